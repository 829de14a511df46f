// Copyright 2024 the project contributors (see CONTRIBUTORS.md).
// Licensed under the Apache License, Version 2.0 (see LICENSE).

//! Component I: the report assembler. No logic beyond copying the compilation
//! result and the already-sorted per-test results into the response object.

use crate::types::{CompilationResult, Report, TestResult};

pub fn assemble(compilation: CompilationResult, tests: Vec<TestResult>) -> Report {
    Report { compilation, tests }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DiffResult, ErrorFlag, TimeBreakdown};

    #[test]
    fn copies_compilation_and_tests_verbatim() {
        let compilation = CompilationResult {
            time: "1.000s".to_owned(),
            exit: 0,
            stdout: vec![],
            stderr: vec![],
            error_flags: vec![ErrorFlag::Timeout],
        };
        let tests = vec![TestResult {
            id: "t1".to_owned(),
            name: "case".to_owned(),
            passed: true,
            exit: 0,
            memory_bytes: 0,
            time: TimeBreakdown::default(),
            diff: DiffResult::default(),
            leak: None,
            error_flags: vec![],
        }];

        let report = assemble(compilation.clone(), tests.clone());
        assert_eq!(report.compilation.exit, compilation.exit);
        assert_eq!(report.tests.len(), tests.len());
        assert_eq!(report.tests[0].id, "t1");
    }
}
