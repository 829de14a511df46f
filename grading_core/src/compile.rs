// Copyright 2024 the project contributors (see CONTRIBUTORS.md).
// Licensed under the Apache License, Version 2.0 (see LICENSE).

//! Component D: the compiler driver.

use std::time::Duration;

use crate::duration::format_duration;
use crate::proc_exec::{self, ExecRequest, OutputSink};
use crate::types::{CompilationResult, CompilerConfig, ErrorFlag};
use crate::workspace::Workspace;

/// Splits `cmd` on ASCII space, no shell expansion or quoting — the Open Question in
/// SPEC_FULL.md §9 is resolved in favour of tokenise-and-argv-exec, not `bash -c`.
fn tokenize_command(cmd: &str) -> Vec<String> {
    cmd.split(' ').filter(|token| !token.is_empty()).map(str::to_owned).collect()
}

/// Runs the configured compile command with the workspace root as its working
/// directory, under `compiler.timeout_ms`. Never returns `Err` for a failing
/// compile — that is data (`error_flags` + non-zero `exit`), not an error; only
/// infrastructure problems (the command string tokenising to nothing, the process
/// failing to spawn) are `Err`.
pub async fn compile(
    compiler: &CompilerConfig,
    workspace: &Workspace,
    executor: &task_executor::Executor,
) -> Result<CompilationResult, String> {
    let tokens = tokenize_command(&compiler.cmd);
    let (program, args) = tokens
        .split_first()
        .ok_or_else(|| "compiler.cmd tokenised to an empty argv".to_owned())?;

    let outcome = proc_exec::run(
        ExecRequest {
            program: program.clone(),
            args: args.to_vec(),
            cwd: workspace.path().to_path_buf(),
            stdin: Vec::new(),
            timeout: Duration::from_millis(compiler.timeout_ms),
            stdout: OutputSink::Memory,
            stderr: OutputSink::Memory,
        },
        executor,
    )
    .await?;

    let mut error_flags = Vec::new();
    if outcome.timed_out {
        error_flags.push(ErrorFlag::Timeout);
    }
    // "process failed" reading of the Open Question: non-zero exit (including a
    // timeout kill, whose decoded exit code is negative) sets the flag.
    if outcome.exit_code != 0 {
        error_flags.push(ErrorFlag::StderrNonzero);
    }

    Ok(CompilationResult {
        time: format_duration(outcome.user_time + outcome.system_time),
        exit: outcome.exit_code,
        stdout: split_lines(outcome.stdout.unwrap_or_default()),
        stderr: split_lines(outcome.stderr.unwrap_or_default()),
        error_flags,
    })
}

fn split_lines(bytes: Vec<u8>) -> Vec<String> {
    if bytes.is_empty() {
        return Vec::new();
    }
    String::from_utf8_lossy(&bytes).split('\n').map(str::to_owned).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_splits_on_space_and_drops_empties() {
        assert_eq!(
            tokenize_command("gcc  hello.c -o hello"),
            vec!["gcc", "hello.c", "-o", "hello"]
        );
    }

    #[tokio::test]
    async fn successful_compile_has_no_error_flags() {
        let base = tempfile::tempdir().unwrap();
        let workspace = Workspace::create(base.path()).unwrap();
        let executor = task_executor::Executor::new();
        let result = compile(
            &CompilerConfig {
                cmd: "true".to_owned(),
                timeout_ms: 5000,
                expected_exit: None,
            },
            &workspace,
            &executor,
        )
        .await
        .unwrap();

        assert_eq!(result.exit, 0);
        assert!(result.error_flags.is_empty());
    }

    #[tokio::test]
    async fn failing_compile_sets_the_process_failed_flag() {
        let base = tempfile::tempdir().unwrap();
        let workspace = Workspace::create(base.path()).unwrap();
        let executor = task_executor::Executor::new();
        let result = compile(
            &CompilerConfig {
                cmd: "false".to_owned(),
                timeout_ms: 5000,
                expected_exit: None,
            },
            &workspace,
            &executor,
        )
        .await
        .unwrap();

        assert_ne!(result.exit, 0);
        assert_eq!(result.error_flags, vec![ErrorFlag::StderrNonzero]);
    }
}
