// Copyright 2024 the project contributors (see CONTRIBUTORS.md).
// Licensed under the Apache License, Version 2.0 (see LICENSE).

//! Grading pipeline: workspace lifecycle, resource acquisition, compilation,
//! per-test subprocess supervision (stdin injection, output capture, timeout,
//! leak probing), diffing, and report assembly.

pub mod acquire;
pub mod compile;
pub mod diff;
pub mod duration;
pub mod fetch;
pub mod leak;
pub mod locate;
pub mod proc_exec;
pub mod report;
pub mod run;
pub mod submission;
pub mod types;
pub mod workspace;

pub use submission::Worker;
pub use types::{
    CompilationResult, CompilerConfig, DiffResult, ErrorFlag, FileRef, Leak, LeakAmount,
    LeakRuntime, LeakSite, Report, Submission, Test, TestResult, TimeBreakdown, TraceEntry,
};
