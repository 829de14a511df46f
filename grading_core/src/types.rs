// Copyright 2024 the project contributors (see CONTRIBUTORS.md).
// Licensed under the Apache License, Version 2.0 (see LICENSE).

//! Wire types for the grading request/response bodies (§3 of the data model).
//!
//! Every field name here is load-bearing: it is what the HTTP entrypoint binds
//! JSON onto and what the response serialises back out, so none of these are
//! renamed or reshaped relative to what callers already send.

use serde::{Deserialize, Serialize};

/// A reference to a blob in the object store, plus the name it should land under.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRef {
    pub name: String,
    pub reference: String,
}

impl FileRef {
    /// `name` being empty means "not applicable": skip fetching/capturing/diffing this stream.
    pub fn is_present(&self) -> bool {
        !self.name.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompilerConfig {
    pub cmd: String,
    pub timeout_ms: u64,
    #[serde(default)]
    pub expected_exit: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Test {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: Vec<String>,
    pub expected_exit: i32,
    #[serde(default)]
    pub leaks: bool,
    pub timeout_ms: u64,
    pub stdin: FileRef,
    pub stdout: FileRef,
    pub stderr: FileRef,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub files: Vec<FileRef>,
    pub tests: Vec<Test>,
    pub compiler: CompilerConfig,
}

/// Error kinds that can be attached to a compilation or a test result. The set is
/// deliberately narrow (§3): infrastructure failures that abort the whole submission
/// (`fetch_failed` outside of compilation, missing workspace, …) never reach a client
/// as one of these — they short-circuit to an HTTP 400 instead (§7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorFlag {
    Timeout,
    /// Named `stderr_nonzero` for continuity with the source's flag name, but set on
    /// "the process failed" (non-zero exit or failed to start), not on "stderr is
    /// non-empty" — see the Open Question resolution in SPEC_FULL.md §9.
    StderrNonzero,
    MissingExecutable,
    FetchFailed,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimeBreakdown {
    pub elapsed: String,
    pub user: String,
    pub system: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiffResult {
    pub stdout_lines: Vec<String>,
    pub stderr_lines: Vec<String>,
    pub elapsed: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LeakAmount {
    pub blocks: i64,
    pub bytes: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LeakRuntime {
    pub allocs: i64,
    pub frees: i64,
    pub bytes: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TraceEntry {
    pub address: u64,
    pub location: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LeakSite {
    pub blocks: i64,
    pub bytes: i64,
    #[serde(default)]
    pub trace: Vec<TraceEntry>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Leak {
    #[serde(default)]
    pub pid: i64,
    #[serde(default)]
    pub lost: LeakAmount,
    #[serde(default)]
    pub runtime: LeakRuntime,
    #[serde(default)]
    pub leaks: Vec<LeakSite>,
    /// Wall time from leak-probe spawn to completion. Not part of the source's JSON
    /// shape; recorded here per §4.G ("Elapsed wall time is measured ... and stored").
    #[serde(default)]
    pub elapsed: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompilationResult {
    pub time: String,
    pub exit: i32,
    pub stdout: Vec<String>,
    pub stderr: Vec<String>,
    pub error_flags: Vec<ErrorFlag>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    pub id: String,
    pub name: String,
    pub passed: bool,
    pub exit: i32,
    pub memory_bytes: u64,
    pub time: TimeBreakdown,
    pub diff: DiffResult,
    #[serde(default)]
    pub leak: Option<Leak>,
    pub error_flags: Vec<ErrorFlag>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Report {
    pub compilation: CompilationResult,
    pub tests: Vec<TestResult>,
}
