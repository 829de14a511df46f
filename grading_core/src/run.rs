// Copyright 2024 the project contributors (see CONTRIBUTORS.md).
// Licensed under the Apache License, Version 2.0 (see LICENSE).

//! Component F: the test runner. One independent task per test; the leak probe (if
//! requested) runs as a subordinate task alongside the main supervised process.

use std::time::Duration;

use crate::diff::{self, is_empty_or_header_only};
use crate::leak;
use crate::proc_exec::{self, ExecRequest, OutputSink};
use crate::types::{DiffResult, Test, TestResult, TimeBreakdown};
use crate::workspace::Workspace;
use crate::types::ErrorFlag;

/// Runs one test to completion: leak side-task, stdin load, supervised spawn, diff,
/// pass-rule evaluation. Infrastructure failures (fixture unreadable, spawn failure)
/// are `Err`; everything that is itself grading data — timeouts, non-zero exit,
/// diff mismatches, leaks — is folded into the returned `TestResult`.
pub async fn run_test(
    test: &Test,
    executable: &std::path::Path,
    workspace: &Workspace,
    executor: &task_executor::Executor,
) -> Result<TestResult, String> {
    let timeout = Duration::from_millis(test.timeout_ms);

    let stdin_path = test.stdin.is_present().then(|| workspace.fixture_path(&test.stdin.name));
    let stdin = proc_exec::read_fixture(stdin_path.as_deref()).await?;

    let leak_handle = test.leaks.then(|| {
        let report_path = workspace.results_dir().join(format!("{}.mem", test.name));
        let leak_executable = executable.to_path_buf();
        let leak_args = test.args.clone();
        let leak_stdin = stdin.clone();
        let leak_executor = executor.clone();
        executor.native_spawn(async move {
            leak::probe(&leak_executable, &leak_args, leak_stdin, &report_path, timeout, &leak_executor).await
        })
    });

    let stdout_sink = test
        .stdout
        .is_present()
        .then(|| OutputSink::File(workspace.result_path(&test.stdout.name)))
        .unwrap_or(OutputSink::Discard);
    let stderr_sink = test
        .stderr
        .is_present()
        .then(|| OutputSink::File(workspace.result_path(&test.stderr.name)))
        .unwrap_or(OutputSink::Discard);

    let outcome = proc_exec::run(
        ExecRequest {
            program: executable.to_string_lossy().into_owned(),
            args: test.args.clone(),
            cwd: workspace.path().to_path_buf(),
            stdin,
            timeout,
            stdout: stdout_sink,
            stderr: stderr_sink,
        },
        executor,
    )
    .await?;

    let leak = match leak_handle {
        Some(handle) => Some(handle.await.map_err(|e| format!("leak probe task panicked: {e}"))?),
        None => None,
    };

    let diff = combined_diff(test, workspace)?;

    let mut error_flags = Vec::new();
    if outcome.timed_out {
        error_flags.push(ErrorFlag::Timeout);
    }

    let leaked_bytes = leak.as_ref().map_or(0, |l| l.lost.bytes);
    let passed = outcome.exit_code == test.expected_exit
        && is_empty_or_header_only(&diff.stdout_lines)
        && is_empty_or_header_only(&diff.stderr_lines)
        && (!test.leaks || leaked_bytes == 0);

    Ok(TestResult {
        id: test.id.clone(),
        name: test.name.clone(),
        passed,
        exit: outcome.exit_code,
        memory_bytes: outcome.peak_rss_bytes,
        time: TimeBreakdown {
            elapsed: crate::duration::format_duration(outcome.user_time + outcome.system_time),
            user: crate::duration::format_duration(outcome.user_time),
            system: crate::duration::format_duration(outcome.system_time),
        },
        diff,
        leak,
        error_flags,
    })
}

/// Diffs whichever of stdout/stderr the test declares, leaving the other stream's
/// lines empty (trivially equal, per the "skip streams whose name is empty" rule).
fn combined_diff(test: &Test, workspace: &Workspace) -> Result<DiffResult, String> {
    let mut total_elapsed = Duration::ZERO;

    let stdout_lines = if test.stdout.is_present() {
        let stream = diff::diff_files(
            &workspace.fixture_path(&test.stdout.name),
            &workspace.result_path(&test.stdout.name),
        )?;
        total_elapsed += stream.elapsed;
        stream.lines
    } else {
        Vec::new()
    };

    let stderr_lines = if test.stderr.is_present() {
        let stream = diff::diff_files(
            &workspace.fixture_path(&test.stderr.name),
            &workspace.result_path(&test.stderr.name),
        )?;
        total_elapsed += stream.elapsed;
        stream.lines
    } else {
        Vec::new()
    };

    Ok(DiffResult {
        stdout_lines,
        stderr_lines,
        elapsed: crate::duration::format_duration(total_elapsed),
    })
}

/// Runs every test independently in parallel and returns results sorted by `id`, so
/// the report is stable regardless of completion order (§5's ordering invariant).
pub async fn run_tests(
    tests: &[Test],
    executable: &std::path::Path,
    workspace: &Workspace,
    executor: &task_executor::Executor,
) -> Result<Vec<TestResult>, String> {
    let futures = tests
        .iter()
        .map(|test| run_test(test, executable, workspace, executor));
    let mut results = futures::future::try_join_all(futures).await?;
    results.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(results)
}
