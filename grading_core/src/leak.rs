// Copyright 2024 the project contributors (see CONTRIBUTORS.md).
// Licensed under the Apache License, Version 2.0 (see LICENSE).

//! Component G: the leak probe. Runs the compiled executable a second time under a
//! heap-accounting wrapper, writes a side JSON report to `results/<test.name>.mem`,
//! and parses it into a `Leak` record. Probe failures — the wrapper not being
//! installed, a malformed report — are non-fatal: the caller gets a zero-state
//! `Leak` back and no error flag is raised (§4.G).

use std::path::Path;
use std::time::{Duration, Instant};

use crate::proc_exec::{self, ExecRequest, OutputSink};
use crate::types::Leak;

/// Name of the heap-accounting wrapper. Invoked as `<WRAPPER> <executable> <args...>`.
const WRAPPER: &str = "heapusage";

/// Runs `executable` under the wrapper with the same args and stdin fixture as the
/// main test run, under `timeout`. Never returns `Err`: any failure to spawn, a
/// non-zero wrapper exit, or a JSON parse failure all collapse to a zero-state
/// `Leak`, matching the "swallowed silently" propagation rule.
pub async fn probe(
    executable: &Path,
    args: &[String],
    stdin: Vec<u8>,
    report_path: &Path,
    timeout: Duration,
    executor: &task_executor::Executor,
) -> Leak {
    let start = Instant::now();

    let mut wrapper_args = vec![executable.to_string_lossy().into_owned()];
    wrapper_args.extend(args.iter().cloned());

    let outcome = proc_exec::run(
        ExecRequest {
            program: WRAPPER.to_owned(),
            args: wrapper_args,
            cwd: executable
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| Path::new(".").to_path_buf()),
            stdin,
            timeout,
            stdout: OutputSink::File(report_path.to_path_buf()),
            stderr: OutputSink::Discard,
        },
        executor,
    )
    .await;

    let mut leak = match outcome {
        Ok(_) => parse_report(report_path).await.unwrap_or_default(),
        Err(_) => Leak::default(),
    };
    leak.elapsed = crate::duration::format_duration(start.elapsed());
    leak
}

async fn parse_report(path: &Path) -> Option<Leak> {
    let bytes = tokio::fs::read(path).await.ok()?;
    serde_json::from_slice(&bytes).ok()
}
