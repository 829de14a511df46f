// Copyright 2024 the project contributors (see CONTRIBUTORS.md).
// Licensed under the Apache License, Version 2.0 (see LICENSE).

//! Subprocess execution shared by the compiler driver (§4.D), the test runner
//! (§4.F), and the leak probe (§4.G): spawn with a monotonic deadline, capture or
//! sink stdout/stderr, and report exit status plus per-child resource accounting.
//!
//! Runs the child via `std::process::Command` on the executor's blocking pool and
//! reaps it with `libc::wait4` targeted at its own pid. `getrusage(RUSAGE_CHILDREN)`
//! — the simpler alternative — aggregates *all* terminated children of the process,
//! which races when many tests (and their leak-probe siblings) run concurrently;
//! `wait4` on a specific pid does not have that problem.

use std::io::{Read, Write};
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::{Command as StdCommand, Stdio};
use std::thread;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Where a child's stdout/stderr should go.
pub enum OutputSink {
    /// Captured into memory and returned in `ExecOutcome`.
    Memory,
    /// Redirected directly into a file (truncated/created first).
    File(PathBuf),
    /// Discarded.
    Discard,
}

pub struct ExecRequest {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    pub stdin: Vec<u8>,
    pub timeout: Duration,
    pub stdout: OutputSink,
    pub stderr: OutputSink,
}

#[derive(Debug, Default)]
pub struct ExecOutcome {
    /// Exit code, or `-signal` if the process was killed by a signal (including our
    /// own timeout SIGKILL).
    pub exit_code: i32,
    pub timed_out: bool,
    pub stdout: Option<Vec<u8>>,
    pub stderr: Option<Vec<u8>>,
    pub user_time: Duration,
    pub system_time: Duration,
    pub peak_rss_bytes: u64,
}

/// Runs `req` to completion (or until its deadline expires) on the given executor's
/// blocking pool.
pub async fn run(req: ExecRequest, executor: &task_executor::Executor) -> Result<ExecOutcome, String> {
    executor
        .spawn_blocking(
            move || run_blocking(req),
            |join_error| Err(format!("process supervisor task panicked: {join_error}")),
        )
        .await
}

fn open_sink(sink: &OutputSink) -> Result<Stdio, String> {
    match sink {
        OutputSink::Memory => Ok(Stdio::piped()),
        OutputSink::Discard => Ok(Stdio::null()),
        OutputSink::File(path) => {
            let file = std::fs::File::create(path).map_err(|e| format!("Failed to create {path:?}: {e}"))?;
            Ok(Stdio::from(file))
        }
    }
}

fn run_blocking(req: ExecRequest) -> Result<ExecOutcome, String> {
    let mut command = StdCommand::new(&req.program);
    command.args(&req.args);
    command.current_dir(&req.cwd);
    command.stdin(Stdio::piped());
    command.stdout(open_sink(&req.stdout)?);
    command.stderr(open_sink(&req.stderr)?);

    // New process group, so a timeout kill takes the whole subtree with it.
    unsafe {
        command.pre_exec(|| {
            nix::unistd::setsid()
                .map(|_pgid| ())
                .map_err(|e| std::io::Error::other(format!("Could not create new pgid: {e}")))
        });
    }

    let mut child = command
        .spawn()
        .map_err(|e| format!("Failed to spawn {}: {e}", req.program))?;
    let pid = child.id() as libc::pid_t;

    let mut stdin_pipe = child.stdin.take();
    let stdin_bytes = req.stdin;
    let stdin_writer = thread::spawn(move || {
        if let Some(mut pipe) = stdin_pipe.take() {
            let _ = pipe.write_all(&stdin_bytes);
            // Drop closes the write end, signalling EOF to the child.
        }
    });

    let stdout_reader = spawn_capture_reader(child.stdout.take());
    let stderr_reader = spawn_capture_reader(child.stderr.take());

    let (status, rusage, timed_out) = wait_with_deadline(pid, req.timeout)?;

    let _ = stdin_writer.join();
    let stdout = stdout_reader.join().map_err(|_| "stdout reader thread panicked".to_owned())?;
    let stderr = stderr_reader.join().map_err(|_| "stderr reader thread panicked".to_owned())?;

    let exit_code = decode_exit_code(status);
    let (user_time, system_time) = rusage_times(&rusage);
    let peak_rss_bytes = normalize_maxrss(rusage.ru_maxrss);

    Ok(ExecOutcome {
        exit_code,
        timed_out,
        stdout,
        stderr,
        user_time,
        system_time,
        peak_rss_bytes,
    })
}

fn spawn_capture_reader<R>(pipe: Option<R>) -> thread::JoinHandle<Option<Vec<u8>>>
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let mut pipe = pipe?;
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        Some(buf)
    })
}

/// Polls the child with `wait4(..., WNOHANG, ...)` until it exits or `timeout` elapses.
/// On timeout, SIGKILLs the whole process group and performs one final blocking `wait4`
/// to reap it and collect its final rusage.
fn wait_with_deadline(pid: libc::pid_t, timeout: Duration) -> Result<(libc::c_int, libc::rusage, bool), String> {
    let deadline = Instant::now() + timeout;
    let mut status: libc::c_int = 0;
    let mut rusage: libc::rusage = unsafe { std::mem::zeroed() };

    loop {
        let ret = unsafe { libc::wait4(pid, &mut status, libc::WNOHANG, &mut rusage) };
        if ret == pid {
            return Ok((status, rusage, false));
        }
        if ret < 0 {
            return Err(format!(
                "wait4({pid}) failed: {}",
                std::io::Error::last_os_error()
            ));
        }
        // ret == 0: still running.
        if Instant::now() >= deadline {
            // Signal the whole group so any children the target spawned die with it.
            unsafe {
                libc::kill(-pid, libc::SIGKILL);
            }
            let ret = unsafe { libc::wait4(pid, &mut status, 0, &mut rusage) };
            if ret < 0 {
                return Err(format!(
                    "wait4({pid}) failed after timeout kill: {}",
                    std::io::Error::last_os_error()
                ));
            }
            return Ok((status, rusage, true));
        }
        thread::sleep(POLL_INTERVAL);
    }
}

fn decode_exit_code(status: libc::c_int) -> i32 {
    if libc::WIFEXITED(status) {
        libc::WEXITSTATUS(status)
    } else if libc::WIFSIGNALED(status) {
        -libc::WTERMSIG(status)
    } else {
        -1
    }
}

fn rusage_times(rusage: &libc::rusage) -> (Duration, Duration) {
    let user = Duration::new(rusage.ru_utime.tv_sec as u64, (rusage.ru_utime.tv_usec as u32) * 1000);
    let system = Duration::new(rusage.ru_stime.tv_sec as u64, (rusage.ru_stime.tv_usec as u32) * 1000);
    (user, system)
}

/// `ru_maxrss` is kilobytes on Linux and bytes on macOS; normalise to bytes.
#[cfg(target_os = "macos")]
fn normalize_maxrss(ru_maxrss: libc::c_long) -> u64 {
    ru_maxrss.max(0) as u64
}

#[cfg(not(target_os = "macos"))]
fn normalize_maxrss(ru_maxrss: libc::c_long) -> u64 {
    (ru_maxrss.max(0) as u64) * 1024
}

/// Reads a small, bounded fixture file fully into memory, or an empty buffer if `path`
/// is `None` (i.e. the corresponding `FileRef.name` was empty).
pub async fn read_fixture(path: Option<&Path>) -> Result<Vec<u8>, String> {
    match path {
        None => Ok(Vec::new()),
        Some(path) => tokio::fs::read(path)
            .await
            .map_err(|e| format!("Failed to read fixture {path:?}: {e}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn echoes_stdin_and_reports_exit_code() {
        let executor = task_executor::Executor::new();
        let dir = tempfile::tempdir().unwrap();
        let outcome = run(
            ExecRequest {
                program: "cat".to_owned(),
                args: vec![],
                cwd: dir.path().to_path_buf(),
                stdin: b"hello\n".to_vec(),
                timeout: Duration::from_secs(5),
                stdout: OutputSink::Memory,
                stderr: OutputSink::Memory,
            },
            &executor,
        )
        .await
        .unwrap();

        assert_eq!(outcome.exit_code, 0);
        assert!(!outcome.timed_out);
        assert_eq!(outcome.stdout.unwrap(), b"hello\n");
    }

    #[tokio::test]
    async fn kills_process_on_timeout() {
        let executor = task_executor::Executor::new();
        let dir = tempfile::tempdir().unwrap();
        let outcome = run(
            ExecRequest {
                program: "sleep".to_owned(),
                args: vec!["5".to_owned()],
                cwd: dir.path().to_path_buf(),
                stdin: Vec::new(),
                timeout: Duration::from_millis(100),
                stdout: OutputSink::Discard,
                stderr: OutputSink::Discard,
            },
            &executor,
        )
        .await
        .unwrap();

        assert!(outcome.timed_out);
        assert_eq!(outcome.exit_code, -libc::SIGKILL);
    }

    #[tokio::test]
    async fn redirects_stdout_to_a_file() {
        let executor = task_executor::Executor::new();
        let dir = tempfile::tempdir().unwrap();
        let out_path = dir.path().join("out.txt");
        let outcome = run(
            ExecRequest {
                program: "printf".to_owned(),
                args: vec!["captured".to_owned()],
                cwd: dir.path().to_path_buf(),
                stdin: Vec::new(),
                timeout: Duration::from_secs(5),
                stdout: OutputSink::File(out_path.clone()),
                stderr: OutputSink::Discard,
            },
            &executor,
        )
        .await
        .unwrap();

        assert_eq!(outcome.exit_code, 0);
        assert_eq!(std::fs::read_to_string(&out_path).unwrap(), "captured");
    }
}
