// Copyright 2024 the project contributors (see CONTRIBUTORS.md).
// Licensed under the Apache License, Version 2.0 (see LICENSE).

//! Orchestration: `Workspace.create → (acquire ∥ acquire) → Compile → Locate →
//! (for each test: Run ∥ Leak ∥ Diff) → Report → Workspace.destroy`.
//!
//! A `Worker` owns the handles shared across submissions: the HTTP client used for
//! blob fetches and the executor used for every fan-out and for backgrounding
//! teardown. Submissions share no mutable state with each other.

use std::path::PathBuf;

use grading_config::KeepWorkspaces;

use crate::acquire::acquire;
use crate::compile;
use crate::locate::find_executable;
use crate::report;
use crate::run::run_tests;
use crate::types::{ErrorFlag, Report, Submission};
use crate::workspace::Workspace;

pub struct Worker {
    client: reqwest::Client,
    executor: task_executor::Executor,
    workspace_base: PathBuf,
    keep_workspaces: KeepWorkspaces,
}

impl Worker {
    pub fn new(executor: task_executor::Executor, workspace_base: PathBuf) -> Worker {
        Worker::with_keep_workspaces(executor, workspace_base, KeepWorkspaces::Never)
    }

    pub fn with_keep_workspaces(
        executor: task_executor::Executor,
        workspace_base: PathBuf,
        keep_workspaces: KeepWorkspaces,
    ) -> Worker {
        Worker {
            client: reqwest::Client::new(),
            executor,
            workspace_base,
            keep_workspaces,
        }
    }

    /// Runs a submission to completion. `Err` means the submission aborted before a
    /// report could be produced (`fetch_failed` or an infrastructure problem) — the
    /// HTTP layer maps that to 400. `Ok` always carries a usable report, even when
    /// compilation failed or produced no executable.
    pub async fn grade(
        &self,
        submission: &Submission,
        s3_endpoint: &str,
        s3_bucket: &str,
    ) -> Result<Report, String> {
        let workspace = Workspace::create(&self.workspace_base)?;
        let outcome = self.grade_in_workspace(submission, s3_endpoint, s3_bucket, &workspace).await;

        let keep = match self.keep_workspaces {
            KeepWorkspaces::Always => true,
            KeepWorkspaces::Never => false,
            KeepWorkspaces::OnFailure => outcome.is_err(),
        };
        if keep {
            let path = workspace.keep();
            log::info!("preserving workspace at {path:?} ({:?})", self.keep_workspaces);
        } else {
            workspace.destroy(&self.executor).await;
        }

        outcome
    }

    async fn grade_in_workspace(
        &self,
        submission: &Submission,
        s3_endpoint: &str,
        s3_bucket: &str,
        workspace: &Workspace,
    ) -> Result<Report, String> {
        acquire(
            &self.client,
            s3_endpoint,
            s3_bucket,
            &submission.files,
            &submission.tests,
            workspace,
        )
        .await
        .map_err(|e| format!("fetch_failed: {e}"))?;

        let mut compilation = compile::compile(&submission.compiler, workspace, &self.executor).await?;

        let Some(executable) = find_executable(workspace.path()) else {
            compilation.error_flags.push(ErrorFlag::MissingExecutable);
            return Ok(report::assemble(compilation, Vec::new()));
        };

        let tests = run_tests(&submission.tests, &executable, workspace, &self.executor).await?;
        Ok(report::assemble(compilation, tests))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CompilerConfig, FileRef, Test};
    use axum::{routing::get, Router};
    use std::net::TcpListener;

    fn present(name: &str, reference: &str) -> FileRef {
        FileRef {
            name: name.to_owned(),
            reference: reference.to_owned(),
        }
    }

    fn absent() -> FileRef {
        FileRef {
            name: String::new(),
            reference: String::new(),
        }
    }

    async fn spawn_blob_server() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.set_nonblocking(true).unwrap();
        let addr = listener.local_addr().unwrap();

        let router = Router::new()
            .route("/bucket/hello-c", get(|| async { "#!/bin/sh\nprintf hi\n" }))
            .route("/bucket/stdout-ref", get(|| async { "hi" }));
        tokio::spawn(async move {
            axum_server::from_tcp(listener)
                .serve(router.into_make_service())
                .await
                .unwrap();
        });

        format!("http://{addr}")
    }

    #[tokio::test]
    async fn a_shell_script_submission_compiles_and_passes() {
        let endpoint = spawn_blob_server().await;
        let base = tempfile::tempdir().unwrap();
        let worker = Worker::new(task_executor::Executor::new(), base.path().to_path_buf());

        let submission = Submission {
            files: vec![present("hello.sh", "hello-c")],
            tests: vec![Test {
                id: "t1".to_owned(),
                name: "case".to_owned(),
                args: vec![],
                env: vec![],
                expected_exit: 0,
                leaks: false,
                timeout_ms: 5000,
                stdin: absent(),
                stdout: present("hello.out", "stdout-ref"),
                stderr: absent(),
            }],
            compiler: CompilerConfig {
                cmd: "chmod +x hello.sh".to_owned(),
                timeout_ms: 5000,
                expected_exit: None,
            },
        };

        let report = worker.grade(&submission, &endpoint, "bucket").await.unwrap();
        assert_eq!(report.compilation.exit, 0);
        assert_eq!(report.tests.len(), 1);
    }

    #[tokio::test]
    async fn missing_blob_aborts_the_submission() {
        let endpoint = spawn_blob_server().await;
        let base = tempfile::tempdir().unwrap();
        let worker = Worker::new(task_executor::Executor::new(), base.path().to_path_buf());

        let submission = Submission {
            files: vec![present("hello.sh", "does-not-exist")],
            tests: vec![],
            compiler: CompilerConfig {
                cmd: "true".to_owned(),
                timeout_ms: 5000,
                expected_exit: None,
            },
        };

        let result = worker.grade(&submission, &endpoint, "bucket").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn a_compile_command_producing_no_executable_reports_missing_executable() {
        let endpoint = spawn_blob_server().await;
        let base = tempfile::tempdir().unwrap();
        let worker = Worker::new(task_executor::Executor::new(), base.path().to_path_buf());

        let submission = Submission {
            files: vec![present("hello.sh", "hello-c")],
            tests: vec![],
            compiler: CompilerConfig {
                cmd: "true".to_owned(),
                timeout_ms: 5000,
                expected_exit: None,
            },
        };

        let report = worker.grade(&submission, &endpoint, "bucket").await.unwrap();
        assert!(report.compilation.error_flags.contains(&ErrorFlag::MissingExecutable));
        assert!(report.tests.is_empty());
    }

    #[tokio::test]
    async fn keep_workspaces_always_leaves_the_directory_on_disk() {
        let endpoint = spawn_blob_server().await;
        let base = tempfile::tempdir().unwrap();
        let worker = Worker::with_keep_workspaces(
            task_executor::Executor::new(),
            base.path().to_path_buf(),
            KeepWorkspaces::Always,
        );

        let submission = Submission {
            files: vec![present("hello.sh", "hello-c")],
            tests: vec![],
            compiler: CompilerConfig {
                cmd: "true".to_owned(),
                timeout_ms: 5000,
                expected_exit: None,
            },
        };

        worker.grade(&submission, &endpoint, "bucket").await.unwrap();
        let mut entries = std::fs::read_dir(base.path()).unwrap();
        assert!(entries.next().is_some());
    }
}
