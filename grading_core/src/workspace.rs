// Copyright 2024 the project contributors (see CONTRIBUTORS.md).
// Licensed under the Apache License, Version 2.0 (see LICENSE).

//! Component A: the workspace (enclave). A unique scratch directory with `tests/`
//! and `results/` subdirectories, torn down on every exit path.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

const TESTS_SUBDIR: &str = "tests";
const RESULTS_SUBDIR: &str = "results";

/// An ephemeral directory tree that hosts one submission's files.
///
/// Teardown rides on `TempDir`'s own `Drop` impl: once the last reference to the
/// `Workspace` goes away — success, early return, or unwind — the directory is gone.
/// `destroy` exists for the common case of wanting that cleanup to happen off the
/// async executor's worker threads rather than inline.
pub struct Workspace {
    root: Option<TempDir>,
}

impl Workspace {
    /// Allocates `<base_dir>/<uuid>-.../` with `tests/` and `results/` beneath it.
    pub fn create(base_dir: &Path) -> Result<Workspace, String> {
        let prefix = format!("{}-", uuid::Uuid::new_v4());
        let root = tempfile::Builder::new()
            .prefix(&prefix)
            .tempdir_in(base_dir)
            .map_err(|e| format!("Failed to allocate workspace under {base_dir:?}: {e}"))?;

        std::fs::create_dir(root.path().join(TESTS_SUBDIR))
            .map_err(|e| format!("Failed to create tests/ subdir: {e}"))?;
        std::fs::create_dir(root.path().join(RESULTS_SUBDIR))
            .map_err(|e| format!("Failed to create results/ subdir: {e}"))?;

        Ok(Workspace { root: Some(root) })
    }

    fn root_path(&self) -> &Path {
        self.root
            .as_ref()
            .expect("Workspace used after destroy()")
            .path()
    }

    /// Root of the workspace; source files and the compiled executable live here directly.
    pub fn path(&self) -> &Path {
        self.root_path()
    }

    pub fn tests_dir(&self) -> PathBuf {
        self.root_path().join(TESTS_SUBDIR)
    }

    pub fn results_dir(&self) -> PathBuf {
        self.root_path().join(RESULTS_SUBDIR)
    }

    /// Destination for a source `FileRef` landing directly under the workspace root.
    pub fn source_path(&self, name: &str) -> PathBuf {
        self.root_path().join(name)
    }

    /// Destination for a test fixture (stdin / expected stdout / expected stderr).
    pub fn fixture_path(&self, name: &str) -> PathBuf {
        self.tests_dir().join(name)
    }

    /// Destination for a produced capture, keyed by the expected file's name so the
    /// diff engine can pair `tests/<name>` with `results/<name>`.
    pub fn result_path(&self, name: &str) -> PathBuf {
        self.results_dir().join(name)
    }

    /// Tears the workspace down on the executor's blocking pool, so the recursive
    /// directory removal doesn't run inline on an async worker thread.
    pub async fn destroy(mut self, executor: &task_executor::Executor) {
        if let Some(root) = self.root.take() {
            let _ = executor
                .spawn_blocking(move || drop(root), |_join_error| ())
                .await;
        }
    }

    /// Detaches the directory from its `TempDir` guard so it survives past this
    /// `Workspace`, for post-mortem inspection (`KEEP_WORKSPACES`). Returns the root path.
    pub fn keep(mut self) -> PathBuf {
        self.root
            .take()
            .expect("Workspace used after destroy()")
            .into_path()
    }
}
