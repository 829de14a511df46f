// Copyright 2024 the project contributors (see CONTRIBUTORS.md).
// Licensed under the Apache License, Version 2.0 (see LICENSE).

//! Component E: the executable locator.

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// Scans the workspace root (not recursively into `tests/`/`results/`, which never
/// hold the compiler's output) for a regular file with any execute bit set. Ties are
/// broken by lexicographic path order, which the spec leaves as our choice to
/// document since production inputs are expected to produce exactly one candidate.
pub fn find_executable(workspace_root: &Path) -> Option<PathBuf> {
    let mut candidates: Vec<PathBuf> = WalkDir::new(workspace_root)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .metadata()
                .map(|m| m.permissions().mode() & 0o111 != 0)
                .unwrap_or(false)
        })
        .map(|entry| entry.into_path())
        .collect();

    candidates.sort();
    candidates.into_iter().next()
}
