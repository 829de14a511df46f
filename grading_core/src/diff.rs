// Copyright 2024 the project contributors (see CONTRIBUTORS.md).
// Licensed under the Apache License, Version 2.0 (see LICENSE).

//! Component H: the diff engine. Unified diff, zero context lines, between an
//! expected fixture under `tests/` and a produced capture under `results/`.

use std::path::Path;
use std::time::{Duration, Instant};

use similar::TextDiff;

/// One stream's diff: the unified-diff text split into lines, plus how long the
/// comparison took.
pub struct StreamDiff {
    pub lines: Vec<String>,
    pub elapsed: Duration,
}

/// Diffs `expected_path` (the fixture) against `produced_path` (the capture). Treats
/// a missing `produced_path` as "nothing was produced" rather than an error — the
/// test runner may not have created a capture file if the stream's `FileRef.name`
/// was empty, and a compile/spawn failure can also leave it absent.
pub fn diff_files(expected_path: &Path, produced_path: &Path) -> Result<StreamDiff, String> {
    let start = Instant::now();

    let expected = std::fs::read_to_string(expected_path)
        .map_err(|e| format!("Failed to read expected fixture {expected_path:?}: {e}"))?;
    let produced = std::fs::read(produced_path)
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_default();

    let text_diff = TextDiff::from_lines(&expected, &produced);
    let unified = text_diff
        .unified_diff()
        .context_radius(0)
        .header(
            &format!("tests/{}", file_label(expected_path)),
            &format!("results/{}", file_label(produced_path)),
        )
        .to_string();

    let lines = if unified.is_empty() {
        Vec::new()
    } else {
        unified.lines().map(str::to_owned).collect()
    };

    Ok(StreamDiff {
        lines,
        elapsed: start.elapsed(),
    })
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// A diff is "equal" when it is empty or carries only the `---`/`+++` header lines
/// with no `@@` hunks.
pub fn is_empty_or_header_only(lines: &[String]) -> bool {
    lines
        .iter()
        .all(|line| line.is_empty() || line.starts_with("---") || line.starts_with("+++"))
}
