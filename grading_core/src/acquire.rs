// Copyright 2024 the project contributors (see CONTRIBUTORS.md).
// Licensed under the Apache License, Version 2.0 (see LICENSE).

//! Component C: the resource acquirer. Two concurrent fan-outs — source files and
//! per-test fixtures — gated by a single barrier before the compile stage begins.

use futures::future::try_join_all;

use crate::fetch::fetch_blob;
use crate::types::{FileRef, Test};
use crate::workspace::Workspace;

/// Composes the blob URL the same way for every fetch: `{endpoint}/{bucket}/{reference}`.
fn blob_url(s3_endpoint: &str, s3_bucket: &str, reference: &str) -> String {
    format!("{}/{}/{}", s3_endpoint.trim_end_matches('/'), s3_bucket, reference)
}

/// Fetches every source file and every test's stdin/stdout/stderr fixture into the
/// workspace, concurrently. Any single failure aborts the whole acquisition — the
/// submission as a whole becomes `fetch_failed`; partial downloads are not retained
/// (the workspace is torn down by the caller regardless).
pub async fn acquire(
    client: &reqwest::Client,
    s3_endpoint: &str,
    s3_bucket: &str,
    files: &[FileRef],
    tests: &[Test],
    workspace: &Workspace,
) -> Result<(), String> {
    let source_fetches = files.iter().map(|file_ref| {
        let url = blob_url(s3_endpoint, s3_bucket, &file_ref.reference);
        let destination = workspace.source_path(&file_ref.name);
        async move { fetch_blob(client, &url, &destination).await }
    });

    let fixture_fetches = tests.iter().flat_map(|test| {
        [&test.stdin, &test.stdout, &test.stderr]
            .into_iter()
            .filter(|file_ref| file_ref.is_present())
    }).map(|file_ref| {
        let url = blob_url(s3_endpoint, s3_bucket, &file_ref.reference);
        let destination = workspace.fixture_path(&file_ref.name);
        async move { fetch_blob(client, &url, &destination).await }
    });

    futures::try_join!(
        try_join_all(source_fetches),
        try_join_all(fixture_fetches),
    )?;

    Ok(())
}
