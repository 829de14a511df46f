// Copyright 2024 the project contributors (see CONTRIBUTORS.md).
// Licensed under the Apache License, Version 2.0 (see LICENSE).

//! Component B: the blob fetcher. Streams one remote blob into a named file under
//! the workspace. Grounded in the engine's `downloads::NetDownload`, stripped of
//! content-addressed verification and retries — submissions carry no digest to
//! verify against, and the spec does not ask for retry/backoff here.

use std::path::Path;

use futures::StreamExt;
use tokio::io::AsyncWriteExt;
use tokio_util::io::StreamReader;

/// GETs `url` and streams the body into `destination`, creating/truncating it.
/// Never panics: every failure mode comes back as `Err`, for the acquirer to collect.
pub async fn fetch_blob(client: &reqwest::Client, url: &str, destination: &Path) -> Result<(), String> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| format!("Failed to GET {url}: {e}"))?;

    let status = response.status();
    if !status.is_success() {
        return Err(format!("Fetching {url} returned HTTP {status}"));
    }

    let byte_stream = response
        .bytes_stream()
        .map(|result| result.map_err(std::io::Error::other));
    let mut reader = StreamReader::new(byte_stream);

    let mut file = tokio::fs::File::create(destination)
        .await
        .map_err(|e| format!("Failed to create {destination:?}: {e}"))?;

    tokio::io::copy(&mut reader, &mut file)
        .await
        .map_err(|e| format!("Failed to stream {url} into {destination:?}: {e}"))?;
    file.flush()
        .await
        .map_err(|e| format!("Failed to flush {destination:?}: {e}"))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::get, Router};
    use std::net::TcpListener;

    async fn spawn_blob_server(body: &'static [u8]) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.set_nonblocking(true).unwrap();
        let addr = listener.local_addr().unwrap();

        let router = Router::new().route("/blob", get(move || async move { body }));
        tokio::spawn(async move {
            axum_server::from_tcp(listener)
                .serve(router.into_make_service())
                .await
                .unwrap();
        });

        format!("http://{addr}/blob")
    }

    #[tokio::test]
    async fn fetch_blob_streams_body_to_destination() {
        let url = spawn_blob_server(b"hello from the object store").await;
        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("hello.c");

        let client = reqwest::Client::new();
        fetch_blob(&client, &url, &destination).await.unwrap();

        let contents = std::fs::read(&destination).unwrap();
        assert_eq!(contents, b"hello from the object store");
    }

    #[tokio::test]
    async fn fetch_blob_reports_http_errors() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.set_nonblocking(true).unwrap();
        let addr = listener.local_addr().unwrap();
        let router = Router::new().route(
            "/missing",
            get(|| async { (axum::http::StatusCode::NOT_FOUND, "nope") }),
        );
        tokio::spawn(async move {
            axum_server::from_tcp(listener)
                .serve(router.into_make_service())
                .await
                .unwrap();
        });

        let dir = tempfile::tempdir().unwrap();
        let client = reqwest::Client::new();
        let result = fetch_blob(
            &client,
            &format!("http://{addr}/missing"),
            &dir.path().join("out"),
        )
        .await;
        assert!(result.is_err());
    }
}
