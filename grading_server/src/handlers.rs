// Copyright 2024 the project contributors (see CONTRIBUTORS.md).
// Licensed under the Apache License, Version 2.0 (see LICENSE).

//! The one HTTP route: decode a submission, run it through the grading pipeline,
//! and map the outcome onto the response contract in §6/§7.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use grading_core::{Submission, Worker};
use serde_json::json;

#[derive(Clone)]
pub struct AppState {
    pub worker: Arc<Worker>,
    pub s3_endpoint: String,
    pub s3_bucket: String,
}

/// `POST /api/v1/submit`. 200 with the report on success; 400 with
/// `{"error": "Bad Request"}` for malformed JSON or a submission that aborted
/// before a report could be produced (fetch failures, workspace allocation
/// failures). We decode the body ourselves rather than relying on axum's `Json`
/// extractor so that a parse failure and a grading failure share one response shape.
pub async fn submit(State(state): State<AppState>, body: Bytes) -> Response {
    let submission: Submission = match serde_json::from_slice(&body) {
        Ok(submission) => submission,
        Err(e) => {
            log::warn!("rejected malformed submission body: {e}");
            return bad_request();
        }
    };

    match state
        .worker
        .grade(&submission, &state.s3_endpoint, &state.s3_bucket)
        .await
    {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(e) => {
            log::warn!("submission aborted: {e}");
            bad_request()
        }
    }
}

fn bad_request() -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({"error": "Bad Request"}))).into_response()
}
