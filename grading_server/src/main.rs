// Copyright 2024 the project contributors (see CONTRIBUTORS.md).
// Licensed under the Apache License, Version 2.0 (see LICENSE).

#![deny(warnings)]
#![deny(
    clippy::all,
    clippy::default_trait_access,
    clippy::expl_impl_clone_on_copy,
    clippy::if_not_else,
    clippy::needless_continue,
    clippy::unseparated_literal_suffix,
    clippy::used_underscore_binding
)]
#![allow(clippy::match_ref_pats)]
#![allow(
    clippy::len_without_is_empty,
    clippy::redundant_field_names,
    clippy::too_many_arguments
)]
#![allow(clippy::new_without_default, clippy::new_ret_no_self)]
#![allow(clippy::mutex_atomic)]

mod handlers;

use std::net::TcpListener;
use std::sync::Arc;

use axum::routing::post;
use axum::Router;
use grading_core::Worker;
use handlers::{submit, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let config = grading_config::Config::load()?;
    let executor = task_executor::Executor::new();
    let worker = Worker::with_keep_workspaces(executor, std::env::temp_dir(), config.keep_workspaces);

    let state = AppState {
        worker: Arc::new(worker),
        s3_endpoint: config.s3_endpoint.clone(),
        s3_bucket: config.s3_bucket.clone(),
    };

    let app = Router::new()
        .route("/api/v1/submit", post(submit))
        .with_state(state);

    let address = config.listen_address();
    let listener = TcpListener::bind(&address)?;
    listener.set_nonblocking(true)?;
    log::info!("grading worker listening on {address}");

    axum_server::from_tcp(listener)
        .serve(app.into_make_service())
        .await?;

    Ok(())
}
