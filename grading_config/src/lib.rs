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

//! Environment-driven configuration for the grading worker.
//!
//! Mirrors the source service's `config.Init()`: in any environment other than
//! `production`, a `.env` file in the working directory is loaded into the
//! process environment before the required variables are read. Missing `.env`
//! is not fatal here (only a missing *required* variable is).

use std::env;
use std::str::FromStr;

/// Whether a submission's workspace survives past the request that created it, for
/// post-mortem debugging. Mirrors the `KeepSandboxes` convention used for process
/// execution sandboxes upstream: `strum_macros::EnumString` over a lowercase,
/// snake_case env value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum KeepWorkspaces {
    Always,
    Never,
    OnFailure,
}

/// Listen host/port plus the object-store coordinates the blob fetcher composes URLs from.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: String,
    pub s3_endpoint: String,
    pub s3_bucket: String,
    pub keep_workspaces: KeepWorkspaces,
}

impl Config {
    /// Loads configuration from the process environment, first populating it from a `.env`
    /// file unless `ENV=production`.
    pub fn load() -> Result<Config, String> {
        if env::var("ENV").as_deref() != Ok("production") {
            match dotenvy::dotenv() {
                Ok(path) => log::debug!("loaded environment from {}", path.display()),
                Err(e) if e.not_found() => {
                    log::debug!("no .env file found, continuing with process environment only")
                }
                Err(e) => log::warn!("failed to load .env file: {e}"),
            }
        }

        Ok(Config {
            host: required("HOST")?,
            port: required("PORT")?,
            s3_endpoint: required("S3_ENDPOINT")?,
            s3_bucket: required("S3_BUCKET")?,
            keep_workspaces: keep_workspaces(),
        })
    }

    /// The address to bind the HTTP listener to, as `host:port`.
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn required(name: &str) -> Result<String, String> {
    env::var(name).map_err(|_| format!("missing required environment variable {name}"))
}

/// `KEEP_WORKSPACES` is optional; unset or unparsable both fall back to `Never`, the
/// latter with a warning since it usually means a typo in the environment.
fn keep_workspaces() -> KeepWorkspaces {
    match env::var("KEEP_WORKSPACES") {
        Ok(raw) => KeepWorkspaces::from_str(&raw).unwrap_or_else(|_| {
            log::warn!("KEEP_WORKSPACES={raw:?} is not one of always/never/on_failure, defaulting to never");
            KeepWorkspaces::Never
        }),
        Err(_) => KeepWorkspaces::Never,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listen_address_joins_host_and_port() {
        let config = Config {
            host: "0.0.0.0".to_owned(),
            port: "8080".to_owned(),
            s3_endpoint: "http://localhost:9000".to_owned(),
            s3_bucket: "submissions".to_owned(),
            keep_workspaces: KeepWorkspaces::Never,
        };
        assert_eq!(config.listen_address(), "0.0.0.0:8080");
    }

    #[test]
    fn required_reports_missing_variable_by_name() {
        env::remove_var("GRADING_CONFIG_TEST_VAR_UNSET");
        let err = required("GRADING_CONFIG_TEST_VAR_UNSET").unwrap_err();
        assert!(err.contains("GRADING_CONFIG_TEST_VAR_UNSET"));
    }

    #[test]
    fn keep_workspaces_parses_known_values_case_sensitively_lowercase() {
        assert_eq!(KeepWorkspaces::from_str("always").unwrap(), KeepWorkspaces::Always);
        assert_eq!(KeepWorkspaces::from_str("on_failure").unwrap(), KeepWorkspaces::OnFailure);
        assert!(KeepWorkspaces::from_str("sometimes").is_err());
    }
}
