//! CLI command implementations.
//!
//! Each command drives one client operation and prints the result as
//! pretty JSON on stdout. Logs go to stderr.

pub mod activity;
pub mod auth;
pub mod collaborators;
pub mod repos;

use gitserver_client::{ConfigError, GatewayError};
use serde::Serialize;
use thiserror::Error;

/// Errors that end a CLI invocation.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Gateway(#[from] GatewayError),

    #[error("not logged in (run `gitserver login` first)")]
    NotLoggedIn,

    #[error("failed to render output: {0}")]
    Output(#[from] serde_json::Error),
}

/// Print `value` as pretty JSON on stdout.
#[allow(clippy::print_stdout)]
pub fn emit<T: Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
