//! Command implementations for the ama CLI.

pub mod collections;
pub mod config;
pub mod get;
pub mod list;
pub mod query;

use atmyapp_api_rs::client::AtMyAppClient;
use atmyapp_local_rs::{ClientMode, CollectionsClient, SnapshotStoreError};
use serde::Serialize;

use crate::cli::Cli;
use config::Config;

/// Error type for command execution.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// API or query error.
    #[error("{0}")]
    Api(#[from] atmyapp_api_rs::error::Error),

    /// Local snapshot error.
    #[error("snapshot error: {0}")]
    Snapshot(#[from] SnapshotStoreError),

    /// Malformed `--where`/`--any`/`--range` argument.
    #[error("invalid query: {0}")]
    Query(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CommandError {
    /// Returns the process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            CommandError::Api(e) => u8::try_from(e.exit_code()).unwrap_or(2),
            CommandError::Query(_) | CommandError::Json(_) => 1,
            CommandError::Io(_) => 3,
            CommandError::Snapshot(_) | CommandError::Config(_) => 5,
        }
    }

    /// Returns the error code string for JSON error output.
    pub fn code(&self) -> &'static str {
        match self {
            CommandError::Api(atmyapp_api_rs::error::Error::Query(_)) => "QUERY_ERROR",
            CommandError::Api(_) => "API_ERROR",
            CommandError::Snapshot(_) => "SNAPSHOT_ERROR",
            CommandError::Query(_) => "QUERY_ERROR",
            CommandError::Config(_) => "CONFIG_ERROR",
            CommandError::Io(_) => "IO_ERROR",
            CommandError::Json(_) => "JSON_ERROR",
        }
    }
}

/// Result type for command execution.
pub type Result<T> = std::result::Result<T, CommandError>;

/// Settings resolved from the command line and the config file.
#[derive(Debug)]
pub struct CommandContext {
    pub config: Config,
}

impl CommandContext {
    /// Applies command-line overrides on top of `config`.
    pub fn new(cli: &Cli, mut config: Config) -> Self {
        if let Some(api_key) = &cli.api_key {
            config.api_key = Some(api_key.clone());
        }
        if let Some(base_url) = &cli.base_url {
            config.base_url = Some(base_url.clone());
        }
        if let Some(mode) = cli.mode {
            config.collections.client_mode = mode;
        }
        if let Some(path) = &cli.local_path {
            config.collections.local_storage.path = path.clone();
        }
        Self { config }
    }

    /// Builds the collections client for the resolved mode.
    ///
    /// Online mode needs an API key. The other modes build a transport only
    /// when a key is available.
    pub fn collections_client(&self) -> Result<CollectionsClient> {
        let mode = self.config.collections.client_mode;
        let remote = match (&self.config.api_key, mode) {
            (Some(api_key), ClientMode::Online | ClientMode::WithFallback) => {
                let mut builder = AtMyAppClient::builder(api_key.as_str());
                if let Some(base_url) = &self.config.base_url {
                    builder = builder.base_url(base_url.as_str());
                }
                Some(builder.build()?)
            }
            (None, ClientMode::Online) => {
                return Err(CommandError::Config(
                    "No API key configured. Set AMA_API_KEY, pass --api-key, or add api_key to the config file".to_string(),
                ))
            }
            _ => None,
        };

        tracing::debug!(mode = %mode, remote = remote.is_some(), "Building collections client");
        Ok(CollectionsClient::from_config(self.config.collections.clone(), remote))
    }
}

/// Prints `value` as pretty JSON on stdout.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
