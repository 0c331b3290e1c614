//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and a stable process exit code.

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

use owfleet_config::ConfigError;
use owfleet_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const CONFIG: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
    pub const DATA: i32 = 9;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Configuration ────────────────────────────────────────────────
    #[error("Topology file {} not found", path.display())]
    #[diagnostic(
        code(owfleet::no_topology),
        help(
            "Create clouds.json in the config directory, or point --config-dir at it.\n\
             Run: owfleet config path"
        )
    )]
    NoTopology { path: PathBuf },

    #[error("Deployment '{name}' not found in {}", path.display())]
    #[diagnostic(
        code(owfleet::unknown_deployment),
        help("Run: owfleet config deployments")
    )]
    UnknownDeployment { name: String, path: PathBuf },

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(owfleet::validation))]
    Validation { field: String, reason: String },

    #[error("Configuration error: {message}")]
    #[diagnostic(
        code(owfleet::config),
        help("Check owfleet.toml and OWFLEET_* environment variables.")
    )]
    Config { message: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("No credentials for deployment '{name}' in {}", path.display())]
    #[diagnostic(
        code(owfleet::no_credentials),
        help("Add a userId and password entry for the deployment, keyed by its name.")
    )]
    NoCredentials { name: String, path: PathBuf },

    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(owfleet::auth_failed),
        help(
            "Verify the userId and password in PRIV-creds.json.\n\
             If a cached token has expired, rerun with --fresh-login."
        )
    )]
    AuthFailed { message: String },

    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to {url}")]
    #[diagnostic(
        code(owfleet::connection_failed),
        help(
            "{reason}\n\
             Check the host and port in clouds.json, or try --insecure for self-signed certificates."
        )
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("Request to {url} timed out")]
    #[diagnostic(
        code(owfleet::timeout),
        help("Increase the timeout with --timeout or timeout_secs in owfleet.toml.")
    )]
    Timeout { url: String },

    // ── Data ─────────────────────────────────────────────────────────
    #[error("No {resource} data available")]
    #[diagnostic(code(owfleet::collection_unavailable), help("{reason}"))]
    CollectionUnavailable {
        resource: &'static str,
        reason: String,
    },

    #[error("Unable to load statistics for {mac} after {attempts} attempts")]
    #[diagnostic(
        code(owfleet::stats_unavailable),
        help("Rerun with --skip-failed-stats to continue past devices without statistics.")
    )]
    StatsUnavailable { mac: String, attempts: u32 },

    // ── API ──────────────────────────────────────────────────────────
    #[error("API error: {message}")]
    #[diagnostic(code(owfleet::api_error))]
    Api { message: String },

    #[error("Report failed: {message}")]
    #[diagnostic(code(owfleet::report))]
    Report { message: String },

    #[error("Cache file {}: {message}", path.display())]
    #[diagnostic(
        code(owfleet::cache),
        help("Delete the file to rebuild it on the next run.")
    )]
    Cache { path: PathBuf, message: String },

    #[error("Internal error: {0}")]
    #[diagnostic(code(owfleet::internal))]
    Internal(String),

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("JSON output failed: {0}")]
    #[diagnostic(code(owfleet::json))]
    Json(#[from] serde_json::Error),

    #[error("YAML output failed: {0}")]
    #[diagnostic(code(owfleet::yaml))]
    Yaml(#[from] serde_yaml::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NoTopology { .. }
            | Self::UnknownDeployment { .. }
            | Self::Validation { .. }
            | Self::Config { .. } => exit_code::CONFIG,
            Self::NoCredentials { .. } | Self::AuthFailed { .. } => exit_code::AUTH,
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::CollectionUnavailable { .. } | Self::StatsUnavailable { .. } => exit_code::DATA,
            _ => exit_code::GENERAL,
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::MissingFile { path } => CliError::NoTopology { path },
            ConfigError::UnknownDeployment { name, path } => {
                CliError::UnknownDeployment { name, path }
            }
            ConfigError::MissingCredentials { name, path } => CliError::NoCredentials { name, path },
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            other @ (ConfigError::Serialization(_) | ConfigError::Figment(_)) => CliError::Config {
                message: other.to_string(),
            },
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Config { message } => CliError::Config { message },
            CoreError::AuthenticationFailed { message } => CliError::AuthFailed { message },
            CoreError::ConnectionFailed { url, reason } => {
                CliError::ConnectionFailed { url, reason }
            }
            CoreError::Timeout { url } => CliError::Timeout { url },
            CoreError::CollectionUnavailable { resource, reason } => {
                CliError::CollectionUnavailable { resource, reason }
            }
            CoreError::StatsUnavailable { mac, attempts } => {
                CliError::StatsUnavailable { mac, attempts }
            }
            CoreError::Cache { path, message } => CliError::Cache { path, message },
            CoreError::Report(e) => CliError::Report {
                message: e.to_string(),
            },
            CoreError::Api { message, .. } => CliError::Api { message },
            CoreError::Io(e) => CliError::Io(e),
            CoreError::Internal(message) => CliError::Internal(message),
        }
    }
}

impl From<owfleet_api::Error> for CliError {
    fn from(err: owfleet_api::Error) -> Self {
        CoreError::from(err).into()
    }
}
