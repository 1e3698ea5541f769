//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError`, `StoreError` and `ConfigError` into user-facing
//! errors with actionable help text and distinct exit codes.

use miette::Diagnostic;
use thiserror::Error;

use fleetmon_config::ConfigError;
use fleetmon_core::{CoreError, StoreError};

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONFLICT: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the metrics server at {url}")]
    #[diagnostic(
        code(fleetmon::connection_failed),
        help(
            "Check that Prometheus is running and reachable.\n\
             Set the URL with --prometheus or [prometheus] url in the config file.\n\
             For self-signed certificates use --insecure (-k) or ca_cert."
        )
    )]
    ConnectionFailed {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Authentication with the metrics server failed")]
    #[diagnostic(
        code(fleetmon::auth_failed),
        help(
            "Check the bearer token.\n\
             Store one with: fleetmon config set-token\n\
             Or set bearer_token_env in the [prometheus] section."
        )
    )]
    AuthFailed { message: String },

    #[error("Query failed: {message}")]
    #[diagnostic(
        code(fleetmon::query_failed),
        help("Check the PromQL expression; it must return an instant vector.")
    )]
    QueryFailed { message: String },

    #[error("Request timed out after {seconds}s")]
    #[diagnostic(
        code(fleetmon::timeout),
        help("Increase timeout with --timeout or check Prometheus responsiveness.")
    )]
    Timeout { seconds: u64 },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(fleetmon::not_found),
        help("Run: fleetmon {list_command} to see available {resource_type}s")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    #[error("No state file configured")]
    #[diagnostic(
        code(fleetmon::no_state_file),
        help(
            "Stored devices, error logs and the summary live in the state file.\n\
             Pass --state-file or set [collector] state_file in {path}"
        )
    )]
    NoStateFile { path: String },

    #[error("Store error: {message}")]
    #[diagnostic(code(fleetmon::store))]
    Store { message: String },

    #[error("The collector is already running")]
    #[diagnostic(code(fleetmon::conflict))]
    Conflict,

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(fleetmon::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Config file already exists at {path}")]
    #[diagnostic(
        code(fleetmon::config_exists),
        help("Use --force to overwrite it.")
    )]
    ConfigExists { path: String },

    #[error("Configuration could not be loaded")]
    #[diagnostic(
        code(fleetmon::config),
        help("Check the config file syntax and FLEETMON_* environment variables.")
    )]
    Config(#[source] ConfigError),

    // ── Interactive ──────────────────────────────────────────────────
    #[error("Operation '{action}' requires confirmation")]
    #[diagnostic(
        code(fleetmon::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── Internal ─────────────────────────────────────────────────────
    #[error("Internal error: {0}")]
    #[diagnostic(code(fleetmon::internal))]
    Internal(String),

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("JSON serialization failed: {0}")]
    #[diagnostic(code(fleetmon::json))]
    Json(#[from] serde_json::Error),

    #[error("YAML serialization failed: {0}")]
    #[diagnostic(code(fleetmon::yaml))]
    Yaml(#[from] serde_yaml::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } => exit_code::AUTH,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Conflict | Self::ConfigExists { .. } => exit_code::CONFLICT,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Validation { .. }
            | Self::NoStateFile { .. }
            | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── Conversions ──────────────────────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => CliError::ConnectionFailed {
                url,
                source: reason.into(),
            },

            CoreError::AuthenticationFailed { message } => CliError::AuthFailed { message },

            CoreError::Timeout { timeout_secs } => CliError::Timeout {
                seconds: timeout_secs,
            },

            CoreError::Query { message, .. } => CliError::QueryFailed { message },

            CoreError::ErrorLogNotFound { id } => CliError::NotFound {
                resource_type: "error log entry".into(),
                identifier: id.to_string(),
                list_command: "logs list".into(),
            },

            CoreError::Store(e) => CliError::Store {
                message: e.to_string(),
            },

            CoreError::AlreadyRunning => CliError::Conflict,

            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },

            CoreError::Internal(message) => CliError::Internal(message),
        }
    }
}

impl From<StoreError> for CliError {
    fn from(err: StoreError) -> Self {
        CoreError::from(err).into()
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            other => CliError::Config(other),
        }
    }
}
