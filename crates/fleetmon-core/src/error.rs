// ── Core error types ──
//
// User-facing errors from fleetmon-core. Consumers never see HTTP status
// codes or JSON parse failures directly; `From<fleetmon_api::Error>`
// translates transport errors into domain variants.

use thiserror::Error;

use crate::store::StoreError;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Metrics source errors ────────────────────────────────────────
    #[error("Cannot reach metrics server at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Metrics query timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Query rejected by metrics server: {message}")]
    Query {
        message: String,
        /// Prometheus `errorType` (e.g. "bad_data"), when reported.
        error_type: Option<String>,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Error log entry not found: {id}")]
    ErrorLogNotFound { id: u64 },

    #[error("Store error: {0}")]
    Store(StoreError),

    // ── Lifecycle errors ─────────────────────────────────────────────
    #[error("Collector is already running")]
    AlreadyRunning,

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

// ── Conversions ─────────────────────────────────────────────────────

impl From<fleetmon_api::Error> for CoreError {
    fn from(err: fleetmon_api::Error) -> Self {
        match err {
            fleetmon_api::Error::Authentication { message } => {
                CoreError::AuthenticationFailed { message }
            }
            fleetmon_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout { timeout_secs: 0 }
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map(ToString::to_string)
                            .unwrap_or_else(|| "<unknown>".into()),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Query {
                        message: e.to_string(),
                        error_type: None,
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            fleetmon_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            fleetmon_api::Error::Timeout { timeout_secs } => CoreError::Timeout { timeout_secs },
            fleetmon_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            fleetmon_api::Error::Http { status, body } => CoreError::Query {
                message: if body.is_empty() {
                    format!("HTTP {status}")
                } else {
                    format!("HTTP {status}: {body}")
                },
                error_type: None,
                status: Some(status),
            },
            fleetmon_api::Error::Query {
                error_type,
                message,
            } => CoreError::Query {
                message,
                error_type: Some(error_type),
                status: None,
            },
            fleetmon_api::Error::UnexpectedResultType { result_type } => CoreError::Query {
                message: format!("expected an instant vector, got {result_type}"),
                error_type: Some("unexpected_result".into()),
                status: None,
            },
            fleetmon_api::Error::Deserialization { message, .. } => {
                CoreError::Internal(format!("Failed to decode metrics response: {message}"))
            }
        }
    }
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { id } => CoreError::ErrorLogNotFound { id },
            other => CoreError::Store(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_envelope_keeps_error_type() {
        let err: CoreError = fleetmon_api::Error::Query {
            error_type: "bad_data".into(),
            message: "parse error".into(),
        }
        .into();
        assert!(matches!(
            err,
            CoreError::Query { error_type: Some(ref t), .. } if t == "bad_data"
        ));
    }

    #[test]
    fn missing_entry_maps_to_not_found() {
        let err: CoreError = StoreError::NotFound { id: 9 }.into();
        assert!(matches!(err, CoreError::ErrorLogNotFound { id: 9 }));
    }
}
