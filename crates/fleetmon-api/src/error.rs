use thiserror::Error;

/// Top-level error type for the `fleetmon-api` crate.
///
/// Every failure mode of a single query: transport, HTTP status,
/// Prometheus error envelopes, and undecodable bodies. `fleetmon-core`
/// maps these into domain diagnostics and decides whether a failed
/// query zero-fills or aborts.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// The server (or an auth proxy in front of it) rejected the request.
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Request timed out.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// TLS handshake or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Prometheus ──────────────────────────────────────────────────
    /// Non-success HTTP status without a decodable error envelope.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// `{"status":"error","errorType":...,"error":...}` envelope.
    #[error("Query failed ({error_type}): {message}")]
    Query { error_type: String, message: String },

    /// The query evaluated to something other than an instant vector.
    #[error("Unexpected result type '{result_type}' (expected vector)")]
    UnexpectedResultType { result_type: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if this is a transient error worth retrying on
    /// the next scheduled pass.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Timeout { .. } => true,
            Self::Http { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// Returns `true` if the request never completed within its deadline.
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout(),
            Self::Timeout { .. } => true,
            _ => false,
        }
    }

    /// The PromQL error class, when the server reported one.
    pub fn error_type(&self) -> Option<&str> {
        match self {
            Self::Query { error_type, .. } => Some(error_type),
            _ => None,
        }
    }
}
