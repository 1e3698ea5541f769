// Prometheus HTTP query client
//
// Wraps `reqwest::Client` with base-URL handling, optional bearer auth,
// and envelope unwrapping. Callers get decoded vector samples or a typed
// `Error` -- an empty vector always means "the query matched nothing",
// never "the request failed".

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, trace, warn};
use url::Url;

use super::models::{QueryData, QueryResponse, VectorSample};
use crate::error::Error;
use crate::transport::TransportConfig;

/// Raw HTTP client for the Prometheus query API.
///
/// Cheap to clone: the underlying `reqwest::Client` is reference counted.
#[derive(Clone)]
pub struct PrometheusClient {
    http: reqwest::Client,
    base_url: Url,
    timeout: Duration,
    bearer_token: Option<SecretString>,
}

impl std::fmt::Debug for PrometheusClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrometheusClient")
            .field("base_url", &self.base_url.as_str())
            .field("timeout", &self.timeout)
            .field("bearer_token", &self.bearer_token.as_ref().map(|_| "<redacted>"))
            .finish_non_exhaustive()
    }
}

impl PrometheusClient {
    /// Create a new client from a `TransportConfig`.
    ///
    /// `base_url` is the server root (e.g. `http://prometheus:9090`); a
    /// path prefix such as `https://host/prometheus` is preserved.
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self {
            http,
            base_url,
            timeout: transport.timeout,
            bearer_token: None,
        })
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self {
            http,
            base_url,
            timeout: TransportConfig::default().timeout,
            bearer_token: None,
        }
    }

    /// Send `Authorization: Bearer <token>` on every request.
    pub fn with_bearer_token(mut self, token: SecretString) -> Self {
        self.bearer_token = Some(token);
        self
    }

    /// The server base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Build `{base}/api/v1/{path}`, keeping any prefix on the base URL.
    pub(crate) fn api_url(&self, path: &str) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{base}/api/v1/{path}"))?)
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// Evaluate an instant query at the server's current time.
    ///
    /// Only instant vectors are accepted; a scalar or string result is an
    /// [`Error::UnexpectedResultType`].
    pub async fn query_instant(&self, query: &str) -> Result<Vec<VectorSample>, Error> {
        let url = self.api_url("query")?;
        debug!(%query, "GET {}", url);

        let mut builder = self.http.get(url).query(&[("query", query)]);
        if let Some(ref token) = self.bearer_token {
            builder = builder.bearer_auth(token.expose_secret());
        }

        let resp = builder.send().await.map_err(|e| self.map_transport(e))?;
        let data = self.parse_envelope(resp).await?;

        if data.result_type != "vector" {
            return Err(Error::UnexpectedResultType {
                result_type: data.result_type,
            });
        }

        let samples: Vec<VectorSample> =
            serde_json::from_value(data.result).map_err(|e| Error::Deserialization {
                message: format!("vector result: {e}"),
                body: String::new(),
            })?;
        trace!(%query, count = samples.len(), "instant query decoded");
        Ok(samples)
    }

    // ── Response handling ────────────────────────────────────────────

    fn map_transport(&self, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::Timeout {
                timeout_secs: self.timeout.as_secs(),
            }
        } else {
            Error::Transport(err)
        }
    }

    /// Parse the `{ status, data }` envelope, returning `data` on success.
    ///
    /// Prometheus reports bad queries as HTTP 400/422 *with* an error
    /// envelope, so the body is decoded before the status is judged.
    async fn parse_envelope(&self, resp: reqwest::Response) -> Result<QueryData, Error> {
        let status = resp.status();

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(Error::Authentication {
                message: format!("HTTP {status} from metrics server"),
            });
        }

        let body = resp.text().await.map_err(|e| self.map_transport(e))?;

        let envelope: QueryResponse<QueryData> = match serde_json::from_str(&body) {
            Ok(envelope) => envelope,
            Err(_) if !status.is_success() => {
                return Err(Error::Http {
                    status: status.as_u16(),
                    body: body.chars().take(200).collect(),
                });
            }
            Err(e) => {
                let preview: String = body.chars().take(200).collect();
                return Err(Error::Deserialization {
                    message: format!("{e} (body preview: {preview:?})"),
                    body,
                });
            }
        };

        for warning in &envelope.warnings {
            warn!(%warning, "metrics server returned a query warning");
        }

        if envelope.status != "success" {
            return Err(Error::Query {
                error_type: envelope.error_type.unwrap_or_else(|| "unknown".into()),
                message: envelope
                    .error
                    .unwrap_or_else(|| format!("status={}", envelope.status)),
            });
        }

        if !status.is_success() {
            return Err(Error::Http {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        envelope.data.ok_or_else(|| Error::Deserialization {
            message: "success envelope without data".into(),
            body,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn api_url_keeps_path_prefix() {
        let client = PrometheusClient::with_client(
            reqwest::Client::new(),
            Url::parse("https://metrics.example/prometheus/").unwrap(),
        );
        assert_eq!(
            client.api_url("query").unwrap().as_str(),
            "https://metrics.example/prometheus/api/v1/query"
        );
    }

    #[test]
    fn debug_redacts_bearer_token() {
        let client = PrometheusClient::with_client(
            reqwest::Client::new(),
            Url::parse("http://localhost:9090").unwrap(),
        )
        .with_bearer_token(SecretString::from("s3cret".to_string()));
        let rendered = format!("{client:?}");
        assert!(!rendered.contains("s3cret"));
        assert!(rendered.contains("<redacted>"));
    }
}
