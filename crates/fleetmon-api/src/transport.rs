// ── HTTP transport for metrics servers ──
//
// Every request to Prometheus goes through one `reqwest::Client`, built
// here from the configured TLS mode and query deadline.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Error;

const USER_AGENT: &str = concat!("fleetmon/", env!("CARGO_PKG_VERSION"));

/// Deadline for a single instant query.
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(10);

/// How the metrics server's certificate is checked.
#[derive(Debug, Clone, Default)]
pub enum TlsMode {
    #[default]
    System,
    /// Trust the PEM bundle at this path in addition to the system roots.
    CustomCa(PathBuf),
    /// Skip verification. Only for lab servers with self-signed certs.
    DangerAcceptInvalid,
}

#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub tls: TlsMode,
    /// A query exceeding this fails with [`Error::Timeout`].
    pub timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            tls: TlsMode::default(),
            timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }
}

impl TransportConfig {
    pub fn with_timeout(self, timeout: Duration) -> Self {
        Self { timeout, ..self }
    }

    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        let builder = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(USER_AGENT);

        let builder = match &self.tls {
            TlsMode::System => builder,
            TlsMode::CustomCa(path) => builder.add_root_certificate(read_ca(path)?),
            TlsMode::DangerAcceptInvalid => builder.danger_accept_invalid_certs(true),
        };

        builder
            .build()
            .map_err(|e| Error::Tls(format!("cannot build HTTP client: {e}")))
    }
}

fn read_ca(path: &Path) -> Result<reqwest::Certificate, Error> {
    let pem = std::fs::read(path)
        .map_err(|e| Error::Tls(format!("cannot read CA bundle {}: {e}", path.display())))?;
    reqwest::Certificate::from_pem(&pem)
        .map_err(|e| Error::Tls(format!("CA bundle {} is not PEM: {e}", path.display())))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn missing_ca_bundle_is_a_tls_error() {
        let transport = TransportConfig {
            tls: TlsMode::CustomCa(PathBuf::from("/nonexistent/fleetmon-ca.pem")),
            ..TransportConfig::default()
        };

        let err = transport.build_client().unwrap_err();
        assert!(matches!(err, Error::Tls(ref msg) if msg.contains("fleetmon-ca.pem")), "got {err:?}");
    }

    #[test]
    fn timeout_override_keeps_tls_mode() {
        let transport = TransportConfig {
            tls: TlsMode::DangerAcceptInvalid,
            ..TransportConfig::default()
        }
        .with_timeout(Duration::from_millis(250));

        assert_eq!(transport.timeout, Duration::from_millis(250));
        assert!(matches!(transport.tls, TlsMode::DangerAcceptInvalid));
        assert!(transport.build_client().is_ok());
    }
}
