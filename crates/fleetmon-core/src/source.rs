// ── Metrics source seam ──
//
// The aggregator only needs instant queries. `PrometheusClient` is the
// production implementation; tests plug in canned responses.

use std::future::Future;

use fleetmon_api::{PrometheusClient, TlsMode, TransportConfig, VectorSample};

use crate::config::{CollectorConfig, TlsVerification};
use crate::error::CoreError;

/// Something that can evaluate an instant PromQL query.
///
/// A failed request is an `Err`, never an empty vector.
pub trait MetricsSource: Send + Sync + 'static {
    fn query_instant(
        &self,
        query: &str,
    ) -> impl Future<Output = Result<Vec<VectorSample>, fleetmon_api::Error>> + Send;
}

impl MetricsSource for PrometheusClient {
    fn query_instant(
        &self,
        query: &str,
    ) -> impl Future<Output = Result<Vec<VectorSample>, fleetmon_api::Error>> + Send {
        PrometheusClient::query_instant(self, query)
    }
}

/// Build the Prometheus client described by `config`.
pub fn connect(config: &CollectorConfig) -> Result<PrometheusClient, CoreError> {
    let client = PrometheusClient::new(config.url.clone(), &build_transport(config))?;
    Ok(match &config.bearer_token {
        Some(token) => client.with_bearer_token(token.clone()),
        None => client,
    })
}

fn build_transport(config: &CollectorConfig) -> TransportConfig {
    TransportConfig {
        tls: tls_to_transport(&config.tls),
        timeout: config.timeout,
    }
}

fn tls_to_transport(tls: &TlsVerification) -> TlsMode {
    match tls {
        TlsVerification::SystemDefaults => TlsMode::System,
        TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
        TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    /// Canned query results keyed by PromQL text.
    #[derive(Debug, Default)]
    pub(crate) struct StaticSource {
        responses: HashMap<String, Vec<VectorSample>>,
        failing: HashSet<String>,
        delay: Option<Duration>,
        calls: AtomicUsize,
    }

    impl StaticSource {
        pub(crate) fn respond(mut self, query: &str, samples: Vec<VectorSample>) -> Self {
            self.responses.insert(query.to_owned(), samples);
            self
        }

        pub(crate) fn fail(mut self, query: &str) -> Self {
            self.failing.insert(query.to_owned());
            self
        }

        pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        pub(crate) fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl MetricsSource for StaticSource {
        fn query_instant(
            &self,
            query: &str,
        ) -> impl Future<Output = Result<Vec<VectorSample>, fleetmon_api::Error>> + Send {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let result = if self.failing.contains(query) {
                Err(fleetmon_api::Error::Http {
                    status: 503,
                    body: "unavailable".into(),
                })
            } else {
                Ok(self.responses.get(query).cloned().unwrap_or_default())
            };
            let delay = self.delay;
            async move {
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                result
            }
        }
    }
}
