// fleetmon-api: Async Rust client for the Prometheus HTTP query API

pub mod error;
pub mod prometheus;
pub mod transport;

pub use error::Error;
pub use prometheus::{PrometheusClient, QueryData, QueryResponse, VectorSample};
pub use transport::{TlsMode, TransportConfig};
