// Prometheus HTTP API client modules
//
// Instant queries against `/api/v1/query`, unwrapped from the standard
// `{ status, data: { resultType, result } }` envelope.

pub mod client;
pub mod models;

pub use client::PrometheusClient;
pub use models::{QueryData, QueryResponse, VectorSample};
