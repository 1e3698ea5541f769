// Prometheus query response types
//
// Every `/api/v1/query` response is wrapped in the `QueryResponse<T>`
// envelope. Sample fields use `#[serde(default)]` so that one malformed
// sample decodes as "empty" instead of failing the whole vector; the core
// parser decides what to drop.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ── Response Envelope ────────────────────────────────────────────────

/// Standard Prometheus API response envelope.
///
/// ```json
/// { "status": "success", "data": { "resultType": "vector", "result": [...] } }
/// { "status": "error", "errorType": "bad_data", "error": "parse error ..." }
/// ```
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse<T> {
    pub status: String,
    pub data: Option<T>,
    #[serde(default)]
    pub error_type: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

/// Payload of a successful instant query.
///
/// `result` stays untyped until `result_type` has been checked; scalar
/// and string results have a different shape than vectors.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryData {
    pub result_type: String,
    #[serde(default)]
    pub result: Value,
}

// ── Vector sample ────────────────────────────────────────────────────

/// One series of an instant vector: its label set and `[ts, "value"]`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VectorSample {
    #[serde(default)]
    pub metric: BTreeMap<String, String>,
    /// `[<unix seconds as float>, "<value as string>"]`
    #[serde(default)]
    pub value: Vec<Value>,
}

impl VectorSample {
    /// Build a sample from a label list and a raw value (test helper and
    /// fixture builder).
    pub fn new<'a>(
        labels: impl IntoIterator<Item = (&'a str, &'a str)>,
        timestamp: f64,
        value: &str,
    ) -> Self {
        Self {
            metric: labels
                .into_iter()
                .map(|(k, v)| (k.to_owned(), v.to_owned()))
                .collect(),
            value: vec![Value::from(timestamp), Value::from(value)],
        }
    }

    /// Look up a label value.
    pub fn label(&self, name: &str) -> Option<&str> {
        self.metric.get(name).map(String::as_str)
    }

    /// The `instance` label, if the series carries one.
    pub fn instance(&self) -> Option<&str> {
        self.label("instance")
    }

    /// Evaluation timestamp in fractional unix seconds.
    pub fn timestamp(&self) -> Option<f64> {
        self.value.first().and_then(Value::as_f64)
    }

    /// Evaluation timestamp as a UTC datetime (millisecond precision).
    pub fn sampled_at(&self) -> Option<DateTime<Utc>> {
        let secs = self.timestamp()?;
        if !secs.is_finite() {
            return None;
        }
        #[allow(clippy::cast_possible_truncation, clippy::as_conversions)]
        let millis = (secs * 1000.0).round() as i64;
        DateTime::from_timestamp_millis(millis)
    }

    /// The raw sample value string (Prometheus encodes values as strings
    /// so that `NaN` and `+Inf` survive JSON).
    pub fn raw_value(&self) -> Option<&str> {
        self.value.get(1).and_then(Value::as_str)
    }
}
