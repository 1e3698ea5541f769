// ── Metric sample parsing ──
//
// Turns raw vector samples into typed `Sample`s. Every sample is judged on
// its own: a bad value is dropped with a reason and never blocks the rest
// of the batch.

use fleetmon_api::VectorSample;
use tracing::trace;

use crate::model::{MetricKind, Sample, SampleValue};

/// Instance label used when a series carries none.
pub const UNKNOWN_INSTANCE: &str = "unknown";

/// Why a raw sample was dropped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DiscardReason {
    #[error("sample has no value")]
    MissingValue,

    #[error("sample has no usable timestamp")]
    MissingTimestamp,

    #[error("value {0:?} is not a number")]
    NotNumeric(String),

    #[error("value {0:?} is not finite")]
    NotFinite(String),

    #[error("value {0:?} is not an integer")]
    NotInteger(String),
}

/// Result of parsing one query's worth of samples.
#[derive(Debug, Default)]
pub struct ParsedBatch {
    pub samples: Vec<Sample>,
    pub discarded: Vec<(String, DiscardReason)>,
}

/// Parse one raw sample as `kind`.
pub fn parse_sample(kind: MetricKind, raw: &VectorSample) -> Result<Sample, DiscardReason> {
    let instance = raw.instance().unwrap_or(UNKNOWN_INSTANCE).to_owned();
    let text = raw.raw_value().ok_or(DiscardReason::MissingValue)?;
    let timestamp = raw.sampled_at().ok_or(DiscardReason::MissingTimestamp)?;
    let value = parse_value(kind, text)?;

    Ok(Sample {
        instance,
        kind,
        value,
        timestamp,
    })
}

/// Parse a whole query result, collecting discards instead of failing.
pub fn parse_batch(kind: MetricKind, raws: &[VectorSample]) -> ParsedBatch {
    let mut batch = ParsedBatch::default();
    for raw in raws {
        match parse_sample(kind, raw) {
            Ok(sample) => batch.samples.push(sample),
            Err(reason) => {
                let instance = raw.instance().unwrap_or(UNKNOWN_INSTANCE).to_owned();
                trace!(%kind, %instance, %reason, "discarding sample");
                batch.discarded.push((instance, reason));
            }
        }
    }
    batch
}

fn parse_value(kind: MetricKind, text: &str) -> Result<SampleValue, DiscardReason> {
    let text = text.trim();

    if kind.is_integer() {
        if let Ok(v) = text.parse::<i64>() {
            return Ok(SampleValue::Integer(v));
        }
    }

    let v: f64 = text
        .parse()
        .map_err(|_| DiscardReason::NotNumeric(text.to_owned()))?;
    if !v.is_finite() {
        return Err(DiscardReason::NotFinite(text.to_owned()));
    }
    if !kind.is_integer() {
        return Ok(SampleValue::Float(v));
    }

    // Exporters sometimes render integral gauges as "2.0" or "1e0".
    #[allow(clippy::cast_possible_truncation, clippy::as_conversions)]
    let truncated = v as i64;
    #[allow(clippy::cast_precision_loss, clippy::as_conversions, clippy::float_cmp)]
    let exact = v.fract() == 0.0 && (truncated as f64) == v;
    if exact {
        Ok(SampleValue::Integer(truncated))
    } else {
        Err(DiscardReason::NotInteger(text.to_owned()))
    }
}

/// Device identity of a scrape target: the host part of `instance`.
///
/// `10.0.0.5:5000` -> `10.0.0.5`, `[fe80::1]:9100` -> `fe80::1`, and an
/// instance without a port is returned unchanged.
pub fn resolve_ip(instance: &str) -> &str {
    if let Some(rest) = instance.strip_prefix('[') {
        if let Some((host, _)) = rest.split_once(']') {
            return host;
        }
    }
    match instance.rsplit_once(':') {
        // A bare IPv6 address has several colons and no port.
        Some((host, _)) if !host.contains(':') => host,
        Some(_) | None => instance,
    }
}
