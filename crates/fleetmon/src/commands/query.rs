//! Raw instant queries, optionally parsed as a metric kind.

use serde::Serialize;
use tabled::Tabled;
use tracing::warn;

use fleetmon_core::{CoreError, MetricKind, Sample, SampleValue, VectorSample, parse};

use crate::cli::{GlobalOpts, QueryArgs};
use crate::config;
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct RawRow {
    #[tabled(rename = "Instance")]
    instance: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Timestamp")]
    timestamp: String,
    #[tabled(rename = "Labels")]
    labels: String,
}

impl From<&VectorSample> for RawRow {
    fn from(s: &VectorSample) -> Self {
        Self {
            instance: s.instance().unwrap_or(parse::UNKNOWN_INSTANCE).to_owned(),
            value: s.raw_value().unwrap_or("-").to_owned(),
            timestamp: util::or_dash(s.sampled_at().map(util::fmt_time)),
            labels: s
                .metric
                .iter()
                .filter(|(k, _)| k.as_str() != "instance")
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join(","),
        }
    }
}

#[derive(Tabled)]
struct SampleRow {
    #[tabled(rename = "IP")]
    ip: String,
    #[tabled(rename = "Instance")]
    instance: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Timestamp")]
    timestamp: String,
}

impl From<&Sample> for SampleRow {
    fn from(s: &Sample) -> Self {
        Self {
            ip: parse::resolve_ip(&s.instance).to_owned(),
            instance: s.instance.clone(),
            kind: s.kind.to_string(),
            value: match s.value {
                SampleValue::Integer(v) => v.to_string(),
                SampleValue::Float(v) => format!("{v:.2}"),
            },
            timestamp: util::fmt_time(s.timestamp),
        }
    }
}

/// `--kind` output: kept samples plus why the rest were dropped.
#[derive(Serialize)]
struct ParsedOutput<'a> {
    samples: &'a [Sample],
    discarded: Vec<Discarded>,
}

#[derive(Serialize)]
struct Discarded {
    instance: String,
    reason: String,
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(args: &QueryArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let cfg = config::load(global)?;
    let collector_config = config::collector_config(&cfg)?;
    let client = fleetmon_core::connect(&collector_config)?;

    let raws = client
        .query_instant(&args.query)
        .await
        .map_err(CoreError::from)?;

    let out = match args.kind {
        None => output::render_list(
            &global.output,
            &raws,
            |s| RawRow::from(s),
            |s| s.raw_value().unwrap_or_default().to_owned(),
        )?,
        Some(kind) => {
            let kind = MetricKind::from(kind);
            let batch = parse::parse_batch(kind, &raws);
            for (instance, reason) in &batch.discarded {
                warn!(%instance, %reason, "sample discarded");
            }
            render_parsed(global, &batch.samples, &batch.discarded)?
        }
    };

    output::print_output(&out, global.quiet);
    Ok(())
}

fn render_parsed(
    global: &GlobalOpts,
    samples: &[Sample],
    discarded: &[(String, parse::DiscardReason)],
) -> Result<String, CliError> {
    use crate::cli::OutputFormat;

    match global.output {
        OutputFormat::Table | OutputFormat::Plain => output::render_list(
            &global.output,
            samples,
            |s| SampleRow::from(s),
            |s| format!("{} {}", s.instance, s.value.as_f64()),
        ),
        _ => {
            let parsed = ParsedOutput {
                samples,
                discarded: discarded
                    .iter()
                    .map(|(instance, reason)| Discarded {
                        instance: instance.clone(),
                        reason: reason.to_string(),
                    })
                    .collect(),
            };
            output::render_single(&global.output, &parsed, |_| String::new(), |_| String::new())
        }
    }
}
