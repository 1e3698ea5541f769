//! Shared helpers for command handlers.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use fleetmon_core::{
    CategoryClassifier, CollectorConfig, DashboardAggregator, MemoryStore, PrometheusClient,
};

use crate::cli::GlobalOpts;
use crate::config;
use crate::error::CliError;

/// Aggregator wired to the live metrics server and the configured store.
pub type Aggregator = DashboardAggregator<PrometheusClient, MemoryStore>;

/// Load config, connect, open the store and build an aggregator.
pub fn build_aggregator(global: &GlobalOpts) -> Result<(CollectorConfig, Aggregator), CliError> {
    let cfg = config::load(global)?;
    let collector_config = config::collector_config(&cfg)?;

    let client = fleetmon_core::connect(&collector_config)?;
    let store = Arc::new(config::open_store(&collector_config)?);
    let classifier = Arc::new(CategoryClassifier::new(collector_config.code_tables.clone()));

    let aggregator = DashboardAggregator::new(
        client,
        store,
        classifier,
        collector_config.queries.clone(),
    );
    Ok((collector_config, aggregator))
}

/// Prompt for confirmation, auto-approving if `--yes` was passed.
///
/// Without a terminal there is nobody to ask, so `--yes` is required.
pub fn confirm(message: &str, action: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::IsTerminal::is_terminal(&std::io::stdin()) {
        return Err(CliError::NonInteractiveRequiresYes {
            action: action.into(),
        });
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))?;
    Ok(confirmed)
}

/// Render an optional value, `-` when absent.
pub fn or_dash<T: std::fmt::Display>(value: Option<T>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => "-".into(),
    }
}

/// Timestamps in tables drop sub-second noise.
pub fn fmt_time(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}
