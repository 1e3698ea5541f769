//! Long-running collector.

use tracing::info;

use fleetmon_core::Collector;

use crate::cli::{GlobalOpts, RunArgs};
use crate::error::CliError;

use super::util;

pub async fn handle(args: &RunArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let (collector_config, aggregator) = util::build_aggregator(global)?;

    let interval = match args.interval {
        Some(ref raw) => fleetmon_config::parse_interval(raw)?,
        None => collector_config.interval,
    };

    let collector = Collector::new(aggregator, interval);
    let mut reports = collector.reports();
    collector.start().await?;
    info!(url = %collector_config.url, ?interval, "collecting; press Ctrl-C to stop");

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            () = &mut shutdown => break,
            changed = reports.changed() => {
                if changed.is_err() {
                    break;
                }
                let latest = reports.borrow_and_update().clone();
                if let Some(report) = latest {
                    if !global.quiet {
                        let s = &report.summary;
                        eprintln!(
                            "{}  devices {}/{} active  failed queries {}  new errors {}",
                            util::fmt_time(report.started_at),
                            s.active_devices,
                            s.total_devices,
                            report.failed_queries.len(),
                            report.error_logs_created,
                        );
                    }
                }
            }
        }
    }

    info!("shutting down");
    collector.stop().await?;
    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
