//! Single aggregation pass.

use std::fmt::Write;

use fleetmon_core::{PassReport, Store};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

use super::{summary, util};

pub async fn handle(global: &GlobalOpts) -> Result<(), CliError> {
    let (_, aggregator) = util::build_aggregator(global)?;

    let report = aggregator.run_pass().await;
    aggregator.store().flush()?;

    let color = output::should_color(&global.color);
    let out = output::render_single(
        &global.output,
        &report,
        |r| detail(r, color),
        |r| r.summary.total_devices.to_string(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

fn detail(report: &PassReport, color: bool) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "Elapsed:     {} ms", report.elapsed_ms);
    let _ = writeln!(out, "{}", summary::detail(&report.summary, color));
    let _ = writeln!(
        out,
        "Samples:     {} kept, {} discarded",
        report.samples, report.discarded_samples
    );
    let _ = writeln!(out, "Snapshots:   {}", report.snapshots_written);
    let _ = writeln!(
        out,
        "Error logs:  {} created, {} refreshed",
        report.error_logs_created, report.error_logs_refreshed
    );
    if report.store_failures > 0 {
        let _ = writeln!(out, "Store errors: {}", report.store_failures);
    }
    if !report.summary_saved {
        let _ = writeln!(out, "Summary:     not saved");
    }
    for failed in &report.failed_queries {
        let label = output::paint_health("FAILED", true, color);
        let _ = writeln!(out, "{label} {} ({}): {}", failed.kind, failed.query, failed.error);
    }

    out.trim_end().to_owned()
}
