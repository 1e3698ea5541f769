//! Stored dashboard summary.

use std::fmt::Write;

use fleetmon_core::{Category, DashboardSummary, Store};

use crate::cli::GlobalOpts;
use crate::config;
use crate::error::CliError;
use crate::output;

use super::util;

pub fn handle(global: &GlobalOpts) -> Result<(), CliError> {
    let cfg = config::load(global)?;
    let store = config::open_existing_store(global, &cfg)?;

    let summary = store.dashboard_summary()?.ok_or_else(|| CliError::NotFound {
        resource_type: "dashboard summary".into(),
        identifier: "1".into(),
        list_command: "pass".into(),
    })?;

    let color = output::should_color(&global.color);
    let out = output::render_single(
        &global.output,
        &summary,
        |s| detail(s, color),
        |s| s.total_devices.to_string(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

pub(super) fn detail(s: &DashboardSummary, color: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Updated:     {}", util::fmt_time(s.last_updated));
    let _ = writeln!(out, "Total:       {}", s.total_devices);
    let _ = writeln!(out, "Active:      {}", s.active_devices);
    let _ = writeln!(out, "Inactive:    {}", s.inactive_devices);
    for category in Category::ALL {
        let counts = s.counts.get(category);
        let abnormal = output::paint_health(&counts.abnormal.to_string(), counts.abnormal > 0, color);
        let _ = writeln!(
            out,
            "{:<12} {} normal, {abnormal} abnormal",
            format!("{category}:"),
            counts.normal
        );
    }
    let _ = writeln!(out, "Avg CPU:     {:.1}%", s.avg_cpu_usage);
    let _ = write!(out, "Avg memory:  {:.1}%", s.avg_memory_usage);
    out
}
