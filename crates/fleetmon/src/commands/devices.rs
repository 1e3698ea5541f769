//! Stored device snapshots.

use tabled::Tabled;

use fleetmon_core::{Category, CategoryClassifier, DeviceSnapshot, Store};

use crate::cli::{DevicesArgs, GlobalOpts};
use crate::config;
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "IP")]
    ip: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Camera")]
    camera: String,
    #[tabled(rename = "HDMI")]
    hdmi: String,
    #[tabled(rename = "AC")]
    ac: String,
    #[tabled(rename = "DC")]
    dc: String,
    #[tabled(rename = "CPU %")]
    cpu: String,
    #[tabled(rename = "Mem %")]
    memory: String,
    #[tabled(rename = "OCR age")]
    ocr: String,
    #[tabled(rename = "Observed")]
    observed: String,
}

fn row(d: &DeviceSnapshot, color: bool) -> DeviceRow {
    let code = |category: Category| match d.value(category) {
        Some(code) => output::paint_health(
            &code.to_string(),
            CategoryClassifier::is_abnormal(category, code),
            color,
        ),
        None => "-".into(),
    };

    DeviceRow {
        ip: d.ip.clone(),
        state: output::paint_online(d.is_online, color),
        status: d.status.clone(),
        camera: code(Category::Camera),
        hdmi: code(Category::Hdmi),
        ac: code(Category::Ac),
        dc: code(Category::Dc),
        cpu: util::or_dash(d.cpu_usage.map(|v| format!("{v:.1}"))),
        memory: util::or_dash(d.memory_usage.map(|v| format!("{v:.1}"))),
        ocr: util::or_dash(d.ocr_value_seconds.map(|v| format!("{v}s"))),
        observed: util::fmt_time(d.observed_at),
    }
}

fn has_abnormal(d: &DeviceSnapshot) -> bool {
    Category::ALL.into_iter().any(|category| {
        d.value(category)
            .is_some_and(|code| CategoryClassifier::is_abnormal(category, code))
    })
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: &DevicesArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let cfg = config::load(global)?;
    let store = config::open_existing_store(global, &cfg)?;

    let devices: Vec<DeviceSnapshot> = store
        .device_snapshots()?
        .into_iter()
        .filter(|d| !args.abnormal || has_abnormal(d))
        .filter(|d| !args.offline || !d.is_online)
        .collect();

    let color = output::should_color(&global.color);
    let out = output::render_list(
        &global.output,
        &devices,
        |d| row(d, color),
        |d| d.ip.clone(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use fleetmon_core::PerCategory;

    use super::*;

    fn snapshot(camera: Option<i64>, dc: Option<i64>) -> DeviceSnapshot {
        DeviceSnapshot {
            ip: "10.0.0.1".into(),
            instance: "10.0.0.1:5000".into(),
            is_online: true,
            values: PerCategory {
                camera,
                hdmi: Some(0),
                ac: None,
                dc,
            },
            cpu_usage: Some(12.5),
            memory_usage: None,
            ocr_value_seconds: Some(30),
            status: "normal".into(),
            observed_at: Utc::now(),
        }
    }

    #[test]
    fn any_nonzero_code_is_abnormal() {
        assert!(!has_abnormal(&snapshot(Some(0), None)));
        assert!(has_abnormal(&snapshot(Some(0), Some(1))));
        assert!(has_abnormal(&snapshot(Some(3), None)));
    }

    #[test]
    fn row_renders_missing_values_as_dash() {
        let r = row(&snapshot(Some(2), None), false);
        assert_eq!(r.camera, "2");
        assert_eq!(r.ac, "-");
        assert_eq!(r.cpu, "12.5");
        assert_eq!(r.memory, "-");
        assert_eq!(r.ocr, "30s");
        assert_eq!(r.state, "online");
    }
}
