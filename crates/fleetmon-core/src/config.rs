// ── Runtime collector configuration ──
//
// These types describe *what* to scrape and *how* to reach the metrics
// server. They carry credential data and tuning, but never touch disk:
// the CLI builds a `CollectorConfig` and hands it in.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::classify::CodeTables;
use crate::model::{Category, MetricKind};

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(PathBuf),
    /// Skip verification (self-signed metrics servers).
    DangerAcceptInvalid,
}

/// PromQL issued for each metric kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricQueries {
    pub liveness: String,
    pub camera: String,
    pub hdmi: String,
    pub ac: String,
    pub dc: String,
    pub cpu: String,
    pub memory: String,
    pub ocr: String,
}

impl Default for MetricQueries {
    fn default() -> Self {
        Self {
            liveness: r#"up{job="devices"}"#.into(),
            camera: "camera_value".into(),
            hdmi: "hdmi_value".into(),
            ac: "ac_value".into(),
            dc: "dc_value".into(),
            cpu: r#"system_cpu_percent{job="devices"}"#.into(),
            memory: r#"system_memory_percent{job="devices"}"#.into(),
            ocr: "ocr_value_seconds".into(),
        }
    }
}

impl MetricQueries {
    pub fn for_kind(&self, kind: MetricKind) -> &str {
        match kind {
            MetricKind::Liveness => &self.liveness,
            MetricKind::Status(Category::Camera) => &self.camera,
            MetricKind::Status(Category::Hdmi) => &self.hdmi,
            MetricKind::Status(Category::Ac) => &self.ac,
            MetricKind::Status(Category::Dc) => &self.dc,
            MetricKind::CpuUsage => &self.cpu,
            MetricKind::MemoryUsage => &self.memory,
            MetricKind::OcrSeconds => &self.ocr,
        }
    }
}

/// Everything needed to run the collector against one metrics server.
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// Metrics server URL (e.g., `http://prometheus:9090`).
    pub url: Url,
    pub bearer_token: Option<SecretString>,
    pub tls: TlsVerification,
    /// Per-query timeout.
    pub timeout: Duration,
    /// Time between aggregation passes.
    pub interval: Duration,
    pub queries: MetricQueries,
    pub code_tables: CodeTables,
    /// JSON state file; `None` keeps state in memory only.
    pub state_file: Option<PathBuf>,
}

impl CollectorConfig {
    /// Defaults for everything except the server URL.
    pub fn new(url: Url) -> Self {
        Self {
            url,
            bearer_token: None,
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(10),
            interval: Duration::from_secs(5),
            queries: MetricQueries::default(),
            code_tables: CodeTables::default(),
            state_file: None,
        }
    }
}
