//! Clap derive structures for the `fleetmon` CLI.
//!
//! Global flags are flattened into every subcommand; handlers receive the
//! parsed args plus `GlobalOpts`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

use fleetmon_core::{Category, MetricKind};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// fleetmon: device fleet health from Prometheus
#[derive(Debug, Parser)]
#[command(
    name = "fleetmon",
    version,
    about = "Aggregate camera, HDMI, AC and DC device health from Prometheus",
    long_about = "Scrapes device status gauges from a Prometheus server, resolves one \
        snapshot per device IP, keeps a deduplicated error log and a rolling \
        dashboard summary.\n\n\
        Configure with `fleetmon config init` or pass --prometheus directly.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config file (defaults to the platform config directory)
    #[arg(long, short = 'C', env = "FLEETMON_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Prometheus base URL (overrides config)
    #[arg(long, short = 'P', env = "FLEETMON_PROMETHEUS_URL", global = true)]
    pub prometheus: Option<String>,

    /// JSON state file holding devices, error logs and the summary
    #[arg(long, env = "FLEETMON_STATE_FILE", global = true)]
    pub state_file: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "FLEETMON_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Log line format
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "FLEETMON_INSECURE", global = true)]
    pub insecure: bool,

    /// Per-query timeout in seconds (overrides config)
    #[arg(long, env = "FLEETMON_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines
    Text,
    /// One JSON object per line
    Json,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the collector until interrupted (Ctrl-C / SIGTERM)
    Run(RunArgs),

    /// Run a single aggregation pass and print its report
    Pass,

    /// Evaluate a raw instant query and print the samples
    Query(QueryArgs),

    /// Show the stored dashboard summary
    Summary,

    /// List the latest device snapshots
    Devices(DevicesArgs),

    /// Inspect and acknowledge error log entries
    Logs(LogsArgs),

    /// Show the active status code tables
    Codes(CodesArgs),

    /// Inspect or initialize configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Run ──────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Time between passes, e.g. "5s" or "1m" (overrides config)
    #[arg(long, short = 'i')]
    pub interval: Option<String>,
}

// ── Query ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct QueryArgs {
    /// PromQL expression (must return an instant vector)
    pub query: String,

    /// Parse values as this metric kind and report discarded samples
    #[arg(long, short = 'K')]
    pub kind: Option<KindArg>,
}

/// Metric kinds accepted by `query --kind`.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum KindArg {
    Liveness,
    Camera,
    Hdmi,
    Ac,
    Dc,
    Cpu,
    Memory,
    Ocr,
}

impl From<KindArg> for MetricKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Liveness => MetricKind::Liveness,
            KindArg::Camera => MetricKind::Status(Category::Camera),
            KindArg::Hdmi => MetricKind::Status(Category::Hdmi),
            KindArg::Ac => MetricKind::Status(Category::Ac),
            KindArg::Dc => MetricKind::Status(Category::Dc),
            KindArg::Cpu => MetricKind::CpuUsage,
            KindArg::Memory => MetricKind::MemoryUsage,
            KindArg::Ocr => MetricKind::OcrSeconds,
        }
    }
}

// ── Devices ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct DevicesArgs {
    /// Only devices with at least one abnormal category
    #[arg(long)]
    pub abnormal: bool,

    /// Only offline devices
    #[arg(long)]
    pub offline: bool,
}

// ── Logs ─────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct LogsArgs {
    #[command(subcommand)]
    pub command: LogsCommand,
}

#[derive(Debug, Subcommand)]
pub enum LogsCommand {
    /// List error log entries
    #[command(alias = "ls")]
    List {
        /// Only unread entries, newest first occurrence first
        #[arg(long, short = 'u')]
        unread: bool,
    },

    /// Show one entry
    Get {
        /// Entry id
        id: u64,
    },

    /// Mark one entry as read
    Ack {
        /// Entry id
        id: u64,
    },

    /// Mark every unread entry as read
    AckAll,
}

// ── Codes ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CodesArgs {
    /// Only this category (camera, hdmi, ac, dc)
    pub category: Option<Category>,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file path
    Path,

    /// Show the effective configuration (secrets redacted)
    Show,

    /// Write a config file with defaults
    Init {
        /// Prometheus URL to write (prompted when omitted on a terminal)
        #[arg(long)]
        url: Option<String>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Store the Prometheus bearer token in the system keyring
    SetToken {
        /// Token value (prompted when omitted)
        #[arg(long)]
        token: Option<String>,
    },
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Target shell
    pub shell: Shell,
}
