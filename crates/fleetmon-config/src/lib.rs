//! Configuration for the fleetmon collector.
//!
//! TOML file + environment loading (figment), bearer-token resolution
//! (env + keyring + plaintext), validation, and translation to
//! `fleetmon_core::CollectorConfig`. The CLI layers flag overrides on top.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use fleetmon_core::{Category, CodeTables, CollectorConfig, MetricKind, MetricQueries, TlsVerification};

const KEYRING_SERVICE: &str = "fleetmon";
const KEYRING_TOKEN_USER: &str = "prometheus/bearer-token";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

fn invalid(field: impl Into<String>, reason: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub defaults: Defaults,

    #[serde(default)]
    pub prometheus: PrometheusSection,

    #[serde(default)]
    pub collector: CollectorSection,

    /// PromQL per metric kind; unset keys keep their defaults.
    #[serde(default)]
    pub queries: MetricQueries,

    /// Label overrides: `[code_tables.camera] 5 = "lens obstructed"`.
    #[serde(default)]
    pub code_tables: BTreeMap<String, BTreeMap<String, String>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}

/// How to reach the metrics server.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PrometheusSection {
    #[serde(default = "default_url")]
    pub url: String,

    /// Per-query timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Accept any TLS certificate.
    #[serde(default)]
    pub insecure: bool,

    /// Path to custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Environment variable holding the bearer token.
    pub bearer_token_env: Option<String>,

    /// Bearer token (plaintext; prefer the env var or keyring).
    pub bearer_token: Option<String>,

    /// Look the token up in the system keyring.
    #[serde(default = "default_true")]
    pub use_keyring: bool,
}

impl Default for PrometheusSection {
    fn default() -> Self {
        Self {
            url: default_url(),
            timeout: default_timeout(),
            insecure: false,
            ca_cert: None,
            bearer_token_env: None,
            bearer_token: None,
            use_keyring: true,
        }
    }
}

fn default_url() -> String {
    "http://localhost:9090".into()
}
fn default_timeout() -> u64 {
    10
}
fn default_true() -> bool {
    true
}

/// Scheduling and persistence.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CollectorSection {
    /// Time between passes, humantime syntax ("5s", "1m 30s").
    #[serde(default = "default_interval")]
    pub interval: String,

    /// JSON state file; unset keeps state in memory only.
    pub state_file: Option<PathBuf>,
}

impl Default for CollectorSection {
    fn default() -> Self {
        Self {
            interval: default_interval(),
            state_file: None,
        }
    }
}

fn default_interval() -> String {
    "5s".into()
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("dev", "fleetmon", "fleetmon").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("fleetmon");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load defaults, then `path` (if present), then `FLEETMON_*` variables.
///
/// Nested keys use a double underscore: `FLEETMON_PROMETHEUS__URL`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("FLEETMON_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write it to `path`.
pub fn save_config(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution ───────────────────────────────────────────

/// Resolve the bearer token: env var, then keyring, then plaintext.
///
/// No token is not an error; most Prometheus servers are unauthenticated.
pub fn resolve_bearer_token(section: &PrometheusSection) -> Option<SecretString> {
    // 1. Named env var
    if let Some(ref env_name) = section.bearer_token_env {
        if let Ok(val) = std::env::var(env_name) {
            return Some(SecretString::from(val));
        }
    }

    // 2. System keyring
    if section.use_keyring {
        if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, KEYRING_TOKEN_USER) {
            if let Ok(secret) = entry.get_password() {
                return Some(SecretString::from(secret));
            }
        }
    }

    // 3. Plaintext in config
    section
        .bearer_token
        .as_ref()
        .map(|t| SecretString::from(t.clone()))
}

/// Store a bearer token in the system keyring.
pub fn store_bearer_token(token: &str) -> Result<(), ConfigError> {
    keyring::Entry::new(KEYRING_SERVICE, KEYRING_TOKEN_USER)
        .and_then(|entry| entry.set_password(token))
        .map_err(|e| invalid("keyring", e.to_string()))
}

// ── Validation & translation ────────────────────────────────────────

/// Parse a humantime interval; zero is rejected.
pub fn parse_interval(raw: &str) -> Result<Duration, ConfigError> {
    let interval = humantime::parse_duration(raw)
        .map_err(|e| invalid("collector.interval", format!("{raw:?}: {e}")))?;
    if interval.is_zero() {
        return Err(invalid("collector.interval", "must be greater than zero"));
    }
    Ok(interval)
}

/// Parse and validate a metrics server URL.
pub fn parse_url(raw: &str) -> Result<Url, ConfigError> {
    let url: Url = raw
        .parse()
        .map_err(|e| invalid("prometheus.url", format!("{raw:?}: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(invalid(
            "prometheus.url",
            format!("expected http or https, got {other:?}"),
        )),
    }
}

/// Apply `[code_tables.*]` overrides on top of the built-in tables.
pub fn code_tables(overrides: &BTreeMap<String, BTreeMap<String, String>>) -> Result<CodeTables, ConfigError> {
    let mut tables = CodeTables::default();
    for (name, labels) in overrides {
        let field = format!("code_tables.{name}");
        let category: Category = name.parse().map_err(|_| {
            invalid(&field, "expected one of camera, hdmi, ac, dc")
        })?;

        let mut parsed = Vec::with_capacity(labels.len());
        for (code, label) in labels {
            let code: i64 = code
                .trim()
                .parse()
                .map_err(|_| invalid(&field, format!("code {code:?} is not an integer")))?;
            parsed.push((code, label.clone()));
        }
        tables = tables.with_labels(category, parsed);
    }
    Ok(tables)
}

fn validate_queries(queries: &MetricQueries) -> Result<(), ConfigError> {
    for kind in MetricKind::ALL {
        if queries.for_kind(kind).trim().is_empty() {
            return Err(invalid(format!("queries.{kind}"), "must not be empty"));
        }
    }
    Ok(())
}

/// Build a `CollectorConfig` from a loaded config, with no CLI overrides.
pub fn to_collector_config(cfg: &Config) -> Result<CollectorConfig, ConfigError> {
    let url = parse_url(&cfg.prometheus.url)?;

    if cfg.prometheus.timeout == 0 {
        return Err(invalid("prometheus.timeout", "must be greater than zero"));
    }
    validate_queries(&cfg.queries)?;

    let tls = if cfg.prometheus.insecure {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = cfg.prometheus.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    };

    Ok(CollectorConfig {
        url,
        bearer_token: resolve_bearer_token(&cfg.prometheus),
        tls,
        timeout: Duration::from_secs(cfg.prometheus.timeout),
        interval: parse_interval(&cfg.collector.interval)?,
        queries: cfg.queries.clone(),
        code_tables: code_tables(&cfg.code_tables)?,
        state_file: cfg.collector.state_file.clone(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use figment::Jail;
    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;

    use super::*;

    fn offline_keyring() -> Config {
        let mut cfg = Config::default();
        cfg.prometheus.use_keyring = false;
        cfg
    }

    #[test]
    fn defaults_translate_to_collector_config() {
        let collector = to_collector_config(&offline_keyring()).unwrap();
        assert_eq!(collector.url.as_str(), "http://localhost:9090/");
        assert_eq!(collector.interval, Duration::from_secs(5));
        assert_eq!(collector.timeout, Duration::from_secs(10));
        assert_eq!(collector.tls, TlsVerification::SystemDefaults);
        assert_eq!(collector.queries, MetricQueries::default());
        assert!(collector.bearer_token.is_none());
        assert!(collector.state_file.is_none());
    }

    #[test]
    fn file_and_env_layers_merge() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.toml",
                r#"
                [prometheus]
                url = "https://prom.internal:9090"
                insecure = true
                use_keyring = false

                [collector]
                interval = "30s"
                state_file = "/var/lib/fleetmon/state.json"

                [queries]
                camera = 'camera_value{site="hq"}'

                [code_tables.camera]
                5 = "lens obstructed"
                "#,
            )?;
            jail.set_env("FLEETMON_PROMETHEUS__TIMEOUT", "3");

            let cfg = load_config_from(Path::new("config.toml")).unwrap();
            let collector = to_collector_config(&cfg).unwrap();

            assert_eq!(collector.url.host_str(), Some("prom.internal"));
            assert_eq!(collector.tls, TlsVerification::DangerAcceptInvalid);
            assert_eq!(collector.timeout, Duration::from_secs(3));
            assert_eq!(collector.interval, Duration::from_secs(30));
            assert_eq!(collector.queries.camera, r#"camera_value{site="hq"}"#);
            assert_eq!(collector.queries.hdmi, "hdmi_value");
            assert_eq!(
                collector.code_tables.label(Category::Camera, 5),
                Some("lens obstructed")
            );
            assert_eq!(
                collector.state_file.as_deref(),
                Some(Path::new("/var/lib/fleetmon/state.json"))
            );
            Ok(())
        });
    }

    #[test]
    fn missing_file_yields_defaults() {
        Jail::expect_with(|_jail| {
            let cfg = load_config_from(Path::new("absent.toml")).unwrap();
            assert_eq!(cfg, Config::default());
            Ok(())
        });
    }

    #[test]
    fn bearer_token_prefers_env_over_plaintext() {
        Jail::expect_with(|jail| {
            jail.set_env("PROM_TOKEN", "from-env");
            let section = PrometheusSection {
                bearer_token_env: Some("PROM_TOKEN".into()),
                bearer_token: Some("from-file".into()),
                use_keyring: false,
                ..PrometheusSection::default()
            };
            let token = resolve_bearer_token(&section).unwrap();
            assert_eq!(token.expose_secret(), "from-env");
            Ok(())
        });
    }

    #[test]
    fn bearer_token_falls_back_to_plaintext() {
        let section = PrometheusSection {
            bearer_token_env: Some("FLEETMON_TEST_UNSET_TOKEN_VAR".into()),
            bearer_token: Some("from-file".into()),
            use_keyring: false,
            ..PrometheusSection::default()
        };
        let token = resolve_bearer_token(&section).unwrap();
        assert_eq!(token.expose_secret(), "from-file");
    }

    #[test]
    fn invalid_values_name_their_field() {
        let mut cfg = offline_keyring();
        cfg.collector.interval = "soon".into();
        let err = to_collector_config(&cfg).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "collector.interval"));

        let mut cfg = offline_keyring();
        cfg.prometheus.url = "ftp://prom".into();
        let err = to_collector_config(&cfg).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "prometheus.url"));

        let mut cfg = offline_keyring();
        cfg.queries.memory = "  ".into();
        let err = to_collector_config(&cfg).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "queries.memory"));
    }

    #[test]
    fn zero_interval_is_rejected() {
        assert!(parse_interval("0s").is_err());
        assert_eq!(parse_interval("1m 30s").unwrap(), Duration::from_secs(90));
    }

    #[test]
    fn code_table_overrides_are_validated() {
        let mut overrides = BTreeMap::new();
        overrides.insert(
            "power".to_owned(),
            BTreeMap::from([("1".to_owned(), "x".to_owned())]),
        );
        let err = code_tables(&overrides).unwrap_err();
        assert!(err.to_string().contains("code_tables.power"));

        let mut overrides = BTreeMap::new();
        overrides.insert(
            "hdmi".to_owned(),
            BTreeMap::from([("two".to_owned(), "x".to_owned())]),
        );
        assert!(code_tables(&overrides).is_err());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub").join("config.toml");
        let mut cfg = offline_keyring();
        cfg.collector.interval = "10s".into();
        cfg.code_tables.insert(
            "dc".into(),
            BTreeMap::from([("2".to_owned(), "reversed polarity".to_owned())]),
        );

        save_config(&cfg, &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let loaded: Config = toml::from_str(&text).unwrap();
        assert_eq!(loaded, cfg);
    }
}
