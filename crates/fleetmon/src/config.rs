//! CLI flag overlay on top of `fleetmon-config`.
//!
//! Loads the TOML + env configuration, applies `--prometheus`,
//! `--state-file`, `--insecure` and `--timeout`, then hands core a
//! ready-built `CollectorConfig`.

use std::path::PathBuf;

use fleetmon_config::Config;
use fleetmon_core::{CollectorConfig, MemoryStore};

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// The config file this invocation reads.
pub fn config_path(global: &GlobalOpts) -> PathBuf {
    global
        .config
        .clone()
        .unwrap_or_else(fleetmon_config::config_path)
}

/// Load the config file and apply CLI overrides.
pub fn load(global: &GlobalOpts) -> Result<Config, CliError> {
    let mut cfg = fleetmon_config::load_config_from(&config_path(global))?;
    apply_overrides(&mut cfg, global);
    Ok(cfg)
}

fn apply_overrides(cfg: &mut Config, global: &GlobalOpts) {
    if let Some(ref url) = global.prometheus {
        cfg.prometheus.url.clone_from(url);
    }
    if let Some(ref path) = global.state_file {
        cfg.collector.state_file = Some(path.clone());
    }
    if global.insecure {
        cfg.prometheus.insecure = true;
    }
    if let Some(timeout) = global.timeout {
        cfg.prometheus.timeout = timeout;
    }
}

/// Validate the merged config into a `CollectorConfig`.
pub fn collector_config(cfg: &Config) -> Result<CollectorConfig, CliError> {
    Ok(fleetmon_config::to_collector_config(cfg)?)
}

/// Open the configured state file, or an in-memory store without one.
pub fn open_store(collector: &CollectorConfig) -> Result<MemoryStore, CliError> {
    match collector.state_file {
        Some(ref path) => Ok(MemoryStore::open(path.clone())?),
        None => Ok(MemoryStore::new()),
    }
}

/// Open the state file for read-side commands, which have nothing to
/// show without one.
pub fn open_existing_store(global: &GlobalOpts, cfg: &Config) -> Result<MemoryStore, CliError> {
    let path = cfg
        .collector
        .state_file
        .clone()
        .ok_or_else(|| CliError::NoStateFile {
            path: config_path(global).display().to_string(),
        })?;
    Ok(MemoryStore::open(path)?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::Parser;

    use super::*;
    use crate::cli::Cli;

    fn global(args: &[&str]) -> GlobalOpts {
        let mut argv = vec!["fleetmon"];
        argv.extend_from_slice(args);
        argv.push("summary");
        Cli::try_parse_from(argv).unwrap().global
    }

    #[test]
    fn flags_override_file_values() {
        let mut cfg = Config::default();
        let global = global(&[
            "--prometheus",
            "https://metrics.example:9090",
            "--state-file",
            "/tmp/state.json",
            "-k",
            "--timeout",
            "3",
        ]);
        apply_overrides(&mut cfg, &global);

        assert_eq!(cfg.prometheus.url, "https://metrics.example:9090");
        assert_eq!(cfg.collector.state_file, Some(PathBuf::from("/tmp/state.json")));
        assert!(cfg.prometheus.insecure);
        assert_eq!(cfg.prometheus.timeout, 3);
    }

    #[test]
    fn absent_flags_leave_config_alone() {
        let mut cfg = Config::default();
        apply_overrides(&mut cfg, &global(&[]));
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn read_commands_require_a_state_file() {
        let err = open_existing_store(&global(&[]), &Config::default()).unwrap_err();
        assert!(matches!(err, CliError::NoStateFile { .. }));
    }
}
