//! Config subcommand handlers.

use std::io::IsTerminal;

use dialoguer::{Input, Password};
use secrecy::{ExposeSecret, SecretString};

use fleetmon_config::Config;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config;
use crate::error::CliError;
use crate::output;

// ── Helpers ─────────────────────────────────────────────────────────

/// Format config for display, masking the bearer token.
fn format_config_redacted(cfg: &Config) -> String {
    use std::fmt::Write;
    let mut out = String::new();

    let _ = writeln!(out, "[defaults]");
    let _ = writeln!(out, "output = \"{}\"", cfg.defaults.output);
    let _ = writeln!(out, "color = \"{}\"", cfg.defaults.color);

    let p = &cfg.prometheus;
    let _ = writeln!(out);
    let _ = writeln!(out, "[prometheus]");
    let _ = writeln!(out, "url = \"{}\"", p.url);
    let _ = writeln!(out, "timeout = {}", p.timeout);
    let _ = writeln!(out, "insecure = {}", p.insecure);
    if let Some(ref ca) = p.ca_cert {
        let _ = writeln!(out, "ca_cert = \"{}\"", ca.display());
    }
    if let Some(ref env) = p.bearer_token_env {
        let _ = writeln!(out, "bearer_token_env = \"{env}\"");
    }
    if p.bearer_token.is_some() {
        let _ = writeln!(out, "bearer_token = \"****\"");
    }
    let _ = writeln!(out, "use_keyring = {}", p.use_keyring);

    let _ = writeln!(out);
    let _ = writeln!(out, "[collector]");
    let _ = writeln!(out, "interval = \"{}\"", cfg.collector.interval);
    if let Some(ref path) = cfg.collector.state_file {
        let _ = writeln!(out, "state_file = \"{}\"", path.display());
    }

    let q = &cfg.queries;
    let _ = writeln!(out);
    let _ = writeln!(out, "[queries]");
    for (name, query) in [
        ("liveness", &q.liveness),
        ("camera", &q.camera),
        ("hdmi", &q.hdmi),
        ("ac", &q.ac),
        ("dc", &q.dc),
        ("cpu", &q.cpu),
        ("memory", &q.memory),
        ("ocr", &q.ocr),
    ] {
        let _ = writeln!(out, "{name} = {query:?}");
    }

    for (category, labels) in &cfg.code_tables {
        let _ = writeln!(out);
        let _ = writeln!(out, "[code_tables.{category}]");
        for (code, label) in labels {
            let _ = writeln!(out, "{code} = {label:?}");
        }
    }

    out.trim_end().to_owned()
}

fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: &ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Path => {
            output::print_output(&config::config_path(global).display().to_string(), global.quiet);
            Ok(())
        }

        ConfigCommand::Show => {
            let cfg = config::load(global)?;
            let out = match global.output {
                crate::cli::OutputFormat::Table | crate::cli::OutputFormat::Plain => {
                    format_config_redacted(&cfg)
                }
                _ => {
                    let mut redacted = cfg;
                    if redacted.prometheus.bearer_token.is_some() {
                        redacted.prometheus.bearer_token = Some("****".into());
                    }
                    output::render_single(
                        &global.output,
                        &redacted,
                        |_| String::new(),
                        |_| String::new(),
                    )?
                }
            };
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Init { ref url, force } => {
            let path = config::config_path(global);
            if path.exists() && !force {
                return Err(CliError::ConfigExists {
                    path: path.display().to_string(),
                });
            }

            let mut cfg = Config::default();
            let url = match url {
                Some(url) => url.clone(),
                None if std::io::stdin().is_terminal() => Input::new()
                    .with_prompt("Prometheus URL")
                    .default(cfg.prometheus.url.clone())
                    .interact_text()
                    .map_err(prompt_err)?,
                None => cfg.prometheus.url.clone(),
            };
            fleetmon_config::parse_url(&url)?;
            cfg.prometheus.url = url;

            fleetmon_config::save_config(&cfg, &path)?;
            if !global.quiet {
                eprintln!("Wrote {}", path.display());
            }
            Ok(())
        }

        ConfigCommand::SetToken { ref token } => {
            let token: SecretString = match token {
                Some(token) => token.clone().into(),
                None if std::io::stdin().is_terminal() => Password::new()
                    .with_prompt("Bearer token")
                    .interact()
                    .map_err(prompt_err)?
                    .into(),
                None => {
                    return Err(CliError::Validation {
                        field: "token".into(),
                        reason: "pass --token when stdin is not a terminal".into(),
                    });
                }
            };
            if token.expose_secret().trim().is_empty() {
                return Err(CliError::Validation {
                    field: "token".into(),
                    reason: "cannot be empty".into(),
                });
            }

            fleetmon_config::store_bearer_token(token.expose_secret())?;
            if !global.quiet {
                eprintln!("Bearer token stored in system keyring");
            }
            Ok(())
        }
    }
}
