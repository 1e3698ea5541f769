//! Output formatting: table, JSON, YAML, plain.
//!
//! Renders data in the format selected by `--output`. Table uses `tabled`,
//! structured formats use serde, plain emits one identifier per line.

use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use tabled::{Table, Tabled, settings::Style};

use crate::cli::{ColorMode, OutputFormat};
use crate::error::CliError;

// ── Color helpers ────────────────────────────────────────────────────

/// Determine whether color output should be enabled.
pub fn should_color(mode: &ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

/// Paint a normal/abnormal marker.
pub fn paint_health(text: &str, abnormal: bool, color: bool) -> String {
    match (color, abnormal) {
        (false, _) => text.to_owned(),
        (true, true) => text.red().bold().to_string(),
        (true, false) => text.green().to_string(),
    }
}

/// Paint an online/offline marker.
pub fn paint_online(online: bool, color: bool) -> String {
    let text = if online { "online" } else { "offline" };
    if !color {
        return text.to_owned();
    }
    if online {
        text.green().to_string()
    } else {
        text.dimmed().to_string()
    }
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a list of serde-serializable + tabled items in the chosen format.
///
/// - `table`: uses the `Tabled` derive to build a pretty table
/// - `json` / `json-compact`: serializes the original data via serde
/// - `yaml`: serializes via serde_yaml
/// - `plain`: calls `id_fn` on each item to emit one identifier per line
pub fn render_list<T, R>(
    format: &OutputFormat,
    data: &[T],
    to_row: impl Fn(&T) -> R,
    id_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: serde::Serialize,
    R: Tabled,
{
    match format {
        OutputFormat::Table => {
            let rows: Vec<R> = data.iter().map(to_row).collect();
            Ok(render_table(&rows))
        }
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => Ok(data.iter().map(&id_fn).collect::<Vec<_>>().join("\n")),
    }
}

/// Render a single serde-serializable item in the chosen format.
///
/// Table rendering uses `detail_fn`, since single-item detail views
/// don't use the `Tabled` derive.
pub fn render_single<T>(
    format: &OutputFormat,
    data: &T,
    detail_fn: impl Fn(&T) -> String,
    id_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: serde::Serialize,
{
    match format {
        OutputFormat::Table => Ok(detail_fn(data)),
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => Ok(id_fn(data)),
    }
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

// ── Format-specific renderers ────────────────────────────────────────

fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

fn render_json<T: serde::Serialize + ?Sized>(data: &T, compact: bool) -> Result<String, CliError> {
    let rendered = if compact {
        serde_json::to_string(data)?
    } else {
        serde_json::to_string_pretty(data)?
    };
    Ok(rendered)
}

fn render_yaml<T: serde::Serialize + ?Sized>(data: &T) -> Result<String, CliError> {
    Ok(serde_yaml::to_string(data)?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[derive(serde::Serialize)]
    struct Item {
        name: &'static str,
    }

    #[derive(Tabled)]
    struct Row {
        #[tabled(rename = "Name")]
        name: &'static str,
    }

    fn items() -> Vec<Item> {
        vec![Item { name: "a" }, Item { name: "b" }]
    }

    #[test]
    fn plain_emits_one_id_per_line() {
        let out = render_list(
            &OutputFormat::Plain,
            &items(),
            |i| Row { name: i.name },
            |i| i.name.to_owned(),
        )
        .unwrap();
        assert_eq!(out, "a\nb");
    }

    #[test]
    fn compact_json_is_single_line() {
        let out = render_list(
            &OutputFormat::JsonCompact,
            &items(),
            |i| Row { name: i.name },
            |i| i.name.to_owned(),
        )
        .unwrap();
        assert_eq!(out, r#"[{"name":"a"},{"name":"b"}]"#);
    }

    #[test]
    fn table_has_header() {
        let out = render_list(
            &OutputFormat::Table,
            &items(),
            |i| Row { name: i.name },
            |i| i.name.to_owned(),
        )
        .unwrap();
        assert!(out.contains("Name"));
        assert!(out.contains('b'));
    }

    #[test]
    fn uncolored_markers_are_plain_text() {
        assert_eq!(paint_health("ABNORMAL", true, false), "ABNORMAL");
        assert_eq!(paint_online(false, false), "offline");
    }
}
