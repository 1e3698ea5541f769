//! Status code tables in effect after config overrides.

use serde::Serialize;
use tabled::Tabled;

use fleetmon_core::{Category, CategoryClassifier};

use crate::cli::{CodesArgs, GlobalOpts};
use crate::config;
use crate::error::CliError;
use crate::output;

#[derive(Serialize)]
struct CodeEntry {
    category: Category,
    code: i64,
    label: String,
    abnormal: bool,
}

#[derive(Tabled)]
struct CodeRow {
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Code")]
    code: i64,
    #[tabled(rename = "Label")]
    label: String,
    #[tabled(rename = "Health")]
    health: String,
}

pub fn handle(args: &CodesArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let cfg = config::load(global)?;
    let tables = fleetmon_config::code_tables(&cfg.code_tables)?;

    let entries: Vec<CodeEntry> = tables
        .iter()
        .filter(|(category, _)| args.category.is_none_or(|wanted| wanted == *category))
        .flat_map(|(category, table)| {
            table.iter().map(move |(&code, label)| CodeEntry {
                category,
                code,
                label: label.clone(),
                abnormal: CategoryClassifier::is_abnormal(category, code),
            })
        })
        .collect();

    let color = output::should_color(&global.color);
    let out = output::render_list(
        &global.output,
        &entries,
        |e| CodeRow {
            category: e.category.to_string(),
            code: e.code,
            label: e.label.clone(),
            health: output::paint_health(
                if e.abnormal { "abnormal" } else { "normal" },
                e.abnormal,
                color,
            ),
        },
        |e| format!("{}:{}", e.category, e.code),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
