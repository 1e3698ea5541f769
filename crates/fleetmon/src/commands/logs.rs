//! Error log listing and acknowledgement.

use std::sync::Arc;

use chrono::Utc;
use tabled::Tabled;

use fleetmon_core::{
    CategoryClassifier, CodeTables, ErrorLogEntry, ErrorLogReconciler, MemoryStore, Store,
};

use crate::cli::{GlobalOpts, LogsArgs, LogsCommand};
use crate::config;
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct LogRow {
    #[tabled(rename = "ID")]
    id: u64,
    #[tabled(rename = "Device")]
    device: String,
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Code")]
    code: i64,
    #[tabled(rename = "Message")]
    message: String,
    #[tabled(rename = "First seen")]
    first: String,
    #[tabled(rename = "Last seen")]
    last: String,
    #[tabled(rename = "Read")]
    read: String,
}

fn row(e: &ErrorLogEntry, color: bool) -> LogRow {
    LogRow {
        id: e.id,
        device: e.device_ip.clone(),
        category: e.category.to_string(),
        code: e.code,
        message: output::paint_health(&e.message, !e.is_read, color),
        first: util::fmt_time(e.first_occurred_at),
        last: util::fmt_time(e.last_occurred_at),
        read: if e.is_read { "yes".into() } else { "no".into() },
    }
}

fn detail(e: &ErrorLogEntry) -> String {
    let ctx = &e.context;
    [
        format!("ID:          {}", e.id),
        format!("Device:      {}", e.device_ip),
        format!("Category:    {}", e.category),
        format!("Code:        {}", e.code),
        format!("Message:     {}", e.message),
        format!("First seen:  {}", util::fmt_time(e.first_occurred_at)),
        format!("Last seen:   {}", util::fmt_time(e.last_occurred_at)),
        format!(
            "Read:        {}",
            e.read_at
                .map_or_else(|| "no".into(), |at| format!("yes ({})", util::fmt_time(at)))
        ),
        format!(
            "Context:     camera={} hdmi={} ac={} dc={} ocr={}",
            util::or_dash(ctx.camera_value),
            util::or_dash(ctx.hdmi_value),
            util::or_dash(ctx.ac_value),
            util::or_dash(ctx.dc_value),
            util::or_dash(ctx.ocr_value_seconds.map(|s| format!("{s}s"))),
        ),
    ]
    .join("\n")
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: &LogsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let cfg = config::load(global)?;
    let tables = fleetmon_config::code_tables(&cfg.code_tables)?;
    let store = Arc::new(config::open_existing_store(global, &cfg)?);
    let color = output::should_color(&global.color);

    match args.command {
        LogsCommand::List { unread } => {
            let entries = if unread {
                store.unread_error_logs()?
            } else {
                store.error_logs()?
            };
            let out = output::render_list(
                &global.output,
                &entries,
                |e| row(e, color),
                |e| e.id.to_string(),
            )?;
            output::print_output(&out, global.quiet);
        }

        LogsCommand::Get { id } => {
            let entry = store.error_log(id)?.ok_or_else(|| not_found(id))?;
            let out = output::render_single(&global.output, &entry, detail, |e| e.id.to_string())?;
            output::print_output(&out, global.quiet);
        }

        LogsCommand::Ack { id } => {
            let reconciler = reconciler(&store, tables);
            let entry = reconciler.mark_read(id, Utc::now())?;
            store.flush()?;
            let out = output::render_single(&global.output, &entry, detail, |e| e.id.to_string())?;
            output::print_output(&out, global.quiet);
        }

        LogsCommand::AckAll => {
            let unread = store.unread_error_logs()?.len();
            if unread == 0 {
                if !global.quiet {
                    eprintln!("No unread error log entries");
                }
                return Ok(());
            }
            if !util::confirm(
                &format!("Mark {unread} unread entries as read?"),
                "logs ack-all",
                global.yes,
            )? {
                return Ok(());
            }

            let reconciler = reconciler(&store, tables);
            let marked = reconciler.mark_all_read(Utc::now())?;
            store.flush()?;
            if !global.quiet {
                eprintln!("Marked {marked} entries as read");
            }
        }
    }

    Ok(())
}

fn reconciler(store: &Arc<MemoryStore>, tables: CodeTables) -> ErrorLogReconciler<MemoryStore> {
    ErrorLogReconciler::new(Arc::clone(store), Arc::new(CategoryClassifier::new(tables)))
}

fn not_found(id: u64) -> CliError {
    CliError::NotFound {
        resource_type: "error log entry".into(),
        identifier: id.to_string(),
        list_command: "logs list".into(),
    }
}
