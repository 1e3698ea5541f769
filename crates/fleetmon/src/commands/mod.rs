//! Command dispatch: bridges CLI args -> core engine -> output formatting.

pub mod codes;
pub mod config_cmd;
pub mod devices;
pub mod logs;
pub mod pass;
pub mod query;
pub mod run;
pub mod summary;
pub mod util;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a command that needs the metrics server or the state file.
pub async fn dispatch(cmd: Command, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Run(args) => run::handle(&args, global).await,
        Command::Pass => pass::handle(global).await,
        Command::Query(args) => query::handle(&args, global).await,
        Command::Summary => summary::handle(global),
        Command::Devices(args) => devices::handle(&args, global),
        Command::Logs(args) => logs::handle(&args, global),
        // Config, Codes and Completions are handled before dispatch
        Command::Config(_) | Command::Codes(_) | Command::Completions(_) => unreachable!(),
    }
}
