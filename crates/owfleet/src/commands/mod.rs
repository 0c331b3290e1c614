//! Command dispatch: bridges CLI args -> owfleet-core -> output formatting.

pub mod collect;
pub mod config_cmd;
pub mod device;
pub mod targets;
pub mod util;

use clap::CommandFactory;

use crate::cli::{Cli, Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a parsed command to its handler.
pub async fn dispatch(cmd: Command, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Collect(args) => collect::handle(args, global).await,
        Command::Targets(args) => targets::handle(args, global).await,
        Command::Device(args) => device::handle(args, global).await,
        Command::Config(args) => config_cmd::handle(&args, global),
        Command::Completions(args) => {
            let mut cmd = Cli::command();
            clap_complete::generate(args.shell, &mut cmd, "owfleet", &mut std::io::stdout());
            Ok(())
        }
    }
}
