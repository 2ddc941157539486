mod cli;
mod commands;
mod observability;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use commands::run::{self, RunOptions};
use forkrun_core::config::ForkConfig;

fn main() -> Result<()> {
    observability::init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            no_capture_stdout,
            no_capture_stderr,
            nice,
            workspace_root,
            json,
            command,
        } => {
            let config = run::resolve_config(
                ForkConfig::from_env(),
                no_capture_stdout,
                no_capture_stderr,
                nice,
                workspace_root,
            );
            let code = run::run(&RunOptions {
                command,
                config,
                json,
            })?;
            std::process::exit(code);
        }
    }
}
