use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// forkrun - run a command in a forked child, capture its output, report how it ended
#[derive(Parser, Debug)]
#[command(name = "forkrun")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run PROGRAM in a forked child and report its outcome
    Run {
        /// Do not capture the child's standard output (default: from env or capture)
        #[arg(long)]
        no_capture_stdout: bool,

        /// Do not capture the child's standard error (default: from env or capture)
        #[arg(long)]
        no_capture_stderr: bool,

        /// Niceness increment for the child (default: from env or 0)
        #[arg(long, allow_hyphen_values = true)]
        nice: Option<i32>,

        /// Directory in which the per-run workspace is created
        #[arg(long, value_name = "DIR")]
        workspace_root: Option<PathBuf>,

        /// Print the outcome as JSON instead of replaying captured output
        #[arg(long, default_value = "false")]
        json: bool,

        /// Program to run, followed by its arguments
        #[arg(value_name = "PROGRAM", required = true, trailing_var_arg = true)]
        command: Vec<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_with_flags_and_trailing_args() {
        let cli = Cli::try_parse_from([
            "forkrun",
            "run",
            "--no-capture-stderr",
            "--nice",
            "5",
            "--json",
            "--",
            "ls",
            "-la",
        ])
        .unwrap();
        let Commands::Run {
            no_capture_stdout,
            no_capture_stderr,
            nice,
            json,
            command,
            workspace_root,
        } = cli.command;
        assert!(!no_capture_stdout);
        assert!(no_capture_stderr);
        assert_eq!(nice, Some(5));
        assert!(json);
        assert!(workspace_root.is_none());
        assert_eq!(command, vec!["ls".to_string(), "-la".to_string()]);
    }

    #[test]
    fn test_run_requires_program() {
        assert!(Cli::try_parse_from(["forkrun", "run"]).is_err());
    }
}
