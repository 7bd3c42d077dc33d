//! Scandrop command-line entry point
//!
//! - `run`: one ingestion pass over the drop directory
//! - `watch`: repeated passes on a fixed interval
//! - `check`: classify names against the configured grammars, read-only

use clap::{Parser, Subcommand};
use scandrop_logging::{init_logging, LogConfig};
use std::path::PathBuf;
use std::process::ExitCode;

mod cli;

#[derive(Parser, Debug)]
#[command(name = "scandrop", about = "Ingest scan-data deliveries into the archive")]
struct Cli {
    /// Enable verbose logging (debug to stderr and log file)
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    /// Path to the YAML configuration
    #[arg(
        short = 'c',
        long,
        global = true,
        env = "SCANDROP_CONFIG",
        default_value = "config.yaml"
    )]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a single ingestion pass
    Run {
        /// Output the pass report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run ingestion passes repeatedly until interrupted
    Watch {
        /// Seconds to wait between passes
        #[arg(short, long, default_value = "300")]
        interval: u64,
    },

    /// Check file names (or folder names) against the naming convention
    Check {
        /// Names to check
        #[arg(required = true)]
        names: Vec<String>,

        /// Treat names as folder names and show the repaired name
        #[arg(long)]
        folder: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn command_wants_json(cmd: &Commands) -> bool {
    matches!(
        cmd,
        Commands::Run { json: true } | Commands::Check { json: true, .. }
    )
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let json_mode = command_wants_json(&cli.command);

    let _log_guard = match init_logging(LogConfig {
        app_name: "scandrop",
        verbose: cli.verbose,
        log_dir: None,
    }) {
        Ok(guard) => Some(guard),
        Err(err) => {
            eprintln!("Warning: failed to initialize logging: {:#}", err);
            None
        }
    };

    let result = run_command(cli);

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if json_mode {
                cli::error::print_json_error(&err);
            } else {
                eprintln!("{:#}", err);
            }
            ExitCode::from(1)
        }
    }
}

fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Run { json } => cli::run::run(cli::run::RunArgs {
            config: cli.config,
            json,
        }),
        Commands::Watch { interval } => cli::run::watch(cli::run::WatchArgs {
            config: cli.config,
            interval_secs: interval,
        }),
        Commands::Check {
            names,
            folder,
            json,
        } => cli::check::run(cli::check::CheckArgs {
            config: cli.config,
            names,
            folder,
            json,
        }),
    }
}
