//! nobadfuncs CLI tool.
//!
//! Usage:
//! ```bash
//! nobadfuncs --config-json '{"func os.Exit(int)": "..."}' ./...
//! nobadfuncs check [--config FILE] [--pkg-dir DIR] [PKG]...
//! nobadfuncs run-check-cmd [ARGS]...
//! nobadfuncs upgrade-config [--legacy] FILE
//! ```

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use nobadfuncs_core::CheckerRegistry;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod config_resolver;

/// Reports calls to denied Go functions and methods
#[derive(Parser)]
#[command(name = "nobadfuncs")]
#[command(author, version, about, long_about = None)]
#[command(subcommand_negates_reqs = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(flatten)]
    engine: EngineArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Arguments of a direct engine invocation.
#[derive(Args)]
struct EngineArgs {
    /// JSON object mapping canonical signatures to messages
    #[arg(long = "config-json", value_name = "JSON", required = true)]
    config_json: Option<String>,

    /// Packages to check (`.`, `./dir`, `./...`)
    #[arg(value_name = "PKG")]
    pkgs: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the check the way an orchestrator would, using a YAML config
    Check {
        /// Path to the check configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Directory package paths are resolved against
        #[arg(long, default_value = ".")]
        pkg_dir: PathBuf,

        /// Run the checker in this process instead of a child process
        #[arg(long)]
        in_process: bool,

        /// Packages to check (default: ./...)
        #[arg(value_name = "PKG")]
        pkgs: Vec<String>,
    },

    /// Run the engine with raw arguments, forwarding its output unchanged
    RunCheckCmd {
        /// Arguments passed to the engine as-is
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Print a configuration file upgraded to the current schema
    UpgradeConfig {
        /// Treat the file as legacy (`args` + `filters`) configuration
        #[arg(long)]
        legacy: bool,

        /// Configuration file to upgrade
        file: PathBuf,
    },

    /// Print the checker type name
    Type,

    /// Print the checker priority
    Priority,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("warn")
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        None => {
            let config_json = cli.engine.config_json.unwrap_or_default();
            commands::engine::run(config_json, cli.engine.pkgs)
        }
        Some(Commands::Check {
            config,
            pkg_dir,
            in_process,
            pkgs,
        }) => {
            let registry = registry(in_process)?;
            commands::check::run(&registry, &pkg_dir, config.as_deref(), pkgs)
        }
        Some(Commands::RunCheckCmd { args }) => commands::raw::run(&args),
        Some(Commands::UpgradeConfig { legacy, file }) => commands::upgrade::run(&file, legacy),
        Some(Commands::Type) => {
            commands::info::print_type();
            Ok(())
        }
        Some(Commands::Priority) => {
            commands::info::print_priority();
            Ok(())
        }
    }
}

/// Builds the checker registry for the `check` subcommand.
///
/// Out of process, the checker is this executable in engine mode.
fn registry(in_process: bool) -> Result<CheckerRegistry> {
    let creator = if in_process {
        nobadfuncs_go::creator()
    } else {
        nobadfuncs_go::subprocess_creator(std::env::current_exe()?)
    };
    Ok(CheckerRegistry::new().with(nobadfuncs_go::TYPE_NAME, nobadfuncs_go::PRIORITY, creator))
}
