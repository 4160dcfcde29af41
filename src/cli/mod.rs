//! Command-line interface for repo-reorg
//!
//! `move` and `copy` run the engine against the workspace on disk, `replay`
//! re-runs a stored descriptor, `undo` reverts the last recorded operation
//! and `info` lists the handles the other commands accept.

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::domain::ReorgMode;

mod history;
mod info;
mod progress;
mod queries;
mod reorg_cmd;
mod replay;
mod undo;
mod utils;

/// Move and copy source entities while keeping references consistent
#[derive(Parser)]
#[command(name = "repo-reorg")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Workspace root
    #[arg(short = 'C', long, value_name = "DIR", default_value = ".", global = true)]
    root: PathBuf,

    /// Path to config file (repo-reorg.toml or reorg.yml)
    #[arg(short = 'c', long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging (sets log level to DEBUG)
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Options every command shares.
#[derive(Debug, Clone)]
pub struct GlobalArgs {
    pub root: PathBuf,
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Move files, namespaces, source roots or declarations
    Move(Box<reorg_cmd::ReorgArgs>),

    /// Copy files, namespaces, source roots or declarations
    Copy(Box<reorg_cmd::ReorgArgs>),

    /// Run a stored operation descriptor again without prompting
    Replay(replay::ReplayArgs),

    /// Revert the last recorded operation
    Undo(undo::UndoArgs),

    /// List source roots, namespaces, files and declaration handles
    Info(info::InfoArgs),

    /// Print shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG in the environment always takes precedence; --verbose falls back to DEBUG.
    let filter = if cli.verbose {
        EnvFilter::from_default_env().add_directive(Level::DEBUG.into())
    } else {
        EnvFilter::from_default_env().add_directive(Level::WARN.into())
    };
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init();

    let global = GlobalArgs { root: cli.root, config: cli.config };
    match cli.command {
        Commands::Move(args) => reorg_cmd::run(ReorgMode::Move, *args, &global),
        Commands::Copy(args) => reorg_cmd::run(ReorgMode::Copy, *args, &global),
        Commands::Replay(args) => replay::run(args, &global),
        Commands::Undo(args) => undo::run(args, &global),
        Commands::Info(args) => info::run(args, &global),
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "repo-reorg", &mut std::io::stdout());
            Ok(())
        }
    }
}
