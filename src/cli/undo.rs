//! `undo`: revert the most recent recorded operation.

use anyhow::{Context, Result};
use clap::Args;
use console::style;

use super::history::History;
use super::utils::resolve_config;
use super::GlobalArgs;
use crate::config::CliOverrides;
use crate::services::ChangePerformer;
use crate::workspace::FsChangePerformer;

#[derive(Args, Debug)]
pub struct UndoArgs {
    /// Only show what would be reverted
    #[arg(long)]
    pub dry_run: bool,
}

pub fn run(args: UndoArgs, global: &GlobalArgs) -> Result<()> {
    let (root, config) = resolve_config(global, CliOverrides::default())?;
    let history = History::new(&root, &config.history_file);

    if args.dry_run {
        match history.entries()?.last() {
            Some(entry) => print!("{}", entry.undo.describe()),
            None => println!("Nothing to undo."),
        }
        return Ok(());
    }

    let Some(entry) = history.pop()? else {
        println!("Nothing to undo.");
        return Ok(());
    };
    tracing::debug!("Undoing {} recorded at {}", entry.descriptor.id, entry.timestamp.to_rfc3339());
    FsChangePerformer::new(&root)
        .perform(&entry.undo)
        .with_context(|| format!("Failed to undo '{}'", entry.undo.name()))?;
    println!("{} {}", style("Undone:").green().bold(), entry.undo.name());
    Ok(())
}
