//! `replay`: run a saved descriptor again.

use anyhow::{Context, Result};
use clap::Args;
use std::fs;
use std::path::PathBuf;

use super::progress::BarMonitor;
use super::reorg_cmd::report;
use super::utils::open_workspace;
use super::GlobalArgs;
use crate::config::CliOverrides;
use crate::reorg::{Descriptor, ReorgProcessor};
use crate::services::{ConflictChoice, FixedQueries};
use crate::workspace::FsChangePerformer;

#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// Descriptor written by `--save-descriptor`
    #[arg(value_name = "FILE")]
    pub descriptor: PathBuf,

    /// Show the change without performing it
    #[arg(long)]
    pub dry_run: bool,
}

pub fn run(args: ReplayArgs, global: &GlobalArgs) -> Result<()> {
    let json = fs::read_to_string(&args.descriptor)
        .with_context(|| format!("Failed to read descriptor: {}", args.descriptor.display()))?;
    let descriptor: Descriptor = serde_json::from_str(&json)
        .with_context(|| format!("Invalid descriptor: {}", args.descriptor.display()))?;

    let (config, mut workspace) = open_workspace(global, CliOverrides::default())?;
    let root = workspace.root().to_path_buf();
    let mut performer = FsChangePerformer::new(&root);
    // Unattended: anything the log cannot answer is confirmed, conflicts are skipped.
    let mut queries = FixedQueries::new(true, ConflictChoice::Skip);
    let outcome = {
        let mut monitor = BarMonitor::new();
        ReorgProcessor::new(&mut workspace, &mut performer).replay(
            &descriptor,
            !args.dry_run,
            &mut queries,
            &mut monitor,
        )?
    };
    report(outcome, args.dry_run, None, &root, &config)
}
