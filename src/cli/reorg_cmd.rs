//! `move` and `copy`.

use anyhow::{Context, Result};
use clap::Args;
use console::style;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use super::history::{History, HistoryEntry};
use super::progress::BarMonitor;
use super::queries::{OnConflict, TerminalQueries};
use super::utils::{open_workspace, parse_csv, print_status, resolve_destination, resolve_item};
use super::GlobalArgs;
use crate::config::CliOverrides;
use crate::domain::{Destination, Location, ReorgConfig, ReorgMode};
use crate::reorg::{classify, ReorgOutcome, ReorgProcessor, ReorgRequest};
use crate::workspace::FsChangePerformer;

#[derive(Args, Debug)]
pub struct ReorgArgs {
    /// Files, folders, handles or `file::Type.member` paths to reorganize
    #[arg(required = true, value_name = "ITEM")]
    pub items: Vec<String>,

    /// Destination folder, source root, namespace, file or declaration
    #[arg(short, long, value_name = "TARGET")]
    pub to: String,

    /// Place declarations before or after the destination declaration
    #[arg(long, value_name = "on|before|after", default_value = "on")]
    pub location: Location,

    /// Leave references to moved files untouched
    #[arg(long)]
    pub no_references: bool,

    /// Also rewrite fully qualified names in non-source files
    #[arg(long)]
    pub qualified_names: bool,

    /// Glob patterns of files searched for qualified names (comma-separated)
    #[arg(long, value_name = "GLOBS")]
    pub patterns: Option<String>,

    /// Extra exclude globs for this run (comma-separated)
    #[arg(long, value_name = "GLOBS")]
    pub exclude: Option<String>,

    /// Create a missing destination folder without asking
    #[arg(long)]
    pub create_target: bool,

    /// How to resolve name conflicts at the destination
    #[arg(long, value_enum, default_value_t = OnConflict::Ask)]
    pub on_conflict: OnConflict,

    /// Answer yes to every confirmation
    #[arg(short, long)]
    pub yes: bool,

    /// Show the change without performing it
    #[arg(long)]
    pub dry_run: bool,

    /// Write the operation descriptor (JSON) for later replay
    #[arg(long, value_name = "FILE")]
    pub save_descriptor: Option<PathBuf>,
}

impl ReorgArgs {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            exclude_globs: parse_csv(&self.exclude),
            update_references: self.no_references.then_some(false),
            update_qualified_names: self.qualified_names.then_some(true),
            qualified_name_patterns: self.patterns.clone(),
            ..CliOverrides::default()
        }
    }
}

pub fn run(mode: ReorgMode, args: ReorgArgs, global: &GlobalArgs) -> Result<()> {
    let (config, mut workspace) = open_workspace(global, args.overrides())?;
    let items = args
        .items
        .iter()
        .map(|spec| resolve_item(&workspace, spec))
        .collect::<Result<Vec<_>>>()?;
    let target = resolve_destination(&workspace, &args.to)?;
    let destination = Destination::new(target, args.location);

    let mut policy = classify(&workspace, mode, &items);
    let update_references = config.update_references && policy.can_update_references();
    let update_qualified_names = config.update_qualified_names && policy.can_update_qualified_names();
    let data = policy.data_mut();
    data.update_references = update_references;
    data.update_qualified_names = update_qualified_names;
    data.file_patterns = config.qualified_name_patterns.clone();
    info!("{} {} item(s) with {}", mode.verb(), items.len(), policy.policy_id());

    let root = workspace.root().to_path_buf();
    let mut performer = FsChangePerformer::new(&root);
    let mut queries = TerminalQueries::new(args.on_conflict, args.yes);
    let request = ReorgRequest { destination, perform: !args.dry_run, create_target: args.create_target };
    let outcome = {
        let mut monitor = BarMonitor::new();
        ReorgProcessor::new(&mut workspace, &mut performer).run(policy.as_mut(), request, &mut queries, &mut monitor)?
    };

    report(outcome, args.dry_run, args.save_descriptor.as_deref(), &root, &config)
}

/// Print the outcome and record it in the history when it was performed.
pub(super) fn report(
    outcome: ReorgOutcome,
    dry_run: bool,
    save_descriptor: Option<&Path>,
    root: &Path,
    config: &ReorgConfig,
) -> Result<()> {
    print_status(&outcome.status);
    if outcome.is_cancelled() {
        eprintln!("{}", style("Cancelled.").yellow());
        return Ok(());
    }
    if outcome.status.has_fatal() {
        anyhow::bail!("{}", outcome.status.first_message().unwrap_or("The operation could not be performed."));
    }

    if let Some(change) = &outcome.change {
        if dry_run {
            print!("{}", change.describe());
        } else {
            println!(
                "{} ({} file(s) affected)",
                style(change.name()).green().bold(),
                change.affected_files().len()
            );
        }
    }

    if let (Some(path), Some(descriptor)) = (save_descriptor, &outcome.descriptor) {
        let json = serde_json::to_string_pretty(descriptor).context("Failed to serialize descriptor")?;
        fs::write(path, json).with_context(|| format!("Failed to write descriptor: {}", path.display()))?;
        info!("Descriptor written to {}", path.display());
    }

    if outcome.is_performed() {
        if let (Some(descriptor), Some(undo)) = (outcome.descriptor, outcome.undo) {
            let history = History::new(root, &config.history_file);
            history.append(&HistoryEntry::new(descriptor, undo))?;
            info!("Recorded undo information in {}", history.path().display());
        }
    }
    Ok(())
}
