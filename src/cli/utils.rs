//! Shared CLI utilities.

use anyhow::{Context, Result};
use console::style;
use std::path::PathBuf;

use super::GlobalArgs;
use crate::config::{apply_env, load_config, merge_cli_with_config, CliOverrides};
use crate::domain::{ReorgConfig, ResourcePath, SelectionItem};
use crate::status::{Severity, Status};
use crate::workspace::Workspace;

/// Parse a comma-separated string into a `Vec<String>`, trimming whitespace and
/// discarding empty segments.  Returns `None` when `value` is `None`.
pub fn parse_csv(value: &Option<String>) -> Option<Vec<String>> {
    value.as_ref().map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| part.to_string())
            .collect::<Vec<_>>()
    })
}

/// Canonical workspace root plus its resolved config.
pub fn resolve_config(global: &GlobalArgs, overrides: CliOverrides) -> Result<(PathBuf, ReorgConfig)> {
    let root = global
        .root
        .canonicalize()
        .with_context(|| format!("Workspace root not found: {}", global.root.display()))?;
    if !root.is_dir() {
        anyhow::bail!("Workspace root is not a directory: {}", root.display());
    }
    let file_config = load_config(&root, global.config.as_deref())?;
    let config = merge_cli_with_config(apply_env(file_config)?, overrides);
    Ok((root, config))
}

pub fn open_workspace(global: &GlobalArgs, overrides: CliOverrides) -> Result<(ReorgConfig, Workspace)> {
    let (root, config) = resolve_config(global, overrides)?;
    let workspace = Workspace::open(&root, &config)?;
    Ok((config, workspace))
}

/// Element handles start with `=`, resource handles with `/`; anything
/// else is a workspace path, optionally followed by `::Decl.path`.
pub fn resolve_item(workspace: &Workspace, spec: &str) -> Result<SelectionItem> {
    if spec.starts_with('=') || spec.starts_with('/') {
        return spec.parse::<SelectionItem>().with_context(|| format!("Invalid handle '{spec}'"));
    }
    workspace
        .resolve_path(spec.trim_end_matches('/'))
        .with_context(|| format!("'{spec}' does not exist in the workspace"))
}

/// Like [`resolve_item`], but a missing path names a folder to create.
pub fn resolve_destination(workspace: &Workspace, spec: &str) -> Result<SelectionItem> {
    if spec.starts_with('=') || spec.starts_with('/') || spec.contains("::") {
        return resolve_item(workspace, spec);
    }
    let trimmed = spec.trim_end_matches('/');
    Ok(workspace
        .resolve_path(trimmed)
        .unwrap_or_else(|| SelectionItem::resource(ResourcePath::new(trimmed))))
}

/// Status entries on stderr, coloured by severity.
pub fn print_status(status: &Status) {
    for entry in status.entries() {
        let label = style(entry.severity.to_string());
        let label = match entry.severity {
            Severity::Info => label.cyan(),
            Severity::Warning => label.yellow(),
            Severity::Error | Severity::Fatal => label.red().bold(),
        };
        match &entry.context {
            Some(context) => eprintln!("{label}: {} ({context})", entry.message),
            None => eprintln!("{label}: {}", entry.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_is_trimmed() {
        assert_eq!(parse_csv(&Some(" a, ,b ".to_string())), Some(vec!["a".to_string(), "b".to_string()]));
        assert_eq!(parse_csv(&None), None);
    }
}
