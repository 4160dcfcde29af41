//! Pending edits keyed by file, materialized into text changes at the end.

use super::{Change, ImportRewrite, TextEdit, TextFileChange};
use crate::domain::{ResourcePath, UnitId};
use crate::error::ServiceError;
use crate::services::{AstRewriteService, SourceModel};
use std::collections::BTreeMap;

pub const GROUP_UPDATE_IMPORTS: &str = "Update imports";
pub const GROUP_UPDATE_REFERENCES: &str = "Update references";

#[derive(Debug, Default)]
struct PendingEdits {
    unit: Option<UnitId>,
    edits: Vec<(String, TextEdit)>,
    imports: Option<ImportRewrite>,
}

/// Collects edits per file so that every file ends up with exactly one
/// text change, and import rewrites are computed once per file.
#[derive(Debug, Default)]
pub struct TextChangeManager {
    pending: BTreeMap<ResourcePath, PendingEdits>,
}

impl TextChangeManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_edit(&mut self, file: &ResourcePath, group: &str, edit: TextEdit) {
        self.pending.entry(file.clone()).or_default().edits.push((group.to_string(), edit));
    }

    pub fn add_edits(&mut self, file: &ResourcePath, group: &str, edits: Vec<TextEdit>) {
        for edit in edits {
            self.add_edit(file, group, edit);
        }
    }

    /// The import rewrite of `unit`, created on first use.
    pub fn import_rewrite(&mut self, unit: &UnitId) -> &mut ImportRewrite {
        let pending = self.pending.entry(unit.path()).or_default();
        pending.unit = Some(unit.clone());
        pending.imports.get_or_insert_with(ImportRewrite::default)
    }

    pub fn contains(&self, file: &ResourcePath) -> bool {
        self.pending.contains_key(file)
    }

    pub fn files(&self) -> Vec<ResourcePath> {
        self.pending.keys().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.values().all(|p| {
            p.edits.is_empty() && p.imports.as_ref().map_or(true, |i| !i.has_recorded_changes())
        })
    }

    /// One text change per file, in path order, with the content hash each
    /// was computed against.
    pub fn into_changes(
        self,
        model: &dyn SourceModel,
        rewrite: &dyn AstRewriteService,
    ) -> Result<Vec<TextFileChange>, ServiceError> {
        let mut changes = Vec::new();
        for (file, pending) in self.pending {
            let mut change = TextFileChange::new(file.clone());
            for (group, edit) in pending.edits {
                change.add_edit(&group, edit);
            }
            if let (Some(unit), Some(imports)) = (&pending.unit, &pending.imports) {
                if imports.has_recorded_changes() {
                    for edit in rewrite.rewrite_imports(unit, imports)? {
                        change.add_edit(GROUP_UPDATE_IMPORTS, edit);
                    }
                }
            }
            if change.is_empty() {
                continue;
            }
            change.expected_hash = model.content_hash(&file).map(str::to_string);
            changes.push(change);
        }
        Ok(changes)
    }
}

/// Append `extra` to a text change for the same file inside `changes`.
/// Returns `extra` back when no such change exists.
pub fn merge_text_change(changes: &mut [Change], extra: TextFileChange) -> Option<TextFileChange> {
    for change in changes.iter_mut() {
        for text in change.text_changes_mut() {
            if text.file == extra.file {
                text.edits.extend(extra.edits);
                text.groups.extend(extra.groups);
                return None;
            }
        }
    }
    Some(extra)
}
