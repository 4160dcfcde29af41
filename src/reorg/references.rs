//! Reference discovery and rewriting for moved source files.
//!
//! Every match is classified once (import, qualified, simple) and turned
//! into the smallest edit that keeps it resolving after the move. Import
//! edits are batched per file through [`TextChangeManager::import_rewrite`].

use super::policy::ReorgContext;
use crate::change::manager::GROUP_UPDATE_REFERENCES;
use crate::change::{ImportName, TextChangeManager, TextEdit};
use crate::domain::{DeclarationId, Element, NamespaceId, ResourcePath, SourceRange, UnitId};
use crate::error::ReorgError;
use crate::services::{
    checkpoint, Accuracy, EditOp, ProgressMonitor, SearchPattern, SearchScope, SourceModel,
};
use crate::status::{Severity, Status};

pub const GROUP_UPDATE_NAMESPACE: &str = "Update namespace declaration";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceKind {
    /// Inside `import ...;`.
    Import { import: DeclarationId },
    /// `pkg.a.Foo`; the simple name starts at `simple_offset`.
    Qualified { simple_offset: usize },
    Simple,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceMatch {
    pub file: ResourcePath,
    pub unit: UnitId,
    /// Innermost member or type declaration around the match.
    pub enclosing: Option<DeclarationId>,
    pub range: SourceRange,
    pub kind: ReferenceKind,
}

/// Search references to the type `qualified_name`. Matches that cannot be
/// rewritten are reported in the status instead: binary ones as warnings,
/// inaccurate ones as info.
pub fn find_references(
    ctx: &ReorgContext<'_>,
    qualified_name: &str,
    scope: &SearchScope,
    monitor: &mut dyn ProgressMonitor,
) -> Result<(Vec<ReferenceMatch>, Status), ReorgError> {
    checkpoint(monitor)?;
    monitor.sub_task(&format!("Searching references to {qualified_name}"));
    let pattern = SearchPattern::type_references(qualified_name);
    let simple_len = pattern.simple_name().len();
    let raw = ctx.search.find(&pattern, scope)?;

    let mut status = Status::ok();
    let mut matches = Vec::with_capacity(raw.len());
    for found in raw {
        if found.binary {
            tracing::warn!("Binary reference to {} in {} will not be updated", qualified_name, found.file);
            status.add_warning_with(
                format!("A compiled reference to '{qualified_name}' cannot be updated."),
                found.file.to_string(),
            );
            continue;
        }
        if found.accuracy == Accuracy::Inaccurate {
            tracing::warn!(
                "Skipping inaccurate match for {} in {} at offset {}",
                qualified_name,
                found.file,
                found.range.offset
            );
            status.add(
                Severity::Info,
                format!("A possible reference to '{qualified_name}' was not updated."),
                Some(found.file.to_string()),
            );
            continue;
        }
        let Some(Element::SourceFile(unit)) = ctx.model.element_for_resource(&found.file) else {
            continue;
        };
        let kind = match found.enclosing_import {
            Some(import) => ReferenceKind::Import { import },
            None if found.range.length > simple_len => {
                ReferenceKind::Qualified { simple_offset: found.range.end() - simple_len }
            }
            None => ReferenceKind::Simple,
        };
        let enclosing = enclosing_declaration(ctx.model, &unit, &found.range);
        matches.push(ReferenceMatch { file: found.file, unit, enclosing, range: found.range, kind });
    }
    Ok((matches, status))
}

fn enclosing_declaration(model: &dyn SourceModel, unit: &UnitId, range: &SourceRange) -> Option<DeclarationId> {
    model
        .declarations(unit)
        .into_iter()
        .filter(|info| info.id.kind.is_member() && info.range.covers(range))
        .min_by_key(|info| info.range.length)
        .map(|info| info.id)
}

/// Narrowest scope that can see the types of `unit`: package-private types
/// are only visible inside their namespace.
fn search_scope(model: &dyn SourceModel, unit: &UnitId) -> SearchScope {
    let types = model.top_level_types(unit);
    if !types.is_empty() && types.iter().all(|info| !info.is_public) {
        SearchScope::Namespace(unit.namespace.name.clone())
    } else {
        SearchScope::Workspace
    }
}

/// Decision table for a simple reference in `referencing` to a type that
/// leaves `source`.
fn needs_new_import(model: &dyn SourceModel, referencing: &UnitId, moved: &[UnitId], source: &NamespaceId) -> bool {
    if moved.contains(referencing) {
        return false;
    }
    if referencing.namespace.is_same_namespace(source) {
        return true;
    }
    model.imports(referencing).iter().any(|info| {
        let import = ImportName::from_declaration_path(&info.id.path);
        !import.is_static && import.is_on_demand() && import.container() == source.name
    })
}

/// Record every edit needed to move `moved` into `destination`: their
/// namespace declarations, their own imports and all references to their
/// types.
pub fn update_references(
    ctx: &ReorgContext<'_>,
    moved: &[UnitId],
    destination: &NamespaceId,
    manager: &mut TextChangeManager,
    monitor: &mut dyn ProgressMonitor,
) -> Result<Status, ReorgError> {
    let mut status = Status::ok();
    for unit in moved {
        checkpoint(monitor)?;
        let source = &unit.namespace;
        if source.is_same_namespace(destination) {
            tracing::debug!("{} stays in namespace '{}'; no references to update", unit.name, source.name);
            continue;
        }
        let edits = ctx.rewrite.create_edits(unit, &EditOp::SetNamespace(destination.name.clone()))?;
        manager.add_edits(&unit.path(), GROUP_UPDATE_NAMESPACE, edits);

        add_imports_to_source_namespace_types(ctx, unit, moved, manager, monitor)?;
        remove_imports_to_destination_types(ctx.model, unit, destination, manager);

        let scope = search_scope(ctx.model, unit);
        for ty in ctx.model.top_level_types(unit) {
            let qualified = ty.id.qualified_type_name();
            let (matches, found) = find_references(ctx, &qualified, &scope, monitor)?;
            status.merge(found);
            for reference in matches {
                rewrite_reference(ctx.model, &reference, &ty.id, source, destination, moved, manager);
            }
        }
        monitor.worked(1);
    }
    Ok(status)
}

fn rewrite_reference(
    model: &dyn SourceModel,
    reference: &ReferenceMatch,
    ty: &DeclarationId,
    source: &NamespaceId,
    destination: &NamespaceId,
    moved: &[UnitId],
    manager: &mut TextChangeManager,
) {
    match &reference.kind {
        ReferenceKind::Import { import } => {
            let old = ImportName::from_declaration_path(&import.path);
            let prefix = format!("{}.", source.name);
            let Some(rest) = old.name.strip_prefix(&prefix) else { return };
            let new = ImportName { is_static: old.is_static, name: destination.qualify(rest) };
            let imports = manager.import_rewrite(&reference.unit);
            imports.remove(old);
            imports.add(new);
        }
        ReferenceKind::Qualified { simple_offset } => {
            let qualifier = if destination.is_default() { String::new() } else { format!("{}.", destination.name) };
            manager.add_edit(
                &reference.file,
                GROUP_UPDATE_REFERENCES,
                TextEdit::replace(reference.range.offset, simple_offset - reference.range.offset, qualifier),
            );
        }
        ReferenceKind::Simple => {
            if needs_new_import(model, &reference.unit, moved, source) {
                manager.import_rewrite(&reference.unit).add_import(destination.qualify(&ty.path));
            }
        }
    }
}

/// Types of the old namespace the moved file uses by simple name now need
/// an import.
fn add_imports_to_source_namespace_types(
    ctx: &ReorgContext<'_>,
    unit: &UnitId,
    moved: &[UnitId],
    manager: &mut TextChangeManager,
    monitor: &mut dyn ProgressMonitor,
) -> Result<(), ReorgError> {
    manager.import_rewrite(unit).filter_implicit = false;
    let Some(text) = ctx.model.unit_text(unit) else { return Ok(()) };
    let scope = SearchScope::Files(vec![unit.path()]);
    for fragment in ctx.model.fragments(&unit.namespace.name) {
        for sibling in ctx.model.units(&fragment) {
            if moved.contains(&sibling) {
                continue;
            }
            for ty in ctx.model.top_level_types(&sibling) {
                if !text.contains(ty.id.path.as_str()) {
                    continue;
                }
                checkpoint(monitor)?;
                let qualified = ty.id.qualified_type_name();
                let raw = ctx.search.find(&SearchPattern::type_references(&qualified), &scope)?;
                let uses_simple_name = raw.iter().any(|found| {
                    !found.binary
                        && found.enclosing_import.is_none()
                        && found.range.length == ty.id.path.len()
                });
                if uses_simple_name {
                    manager.import_rewrite(unit).add_import(qualified);
                }
            }
        }
    }
    Ok(())
}

/// Imports of destination types become redundant once the file lives
/// next to them.
fn remove_imports_to_destination_types(
    model: &dyn SourceModel,
    unit: &UnitId,
    destination: &NamespaceId,
    manager: &mut TextChangeManager,
) {
    for info in model.imports(unit) {
        let import = ImportName::from_declaration_path(&info.id.path);
        if !import.is_static && !import.is_on_demand() && import.container() == destination.name {
            manager.import_rewrite(unit).remove(import);
        }
    }
}
