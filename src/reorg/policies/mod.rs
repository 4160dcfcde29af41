//! One policy per selection granularity.

pub mod file_like;
pub mod import;
pub mod member;
pub mod namespace;
pub mod null;
pub mod source_root;
pub mod sub_file;

pub use file_like::FileLikePolicy;
pub use import::ImportMovePolicy;
pub use member::MemberMovePolicy;
pub use namespace::NamespacePolicy;
pub use null::NullPolicy;
pub use source_root::SourceRootPolicy;
pub use sub_file::SubFileCopyPolicy;

use super::conflicts::ConflictResolver;
use super::policy::ReorgContext;
use crate::change::{apply_edits, Change, ResourceChange};
use crate::domain::{ReorgMode, ResourcePath, SelectionItem, UnitId};
use crate::error::ReorgError;
use crate::services::{ConflictQueries, EditOp, SourceModel};
use crate::utils::strip_extension;

/// Name of the composite a policy builds.
pub(crate) fn change_name(mode: ReorgMode, count: usize) -> String {
    let verb = match mode {
        ReorgMode::Move => "Move",
        ReorgMode::Copy => "Copy",
    };
    match count {
        1 => format!("{verb} 1 element"),
        n => format!("{verb} {n} elements"),
    }
}

/// Whether a source about to be moved may be touched. Read-only sources
/// are confirmed once per item (or once for all of them); copies never ask.
pub(crate) fn may_change_source(
    model: &dyn SourceModel,
    mode: ReorgMode,
    item: &SelectionItem,
    resolver: &mut ConflictResolver,
    queries: &mut dyn ConflictQueries,
) -> Result<bool, ReorgError> {
    if mode == ReorgMode::Copy || !model.item_is_read_only(item) {
        return Ok(true);
    }
    let allowed = resolver.confirm_read_only(item, queries)?;
    if !allowed {
        tracing::debug!("Leaving read-only {} in place", item.label());
    }
    Ok(allowed)
}

/// `CreateFolder` changes for every missing folder from `base` down to
/// `folder`, skipping the ones already planned.
pub(crate) fn create_folder_chain(
    model: &dyn SourceModel,
    base: &ResourcePath,
    folder: &ResourcePath,
    planned: &mut Vec<ResourcePath>,
) -> Vec<Change> {
    let mut missing = Vec::new();
    let mut current = Some(folder.clone());
    while let Some(path) = current {
        if !path.is_descendant_of(base) || model.resource_kind(&path).is_some() {
            break;
        }
        current = path.parent();
        if !planned.contains(&path) {
            missing.push(path);
        }
    }
    missing.reverse();
    planned.extend(missing.iter().cloned());
    missing
        .into_iter()
        .map(|path| Change::Resource(ResourceChange::CreateFolder { path }))
        .collect()
}

/// Content of `unit` once copied into `namespace` as `new_name`: the
/// namespace declaration is retargeted and the primary type renamed.
pub(crate) fn retargeted_unit_text(
    ctx: &ReorgContext<'_>,
    unit: &UnitId,
    namespace: &str,
    new_name: Option<&str>,
) -> Result<String, ReorgError> {
    let text = ctx
        .model
        .unit_text(unit)
        .ok_or_else(|| ReorgError::fatal(format!("'{}' cannot be read.", unit.name)))?;
    let mut edits = Vec::new();
    if unit.namespace.name != namespace {
        edits.extend(ctx.rewrite.create_edits(unit, &EditOp::SetNamespace(namespace.to_string()))?);
    }
    if let Some(new_name) = new_name {
        let old = unit.primary_type_name();
        let new = strip_extension(new_name);
        let declared = ctx.model.top_level_types(unit).iter().any(|info| info.id.path == old);
        if declared && old != new {
            let rename = EditOp::RenameType { path: old.to_string(), new_name: new.to_string() };
            edits.extend(ctx.rewrite.create_edits(unit, &rename)?);
        }
    }
    let (content, _) = apply_edits(text, &edits)
        .map_err(|err| ReorgError::fatal(format!("Cannot copy '{}': {err}", unit.name)))?;
    Ok(content)
}
