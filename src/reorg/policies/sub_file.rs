//! Declarations moved or copied as text: members, nested and top-level
//! types, imports.
//!
//! A declaration's source text is cut out at its range (doc comment
//! included), dedented and inserted at the destination. Imports the text
//! needs are added to the destination file. Moves within one file end up
//! in a single text change.

use super::{change_name, may_change_source};
use crate::change::{Change, ImportName, ResourceChange, TextChangeManager};
use crate::domain::{
    DeclarationId, DeclarationInfo, DeclarationKind, Destination, Element, Location, ReorgMode,
    SelectionItem, UnitId,
};
use crate::error::ReorgError;
use crate::reorg::conflicts::{ConflictResolver, Resolution};
use crate::reorg::destination::verify_common;
use crate::reorg::log::ExecutionLog;
use crate::reorg::policy::{prepared_change, PolicyData, PolicyState, ReorgContext, ReorgPolicy};
use crate::services::{
    checkpoint, ConflictQueries, EditOp, InsertAnchor, ProgressMonitor, SourceModel,
};
use crate::status::{Status, Validation};
use crate::utils::indent::{dedent, line_indent, reindent};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet, HashSet};

pub const GROUP_INSERT_DECLARATIONS: &str = "Insert declarations";
pub const GROUP_REMOVE_DECLARATIONS: &str = "Remove moved declarations";

static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\p{L}_$][\p{L}\p{N}_$]*").expect("identifier regex is valid"));

/// Where one selected declaration lands.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Slot {
    /// The import block of the destination file.
    Import,
    /// `scope` is the enclosing type, `None` for the top level.
    Declaration { anchor: InsertAnchor, scope: Option<DeclarationId> },
}

#[derive(Debug)]
struct Placement {
    unit: UnitId,
    slots: Vec<(DeclarationId, Slot)>,
}

fn primary_type(model: &dyn SourceModel, unit: &UnitId) -> Option<DeclarationId> {
    let types = model.top_level_types(unit);
    types
        .iter()
        .find(|info| info.id.path == unit.primary_type_name())
        .or_else(|| types.first())
        .map(|info| info.id.clone())
}

fn beside(target: &DeclarationId, location: Location) -> InsertAnchor {
    match location {
        Location::Before => InsertAnchor::Before(target.clone()),
        Location::After | Location::On => InsertAnchor::After(target.clone()),
    }
}

/// Where every item goes for `destination`, or why it cannot go there.
fn placement(
    model: &dyn SourceModel,
    items: &[DeclarationId],
    destination: &Destination,
) -> Result<Placement, String> {
    let (unit, target) = match &destination.target {
        SelectionItem::Element(Element::SourceFile(unit)) => (unit.clone(), None),
        SelectionItem::Element(Element::Declaration(decl)) => (decl.unit.clone(), Some(decl)),
        other => {
            return Err(format!(
                "'{}' cannot hold declarations; choose a source file or a declaration.",
                other.label()
            ))
        }
    };
    let location = destination.location;
    let mut slots = Vec::with_capacity(items.len());
    for item in items {
        let is_import = item.kind == DeclarationKind::Import;
        let slot = match target {
            None if is_import => Slot::Import,
            None if item.kind == DeclarationKind::Type => {
                Slot::Declaration { anchor: InsertAnchor::EndOfUnit, scope: None }
            }
            None => {
                let ty = primary_type(model, &unit).ok_or_else(|| {
                    format!("'{}' declares no type that could hold '{}'.", unit.name, item.simple_name())
                })?;
                Slot::Declaration { anchor: InsertAnchor::IntoType(ty.clone()), scope: Some(ty) }
            }
            Some(target) => match target.kind {
                DeclarationKind::NamespaceDeclaration => {
                    return Err("Nothing can be placed at a namespace declaration.".to_string())
                }
                DeclarationKind::Import => {
                    if location == Location::On {
                        return Err(format!("'{}' cannot contain declarations.", target.path));
                    }
                    if !is_import {
                        return Err("Only imports can be placed next to an import.".to_string());
                    }
                    Slot::Import
                }
                DeclarationKind::Field | DeclarationKind::Method | DeclarationKind::Initializer => {
                    if location == Location::On {
                        return Err(format!("'{}' cannot contain declarations.", target.path));
                    }
                    if is_import {
                        return Err("Imports cannot be placed next to a member.".to_string());
                    }
                    Slot::Declaration { anchor: beside(target, location), scope: target.parent_type() }
                }
                DeclarationKind::Type if location == Location::On => {
                    if is_import {
                        Slot::Import
                    } else {
                        Slot::Declaration {
                            anchor: InsertAnchor::IntoType(target.clone()),
                            scope: Some(target.clone()),
                        }
                    }
                }
                DeclarationKind::Type => {
                    if is_import {
                        return Err("Imports cannot be placed next to a type.".to_string());
                    }
                    if target.is_top_level_type() && item.kind != DeclarationKind::Type {
                        return Err(format!(
                            "Only types can be placed next to the top-level type '{}'.",
                            target.path
                        ));
                    }
                    Slot::Declaration { anchor: beside(target, location), scope: target.parent_type() }
                }
            },
        };
        slots.push((item.clone(), slot));
    }
    Ok(Placement { unit, slots })
}

/// Declarations that share `decl`'s parent, in source order.
fn siblings(model: &dyn SourceModel, decl: &DeclarationId) -> Vec<DeclarationId> {
    let is_import = decl.kind == DeclarationKind::Import;
    model
        .declarations(&decl.unit)
        .into_iter()
        .map(|info| info.id)
        .filter(|id| {
            id.kind != DeclarationKind::NamespaceDeclaration
                && (id.kind == DeclarationKind::Import) == is_import
                && id.parent_type_path() == decl.parent_type_path()
        })
        .collect()
}

/// Moving an item right next to where it already is.
fn lands_in_place(model: &dyn SourceModel, items: &[DeclarationId], destination: &Destination) -> bool {
    let SelectionItem::Element(Element::Declaration(target)) = &destination.target else {
        return false;
    };
    if destination.location == Location::On {
        return false;
    }
    let siblings = siblings(model, target);
    let Some(t) = siblings.iter().position(|s| s == target) else { return false };
    items.iter().any(|item| match siblings.iter().position(|s| s == item) {
        Some(idx) => match destination.location {
            Location::After => idx == t + 1,
            Location::Before => idx + 1 == t,
            Location::On => false,
        },
        None => false,
    })
}

/// Parameter list of a method, whitespace removed; empty for other kinds.
fn parameters(text: &str, info: &DeclarationInfo) -> String {
    if info.id.kind != DeclarationKind::Method {
        return String::new();
    }
    let rest = &text[info.name_range.end()..info.range.end()];
    let Some(open) = rest.find('(') else { return String::new() };
    let close = rest[open..].find(')').map_or(rest.len(), |idx| open + idx + 1);
    rest[open..close].chars().filter(|c| !c.is_whitespace()).collect()
}

#[derive(Debug, Clone)]
struct ScopeEntry {
    id: DeclarationId,
    name: String,
    params: String,
}

/// Declarations already present in a destination scope.
fn scope_entries(
    model: &dyn SourceModel,
    unit: &UnitId,
    scope: &Option<DeclarationId>,
    excluded: &[DeclarationId],
) -> Vec<ScopeEntry> {
    let text = model.unit_text(unit).unwrap_or_default();
    let infos = match scope {
        Some(ty) => model.type_members(ty),
        None => model.top_level_types(unit),
    };
    infos
        .into_iter()
        .filter(|info| info.id.kind != DeclarationKind::Initializer && !excluded.contains(&info.id))
        .map(|info| ScopeEntry {
            name: info.id.simple_name().to_string(),
            params: parameters(text, &info),
            id: info.id,
        })
        .collect()
}

fn identifiers(text: &str) -> HashSet<&str> {
    IDENTIFIER.find_iter(text).map(|found| found.as_str()).collect()
}

/// Replace every identifier spelling `old` with `new`.
fn rename_identifier(text: &str, old: &str, new: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for found in IDENTIFIER.find_iter(text).filter(|found| found.as_str() == old) {
        out.push_str(&text[cursor..found.start()]);
        out.push_str(new);
        cursor = found.end();
    }
    out.push_str(&text[cursor..]);
    out
}

/// Imports the destination needs so that `body` still resolves: the
/// source file's single-type imports it uses, all of its on-demand imports,
/// and types of the source namespace it names.
fn required_imports(
    model: &dyn SourceModel,
    source: &UnitId,
    destination: &UnitId,
    body: &str,
    local_types: &HashSet<String>,
) -> Vec<ImportName> {
    if source == destination {
        return Vec::new();
    }
    let used = identifiers(body);
    let mut needed = Vec::new();
    for info in model.imports(source) {
        let import = ImportName::from_declaration_path(&info.id.path);
        if import.is_on_demand() || used.contains(import.simple_name()) {
            needed.push(import);
        }
    }
    let namespace = &source.namespace;
    if namespace.is_same_namespace(&destination.namespace) || namespace.is_default() {
        return needed;
    }
    for fragment in model.fragments(&namespace.name) {
        for unit in model.units(&fragment) {
            for ty in model.top_level_types(&unit) {
                let name = ty.id.path.as_str();
                if used.contains(name) && !local_types.contains(name) {
                    needed.push(ImportName::single(namespace.qualify(name)));
                }
            }
        }
    }
    needed
}

/// Behaviour shared by member moves, import moves and sub-file copies.
#[derive(Debug)]
pub(crate) struct SubFileReorg {
    pub(crate) data: PolicyData,
    prepared: Option<Change>,
}

impl SubFileReorg {
    pub(crate) fn new(mode: ReorgMode, items: &[SelectionItem]) -> Self {
        Self { data: PolicyData::new(mode, items), prepared: None }
    }

    fn declarations(&self) -> Vec<DeclarationId> {
        self.data.elements.iter().filter_map(|e| e.as_declaration().cloned()).collect()
    }

    pub(crate) fn can_enable(&self, model: &dyn SourceModel) -> bool {
        if !self.data.all_exist(model) {
            return false;
        }
        let items = self.data.items();
        if items.iter().any(|item| model.item_is_archive(item) || !model.item_structure_known(item)) {
            return false;
        }
        !(self.data.mode == ReorgMode::Move && items.iter().all(|item| model.item_is_read_only(item)))
    }

    pub(crate) fn verify_destination(&self, model: &dyn SourceModel, destination: &Destination) -> Validation {
        let validation = verify_common(model, &self.data.items(), destination, false);
        if !validation.is_ok() {
            return validation;
        }
        let items = self.declarations();
        if let Err(reason) = placement(model, &items, destination) {
            return Validation::fatal(reason);
        }
        if self.data.mode == ReorgMode::Move && lands_in_place(model, &items, destination) {
            return Validation::fatal("The declarations would stay where they are.");
        }
        Validation::Ok
    }

    pub(crate) fn check_final_conditions(
        &mut self,
        ctx: &ReorgContext<'_>,
        log: &mut ExecutionLog,
        queries: &mut dyn ConflictQueries,
        monitor: &mut dyn ProgressMonitor,
    ) -> Result<Status, ReorgError> {
        let model = ctx.model;
        let mode = self.data.mode;
        let destination = self.data.destination()?.clone();
        let items = self.declarations();
        let placement = placement(model, &items, &destination).map_err(ReorgError::Fatal)?;
        let dest_unit = placement.unit.clone();
        let dest_path = dest_unit.path();
        let dest_text = model
            .unit_text(&dest_unit)
            .ok_or_else(|| ReorgError::fatal(format!("'{}' cannot be read.", dest_unit.name)))?;
        monitor.begin_task("Checking declarations", items.len());

        let excluded: Vec<DeclarationId> = match mode {
            ReorgMode::Move => items.clone(),
            ReorgMode::Copy => Vec::new(),
        };
        let mut local_types: HashSet<String> =
            model.top_level_types(&dest_unit).into_iter().map(|info| info.id.path).collect();
        local_types.extend(items.iter().filter(|id| id.is_top_level_type()).map(|id| id.path.clone()));

        let mut status = Status::ok();
        let mut resolver = ConflictResolver::new(mode);
        let mut manager = TextChangeManager::new();
        let mut inserts: Vec<(InsertAnchor, Vec<String>)> = Vec::new();
        let mut removals: BTreeMap<UnitId, Vec<DeclarationId>> = BTreeMap::new();
        let mut needed_imports: BTreeSet<ImportName> = BTreeSet::new();
        let mut crosses_units = false;

        for (id, slot) in &placement.slots {
            checkpoint(monitor)?;
            monitor.sub_task(&id.path);
            let item = SelectionItem::Element(Element::Declaration(id.clone()));
            let info = model
                .declaration(id)
                .ok_or_else(|| ReorgError::fatal(format!("'{}' no longer exists.", id.path)))?;
            let source_text = model
                .unit_text(&id.unit)
                .ok_or_else(|| ReorgError::fatal(format!("'{}' cannot be read.", id.unit.name)))?;
            if !may_change_source(model, mode, &item, &mut resolver, queries)? {
                continue;
            }

            match slot {
                Slot::Import => {
                    let import = ImportName::from_declaration_path(&id.path);
                    let name = id.path.clone();
                    let resolution =
                        resolver.resolve(&item, &dest_unit.name, |_| false, |_| name, queries, log)?;
                    if resolution.is_skip() {
                        continue;
                    }
                    if mode == ReorgMode::Move {
                        removals.entry(id.unit.clone()).or_default().push(id.clone());
                    }
                    needed_imports.insert(import);
                }
                Slot::Declaration { anchor, scope } => {
                    let entries = scope_entries(model, &dest_unit, scope, &excluded);
                    let params = parameters(source_text, &info);
                    let kind = id.kind;
                    let name = id.simple_name().to_string();
                    let is_type = kind == DeclarationKind::Type;
                    let taken = |candidate: &str| {
                        kind != DeclarationKind::Initializer
                            && entries.iter().any(|entry| {
                                entry.id.kind == kind
                                    && entry.name == candidate
                                    && (kind != DeclarationKind::Method || entry.params == params)
                            })
                    };
                    let existing_names: Vec<String> = entries.iter().map(|entry| entry.name.clone()).collect();
                    let scope_key = format!(
                        "{}#{}",
                        dest_path,
                        scope.as_ref().map(|ty| ty.path.as_str()).unwrap_or_default()
                    );
                    let label = scope.as_ref().map_or_else(|| dest_unit.name.clone(), |ty| ty.path.clone());
                    let resolution = resolver.resolve(
                        &item,
                        &label,
                        taken,
                        |proposer| proposer.declaration_name(&scope_key, &name, is_type, &existing_names),
                        queries,
                        log,
                    )?;
                    let Resolution::Write { new_name, overwrite } = resolution else { continue };

                    let mut raw = info.text(source_text).to_string();
                    if let Some(new_name) = &new_name {
                        raw = if is_type {
                            rename_identifier(&raw, &name, new_name)
                        } else {
                            let start = info.name_range.offset - info.range.offset;
                            format!("{}{new_name}{}", &raw[..start], &raw[start + info.name_range.length..])
                        };
                        if is_type {
                            local_types.insert(new_name.clone());
                        }
                    }
                    let body = dedent(&raw, &line_indent(source_text, info.range.offset));
                    needed_imports.extend(required_imports(model, &id.unit, &dest_unit, &body, &local_types));

                    let replaced = overwrite
                        .then(|| {
                            let target = new_name.as_deref().unwrap_or(&name);
                            entries.iter().find(|entry| entry.id.kind == kind && entry.name == target)
                        })
                        .flatten();
                    match replaced.and_then(|entry| model.declaration(&entry.id)) {
                        Some(existing) => {
                            let indent = line_indent(dest_text, existing.range.offset);
                            let op = EditOp::Replace { declaration: existing.id, text: reindent(&body, &indent) };
                            manager.add_edits(&dest_path, GROUP_INSERT_DECLARATIONS, ctx.rewrite.create_edits(&dest_unit, &op)?);
                        }
                        None => match inserts.iter_mut().find(|(a, _)| a == anchor) {
                            Some((_, bodies)) => bodies.push(body),
                            None => inserts.push((anchor.clone(), vec![body])),
                        },
                    }
                    if mode == ReorgMode::Move {
                        removals.entry(id.unit.clone()).or_default().push(id.clone());
                    }
                }
            }
            crosses_units |= id.unit != dest_unit;
            monitor.worked(1);
        }

        for (anchor, bodies) in inserts {
            let op = EditOp::Insert { anchor, text: bodies.join("\n\n") };
            manager.add_edits(&dest_path, GROUP_INSERT_DECLARATIONS, ctx.rewrite.create_edits(&dest_unit, &op)?);
        }
        if !needed_imports.is_empty() {
            let imports = manager.import_rewrite(&dest_unit);
            for import in needed_imports {
                imports.add(import);
            }
        }

        let mut deleted = Vec::new();
        for (unit, removed) in removals {
            let types = model.top_level_types(&unit);
            let emptied = unit != dest_unit
                && !types.is_empty()
                && types.iter().all(|info| removed.contains(&info.id));
            if emptied {
                tracing::debug!("{} loses all of its types and is deleted", unit.name);
                deleted.push(Change::Resource(ResourceChange::Delete { path: unit.path() }));
                continue;
            }
            for id in removed {
                if id.kind == DeclarationKind::Import {
                    manager.import_rewrite(&unit).remove(ImportName::from_declaration_path(&id.path));
                } else {
                    let edits = ctx.rewrite.create_edits(&unit, &EditOp::Remove(id))?;
                    manager.add_edits(&unit.path(), GROUP_REMOVE_DECLARATIONS, edits);
                }
            }
        }
        if mode == ReorgMode::Move && crosses_units && items.iter().any(|id| id.kind != DeclarationKind::Import) {
            status.add_info("References to the moved declarations are not updated.");
        }

        let mut children: Vec<Change> =
            manager.into_changes(model, ctx.rewrite)?.into_iter().map(Change::Text).collect();
        children.extend(deleted);
        if children.is_empty() {
            status.add_info("Nothing to do: every declaration was skipped.");
        }
        self.prepared = Some(Change::composite(change_name(mode, items.len()), children));
        self.data.state = PolicyState::ConditionsChecked;
        monitor.done();
        Ok(status)
    }

    pub(crate) fn create_change(&mut self) -> Result<Change, ReorgError> {
        let change = prepared_change(&self.prepared)?;
        self.data.state = PolicyState::ChangeCreated;
        Ok(change)
    }
}

/// Copies declarations of any kind but namespace declarations.
#[derive(Debug)]
pub struct SubFileCopyPolicy {
    core: SubFileReorg,
}

impl SubFileCopyPolicy {
    pub fn new(items: &[SelectionItem]) -> Self {
        Self { core: SubFileReorg::new(ReorgMode::Copy, items) }
    }
}

impl ReorgPolicy for SubFileCopyPolicy {
    fn policy_id(&self) -> &'static str {
        "copyMembers"
    }

    fn data(&self) -> &PolicyData {
        &self.core.data
    }

    fn data_mut(&mut self) -> &mut PolicyData {
        &mut self.core.data
    }

    fn can_enable(&self, model: &dyn SourceModel) -> bool {
        self.core.can_enable(model)
    }

    fn verify_destination(&self, model: &dyn SourceModel, destination: &Destination) -> Validation {
        self.core.verify_destination(model, destination)
    }

    fn check_final_conditions(
        &mut self,
        ctx: &ReorgContext<'_>,
        log: &mut ExecutionLog,
        queries: &mut dyn ConflictQueries,
        monitor: &mut dyn ProgressMonitor,
    ) -> Result<Status, ReorgError> {
        self.core.check_final_conditions(ctx, log, queries, monitor)
    }

    fn create_change(
        &mut self,
        _ctx: &ReorgContext<'_>,
        _monitor: &mut dyn ProgressMonitor,
    ) -> Result<Change, ReorgError> {
        self.core.create_change()
    }
}
