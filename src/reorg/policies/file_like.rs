//! Moving and copying files, folders and source files into a container.
//!
//! Source files moved into a namespace get their namespace declaration
//! retargeted; with reference updates on, every file that names their types
//! is fixed up as well. Copies into another namespace are written as new
//! files with the adjusted content.

use super::{change_name, may_change_source, retargeted_unit_text};
use crate::change::{Change, ResourceChange, TextChangeManager};
use crate::domain::{
    Destination, Element, Location, NamespaceId, ReorgMode, ResourcePath, SelectionItem, UnitId,
};
use crate::error::ReorgError;
use crate::reorg::conflicts::{ConflictResolver, Resolution};
use crate::reorg::destination::{resolve_container, verify_common, ContainerTarget};
use crate::reorg::log::ExecutionLog;
use crate::reorg::policy::{prepared_change, PolicyData, PolicyState, ReorgContext, ReorgPolicy};
use crate::reorg::qualified::QualifiedNameUpdates;
use crate::reorg::references::{update_references, GROUP_UPDATE_NAMESPACE};
use crate::services::{checkpoint, ConflictQueries, EditOp, ProgressMonitor, SourceModel};
use crate::status::{Status, Validation};

#[derive(Debug)]
pub struct FileLikePolicy {
    data: PolicyData,
    prepared: Option<Change>,
    qualified: Option<QualifiedNameUpdates>,
    /// Sources that leave their folder; qualified-name edits skip them.
    moved_paths: Vec<ResourcePath>,
}

impl FileLikePolicy {
    pub fn new(mode: ReorgMode, items: &[SelectionItem]) -> Self {
        Self { data: PolicyData::new(mode, items), prepared: None, qualified: None, moved_paths: Vec::new() }
    }

    fn units(&self) -> Vec<&UnitId> {
        self.data
            .elements
            .iter()
            .filter_map(|element| match element {
                Element::SourceFile(unit) => Some(unit),
                _ => None,
            })
            .collect()
    }

    fn container(&self, model: &dyn SourceModel) -> Result<ContainerTarget, ReorgError> {
        let destination = self.data.destination()?;
        resolve_container(model, &destination.target).ok_or_else(|| {
            ReorgError::fatal(format!("'{}' cannot contain files.", destination.target.label()))
        })
    }
}

/// `(old, new)` qualified names of the top-level types of `moved`.
fn type_renames(model: &dyn SourceModel, moved: &[UnitId], namespace: &NamespaceId) -> Vec<(String, String)> {
    moved
        .iter()
        .flat_map(|unit| model.top_level_types(unit))
        .map(|ty| (ty.id.qualified_type_name(), namespace.qualify(&ty.id.path)))
        .collect()
}

impl ReorgPolicy for FileLikePolicy {
    fn policy_id(&self) -> &'static str {
        match self.data.mode {
            ReorgMode::Move => "moveResources",
            ReorgMode::Copy => "copyResources",
        }
    }

    fn data(&self) -> &PolicyData {
        &self.data
    }

    fn data_mut(&mut self) -> &mut PolicyData {
        &mut self.data
    }

    fn can_enable(&self, model: &dyn SourceModel) -> bool {
        if !self.data.all_exist(model) {
            return false;
        }
        let items = self.data.items();
        if items.iter().any(|item| model.item_is_archive(item)) {
            return false;
        }
        !(self.data.mode == ReorgMode::Move && items.iter().all(|item| model.item_is_read_only(item)))
    }

    fn verify_destination(&self, model: &dyn SourceModel, destination: &Destination) -> Validation {
        let validation = verify_common(model, &self.data.items(), destination, true);
        if !validation.is_ok() {
            return validation;
        }
        if destination.location != Location::On {
            return Validation::fatal("Files can only be placed into a folder.");
        }
        if resolve_container(model, &destination.target).is_none() {
            return Validation::fatal(format!("'{}' cannot contain files.", destination.target.label()));
        }
        Validation::Ok
    }

    fn can_update_references(&self) -> bool {
        self.data.mode == ReorgMode::Move && !self.units().is_empty()
    }

    fn can_update_qualified_names(&self) -> bool {
        self.can_update_references()
    }

    fn check_final_conditions(
        &mut self,
        ctx: &ReorgContext<'_>,
        log: &mut ExecutionLog,
        queries: &mut dyn ConflictQueries,
        monitor: &mut dyn ProgressMonitor,
    ) -> Result<Status, ReorgError> {
        let model = ctx.model;
        let mode = self.data.mode;
        let container = self.container(model)?;
        let folder = container.folder.clone();
        let items = self.data.items();
        monitor.begin_task("Checking files", items.len());

        let mut status = Status::ok();
        let mut resolver = ConflictResolver::new(mode);
        let mut manager = TextChangeManager::new();
        let mut resources: Vec<Change> = Vec::new();
        let mut moved_units: Vec<UnitId> = Vec::new();
        self.moved_paths.clear();

        for item in &items {
            checkpoint(monitor)?;
            monitor.sub_task(&item.label());
            let Some(source) = model.backing_resource(item) else { continue };
            if !may_change_source(model, mode, item, &mut resolver, queries)? {
                continue;
            }
            let unit = match item {
                SelectionItem::Element(Element::SourceFile(unit)) => Some(unit),
                _ => None,
            };
            let name = item.name().to_string();
            let into_namespace = unit.is_some() && container.namespace.is_some();
            let resolution = resolver.resolve(
                item,
                &folder.to_string(),
                |candidate| model.resource_kind(&folder.join(candidate)).is_some(),
                |proposer| {
                    if into_namespace {
                        proposer.unit_name(model, &name, &folder)
                    } else {
                        proposer.resource_name(model, &name, &folder)
                    }
                },
                queries,
                log,
            )?;
            let Resolution::Write { new_name, overwrite } = resolution else { continue };
            let target_name = new_name.clone().unwrap_or_else(|| name.clone());
            if overwrite {
                resources.push(Change::Resource(ResourceChange::Delete { path: folder.join(&target_name) }));
            }

            match mode {
                ReorgMode::Move => {
                    resources.push(Change::Resource(ResourceChange::Move {
                        source: source.clone(),
                        destination: folder.clone(),
                        new_name,
                    }));
                    self.moved_paths.push(source);
                    match unit {
                        Some(unit) if container.namespace.is_some() => moved_units.push(unit.clone()),
                        Some(unit) if self.data.update_references => {
                            tracing::warn!("{} leaves its source folder; references are not updated", unit.name);
                            status.add_warning(format!(
                                "References to '{}' are not updated because the destination is not a namespace.",
                                unit.name
                            ));
                        }
                        _ => {}
                    }
                }
                ReorgMode::Copy => {
                    let retarget = match (unit, &container.namespace) {
                        (Some(unit), Some(namespace))
                            if new_name.is_some() || !unit.namespace.is_same_namespace(namespace) =>
                        {
                            Some(retargeted_unit_text(ctx, unit, &namespace.name, new_name.as_deref())?)
                        }
                        _ => None,
                    };
                    resources.push(Change::Resource(match retarget {
                        Some(content) => ResourceChange::CreateFile { path: folder.join(&target_name), content },
                        None => ResourceChange::Copy { source, destination: folder.clone(), new_name },
                    }));
                }
            }
            monitor.worked(1);
        }

        if let Some(namespace) = &container.namespace {
            if self.data.update_references {
                status.merge(update_references(ctx, &moved_units, namespace, &mut manager, monitor)?);
            } else {
                for unit in moved_units.iter().filter(|unit| !unit.namespace.is_same_namespace(namespace)) {
                    let edits = ctx.rewrite.create_edits(unit, &EditOp::SetNamespace(namespace.name.clone()))?;
                    manager.add_edits(&unit.path(), GROUP_UPDATE_NAMESPACE, edits);
                }
            }
        }

        self.qualified = None;
        if mode == ReorgMode::Move && self.data.update_qualified_names && !self.units().is_empty() {
            match &container.namespace {
                Some(namespace) => {
                    let renames = type_renames(model, &moved_units, namespace);
                    self.qualified =
                        Some(QualifiedNameUpdates::collect(model, &self.data.file_patterns, &renames, monitor)?);
                }
                None => status.add_warning("Qualified names cannot be updated outside a source folder."),
            }
        }

        let mut children: Vec<Change> =
            manager.into_changes(model, ctx.rewrite)?.into_iter().map(Change::Text).collect();
        children.extend(resources);
        if children.is_empty() {
            status.add_info("Nothing to do: every item was skipped.");
        }
        self.prepared = Some(Change::composite(change_name(mode, items.len()), children));
        self.data.state = PolicyState::ConditionsChecked;
        monitor.done();
        Ok(status)
    }

    fn create_change(
        &mut self,
        _ctx: &ReorgContext<'_>,
        _monitor: &mut dyn ProgressMonitor,
    ) -> Result<Change, ReorgError> {
        let change = prepared_change(&self.prepared)?;
        self.data.state = PolicyState::ChangeCreated;
        Ok(change)
    }

    fn post_create_change(
        &mut self,
        _ctx: &ReorgContext<'_>,
        participant_changes: &mut Vec<Change>,
        _monitor: &mut dyn ProgressMonitor,
    ) -> Result<Option<Change>, ReorgError> {
        let Some(mut updates) = self.qualified.take() else { return Ok(None) };
        updates.exclude(&self.moved_paths);
        let rest: Vec<Change> = updates.merge_into(participant_changes).into_iter().map(Change::Text).collect();
        if rest.is_empty() {
            return Ok(None);
        }
        Ok(Some(Change::composite("Update fully qualified names", rest)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{ChangePerformer, ConflictChoice, FixedQueries, NullProgressMonitor};
    use crate::workspace::test_support::workspace;
    use crate::workspace::FsChangePerformer;
    use std::fs;

    fn item(handle: &str) -> SelectionItem {
        handle.parse().expect("handle")
    }

    fn prepare(
        ws: &crate::workspace::Workspace,
        policy: &mut FileLikePolicy,
        target: &str,
        queries: &mut FixedQueries,
    ) -> (Status, Change) {
        assert!(policy.set_destination(ws, Destination::on(item(target))).is_ok());
        let ctx = ReorgContext::from_backend(ws);
        let mut monitor = NullProgressMonitor::default();
        let status = policy
            .check_final_conditions(&ctx, &mut ExecutionLog::new(), queries, &mut monitor)
            .expect("conditions");
        let change = policy.create_change(&ctx, &mut monitor).expect("change");
        (status, change)
    }

    #[test]
    fn moving_without_reference_updates_only_retargets_the_file() {
        let bar = "package pkg.a;\n\npublic class Bar {\n    Foo foo;\n}\n";
        let (tmp, ws) = workspace(&[
            ("src/pkg/a/Foo.java", "package pkg.a;\n\npublic class Foo {}\n"),
            ("src/pkg/a/Bar.java", bar),
            ("src/pkg/b/Baz.java", "package pkg.b;\nclass Baz {}\n"),
        ]);
        let mut policy = FileLikePolicy::new(ReorgMode::Move, &[item("=src<pkg.a{Foo.java")]);
        policy.data_mut().update_references = false;
        let (status, change) = prepare(&ws, &mut policy, "=src<pkg.b", &mut FixedQueries::yes());
        assert!(status.is_ok());
        FsChangePerformer::new(tmp.path()).perform(&change).expect("perform");

        let moved = fs::read_to_string(tmp.path().join("src/pkg/b/Foo.java")).expect("moved");
        assert_eq!(moved, "package pkg.b;\n\npublic class Foo {}\n");
        assert!(!tmp.path().join("src/pkg/a/Foo.java").exists());
        assert_eq!(fs::read_to_string(tmp.path().join("src/pkg/a/Bar.java")).expect("bar"), bar);
    }

    #[test]
    fn copy_over_a_taken_name_renames_the_type() {
        let (tmp, ws) = workspace(&[
            ("src/pkg/a/Foo.java", "package pkg.a;\n\npublic class Foo {\n    Foo() {}\n}\n"),
            ("src/pkg/b/Foo.java", "package pkg.b;\nclass Foo {}\n"),
        ]);
        let foo = item("=src<pkg.a{Foo.java");
        let mut policy = FileLikePolicy::new(ReorgMode::Copy, &[foo.clone()]);
        let mut queries = FixedQueries::new(true, ConflictChoice::Rename);
        assert!(policy.set_destination(&ws, Destination::on(item("=src<pkg.b"))).is_ok());

        let ctx = ReorgContext::from_backend(&ws);
        let mut monitor = NullProgressMonitor::default();
        let mut log = ExecutionLog::new();
        policy.check_final_conditions(&ctx, &mut log, &mut queries, &mut monitor).expect("conditions");
        let change = policy.create_change(&ctx, &mut monitor).expect("change");
        assert_eq!(queries.prompt_count(), 1);
        FsChangePerformer::new(tmp.path()).perform(&change).expect("perform");

        let copy = fs::read_to_string(tmp.path().join("src/pkg/b/CopyOfFoo.java")).expect("copy");
        insta::assert_snapshot!(copy, @r###"
        package pkg.b;

        public class CopyOfFoo {
            CopyOfFoo() {}
        }
        "###);
        assert_eq!(log.new_name(&foo), Some("CopyOfFoo.java"));
        assert!(tmp.path().join("src/pkg/a/Foo.java").exists());
    }

    #[test]
    fn skipped_conflicts_leave_an_empty_change() {
        let (_tmp, ws) = workspace(&[("docs/readme.txt", "a"), ("other/readme.txt", "b")]);
        let mut policy = FileLikePolicy::new(ReorgMode::Move, &[item("/docs/readme.txt")]);
        let mut queries = FixedQueries::new(true, ConflictChoice::Skip);
        let (status, change) = prepare(&ws, &mut policy, "/other", &mut queries);
        assert!(change.is_empty());
        assert_eq!(queries.prompt_count(), 1);
        assert!(!status.has_error());
    }

    #[test]
    fn plain_copies_get_copy_of_names() {
        let (tmp, ws) = workspace(&[("docs/readme.txt", "a"), ("other/readme.txt", "b")]);
        let mut policy = FileLikePolicy::new(ReorgMode::Copy, &[item("/docs/readme.txt")]);
        let mut queries = FixedQueries::new(true, ConflictChoice::Rename);
        let (_, change) = prepare(&ws, &mut policy, "/other", &mut queries);
        FsChangePerformer::new(tmp.path()).perform(&change).expect("perform");
        assert_eq!(fs::read_to_string(tmp.path().join("other/Copy of readme.txt")).expect("copy"), "a");
        assert_eq!(fs::read_to_string(tmp.path().join("other/readme.txt")).expect("kept"), "b");
    }

    #[test]
    fn destination_must_be_a_container() {
        let (_tmp, ws) = workspace(&[("docs/readme.txt", "a"), ("docs/notes.txt", "b"), ("other/x.txt", "c")]);
        let policy = FileLikePolicy::new(ReorgMode::Move, &[item("/docs/readme.txt")]);
        assert!(!policy.verify_destination(&ws, &Destination::on(item("/docs/notes.txt"))).is_ok());
        assert!(policy.verify_destination(&ws, &Destination::on(item("/other"))).is_ok());
        assert!(policy
            .verify_destination(&ws, &Destination::on(SelectionItem::resource(ResourcePath::root())))
            .is_ok());
    }
}
