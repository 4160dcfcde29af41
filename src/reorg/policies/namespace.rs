//! Moving and copying whole namespaces between source roots.
//!
//! A namespace owns only the files directly inside its folder; nested
//! namespaces stay where they are. Moving keeps the dotted name, so no
//! reference changes.

use super::{change_name, create_folder_chain, may_change_source, retargeted_unit_text};
use crate::change::{Change, ResourceChange};
use crate::domain::{Destination, Element, Location, NamespaceId, ReorgMode, ResourcePath, SelectionItem};
use crate::error::ReorgError;
use crate::reorg::conflicts::{ConflictResolver, Resolution};
use crate::reorg::destination::verify_common;
use crate::reorg::log::ExecutionLog;
use crate::reorg::policy::{prepared_change, PolicyData, PolicyState, ReorgContext, ReorgPolicy};
use crate::services::{checkpoint, ConflictQueries, ProgressMonitor, ResourceKind, SourceModel};
use crate::status::{Status, Validation};

#[derive(Debug)]
pub struct NamespacePolicy {
    data: PolicyData,
    prepared: Option<Change>,
}

impl NamespacePolicy {
    pub fn new(mode: ReorgMode, items: &[SelectionItem]) -> Self {
        Self { data: PolicyData::new(mode, items), prepared: None }
    }

    fn namespaces(&self) -> impl Iterator<Item = &NamespaceId> {
        self.data.elements.iter().filter_map(|element| match element {
            Element::Namespace(ns) => Some(ns),
            _ => None,
        })
    }
}

/// The source root a destination names, directly or through its folder.
fn destination_root(model: &dyn SourceModel, target: &SelectionItem) -> Option<ResourcePath> {
    match target {
        SelectionItem::Element(Element::SourceRoot { path }) => Some(path.clone()),
        SelectionItem::Resource { path } => match model.element_for_resource(path)? {
            Element::SourceRoot { path } => Some(path),
            _ => None,
        },
        SelectionItem::Element(_) => None,
    }
}

fn files_of(model: &dyn SourceModel, folder: &ResourcePath) -> (Vec<ResourcePath>, bool) {
    let mut files = Vec::new();
    let mut has_folders = false;
    for member in model.members(folder) {
        match model.resource_kind(&member) {
            Some(ResourceKind::File) => files.push(member),
            Some(_) => has_folders = true,
            None => {}
        }
    }
    (files, has_folders)
}

impl ReorgPolicy for NamespacePolicy {
    fn policy_id(&self) -> &'static str {
        match self.data.mode {
            ReorgMode::Move => "moveNamespaces",
            ReorgMode::Copy => "copyNamespaces",
        }
    }

    fn data(&self) -> &PolicyData {
        &self.data
    }

    fn data_mut(&mut self) -> &mut PolicyData {
        &mut self.data
    }

    fn can_enable(&self, model: &dyn SourceModel) -> bool {
        if !self.data.all_exist(model) || self.namespaces().any(NamespaceId::is_default) {
            return false;
        }
        let items = self.data.items();
        if items.iter().any(|item| model.item_is_archive(item)) {
            return false;
        }
        !(self.data.mode == ReorgMode::Move && items.iter().all(|item| model.item_is_read_only(item)))
    }

    fn verify_destination(&self, model: &dyn SourceModel, destination: &Destination) -> Validation {
        let validation = verify_common(model, &self.data.items(), destination, false);
        if !validation.is_ok() {
            return validation;
        }
        if destination.location != Location::On {
            return Validation::fatal("Namespaces can only be placed into a source folder.");
        }
        let Some(root) = destination_root(model, &destination.target) else {
            return Validation::fatal(format!(
                "'{}' is not a source folder.",
                destination.target.label()
            ));
        };
        if self.namespaces().any(|ns| ns.root == root) {
            return Validation::fatal("The namespaces are already in this source folder.");
        }
        Validation::Ok
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
        let target = &self.data.destination()?.target;
        let root = destination_root(model, target)
            .ok_or_else(|| ReorgError::fatal(format!("'{}' is not a source folder.", target.label())))?;
        let items = self.data.items();
        monitor.begin_task("Checking namespaces", items.len());

        let mut status = Status::ok();
        let mut resolver = ConflictResolver::new(mode);
        let mut planned_folders: Vec<ResourcePath> = Vec::new();
        let mut children: Vec<Change> = Vec::new();

        for item in &items {
            checkpoint(monitor)?;
            let SelectionItem::Element(Element::Namespace(ns)) = item else { continue };
            monitor.sub_task(&ns.name);
            if !may_change_source(model, mode, item, &mut resolver, queries)? {
                continue;
            }
            let resolution = resolver.resolve(
                item,
                &root.to_string(),
                |name| model.element_exists(&Element::Namespace(NamespaceId::new(root.clone(), name))),
                |proposer| proposer.namespace_name(model, ns, &root),
                queries,
                log,
            )?;
            let Resolution::Write { new_name, overwrite } = resolution else { continue };
            let target_ns = NamespaceId::new(root.clone(), new_name.as_deref().unwrap_or(&ns.name));
            let target_folder = target_ns.folder();
            let (files, has_subfolders) = files_of(model, &ns.folder());

            if overwrite {
                for file in &files {
                    let existing = target_folder.join(file.name());
                    if model.resource_kind(&existing).is_some() {
                        children.push(Change::Resource(ResourceChange::Delete { path: existing }));
                    }
                }
            }
            children.extend(create_folder_chain(model, &root, &target_folder, &mut planned_folders));

            for file in files {
                let unit = match model.element_for_resource(&file) {
                    Some(Element::SourceFile(unit)) => Some(unit),
                    _ => None,
                };
                let change = match (mode, unit) {
                    (ReorgMode::Copy, Some(unit)) if target_ns.name != ns.name => ResourceChange::CreateFile {
                        path: target_folder.join(&unit.name),
                        content: retargeted_unit_text(ctx, &unit, &target_ns.name, None)?,
                    },
                    (ReorgMode::Copy, _) => {
                        ResourceChange::Copy { source: file, destination: target_folder.clone(), new_name: None }
                    }
                    (ReorgMode::Move, _) => {
                        ResourceChange::Move { source: file, destination: target_folder.clone(), new_name: None }
                    }
                };
                children.push(Change::Resource(change));
            }

            if mode == ReorgMode::Move {
                if has_subfolders {
                    tracing::debug!("Keeping folder of {}: it holds nested namespaces", ns.name);
                } else {
                    children.push(Change::Resource(ResourceChange::Delete { path: ns.folder() }));
                }
            }
            monitor.worked(1);
        }

        if children.is_empty() {
            status.add_info("Nothing to do: every namespace was skipped.");
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
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{ChangePerformer, ConflictChoice, FixedQueries, NullProgressMonitor};
    use crate::workspace::test_support::workspace;
    use crate::workspace::{FsChangePerformer, Workspace};
    use std::fs;

    fn item(handle: &str) -> SelectionItem {
        handle.parse().expect("handle")
    }

    fn run(ws: &Workspace, policy: &mut NamespacePolicy, target: &str, queries: &mut FixedQueries) -> Change {
        assert!(policy.set_destination(ws, Destination::on(item(target))).is_ok());
        let ctx = ReorgContext::from_backend(ws);
        let mut monitor = NullProgressMonitor::default();
        policy
            .check_final_conditions(&ctx, &mut ExecutionLog::new(), queries, &mut monitor)
            .expect("conditions");
        policy.create_change(&ctx, &mut monitor).expect("change")
    }

    #[test]
    fn moving_to_another_root_keeps_nested_namespaces() {
        let (tmp, ws) = workspace(&[
            ("app/src/pkg/a/Foo.java", "package pkg.a;\npublic class Foo {}\n"),
            ("app/src/pkg/a/notes.txt", "notes"),
            ("app/src/pkg/a/b/Deep.java", "package pkg.a.b;\nclass Deep {}\n"),
            ("core/src/other/Keep.java", "package other;\nclass Keep {}\n"),
        ]);
        let mut policy = NamespacePolicy::new(ReorgMode::Move, &[item("=app/src<pkg.a")]);
        let change = run(&ws, &mut policy, "=core/src", &mut FixedQueries::yes());
        FsChangePerformer::new(tmp.path()).perform(&change).expect("perform");

        assert_eq!(
            fs::read_to_string(tmp.path().join("core/src/pkg/a/Foo.java")).expect("moved"),
            "package pkg.a;\npublic class Foo {}\n"
        );
        assert!(tmp.path().join("core/src/pkg/a/notes.txt").exists());
        assert!(!tmp.path().join("app/src/pkg/a/Foo.java").exists());
        assert!(tmp.path().join("app/src/pkg/a/b/Deep.java").exists());
    }

    #[test]
    fn copy_under_a_new_name_retargets_units() {
        let (tmp, ws) = workspace(&[
            ("app/src/pkg/a/Foo.java", "package pkg.a;\npublic class Foo {}\n"),
            ("core/src/pkg/a/Other.java", "package pkg.a;\nclass Other {}\n"),
        ]);
        let mut policy = NamespacePolicy::new(ReorgMode::Copy, &[item("=app/src<pkg.a")]);
        let mut queries = FixedQueries::new(true, ConflictChoice::Rename);
        let change = run(&ws, &mut policy, "=core/src", &mut queries);
        FsChangePerformer::new(tmp.path()).perform(&change).expect("perform");

        let copy = fs::read_to_string(tmp.path().join("core/src/pkg/copyOfA/Foo.java")).expect("copy");
        assert_eq!(copy, "package pkg.copyOfA;\npublic class Foo {}\n");
        assert!(tmp.path().join("app/src/pkg/a/Foo.java").exists());
    }

    #[test]
    fn same_root_and_default_namespace_are_rejected() {
        let (_tmp, ws) = workspace(&[
            ("app/src/pkg/a/Foo.java", "package pkg.a;\npublic class Foo {}\n"),
            ("app/src/Top.java", "class Top {}\n"),
        ]);
        let policy = NamespacePolicy::new(ReorgMode::Move, &[item("=app/src<pkg.a")]);
        assert!(!policy.verify_destination(&ws, &Destination::on(item("=app/src"))).is_ok());
        assert!(!policy.verify_destination(&ws, &Destination::on(item("/app"))).is_ok());

        let default = NamespacePolicy::new(ReorgMode::Copy, &[item("=app/src<")]);
        assert!(!default.can_enable(&ws));
    }
}
