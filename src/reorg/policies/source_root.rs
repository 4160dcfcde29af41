//! Moving and copying source roots as folders.

use super::{change_name, may_change_source};
use crate::change::{Change, ResourceChange};
use crate::domain::{Destination, Element, Location, ReorgMode, ResourcePath, SelectionItem};
use crate::error::ReorgError;
use crate::reorg::conflicts::{ConflictResolver, Resolution};
use crate::reorg::destination::verify_common;
use crate::reorg::log::ExecutionLog;
use crate::reorg::policy::{prepared_change, PolicyData, PolicyState, ReorgContext, ReorgPolicy};
use crate::services::{checkpoint, ConflictQueries, ProgressMonitor, ResourceKind, SourceModel};
use crate::status::{Status, Validation};

#[derive(Debug)]
pub struct SourceRootPolicy {
    data: PolicyData,
    prepared: Option<Change>,
}

impl SourceRootPolicy {
    pub fn new(mode: ReorgMode, items: &[SelectionItem]) -> Self {
        Self { data: PolicyData::new(mode, items), prepared: None }
    }
}

/// A plain folder outside every source root.
fn destination_folder(model: &dyn SourceModel, target: &SelectionItem) -> Option<ResourcePath> {
    let SelectionItem::Resource { path } = target else { return None };
    match model.resource_kind(path)? {
        ResourceKind::File => None,
        ResourceKind::Root | ResourceKind::Folder => {
            let inside_root = model.source_roots().iter().any(|root| path.is_same_or_descendant_of(root));
            (!inside_root).then(|| path.clone())
        }
    }
}

impl ReorgPolicy for SourceRootPolicy {
    fn policy_id(&self) -> &'static str {
        match self.data.mode {
            ReorgMode::Move => "moveRoots",
            ReorgMode::Copy => "copyRoots",
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
        let archive = items.iter().any(|item| model.item_is_archive(item));
        // Library roots may be copied out, never moved.
        !(self.data.mode == ReorgMode::Move && archive)
    }

    fn verify_destination(&self, model: &dyn SourceModel, destination: &Destination) -> Validation {
        let validation = verify_common(model, &self.data.items(), destination, true);
        if !validation.is_ok() {
            return validation;
        }
        if destination.location != Location::On {
            return Validation::fatal("Source folders can only be placed into a folder.");
        }
        match destination_folder(model, &destination.target) {
            Some(_) => Validation::Ok,
            None => Validation::fatal(format!(
                "'{}' is not a folder outside the source folders.",
                destination.target.label()
            )),
        }
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
        let folder = destination_folder(model, target)
            .ok_or_else(|| ReorgError::fatal(format!("'{}' cannot contain source folders.", target.label())))?;
        let items = self.data.items();
        monitor.begin_task("Checking source folders", items.len());

        let mut status = Status::ok();
        let mut resolver = ConflictResolver::new(mode);
        let mut children = Vec::new();
        for item in &items {
            checkpoint(monitor)?;
            let SelectionItem::Element(Element::SourceRoot { path }) = item else { continue };
            if !may_change_source(model, mode, item, &mut resolver, queries)? {
                continue;
            }
            let name = path.name().to_string();
            let resolution = resolver.resolve(
                item,
                &folder.to_string(),
                |candidate| model.resource_kind(&folder.join(candidate)).is_some(),
                |proposer| proposer.resource_name(model, &name, &folder),
                queries,
                log,
            )?;
            let Resolution::Write { new_name, overwrite } = resolution else { continue };
            if overwrite {
                let existing = folder.join(new_name.as_deref().unwrap_or(&name));
                children.push(Change::Resource(ResourceChange::Delete { path: existing }));
            }
            let source = path.clone();
            let destination = folder.clone();
            children.push(Change::Resource(match mode {
                ReorgMode::Move => ResourceChange::Move { source, destination, new_name },
                ReorgMode::Copy => ResourceChange::Copy { source, destination, new_name },
            }));
            monitor.worked(1);
        }
        if children.is_empty() {
            status.add_info("Nothing to do: every source folder was skipped.");
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
    use crate::services::{ChangePerformer, FixedQueries, NullProgressMonitor};
    use crate::workspace::test_support::workspace;
    use crate::workspace::FsChangePerformer;

    fn item(handle: &str) -> SelectionItem {
        handle.parse().expect("handle")
    }

    #[test]
    fn roots_copy_into_plain_folders_only() {
        let (tmp, ws) = workspace(&[
            ("app/src/pkg/Foo.java", "package pkg;\nclass Foo {}\n"),
            ("core/src/pkg/Bar.java", "package pkg;\nclass Bar {}\n"),
            ("backup/readme.txt", "keep"),
        ]);
        let mut policy = SourceRootPolicy::new(ReorgMode::Copy, &[item("=app/src")]);
        assert!(!policy.verify_destination(&ws, &Destination::on(item("/core/src/pkg"))).is_ok());
        assert!(policy.set_destination(&ws, Destination::on(item("/backup"))).is_ok());

        let ctx = ReorgContext::from_backend(&ws);
        let mut monitor = NullProgressMonitor::default();
        let status = policy
            .check_final_conditions(&ctx, &mut ExecutionLog::new(), &mut FixedQueries::yes(), &mut monitor)
            .expect("conditions");
        assert!(status.is_ok());
        let change = policy.create_change(&ctx, &mut monitor).expect("change");
        insta::assert_snapshot!(change.describe(), @r###"
        Copy 1 element
          copy app/src to backup
        "###);
        FsChangePerformer::new(tmp.path()).perform(&change).expect("perform");
        assert!(tmp.path().join("backup/src/pkg/Foo.java").exists());
        assert!(tmp.path().join("app/src/pkg/Foo.java").exists());
    }

    #[test]
    fn library_roots_cannot_move() {
        let (_tmp, ws) = workspace(&[("lib/ext/Api.java", "package ext;\npublic class Api {}\n")]);
        assert!(!SourceRootPolicy::new(ReorgMode::Move, &[item("=lib")]).can_enable(&ws));
        assert!(SourceRootPolicy::new(ReorgMode::Copy, &[item("=lib")]).can_enable(&ws));
    }
}
