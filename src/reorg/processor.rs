//! Drives one policy through its lifecycle and performs the result.
//!
//! `can_enable -> set_destination -> in-sync -> check_final_conditions ->
//! create_change -> participants -> post_create_change -> perform`. Fatal
//! statuses stop the run before anything is performed; cancellation ends it
//! in [`PolicyState::Cancelled`] without touching the workspace.

use super::descriptor::{policy_from_descriptor, Descriptor, RestoredOperation};
use super::log::ExecutionLog;
use super::policies::create_folder_chain;
use super::policy::{PolicyState, ReorgContext, ReorgPolicy};
use crate::change::Change;
use crate::domain::{Destination, Element, ResourcePath, SelectionItem};
use crate::error::ReorgError;
use crate::services::{
    checkpoint, ChangePerformer, Confirmation, ConflictQueries, ParticipantRequest, ProgressMonitor,
    ReorgBackend, ReorgParticipant, SourceModel,
};
use crate::status::Status;

/// What to run a policy against.
#[derive(Debug, Clone)]
pub struct ReorgRequest {
    pub destination: Destination,
    /// `false` builds and reports the change without performing it.
    pub perform: bool,
    /// Create a missing destination folder without asking.
    pub create_target: bool,
}

impl ReorgRequest {
    pub fn new(destination: Destination) -> Self {
        Self { destination, perform: true, create_target: false }
    }
}

#[derive(Debug)]
pub struct ReorgOutcome {
    pub state: PolicyState,
    pub status: Status,
    pub change: Option<Change>,
    /// Inverse of the performed change, target creation included.
    pub undo: Option<Change>,
    pub descriptor: Option<Descriptor>,
    pub log: ExecutionLog,
}

impl ReorgOutcome {
    fn stopped(state: PolicyState, status: Status, log: ExecutionLog) -> Self {
        Self { state, status, change: None, undo: None, descriptor: None, log }
    }

    pub fn is_performed(&self) -> bool {
        self.state == PolicyState::Performed
    }

    pub fn is_cancelled(&self) -> bool {
        self.state == PolicyState::Cancelled
    }
}

/// Folder that has to exist before `target` can receive anything.
fn missing_folder(model: &dyn SourceModel, target: &SelectionItem) -> Option<ResourcePath> {
    match target {
        SelectionItem::Resource { path } if model.resource_kind(path).is_none() => Some(path.clone()),
        SelectionItem::Element(element @ Element::Namespace(ns)) if !model.element_exists(element) => {
            Some(ns.folder())
        }
        _ => None,
    }
}

fn existing_ancestor(model: &dyn SourceModel, path: &ResourcePath) -> ResourcePath {
    let mut current = path.parent();
    while let Some(candidate) = current {
        if model.resource_kind(&candidate).is_some() {
            return candidate;
        }
        current = candidate.parent();
    }
    ResourcePath::root()
}

fn stale_files<'p>(model: &dyn SourceModel, paths: impl IntoIterator<Item = &'p ResourcePath>) -> Status {
    let mut status = Status::ok();
    for path in paths {
        if model.resource_kind(path).is_some() && !model.is_in_sync(path) {
            status.add_fatal(format!("'{path}' has changed on disk. Reload and try again."));
        }
    }
    status
}

pub struct ReorgProcessor<'a> {
    backend: &'a mut dyn ReorgBackend,
    performer: &'a mut dyn ChangePerformer,
    participants: Vec<Box<dyn ReorgParticipant + 'a>>,
}

impl<'a> ReorgProcessor<'a> {
    pub fn new(backend: &'a mut dyn ReorgBackend, performer: &'a mut dyn ChangePerformer) -> Self {
        Self { backend, performer, participants: Vec::new() }
    }

    pub fn with_participant(mut self, participant: Box<dyn ReorgParticipant + 'a>) -> Self {
        self.participants.push(participant);
        self
    }

    pub fn run(
        &mut self,
        policy: &mut dyn ReorgPolicy,
        request: ReorgRequest,
        queries: &mut dyn ConflictQueries,
        monitor: &mut dyn ProgressMonitor,
    ) -> Result<ReorgOutcome, ReorgError> {
        self.execute(policy, request, ExecutionLog::new(), queries, monitor)
    }

    /// Run a stored operation again. Decisions come from its execution log,
    /// so `queries` is only consulted for questions the log cannot answer.
    pub fn replay(
        &mut self,
        descriptor: &Descriptor,
        perform: bool,
        queries: &mut dyn ConflictQueries,
        monitor: &mut dyn ProgressMonitor,
    ) -> Result<ReorgOutcome, ReorgError> {
        let RestoredOperation { mut policy, destination, log } =
            policy_from_descriptor(self.backend.as_model(), descriptor)?;
        let request = ReorgRequest { destination, perform, create_target: false };
        self.execute(policy.as_mut(), request, log, queries, monitor)
    }

    fn execute(
        &mut self,
        policy: &mut dyn ReorgPolicy,
        request: ReorgRequest,
        mut log: ExecutionLog,
        queries: &mut dyn ConflictQueries,
        monitor: &mut dyn ProgressMonitor,
    ) -> Result<ReorgOutcome, ReorgError> {
        let mode = policy.data().mode;
        if !policy.can_enable(self.backend.as_model()) {
            let status = Status::fatal(format!("The selection cannot be {}d.", mode.verb()));
            return Ok(ReorgOutcome::stopped(PolicyState::Created, status, log));
        }
        policy.data_mut().state = PolicyState::Enabled;
        tracing::debug!("Running {} with {} item(s)", policy.policy_id(), policy.data().items().len());

        let created = if request.perform {
            match self.ensure_target(&request, &mut log, queries) {
                Ok(created) => created,
                Err(ReorgError::Cancelled) => {
                    policy.data_mut().state = PolicyState::Cancelled;
                    return Ok(ReorgOutcome::stopped(PolicyState::Cancelled, Status::ok(), log));
                }
                Err(err) => return Err(err),
            }
        } else {
            None
        };

        match self.build_and_perform(policy, &request, &mut log, queries, monitor) {
            Ok((status, change, undo)) if status.has_fatal() || change.is_none() => {
                self.roll_back(created);
                let state = policy.data().state;
                Ok(ReorgOutcome { state, status, change, undo, descriptor: None, log })
            }
            Ok((status, change, undo)) => {
                let undo = match (undo, created) {
                    (Some(undo), Some(creation)) => {
                        Some(Change::composite(undo.name(), vec![undo, creation]))
                    }
                    (undo, _) => undo,
                };
                let descriptor = Some(policy.descriptor(&log));
                let state = policy.data().state;
                Ok(ReorgOutcome { state, status, change, undo, descriptor, log })
            }
            Err(ReorgError::Cancelled) => {
                self.roll_back(created);
                policy.data_mut().state = PolicyState::Cancelled;
                tracing::debug!("{} cancelled", policy.policy_id());
                Ok(ReorgOutcome::stopped(PolicyState::Cancelled, Status::ok(), log))
            }
            Err(err) => {
                self.roll_back(created);
                Err(err)
            }
        }
    }

    /// Create a missing destination folder. Returns the change that removes
    /// it again.
    fn ensure_target(
        &mut self,
        request: &ReorgRequest,
        log: &mut ExecutionLog,
        queries: &mut dyn ConflictQueries,
    ) -> Result<Option<Change>, ReorgError> {
        let target = &request.destination.target;
        let model = self.backend.as_model();
        let Some(folder) = missing_folder(model, target) else { return Ok(None) };
        let remembered = log.created_for(target).is_some();
        if !request.create_target && !remembered {
            let question = format!("'{}' does not exist. Create it?", target.label());
            match queries.confirm(&question) {
                Confirmation::Yes => {}
                Confirmation::No | Confirmation::Cancel => return Err(ReorgError::Cancelled),
            }
        }
        let base = existing_ancestor(model, &folder);
        let chain = create_folder_chain(model, &base, &folder, &mut Vec::new());
        let change = Change::composite(format!("Create {folder}"), chain);
        let undo = self.performer.perform(&change)?;
        self.backend.reload_model()?;
        log.mark_as_created(target, target);
        tracing::info!("Created {}", folder);
        Ok(Some(undo))
    }

    fn roll_back(&mut self, created: Option<Change>) {
        let Some(undo) = created else { return };
        if let Err(err) = self.performer.perform(&undo) {
            tracing::warn!("Could not remove the created destination: {}", err);
        }
        if let Err(err) = self.backend.reload_model() {
            tracing::warn!("Could not reload the workspace: {}", err);
        }
    }

    /// The policy's change composed with participant changes, and its undo
    /// once performed. `None` as change means the run stopped early.
    fn build_and_perform(
        &mut self,
        policy: &mut dyn ReorgPolicy,
        request: &ReorgRequest,
        log: &mut ExecutionLog,
        queries: &mut dyn ConflictQueries,
        monitor: &mut dyn ProgressMonitor,
    ) -> Result<(Status, Option<Change>, Option<Change>), ReorgError> {
        let model = self.backend.as_model();
        let validation = policy.set_destination(model, request.destination.clone());
        if !validation.is_ok() {
            return Ok((validation.into_status(), None, None));
        }

        let items = policy.data().items();
        let sources: Vec<ResourcePath> = items.iter().filter_map(|item| model.backing_resource(item)).collect();
        let stale = stale_files(model, &sources);
        if stale.has_fatal() {
            return Ok((stale, None, None));
        }

        checkpoint(monitor)?;
        let ctx = ReorgContext::from_backend(&*self.backend);
        let mut status = policy.check_final_conditions(&ctx, log, queries, monitor)?;
        let destination = request.destination.clone();
        let participant_request = ParticipantRequest {
            mode: policy.data().mode,
            items: &items,
            destination: &destination,
            update_references: policy.data().update_references,
        };
        for participant in &mut self.participants {
            status.merge(participant.check_conditions(ctx.model, &participant_request)?);
        }
        if status.has_fatal() {
            return Ok((status, None, None));
        }

        checkpoint(monitor)?;
        let main = policy.create_change(&ctx, monitor)?;
        let mut participant_changes = Vec::new();
        for participant in &mut self.participants {
            if let Some(change) = participant.create_change(ctx.model, &participant_request)? {
                tracing::debug!("Participant {} contributed '{}'", participant.name(), change.name());
                participant_changes.push(change);
            }
        }
        let post = policy.post_create_change(&ctx, &mut participant_changes, monitor)?;
        let change = if participant_changes.is_empty() && post.is_none() {
            main
        } else {
            let name = main.name();
            let mut children = vec![main];
            children.extend(participant_changes);
            children.extend(post);
            Change::composite(name, children)
        };

        status.merge(stale_files(model, &change.affected_files()));
        if status.has_fatal() || !request.perform {
            return Ok((status, Some(change), None));
        }

        checkpoint(monitor)?;
        let undo = self.performer.perform(&change)?;
        policy.data_mut().state = PolicyState::Performed;
        tracing::info!("Performed '{}' ({} edit(s))", change.name(), change.edit_count());
        if let Err(err) = self.backend.reload_model() {
            tracing::warn!("Could not reload the workspace: {}", err);
        }
        Ok((status, Some(change), Some(undo)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reorg::classify::classify;
    use crate::services::{ConflictChoice, FixedQueries, NullProgressMonitor};
    use crate::workspace::test_support::workspace;
    use crate::workspace::FsChangePerformer;
    use crate::domain::ReorgMode;
    use std::fs;

    fn item(handle: &str) -> SelectionItem {
        handle.parse().expect("handle")
    }

    #[test]
    fn missing_namespace_is_created_after_asking() {
        let (tmp, mut ws) = workspace(&[("src/pkg/a/Foo.java", "package pkg.a;\npublic class Foo {}\n")]);
        let mut policy = classify(&ws, ReorgMode::Move, &[item("=src<pkg.a{Foo.java")]);
        let mut performer = FsChangePerformer::new(tmp.path());
        let mut queries = FixedQueries::yes();
        let outcome = ReorgProcessor::new(&mut ws, &mut performer)
            .run(
                policy.as_mut(),
                ReorgRequest::new(Destination::on(item("=src<pkg.c"))),
                &mut queries,
                &mut NullProgressMonitor::default(),
            )
            .expect("run");

        assert!(outcome.is_performed(), "{:?}", outcome.status);
        assert_eq!(queries.asked, vec!["'pkg.c' does not exist. Create it?".to_string()]);
        assert_eq!(
            fs::read_to_string(tmp.path().join("src/pkg/c/Foo.java")).expect("moved"),
            "package pkg.c;\npublic class Foo {}\n"
        );
        assert!(outcome.log.created_for(&item("=src<pkg.c")).is_some());

        let undo = outcome.undo.expect("undo");
        performer.perform(&undo).expect("undo");
        assert!(tmp.path().join("src/pkg/a/Foo.java").exists());
        assert!(!tmp.path().join("src/pkg/c").exists());
    }

    #[test]
    fn declined_creation_cancels_cleanly() {
        let (tmp, mut ws) = workspace(&[("src/pkg/a/Foo.java", "package pkg.a;\npublic class Foo {}\n")]);
        let mut policy = classify(&ws, ReorgMode::Move, &[item("=src<pkg.a{Foo.java")]);
        let mut performer = FsChangePerformer::new(tmp.path());
        let outcome = ReorgProcessor::new(&mut ws, &mut performer)
            .run(
                policy.as_mut(),
                ReorgRequest::new(Destination::on(item("=src<pkg.c"))),
                &mut FixedQueries::new(false, ConflictChoice::Skip),
                &mut NullProgressMonitor::default(),
            )
            .expect("run");
        assert!(outcome.is_cancelled());
        assert!(outcome.change.is_none());
        assert!(!tmp.path().join("src/pkg/c").exists());
    }

    #[test]
    fn fatal_destination_stops_before_anything_is_built() {
        let (tmp, mut ws) = workspace(&[("src/pkg/a/Foo.java", "package pkg.a;\npublic class Foo {}\n")]);
        let mut policy = classify(&ws, ReorgMode::Move, &[item("=src<pkg.a{Foo.java")]);
        let mut performer = FsChangePerformer::new(tmp.path());
        let outcome = ReorgProcessor::new(&mut ws, &mut performer)
            .run(
                policy.as_mut(),
                ReorgRequest::new(Destination::on(item("=src<pkg.a"))),
                &mut FixedQueries::yes(),
                &mut NullProgressMonitor::default(),
            )
            .expect("run");
        assert!(outcome.status.has_fatal());
        assert!(outcome.change.is_none());
        assert!(outcome.descriptor.is_none());
    }

    #[test]
    fn dry_run_reports_without_touching_disk() {
        let (tmp, mut ws) = workspace(&[
            ("src/pkg/a/Foo.java", "package pkg.a;\npublic class Foo {}\n"),
            ("src/pkg/b/Baz.java", "package pkg.b;\nclass Baz {}\n"),
        ]);
        let mut policy = classify(&ws, ReorgMode::Copy, &[item("=src<pkg.a{Foo.java")]);
        let mut performer = FsChangePerformer::new(tmp.path());
        let mut request = ReorgRequest::new(Destination::on(item("=src<pkg.b")));
        request.perform = false;
        let outcome = ReorgProcessor::new(&mut ws, &mut performer)
            .run(policy.as_mut(), request, &mut FixedQueries::yes(), &mut NullProgressMonitor::default())
            .expect("run");
        assert_eq!(outcome.state, PolicyState::ChangeCreated);
        assert!(outcome.change.is_some());
        assert!(outcome.undo.is_none());
        assert!(!tmp.path().join("src/pkg/b/Foo.java").exists());
    }

    struct Marker;

    impl ReorgParticipant for Marker {
        fn name(&self) -> &str {
            "marker"
        }

        fn check_conditions(
            &mut self,
            _model: &dyn SourceModel,
            request: &ParticipantRequest<'_>,
        ) -> Result<Status, ReorgError> {
            let mut status = Status::ok();
            status.add_info(format!("{} item(s)", request.items.len()));
            Ok(status)
        }

        fn create_change(
            &mut self,
            _model: &dyn SourceModel,
            _request: &ParticipantRequest<'_>,
        ) -> Result<Option<Change>, ReorgError> {
            Ok(Some(Change::Resource(crate::change::ResourceChange::CreateFile {
                path: ResourcePath::new("docs/moved.txt"),
                content: "Foo\n".to_string(),
            })))
        }
    }

    #[test]
    fn participant_changes_follow_the_policy_change() {
        let (tmp, mut ws) = workspace(&[
            ("src/pkg/a/Foo.java", "package pkg.a;\npublic class Foo {}\n"),
            ("src/pkg/b/Baz.java", "package pkg.b;\nclass Baz {}\n"),
            ("docs/readme.txt", "a"),
        ]);
        let mut policy = classify(&ws, ReorgMode::Move, &[item("=src<pkg.a{Foo.java")]);
        let mut performer = FsChangePerformer::new(tmp.path());
        let outcome = ReorgProcessor::new(&mut ws, &mut performer)
            .with_participant(Box::new(Marker))
            .run(
                policy.as_mut(),
                ReorgRequest::new(Destination::on(item("=src<pkg.b"))),
                &mut FixedQueries::yes(),
                &mut NullProgressMonitor::default(),
            )
            .expect("run");

        assert!(outcome.is_performed());
        assert!(outcome.status.entries().iter().any(|entry| entry.message == "1 item(s)"));
        let Some(Change::Composite(composite)) = &outcome.change else { panic!("composite change expected") };
        assert_eq!(composite.children.len(), 2);
        assert!(matches!(composite.children[1], Change::Resource(_)));
        assert_eq!(fs::read_to_string(tmp.path().join("docs/moved.txt")).expect("created"), "Foo\n");
        assert!(tmp.path().join("src/pkg/b/Foo.java").exists());
    }
}
