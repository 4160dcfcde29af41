//! The policy interface shared by every reorganization granularity.

use super::descriptor::Descriptor;
use super::log::ExecutionLog;
use crate::change::Change;
use crate::domain::{Destination, Element, ReorgMode, ResourcePath, SelectionItem};
use crate::error::ReorgError;
use crate::services::{
    AstRewriteService, ConflictQueries, ProgressMonitor, ReorgBackend, SearchService, SourceModel,
};
use crate::status::{Status, Validation};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyState {
    Created,
    Enabled,
    ConditionsChecked,
    ChangeCreated,
    Performed,
    Cancelled,
}

/// The collaborators a policy reads from while it works.
#[derive(Clone, Copy)]
pub struct ReorgContext<'a> {
    pub model: &'a dyn SourceModel,
    pub search: &'a dyn SearchService,
    pub rewrite: &'a dyn AstRewriteService,
}

impl<'a> ReorgContext<'a> {
    pub fn from_backend(backend: &'a dyn ReorgBackend) -> Self {
        Self { model: backend.as_model(), search: backend.as_search(), rewrite: backend.as_rewrite() }
    }
}

/// Inputs and flags every policy carries.
#[derive(Debug, Clone)]
pub struct PolicyData {
    pub mode: ReorgMode,
    pub resources: Vec<ResourcePath>,
    pub elements: Vec<Element>,
    pub destination: Option<Destination>,
    /// Off only when replaying an operation whose destination was already
    /// validated.
    pub check_destination: bool,
    pub update_references: bool,
    pub update_qualified_names: bool,
    pub file_patterns: String,
    pub state: PolicyState,
}

impl PolicyData {
    pub fn new(mode: ReorgMode, items: &[SelectionItem]) -> Self {
        let mut resources = Vec::new();
        let mut elements = Vec::new();
        for item in items {
            match item {
                SelectionItem::Resource { path } => resources.push(path.clone()),
                SelectionItem::Element(element) => elements.push(element.clone()),
            }
        }
        Self {
            mode,
            resources,
            elements,
            destination: None,
            check_destination: true,
            update_references: true,
            update_qualified_names: false,
            file_patterns: String::new(),
            state: PolicyState::Created,
        }
    }

    /// Resources first, then elements.
    pub fn items(&self) -> Vec<SelectionItem> {
        self.resources
            .iter()
            .cloned()
            .map(SelectionItem::resource)
            .chain(self.elements.iter().cloned().map(SelectionItem::Element))
            .collect()
    }

    pub fn destination(&self) -> Result<&Destination, ReorgError> {
        self.destination.as_ref().ok_or_else(|| ReorgError::fatal("No destination has been set."))
    }

    pub fn all_exist(&self, model: &dyn SourceModel) -> bool {
        let items = self.items();
        !items.is_empty() && items.iter().all(|item| model.exists(item))
    }
}

pub trait ReorgPolicy {
    /// Stable identifier stored in descriptors (`moveResources`, ...).
    fn policy_id(&self) -> &'static str;

    fn data(&self) -> &PolicyData;

    fn data_mut(&mut self) -> &mut PolicyData;

    /// Cheap feasibility check; never searches.
    fn can_enable(&self, model: &dyn SourceModel) -> bool;

    fn verify_destination(&self, model: &dyn SourceModel, destination: &Destination) -> Validation;

    fn set_destination(&mut self, model: &dyn SourceModel, destination: Destination) -> Validation {
        if self.data().check_destination {
            let validation = self.verify_destination(model, &destination);
            if !validation.is_ok() {
                return validation;
            }
        }
        self.data_mut().destination = Some(destination);
        Validation::Ok
    }

    fn can_update_references(&self) -> bool {
        false
    }

    fn can_update_qualified_names(&self) -> bool {
        false
    }

    /// Resolve conflicts, search references and build the change. The
    /// change is kept for [`ReorgPolicy::create_change`].
    fn check_final_conditions(
        &mut self,
        ctx: &ReorgContext<'_>,
        log: &mut ExecutionLog,
        queries: &mut dyn ConflictQueries,
        monitor: &mut dyn ProgressMonitor,
    ) -> Result<Status, ReorgError>;

    fn create_change(
        &mut self,
        ctx: &ReorgContext<'_>,
        monitor: &mut dyn ProgressMonitor,
    ) -> Result<Change, ReorgError>;

    /// Runs once participants have contributed; may fold late edits into
    /// their text changes.
    fn post_create_change(
        &mut self,
        _ctx: &ReorgContext<'_>,
        _participant_changes: &mut Vec<Change>,
        _monitor: &mut dyn ProgressMonitor,
    ) -> Result<Option<Change>, ReorgError> {
        Ok(None)
    }

    fn descriptor(&self, log: &ExecutionLog) -> Descriptor {
        Descriptor::from_policy(self.policy_id(), self.data(), log)
    }
}

/// The change built by the last successful condition check.
pub(crate) fn prepared_change(prepared: &Option<Change>) -> Result<Change, ReorgError> {
    prepared
        .clone()
        .ok_or_else(|| ReorgError::fatal("Final conditions have not been checked."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_partitions_the_selection() {
        let items: Vec<SelectionItem> = ["/docs/readme.txt", "=src<pkg.a{Foo.java"]
            .iter()
            .map(|h| h.parse().expect("handle"))
            .collect();
        let data = PolicyData::new(ReorgMode::Move, &items);
        assert_eq!(data.resources.len(), 1);
        assert_eq!(data.elements.len(), 1);
        assert_eq!(data.items(), items);
        assert!(data.destination().is_err());
        assert_eq!(data.state, PolicyState::Created);
    }
}
