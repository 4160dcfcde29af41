//! Extension points invoked alongside a policy.

use crate::change::Change;
use crate::domain::{Destination, ReorgMode, SelectionItem};
use crate::error::ReorgError;
use crate::services::SourceModel;
use crate::status::Status;

/// What participants are told about the running operation.
#[derive(Debug, Clone)]
pub struct ParticipantRequest<'a> {
    pub mode: ReorgMode,
    pub items: &'a [SelectionItem],
    pub destination: &'a Destination,
    pub update_references: bool,
}

pub trait ReorgParticipant {
    fn name(&self) -> &str;

    fn check_conditions(
        &mut self,
        model: &dyn SourceModel,
        request: &ParticipantRequest<'_>,
    ) -> Result<Status, ReorgError>;

    /// Text changes returned here may touch files the policy also edits;
    /// the policy merges its own late edits into them.
    fn create_change(
        &mut self,
        model: &dyn SourceModel,
        request: &ParticipantRequest<'_>,
    ) -> Result<Option<Change>, ReorgError>;
}
