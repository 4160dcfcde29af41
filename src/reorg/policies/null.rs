//! The policy for selections nothing else accepts. Never enabled.

use crate::change::Change;
use crate::domain::{Destination, ReorgMode, SelectionItem};
use crate::error::ReorgError;
use crate::reorg::log::ExecutionLog;
use crate::reorg::policy::{PolicyData, ReorgContext, ReorgPolicy};
use crate::services::{ConflictQueries, ProgressMonitor, SourceModel};
use crate::status::{Status, Validation};

const NOT_SUPPORTED: &str = "The selection cannot be moved or copied as a whole.";

#[derive(Debug)]
pub struct NullPolicy {
    data: PolicyData,
}

impl NullPolicy {
    pub fn new(mode: ReorgMode, items: &[SelectionItem]) -> Self {
        Self { data: PolicyData::new(mode, items) }
    }
}

impl ReorgPolicy for NullPolicy {
    fn policy_id(&self) -> &'static str {
        "no_policy"
    }

    fn data(&self) -> &PolicyData {
        &self.data
    }

    fn data_mut(&mut self) -> &mut PolicyData {
        &mut self.data
    }

    fn can_enable(&self, _model: &dyn SourceModel) -> bool {
        false
    }

    fn verify_destination(&self, _model: &dyn SourceModel, _destination: &Destination) -> Validation {
        Validation::fatal(NOT_SUPPORTED)
    }

    fn check_final_conditions(
        &mut self,
        _ctx: &ReorgContext<'_>,
        _log: &mut ExecutionLog,
        _queries: &mut dyn ConflictQueries,
        _monitor: &mut dyn ProgressMonitor,
    ) -> Result<Status, ReorgError> {
        Ok(Status::fatal(NOT_SUPPORTED))
    }

    fn create_change(
        &mut self,
        _ctx: &ReorgContext<'_>,
        _monitor: &mut dyn ProgressMonitor,
    ) -> Result<Change, ReorgError> {
        Err(ReorgError::fatal(NOT_SUPPORTED))
    }
}
