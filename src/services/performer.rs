//! Applies change trees.

use crate::change::Change;
use crate::error::ApplyError;

pub trait ChangePerformer {
    /// Perform `change` and return the change that undoes it. On failure the
    /// performer leaves the workspace as it was before the call.
    fn perform(&mut self, change: &Change) -> Result<Change, ApplyError>;
}
