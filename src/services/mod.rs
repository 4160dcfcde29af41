//! Collaborator interfaces consumed by the reorganization engine.
//!
//! The engine never parses, indexes or touches the disk itself; it talks to
//! these traits. [`crate::workspace`] provides one implementation of each.

pub mod backend;
pub mod model;
pub mod monitor;
pub mod participant;
pub mod performer;
pub mod queries;
pub mod rewrite;
pub mod search;

pub use backend::{Refresh, ReorgBackend};
pub use model::{ResourceKind, SourceModel};
pub use monitor::{checkpoint, NullProgressMonitor, ProgressMonitor};
pub use participant::{ParticipantRequest, ReorgParticipant};
pub use performer::ChangePerformer;
pub use queries::{
    BulkConfirmation, Confirmation, Conflict, ConflictChoice, ConflictQueries, FixedQueries,
};
pub use rewrite::{AstRewriteService, EditOp, InsertAnchor};
pub use search::{Accuracy, RawMatch, SearchPattern, SearchScope, SearchService};
