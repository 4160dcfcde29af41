//! The reorganization engine: classification, destination checks,
//! per-granularity policies, reference updates and the processor that runs
//! them.

pub mod classify;
pub mod conflicts;
pub mod descriptor;
pub mod destination;
pub mod log;
pub mod naming;
pub mod policies;
pub mod policy;
pub mod processor;
pub mod qualified;
pub mod references;

pub use classify::{actual_selection, classify, policy_kind, PolicyKind};
pub use conflicts::{ConflictResolver, Resolution};
pub use descriptor::{policy_from_descriptor, Descriptor, RestoredOperation};
pub use log::ExecutionLog;
pub use naming::NewNameProposer;
pub use policy::{PolicyData, PolicyState, ReorgContext, ReorgPolicy};
pub use processor::{ReorgOutcome, ReorgProcessor, ReorgRequest};
pub use qualified::QualifiedNameUpdates;
pub use references::{find_references, update_references, ReferenceKind, ReferenceMatch};
