//! repo-reorg: move and copy source entities across a project tree while
//! keeping references, imports and namespace declarations consistent.
//!
//! The engine in [`reorg`] talks to its collaborators through the traits in
//! [`services`]; [`workspace`] implements them over a directory on disk.

pub mod change;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod reorg;
pub mod services;
pub mod status;
pub mod utils;
pub mod workspace;

pub use error::{ApplyError, ReorgError, ServiceError};
pub use status::{Severity, Status, Validation};
