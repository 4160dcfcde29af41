//! Error taxonomy.
//!
//! Collaborator services report [`ServiceError`]; policies turn those into
//! [`ReorgError::Fatal`] before returning. [`ApplyError`] is produced only
//! when a change tree is performed.

use crate::domain::ResourcePath;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReorgError {
    #[error("{0}")]
    Fatal(String),

    /// The user declined a prompt. Not a failure.
    #[error("operation cancelled")]
    Cancelled,

    #[error(transparent)]
    Apply(#[from] ApplyError),
}

impl ReorgError {
    pub fn fatal(message: impl Into<String>) -> Self {
        ReorgError::Fatal(message.into())
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ReorgError::Cancelled)
    }
}

impl From<ServiceError> for ReorgError {
    fn from(err: ServiceError) -> Self {
        ReorgError::Fatal(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum ApplyError {
    #[error("{path} has changed on disk since it was read")]
    Stale { path: ResourcePath },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: ResourcePath,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid edit for {path}: {reason}")]
    InvalidEdit { path: ResourcePath, reason: String },

    #[error("participant failed: {0}")]
    Participant(String),
}

impl ApplyError {
    pub fn io(path: &ResourcePath, source: std::io::Error) -> Self {
        ApplyError::Io { path: path.clone(), source }
    }

    pub fn invalid(path: &ResourcePath, reason: impl Into<String>) -> Self {
        ApplyError::InvalidEdit { path: path.clone(), reason: reason.into() }
    }
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0} does not exist")]
    NotFound(String),

    #[error("cannot parse {path}: {reason}")]
    Parse { path: ResourcePath, reason: String },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: ResourcePath,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported: {0}")]
    Unsupported(String),
    #[error("cannot load workspace: {0}")]
    Load(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_errors_become_fatal() {
        let err: ReorgError = ServiceError::NotFound("src/pkg/a/Foo.java".into()).into();
        assert!(matches!(err, ReorgError::Fatal(ref msg) if msg.contains("does not exist")));
    }

    #[test]
    fn cancellation_is_distinguished() {
        assert!(ReorgError::Cancelled.is_cancelled());
        assert!(!ReorgError::fatal("boom").is_cancelled());
    }
}
