//! The model, search and rewrite services bundled behind one handle.

use super::{AstRewriteService, SearchService, SourceModel};
use crate::error::ServiceError;

/// A backend the processor can re-read after it created folders on disk.
pub trait ReorgBackend: SourceModel + SearchService + AstRewriteService {
    fn reload_model(&mut self) -> Result<(), ServiceError>;

    fn as_model(&self) -> &dyn SourceModel;
    fn as_search(&self) -> &dyn SearchService;
    fn as_rewrite(&self) -> &dyn AstRewriteService;
}

/// Implemented by backends that can be re-read.
pub trait Refresh {
    fn refresh(&mut self) -> Result<(), ServiceError>;
}

impl<T> ReorgBackend for T
where
    T: SourceModel + SearchService + AstRewriteService + Refresh,
{
    fn reload_model(&mut self) -> Result<(), ServiceError> {
        Refresh::refresh(self)
    }

    fn as_model(&self) -> &dyn SourceModel {
        self
    }

    fn as_search(&self) -> &dyn SearchService {
        self
    }

    fn as_rewrite(&self) -> &dyn AstRewriteService {
        self
    }
}
