//! Reference search.

use crate::domain::{DeclarationId, ResourcePath, SourceRange};
use crate::error::ServiceError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchScope {
    Workspace,
    /// Every fragment of a dotted namespace.
    Namespace(String),
    Files(Vec<ResourcePath>),
}

/// References to the type with the given fully qualified name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchPattern {
    pub qualified_name: String,
}

impl SearchPattern {
    pub fn type_references(qualified_name: impl Into<String>) -> Self {
        Self { qualified_name: qualified_name.into() }
    }

    pub fn simple_name(&self) -> &str {
        match self.qualified_name.rfind('.') {
            Some(idx) => &self.qualified_name[idx + 1..],
            None => &self.qualified_name,
        }
    }

    pub fn namespace(&self) -> &str {
        match self.qualified_name.rfind('.') {
            Some(idx) => &self.qualified_name[..idx],
            None => "",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accuracy {
    Exact,
    /// The backend could not prove the match binds to the searched type.
    Inaccurate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMatch {
    pub file: ResourcePath,
    /// Covers the qualifier, if any, and the simple name.
    pub range: SourceRange,
    pub accuracy: Accuracy,
    pub inside_comment: bool,
    /// Set when the match sits inside an import declaration.
    pub enclosing_import: Option<DeclarationId>,
    /// Found in a compiled artifact that cannot be rewritten.
    pub binary: bool,
}

pub trait SearchService {
    fn find(
        &self,
        pattern: &SearchPattern,
        scope: &SearchScope,
    ) -> Result<Vec<RawMatch>, ServiceError>;
}
