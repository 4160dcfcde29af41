//! Syntax-aware edit construction.

use crate::change::{ImportRewrite, TextEdit};
use crate::domain::{DeclarationId, UnitId};
use crate::error::ServiceError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertAnchor {
    Before(DeclarationId),
    After(DeclarationId),
    /// Last position inside the body of a type.
    IntoType(DeclarationId),
    /// After the last top-level declaration of the file.
    EndOfUnit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOp {
    Insert { anchor: InsertAnchor, text: String },
    /// Remove a declaration with the whitespace that separates it from its
    /// predecessor.
    Remove(DeclarationId),
    Replace { declaration: DeclarationId, text: String },
    /// Retarget (or add, or drop) the namespace declaration.
    SetNamespace(String),
    /// Rename a type declaration, its constructors and references to it
    /// inside the same file.
    RenameType { path: String, new_name: String },
}

pub trait AstRewriteService {
    fn create_edits(&self, unit: &UnitId, op: &EditOp) -> Result<Vec<TextEdit>, ServiceError>;

    /// Minimal edits that realise the recorded import changes.
    fn rewrite_imports(
        &self,
        unit: &UnitId,
        rewrite: &ImportRewrite,
    ) -> Result<Vec<TextEdit>, ServiceError>;
}
