//! Source ranges and parsed declaration metadata.

use super::element::DeclarationId;
use serde::{Deserialize, Serialize};

/// Byte range inside a decoded source text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SourceRange {
    pub offset: usize,
    pub length: usize,
}

impl SourceRange {
    pub fn new(offset: usize, length: usize) -> Self {
        Self { offset, length }
    }

    pub fn from_bounds(start: usize, end: usize) -> Self {
        Self { offset: start, length: end.saturating_sub(start) }
    }

    pub fn end(&self) -> usize {
        self.offset + self.length
    }

    pub fn contains(&self, offset: usize) -> bool {
        offset >= self.offset && offset < self.end()
    }

    pub fn covers(&self, other: &SourceRange) -> bool {
        other.offset >= self.offset && other.end() <= self.end()
    }
}

/// What the source model knows about one declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclarationInfo {
    pub id: DeclarationId,
    /// Full extent, including a leading doc comment.
    pub range: SourceRange,
    /// The declared identifier (or the imported / namespace name).
    pub name_range: SourceRange,
    /// For types: the `{ ... }` body including braces.
    pub body_range: Option<SourceRange>,
    pub is_public: bool,
    pub is_static: bool,
    /// `import p.q.*;`
    pub on_demand: bool,
}

impl DeclarationInfo {
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.range.offset..self.range.end()]
    }
}
