//! Text edits against a single file.

use crate::domain::ResourcePath;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

/// Replace `length` bytes at `offset` with `text`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextEdit {
    pub offset: usize,
    pub length: usize,
    pub text: String,
}

impl TextEdit {
    pub fn insert(offset: usize, text: impl Into<String>) -> Self {
        Self { offset, length: 0, text: text.into() }
    }

    pub fn delete(offset: usize, length: usize) -> Self {
        Self { offset, length, text: String::new() }
    }

    pub fn replace(offset: usize, length: usize, text: impl Into<String>) -> Self {
        Self { offset, length, text: text.into() }
    }

    pub fn end(&self) -> usize {
        self.offset + self.length
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct EditError(pub String);

/// Apply non-overlapping edits. Returns the new text and the edits that
/// restore the original, expressed against the new text.
///
/// Edits are ordered by offset; an insertion at the start of a replaced
/// range goes first. Insertions sharing an offset keep their given order.
pub fn apply_edits(source: &str, edits: &[TextEdit]) -> Result<(String, Vec<TextEdit>), EditError> {
    let mut sorted: Vec<&TextEdit> = edits.iter().collect();
    sorted.sort_by_key(|edit| (edit.offset, edit.length.min(1)));

    let mut result = String::with_capacity(source.len());
    let mut undo = Vec::with_capacity(sorted.len());
    let mut cursor = 0usize;

    for edit in sorted {
        if edit.end() > source.len() {
            return Err(EditError(format!(
                "edit {}..{} is outside of the text ({} bytes)",
                edit.offset,
                edit.end(),
                source.len()
            )));
        }
        if edit.offset < cursor {
            return Err(EditError(format!("edit at {} overlaps a previous edit", edit.offset)));
        }
        if !source.is_char_boundary(edit.offset) || !source.is_char_boundary(edit.end()) {
            return Err(EditError(format!("edit at {} splits a character", edit.offset)));
        }
        result.push_str(&source[cursor..edit.offset]);
        undo.push(TextEdit::replace(
            result.len(),
            edit.text.len(),
            &source[edit.offset..edit.end()],
        ));
        result.push_str(&edit.text);
        cursor = edit.end();
    }
    result.push_str(&source[cursor..]);

    Ok((result, undo))
}

/// All edits for one file, plus the content hash the edits were computed
/// against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextFileChange {
    pub name: String,
    pub file: ResourcePath,
    pub edits: Vec<TextEdit>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub groups: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_hash: Option<String>,
}

impl TextFileChange {
    pub fn new(file: ResourcePath) -> Self {
        let name = format!("Update {}", file.name());
        Self { name, file, edits: Vec::new(), groups: BTreeSet::new(), expected_hash: None }
    }

    pub fn add_edit(&mut self, group: &str, edit: TextEdit) {
        self.groups.insert(group.to_string());
        self.edits.push(edit);
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn undo_restores_original() {
        let source = "package pkg.a;\n\npublic class Bar { Foo f; }\n";
        let edits = vec![
            TextEdit::insert(14, "\n\nimport pkg.b.Foo;"),
            TextEdit::replace(8, 5, "pkg.b"),
        ];
        let (changed, undo) = apply_edits(source, &edits).expect("apply");
        assert_eq!(changed, "package pkg.b;\n\nimport pkg.b.Foo;\n\npublic class Bar { Foo f; }\n");
        let (restored, _) = apply_edits(&changed, &undo).expect("undo");
        assert_eq!(restored, source);
    }

    #[test]
    fn insertion_before_adjacent_deletion() {
        let (changed, undo) =
            apply_edits("abcdef", &[TextEdit::delete(2, 2), TextEdit::insert(2, "XY")])
                .expect("apply");
        assert_eq!(changed, "abXYef");
        let (restored, _) = apply_edits(&changed, &undo).expect("undo");
        assert_eq!(restored, "abcdef");
    }

    #[test]
    fn overlapping_edits_are_rejected() {
        let result = apply_edits("abcdef", &[TextEdit::delete(1, 3), TextEdit::delete(2, 1)]);
        assert!(result.is_err());
        assert!(apply_edits("abc", &[TextEdit::delete(2, 5)]).is_err());
    }
}
