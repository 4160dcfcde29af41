//! Change trees: performable, serializable, side-effect free until applied.

pub mod imports;
pub mod manager;
pub mod resource;
pub mod text;

pub use imports::{ImportName, ImportRewrite};
pub use manager::{merge_text_change, TextChangeManager};
pub use resource::{ResourceChange, SnapshotEntry};
pub use text::{apply_edits, EditError, TextEdit, TextFileChange};

use crate::domain::ResourcePath;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Change {
    Text(TextFileChange),
    Resource(ResourceChange),
    Composite(CompositeChange),
}

/// Ordered children, performed first to last.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompositeChange {
    pub name: String,
    pub children: Vec<Change>,
}

impl CompositeChange {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), children: Vec::new() }
    }

    pub fn add(&mut self, change: Change) {
        if !change.is_empty() {
            self.children.push(change);
        }
    }

    pub fn extend(&mut self, changes: impl IntoIterator<Item = Change>) {
        for change in changes {
            self.add(change);
        }
    }
}

impl Change {
    pub fn composite(name: impl Into<String>, children: Vec<Change>) -> Change {
        let mut composite = CompositeChange::new(name);
        composite.extend(children);
        Change::Composite(composite)
    }

    pub fn empty(name: impl Into<String>) -> Change {
        Change::Composite(CompositeChange::new(name))
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Change::Text(text) => text.is_empty(),
            Change::Resource(_) => false,
            Change::Composite(composite) => composite.children.iter().all(Change::is_empty),
        }
    }

    pub fn name(&self) -> String {
        match self {
            Change::Text(text) => text.name.clone(),
            Change::Resource(resource) => resource.describe(),
            Change::Composite(composite) => composite.name.clone(),
        }
    }

    /// Every path a performer will read or write.
    pub fn affected_files(&self) -> BTreeSet<ResourcePath> {
        let mut files = BTreeSet::new();
        self.collect_files(&mut files);
        files
    }

    fn collect_files(&self, files: &mut BTreeSet<ResourcePath>) {
        match self {
            Change::Text(text) => {
                files.insert(text.file.clone());
            }
            Change::Resource(resource) => files.extend(resource.touched_paths()),
            Change::Composite(composite) => {
                for child in &composite.children {
                    child.collect_files(files);
                }
            }
        }
    }

    pub fn text_changes(&self) -> Vec<&TextFileChange> {
        match self {
            Change::Text(text) => vec![text],
            Change::Resource(_) => Vec::new(),
            Change::Composite(composite) => {
                composite.children.iter().flat_map(Change::text_changes).collect()
            }
        }
    }

    pub fn text_changes_mut(&mut self) -> Vec<&mut TextFileChange> {
        match self {
            Change::Text(text) => vec![text],
            Change::Resource(_) => Vec::new(),
            Change::Composite(composite) => {
                composite.children.iter_mut().flat_map(Change::text_changes_mut).collect()
            }
        }
    }

    pub fn edit_count(&self) -> usize {
        self.text_changes().iter().map(|t| t.edits.len()).sum()
    }

    /// Indented, one line per node. Used for previews and dry runs.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        self.describe_into(0, &mut out);
        out
    }

    fn describe_into(&self, depth: usize, out: &mut String) {
        let indent = "  ".repeat(depth);
        match self {
            Change::Text(text) => {
                let groups = text.groups.iter().cloned().collect::<Vec<_>>().join(", ");
                if groups.is_empty() {
                    out.push_str(&format!("{indent}edit {} ({} edits)\n", text.file, text.edits.len()));
                } else {
                    out.push_str(&format!(
                        "{indent}edit {} ({} edits: {groups})\n",
                        text.file,
                        text.edits.len()
                    ));
                }
            }
            Change::Resource(resource) => {
                out.push_str(&format!("{indent}{}\n", resource.describe()));
            }
            Change::Composite(composite) => {
                out.push_str(&format!("{indent}{}\n", composite.name));
                for child in &composite.children {
                    child.describe_into(depth + 1, out);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_renders_tree() {
        let mut text = TextFileChange::new(ResourcePath::new("src/pkg/b/Baz.java"));
        text.add_edit("Update references", TextEdit::replace(10, 6, "pkg.b."));
        let change = Change::composite(
            "Move",
            vec![
                Change::Text(text),
                Change::Resource(ResourceChange::Move {
                    source: ResourcePath::new("src/pkg/a/Foo.java"),
                    destination: ResourcePath::new("src/pkg/b"),
                    new_name: None,
                }),
            ],
        );
        insta::assert_snapshot!(change.describe(), @r###"
        Move
          edit src/pkg/b/Baz.java (1 edits: Update references)
          move src/pkg/a/Foo.java to src/pkg/b
        "###);
        assert_eq!(change.affected_files().len(), 3);
    }

    #[test]
    fn empty_children_are_dropped() {
        let change = Change::composite(
            "Copy",
            vec![Change::Text(TextFileChange::new(ResourcePath::new("a.txt")))],
        );
        assert!(change.is_empty());
        let Change::Composite(composite) = change else { panic!("composite") };
        assert!(composite.children.is_empty());
    }
}
