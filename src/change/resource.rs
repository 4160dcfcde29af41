//! Filesystem-level mutations.

use crate::domain::ResourcePath;
use serde::{Deserialize, Serialize};

/// One captured file or folder, used to undo a delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub path: ResourcePath,
    /// `None` for folders.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contents: Option<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ResourceChange {
    CreateFolder {
        path: ResourcePath,
    },
    CreateFile {
        path: ResourcePath,
        content: String,
    },
    /// Move `source` into the folder `destination`, optionally renaming it.
    Move {
        source: ResourcePath,
        destination: ResourcePath,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        new_name: Option<String>,
    },
    Copy {
        source: ResourcePath,
        destination: ResourcePath,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        new_name: Option<String>,
    },
    Delete {
        path: ResourcePath,
    },
    /// Recreate previously deleted entries (parents first).
    Restore {
        entries: Vec<SnapshotEntry>,
    },
}

impl ResourceChange {
    /// Path the entry will have once the change is performed.
    pub fn target_path(&self) -> Option<ResourcePath> {
        match self {
            ResourceChange::CreateFolder { path } | ResourceChange::CreateFile { path, .. } => {
                Some(path.clone())
            }
            ResourceChange::Move { source, destination, new_name }
            | ResourceChange::Copy { source, destination, new_name } => {
                Some(destination.join(new_name.as_deref().unwrap_or(source.name())))
            }
            ResourceChange::Delete { .. } => None,
            ResourceChange::Restore { entries } => entries.first().map(|e| e.path.clone()),
        }
    }

    /// Paths read or written by this change.
    pub fn touched_paths(&self) -> Vec<ResourcePath> {
        match self {
            ResourceChange::CreateFolder { path }
            | ResourceChange::CreateFile { path, .. }
            | ResourceChange::Delete { path } => vec![path.clone()],
            ResourceChange::Move { source, .. } | ResourceChange::Copy { source, .. } => {
                let mut paths = vec![source.clone()];
                paths.extend(self.target_path());
                paths
            }
            ResourceChange::Restore { entries } => entries.iter().map(|e| e.path.clone()).collect(),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            ResourceChange::CreateFolder { path } => format!("create folder {path}"),
            ResourceChange::CreateFile { path, .. } => format!("create file {path}"),
            ResourceChange::Move { source, destination, new_name } => match new_name {
                Some(name) => format!("move {source} to {destination} as {name}"),
                None => format!("move {source} to {destination}"),
            },
            ResourceChange::Copy { source, destination, new_name } => match new_name {
                Some(name) => format!("copy {source} to {destination} as {name}"),
                None => format!("copy {source} to {destination}"),
            },
            ResourceChange::Delete { path } => format!("delete {path}"),
            ResourceChange::Restore { entries } => match entries.first() {
                Some(first) => format!("restore {} ({} entries)", first.path, entries.len()),
                None => "restore nothing".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_path_uses_new_name() {
        let change = ResourceChange::Copy {
            source: ResourcePath::new("src/pkg/a/Foo.java"),
            destination: ResourcePath::new("src/pkg/b"),
            new_name: Some("CopyOfFoo.java".into()),
        };
        assert_eq!(change.target_path(), Some(ResourcePath::new("src/pkg/b/CopyOfFoo.java")));
        assert_eq!(change.describe(), "copy src/pkg/a/Foo.java to src/pkg/b as CopyOfFoo.java");
    }
}
