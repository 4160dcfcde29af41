//! Applies change trees to the filesystem.

use crate::change::{
    apply_edits, Change, CompositeChange, ResourceChange, SnapshotEntry, TextFileChange,
};
use crate::domain::ResourcePath;
use crate::error::ApplyError;
use crate::services::ChangePerformer;
use crate::utils::{content_hash, decode_bytes, encode_text};
use std::fs;
use std::path::PathBuf;
use walkdir::WalkDir;

/// Performs changes below a workspace root.
///
/// Text changes are checked against the hash recorded when they were built;
/// a composite that fails half-way undoes the children it already performed.
#[derive(Debug, Clone)]
pub struct FsChangePerformer {
    root: PathBuf,
}

impl FsChangePerformer {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn absolute(&self, path: &ResourcePath) -> PathBuf {
        if path.is_root() {
            self.root.clone()
        } else {
            self.root.join(path.as_str())
        }
    }

    fn perform_composite(&mut self, composite: &CompositeChange) -> Result<Change, ApplyError> {
        let mut undos = Vec::with_capacity(composite.children.len());
        for child in &composite.children {
            match self.perform(child) {
                Ok(undo) => undos.push(undo),
                Err(err) => {
                    for undo in undos.iter().rev() {
                        if let Err(rollback) = self.perform(undo) {
                            tracing::warn!("Rollback of '{}' failed: {}", undo.name(), rollback);
                        }
                    }
                    return Err(err);
                }
            }
        }
        undos.reverse();
        Ok(Change::Composite(CompositeChange {
            name: format!("Undo {}", composite.name),
            children: undos,
        }))
    }

    fn perform_text(&mut self, change: &TextFileChange) -> Result<Change, ApplyError> {
        let absolute = self.absolute(&change.file);
        let bytes = fs::read(&absolute).map_err(|err| ApplyError::io(&change.file, err))?;
        if let Some(expected) = &change.expected_hash {
            if &content_hash(&bytes) != expected {
                return Err(ApplyError::Stale { path: change.file.clone() });
            }
        }
        let decoded = decode_bytes(&bytes);
        let (text, undo_edits) = apply_edits(&decoded.text, &change.edits)
            .map_err(|err| ApplyError::invalid(&change.file, err.to_string()))?;
        let encoded = encode_text(&text, decoded.encoding, decoded.bom);
        fs::write(&absolute, &encoded).map_err(|err| ApplyError::io(&change.file, err))?;
        tracing::debug!("Applied {} edits to {}", change.edits.len(), change.file);

        Ok(Change::Text(TextFileChange {
            name: format!("Undo {}", change.name),
            file: change.file.clone(),
            edits: undo_edits,
            groups: change.groups.clone(),
            expected_hash: Some(content_hash(&encoded)),
        }))
    }

    fn ensure_absent(&self, path: &ResourcePath) -> Result<(), ApplyError> {
        if self.absolute(path).exists() {
            return Err(ApplyError::invalid(path, "target already exists"));
        }
        Ok(())
    }

    fn perform_resource(&mut self, change: &ResourceChange) -> Result<Change, ApplyError> {
        let undo = match change {
            ResourceChange::CreateFolder { path } => {
                self.ensure_absent(path)?;
                fs::create_dir(self.absolute(path)).map_err(|err| ApplyError::io(path, err))?;
                ResourceChange::Delete { path: path.clone() }
            }
            ResourceChange::CreateFile { path, content } => {
                self.ensure_absent(path)?;
                fs::write(self.absolute(path), content).map_err(|err| ApplyError::io(path, err))?;
                ResourceChange::Delete { path: path.clone() }
            }
            ResourceChange::Move { source, destination, new_name } => {
                let target = destination.join(new_name.as_deref().unwrap_or(source.name()));
                self.ensure_absent(&target)?;
                fs::rename(self.absolute(source), self.absolute(&target))
                    .map_err(|err| ApplyError::io(source, err))?;
                ResourceChange::Move {
                    source: target,
                    destination: source.parent().unwrap_or_default(),
                    new_name: Some(source.name().to_string()),
                }
            }
            ResourceChange::Copy { source, destination, new_name } => {
                let target = destination.join(new_name.as_deref().unwrap_or(source.name()));
                self.ensure_absent(&target)?;
                self.copy_tree(source, &target)?;
                ResourceChange::Delete { path: target }
            }
            ResourceChange::Delete { path } => {
                let entries = self.snapshot(path)?;
                let absolute = self.absolute(path);
                let removed = if absolute.is_dir() {
                    fs::remove_dir_all(&absolute)
                } else {
                    fs::remove_file(&absolute)
                };
                removed.map_err(|err| ApplyError::io(path, err))?;
                ResourceChange::Restore { entries }
            }
            ResourceChange::Restore { entries } => {
                for entry in entries {
                    let absolute = self.absolute(&entry.path);
                    let restored = match &entry.contents {
                        None => fs::create_dir_all(&absolute),
                        Some(bytes) => fs::write(&absolute, bytes),
                    };
                    restored.map_err(|err| ApplyError::io(&entry.path, err))?;
                }
                match entries.first() {
                    Some(first) => ResourceChange::Delete { path: first.path.clone() },
                    None => return Ok(Change::empty("Undo restore")),
                }
            }
        };
        tracing::debug!("Performed: {}", change.describe());
        Ok(Change::Resource(undo))
    }

    fn copy_tree(&self, source: &ResourcePath, target: &ResourcePath) -> Result<(), ApplyError> {
        let from = self.absolute(source);
        let to = self.absolute(target);
        if from.is_file() {
            fs::copy(&from, &to).map_err(|err| ApplyError::io(source, err))?;
            return Ok(());
        }
        for entry in WalkDir::new(&from).sort_by_file_name() {
            let entry = entry.map_err(|err| ApplyError::io(source, err.into()))?;
            let relative = entry.path().strip_prefix(&from).unwrap_or(entry.path());
            let destination = to.join(relative);
            if entry.file_type().is_dir() {
                fs::create_dir_all(&destination).map_err(|err| ApplyError::io(target, err))?;
            } else {
                fs::copy(entry.path(), &destination).map_err(|err| ApplyError::io(target, err))?;
            }
        }
        Ok(())
    }

    /// Folders before their contents.
    fn snapshot(&self, path: &ResourcePath) -> Result<Vec<SnapshotEntry>, ApplyError> {
        let absolute = self.absolute(path);
        if !absolute.exists() {
            return Err(ApplyError::io(
                path,
                std::io::Error::new(std::io::ErrorKind::NotFound, "no such file or directory"),
            ));
        }
        let mut entries = Vec::new();
        for entry in WalkDir::new(&absolute).sort_by_file_name() {
            let entry = entry.map_err(|err| ApplyError::io(path, err.into()))?;
            let relative = entry.path().strip_prefix(&self.root).unwrap_or(entry.path());
            let entry_path = ResourcePath::new(relative.to_string_lossy());
            let contents = if entry.file_type().is_dir() {
                None
            } else {
                Some(fs::read(entry.path()).map_err(|err| ApplyError::io(&entry_path, err))?)
            };
            entries.push(SnapshotEntry { path: entry_path, contents });
        }
        Ok(entries)
    }
}

impl ChangePerformer for FsChangePerformer {
    fn perform(&mut self, change: &Change) -> Result<Change, ApplyError> {
        match change {
            Change::Composite(composite) => self.perform_composite(composite),
            Change::Text(text) => self.perform_text(text),
            Change::Resource(resource) => self.perform_resource(resource),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::change::TextEdit;
    use tempfile::TempDir;

    fn setup() -> (TempDir, FsChangePerformer) {
        let tmp = TempDir::new().expect("tmp");
        fs::create_dir_all(tmp.path().join("src/pkg/a")).expect("mkdir");
        fs::create_dir_all(tmp.path().join("src/pkg/b")).expect("mkdir");
        fs::write(tmp.path().join("src/pkg/a/Foo.java"), "package pkg.a;\nclass Foo {}\n")
            .expect("write");
        let performer = FsChangePerformer::new(tmp.path());
        (tmp, performer)
    }

    #[test]
    fn move_and_undo() {
        let (tmp, mut performer) = setup();
        let foo = ResourcePath::new("src/pkg/a/Foo.java");
        let mut text = TextFileChange::new(foo.clone());
        text.add_edit("ns", TextEdit::replace(8, 5, "pkg.b"));
        text.expected_hash = Some(content_hash(b"package pkg.a;\nclass Foo {}\n"));
        let change = Change::composite(
            "Move Foo",
            vec![
                Change::Text(text),
                Change::Resource(ResourceChange::Move {
                    source: foo,
                    destination: ResourcePath::new("src/pkg/b"),
                    new_name: None,
                }),
            ],
        );

        let undo = performer.perform(&change).expect("perform");
        let moved = fs::read_to_string(tmp.path().join("src/pkg/b/Foo.java")).expect("read");
        assert_eq!(moved, "package pkg.b;\nclass Foo {}\n");
        assert!(!tmp.path().join("src/pkg/a/Foo.java").exists());

        performer.perform(&undo).expect("undo");
        let restored = fs::read_to_string(tmp.path().join("src/pkg/a/Foo.java")).expect("read");
        assert_eq!(restored, "package pkg.a;\nclass Foo {}\n");
    }

    #[test]
    fn stale_text_fails_and_rolls_back() {
        let (tmp, mut performer) = setup();
        let mut stale = TextFileChange::new(ResourcePath::new("src/pkg/a/Foo.java"));
        stale.add_edit("x", TextEdit::insert(0, "// x\n"));
        stale.expected_hash = Some("0000000000000000".to_string());
        let change = Change::composite(
            "Broken",
            vec![
                Change::Resource(ResourceChange::CreateFolder { path: ResourcePath::new("src/pkg/c") }),
                Change::Text(stale),
            ],
        );
        let err = performer.perform(&change).expect_err("stale");
        assert!(matches!(err, ApplyError::Stale { .. }));
        assert!(!tmp.path().join("src/pkg/c").exists());
    }

    #[test]
    fn delete_restores_from_snapshot() {
        let (tmp, mut performer) = setup();
        let undo = performer
            .perform(&Change::Resource(ResourceChange::Delete { path: ResourcePath::new("src/pkg/a") }))
            .expect("delete");
        assert!(!tmp.path().join("src/pkg/a").exists());
        performer.perform(&undo).expect("restore");
        assert!(tmp.path().join("src/pkg/a/Foo.java").is_file());
    }
}
