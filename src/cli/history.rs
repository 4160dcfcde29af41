//! Undo history: one JSON line per performed operation.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::change::Change;
use crate::reorg::Descriptor;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub descriptor: Descriptor,
    pub undo: Change,
}

impl HistoryEntry {
    pub fn new(descriptor: Descriptor, undo: Change) -> Self {
        Self { timestamp: Utc::now(), descriptor, undo }
    }
}

pub struct History {
    path: PathBuf,
}

impl History {
    pub fn new(root: &Path, file: &Path) -> Self {
        Self { path: root.join(file) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, entry: &HistoryEntry) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create history directory: {}", parent.display()))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open history: {}", self.path.display()))?;
        let line = serde_json::to_string(entry).context("Failed to serialize history entry")?;
        writeln!(file, "{line}").with_context(|| format!("Failed to write history: {}", self.path.display()))?;
        Ok(())
    }

    pub fn entries(&self) -> Result<Vec<HistoryEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read history: {}", self.path.display()))?;
        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .enumerate()
            .map(|(idx, line)| {
                serde_json::from_str(line)
                    .with_context(|| format!("Corrupt history entry {} in {}", idx + 1, self.path.display()))
            })
            .collect()
    }

    /// Remove and return the newest entry.
    pub fn pop(&self) -> Result<Option<HistoryEntry>> {
        let mut entries = self.entries()?;
        let Some(last) = entries.pop() else { return Ok(None) };
        let mut content = String::new();
        for entry in &entries {
            content.push_str(&serde_json::to_string(entry).context("Failed to serialize history entry")?);
            content.push('\n');
        }
        fs::write(&self.path, content)
            .with_context(|| format!("Failed to rewrite history: {}", self.path.display()))?;
        Ok(Some(last))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn entry(id: &str) -> HistoryEntry {
        let descriptor = Descriptor { id: id.to_string(), arguments: BTreeMap::new() };
        HistoryEntry::new(descriptor, Change::empty("Undo"))
    }

    #[test]
    fn pop_returns_newest_first() {
        let tmp = TempDir::new().expect("tempdir");
        let history = History::new(tmp.path(), Path::new(".reorg/history.jsonl"));
        assert!(history.path().ends_with(".reorg/history.jsonl"));
        assert!(history.pop().expect("empty").is_none());

        history.append(&entry("move")).expect("append");
        history.append(&entry("copy")).expect("append");
        assert_eq!(history.entries().expect("entries").len(), 2);

        assert_eq!(history.pop().expect("pop").map(|e| e.descriptor.id), Some("copy".to_string()));
        assert_eq!(history.pop().expect("pop").map(|e| e.descriptor.id), Some("move".to_string()));
        assert!(history.entries().expect("entries").is_empty());
    }
}
