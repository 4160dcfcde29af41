//! Directory walk with gitignore support.

use crate::domain::ResourcePath;
use anyhow::Result;
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanEntry {
    pub path: ResourcePath,
    pub is_dir: bool,
}

/// Walks a workspace and returns every folder and file that is not ignored.
pub struct WorkspaceScanner {
    root_path: PathBuf,
    exclude_globs: Vec<String>,
    respect_gitignore: bool,
}

pub fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        match Glob::new(pattern) {
            Ok(glob) => {
                builder.add(glob);
            }
            Err(err) => tracing::warn!("Ignoring invalid glob '{}': {}", pattern, err),
        }
    }
    Ok(builder.build()?)
}

/// Path-segment aware variant: `*` does not cross `/`.
pub fn build_path_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        match globset::GlobBuilder::new(pattern).literal_separator(true).build() {
            Ok(glob) => {
                builder.add(glob);
            }
            Err(err) => tracing::warn!("Ignoring invalid glob '{}': {}", pattern, err),
        }
    }
    Ok(builder.build()?)
}

impl WorkspaceScanner {
    pub fn new(root_path: PathBuf) -> Self {
        Self {
            root_path,
            exclude_globs: Vec::new(),
            respect_gitignore: true,
        }
    }

    /// Set glob patterns to exclude
    pub fn exclude_globs(mut self, globs: Vec<String>) -> Self {
        self.exclude_globs = globs;
        self
    }

    /// Set whether to respect gitignore files
    pub fn respect_gitignore(mut self, respect: bool) -> Self {
        self.respect_gitignore = respect;
        self
    }

    /// Entries in deterministic path order. The workspace root itself is not
    /// included.
    pub fn scan(&self) -> Result<Vec<ScanEntry>> {
        let exclude = build_globset(&self.exclude_globs)?;

        let mut builder = WalkBuilder::new(&self.root_path);
        builder
            .git_ignore(self.respect_gitignore)
            .git_global(self.respect_gitignore)
            .git_exclude(self.respect_gitignore)
            .follow_links(false)
            .hidden(false)
            .parents(true)
            .filter_entry(|entry| {
                let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
                let name = entry.file_name().to_str().unwrap_or("");
                // Hidden directories (VCS metadata, history) are never part of the tree.
                !(is_dir && entry.depth() > 0 && name.starts_with('.'))
            });

        let mut entries = Vec::new();
        for entry_result in builder.build() {
            let entry = match entry_result {
                Ok(e) => e,
                Err(err) => {
                    tracing::warn!("Skipping unreadable entry: {}", err);
                    continue;
                }
            };
            if entry.depth() == 0 {
                continue;
            }

            let rel_path = match entry.path().strip_prefix(&self.root_path) {
                Ok(p) => ResourcePath::new(p.to_string_lossy()),
                Err(_) => continue,
            };
            let is_dir = entry.file_type().is_some_and(|t| t.is_dir());

            if is_excluded(&exclude, &rel_path, is_dir) {
                continue;
            }
            entries.push(ScanEntry { path: rel_path, is_dir });
        }

        // Drop entries below excluded folders.
        let excluded_dirs: Vec<ResourcePath> = entries
            .iter()
            .filter(|e| e.is_dir && is_excluded(&exclude, &e.path, true))
            .map(|e| e.path.clone())
            .collect();
        entries.retain(|e| !excluded_dirs.iter().any(|dir| e.path.is_descendant_of(dir)));

        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(entries)
    }
}

/// Folder globs are usually written as `dir/**`, which only matches what is
/// inside the folder.
fn is_excluded(exclude: &GlobSet, path: &ResourcePath, is_dir: bool) -> bool {
    if exclude.is_match(path.as_str()) {
        return true;
    }
    is_dir && exclude.is_match(format!("{}/x", path.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn scan_lists_folders_and_files_sorted() {
        let tmp = TempDir::new().expect("tmp");
        fs::create_dir_all(tmp.path().join("src/pkg/a")).expect("mkdir");
        fs::write(tmp.path().join("src/pkg/a/Foo.java"), "class Foo {}").expect("write");
        fs::create_dir_all(tmp.path().join("target/classes")).expect("mkdir");
        fs::write(tmp.path().join("target/classes/Foo.class"), [0xca, 0xfe]).expect("write");
        fs::create_dir_all(tmp.path().join(".reorg")).expect("mkdir");
        fs::write(tmp.path().join(".reorg/history.jsonl"), "").expect("write");

        let entries = WorkspaceScanner::new(tmp.path().to_path_buf())
            .exclude_globs(vec!["target/**".to_string()])
            .scan()
            .expect("scan");
        let paths: Vec<&str> = entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["src", "src/pkg", "src/pkg/a", "src/pkg/a/Foo.java"]);
        assert!(entries[0].is_dir);
        assert!(!entries[3].is_dir);
    }

    #[test]
    fn path_globs_do_not_cross_separators() {
        let set = build_path_globset(&["*/src".to_string()]).expect("globset");
        assert!(set.is_match("module/src"));
        assert!(!set.is_match("a/b/src"));
    }
}
