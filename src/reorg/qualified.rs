//! Fully qualified type names in non-source text files (XML descriptors,
//! property files, ...).
//!
//! Matches are collected while final conditions are checked and turned into
//! text changes once participants have contributed theirs, so edits to the
//! same file end up in one change.

use crate::change::{merge_text_change, Change, TextEdit, TextFileChange};
use crate::domain::config::split_csv;
use crate::domain::ResourcePath;
use crate::error::ReorgError;
use crate::services::{checkpoint, ProgressMonitor, SourceModel};
use globset::{Glob, GlobSet, GlobSetBuilder};
use regex::Regex;
use std::collections::BTreeMap;

pub const GROUP_UPDATE_QUALIFIED_NAMES: &str = "Update fully qualified names";

fn is_identifier_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_' || ch == '$'
}

/// File name patterns, comma separated. An empty list matches every file.
fn file_patterns(patterns: &str) -> Result<GlobSet, ReorgError> {
    let mut list = split_csv(patterns);
    if list.is_empty() {
        list.push("*".to_string());
    }
    let mut builder = GlobSetBuilder::new();
    for pattern in &list {
        let glob = Glob::new(pattern)
            .map_err(|err| ReorgError::fatal(format!("Invalid file name pattern '{pattern}': {err}")))?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|err| ReorgError::fatal(format!("Invalid file name patterns '{patterns}': {err}")))
}

/// Occurrences of `old` in `text` that are whole qualified names: not
/// preceded by an identifier character or a dot, not followed by an
/// identifier character.
fn find_occurrences(text: &str, old: &str) -> Vec<usize> {
    let Ok(pattern) = Regex::new(&regex::escape(old)) else {
        return Vec::new();
    };
    pattern
        .find_iter(text)
        .filter(|found| {
            let before = text[..found.start()].chars().next_back();
            let after = text[found.end()..].chars().next();
            !before.is_some_and(|ch| is_identifier_char(ch) || ch == '.')
                && !after.is_some_and(is_identifier_char)
        })
        .map(|found| found.start())
        .collect()
}

/// Qualified-name edits keyed by file.
#[derive(Debug, Default)]
pub struct QualifiedNameUpdates {
    changes: BTreeMap<ResourcePath, TextFileChange>,
}

impl QualifiedNameUpdates {
    /// Scan every text file whose name matches `patterns` for the old names
    /// in `renames` (`(old, new)` pairs).
    pub fn collect(
        model: &dyn SourceModel,
        patterns: &str,
        renames: &[(String, String)],
        monitor: &mut dyn ProgressMonitor,
    ) -> Result<Self, ReorgError> {
        let globs = file_patterns(patterns)?;
        let mut updates = Self::default();
        for file in model.text_files() {
            if !globs.is_match(file.name()) {
                continue;
            }
            checkpoint(monitor)?;
            let Some(text) = model.text(&file) else { continue };
            for (old, new) in renames {
                if old == new {
                    continue;
                }
                for offset in find_occurrences(text, old) {
                    let change = updates.changes.entry(file.clone()).or_insert_with(|| {
                        let mut change = TextFileChange::new(file.clone());
                        change.expected_hash = model.content_hash(&file).map(str::to_string);
                        change
                    });
                    change.add_edit(GROUP_UPDATE_QUALIFIED_NAMES, TextEdit::replace(offset, old.len(), new.clone()));
                }
            }
        }
        if !updates.changes.is_empty() {
            tracing::debug!("Qualified names found in {} file(s)", updates.changes.len());
        }
        Ok(updates)
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn files(&self) -> Vec<ResourcePath> {
        self.changes.keys().cloned().collect()
    }

    /// Drop edits to files at or below `paths`; those are moved away before
    /// the edits would run.
    pub fn exclude(&mut self, paths: &[ResourcePath]) {
        self.changes.retain(|file, _| !paths.iter().any(|path| file.is_same_or_descendant_of(path)));
    }

    /// Fold edits into participant changes touching the same files; the
    /// rest comes back as stand-alone changes.
    pub fn merge_into(self, participant_changes: &mut [Change]) -> Vec<TextFileChange> {
        self.changes
            .into_values()
            .filter_map(|change| merge_text_change(participant_changes, change))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::change::apply_edits;
    use crate::services::NullProgressMonitor;
    use crate::workspace::test_support::workspace;

    #[test]
    fn only_whole_names_are_matched() {
        let text = "pkg.a.Foo xpkg.a.Foo pkg.a.FooBar pkg.a.Foo.Inner (pkg.a.Foo) my.pkg.a.Foo";
        let offsets = find_occurrences(text, "pkg.a.Foo");
        let found: Vec<&str> = offsets.iter().map(|o| &text[*o..*o + 9]).collect();
        assert_eq!(offsets.len(), 3);
        assert!(found.iter().all(|f| *f == "pkg.a.Foo"));
        assert_eq!(offsets, vec![0, 34, 51]);
    }

    #[test]
    fn collects_edits_in_matching_files() {
        let (_tmp, ws) = workspace(&[
            ("src/pkg/a/Foo.java", "package pkg.a;\npublic class Foo {}\n"),
            ("conf/beans.xml", "<bean class=\"pkg.a.Foo\"/>\n<bean class=\"pkg.a.Foo\"/>\n"),
            ("conf/app.properties", "main=pkg.a.Foo\n"),
            ("README.md", "See pkg.a.Foo.\n"),
        ]);
        let renames = vec![("pkg.a.Foo".to_string(), "pkg.b.Foo".to_string())];
        let updates = QualifiedNameUpdates::collect(
            &ws,
            "*.xml, *.properties",
            &renames,
            &mut NullProgressMonitor::default(),
        )
        .expect("collect");
        assert_eq!(
            updates.files(),
            vec![ResourcePath::new("conf/app.properties"), ResourcePath::new("conf/beans.xml")]
        );

        let mut participant = vec![Change::Text(TextFileChange::new(ResourcePath::new("conf/app.properties")))];
        let rest = updates.merge_into(&mut participant);
        assert_eq!(rest.len(), 1);
        assert_eq!(participant[0].edit_count(), 1);
        assert_eq!(rest[0].file, ResourcePath::new("conf/beans.xml"));

        let beans = &rest[0];
        let (text, _) = apply_edits(ws.text(&beans.file).expect("text"), &beans.edits).expect("apply");
        insta::assert_snapshot!(text, @r###"
        <bean class="pkg.b.Foo"/>
        <bean class="pkg.b.Foo"/>
        "###);
    }

    #[test]
    fn moved_files_are_left_alone() {
        let (_tmp, ws) = workspace(&[
            ("conf/beans.xml", "<bean class=\"pkg.a.Foo\"/>\n"),
            ("other/app.xml", "<bean class=\"pkg.a.Foo\"/>\n"),
        ]);
        let renames = vec![("pkg.a.Foo".to_string(), "pkg.b.Foo".to_string())];
        let mut updates =
            QualifiedNameUpdates::collect(&ws, "*.xml", &renames, &mut NullProgressMonitor::default())
                .expect("collect");
        updates.exclude(&[ResourcePath::new("conf")]);
        assert_eq!(updates.files(), vec![ResourcePath::new("other/app.xml")]);
    }

    #[test]
    fn empty_patterns_match_everything() {
        let globs = file_patterns("").expect("globs");
        assert!(globs.is_match("README.md"));
        assert!(file_patterns("[").is_err());
    }
}
