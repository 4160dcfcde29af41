//! Type reference search over the snapshot.
//!
//! Source files are scanned token by token for identifier chains
//! (`a.b.C`). A chain that spells the qualified name is a qualified match;
//! a chain that starts with the simple name is a simple match when the
//! type is visible at that point (same namespace, single-type import,
//! on-demand import). Imports are matched by name, doc comments by regex,
//! compiled artifacts by the internal `p/q/T` form.

use super::parse::{Token, TokenKind};
use super::{UnitEntry, Workspace};
use crate::change::ImportName;
use crate::domain::{DeclarationKind, SourceRange};
use crate::error::ServiceError;
use crate::services::{Accuracy, RawMatch, SearchPattern, SearchScope, SearchService, SourceModel};
use once_cell::sync::Lazy;
use regex::Regex;

static QUALIFIED_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[\p{L}_$][\p{L}\p{N}_$]*(?:\.[\p{L}_$][\p{L}\p{N}_$]*)+")
        .expect("qualified name regex is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visibility {
    Hidden,
    Visible(Accuracy),
}

impl SearchService for Workspace {
    fn find(
        &self,
        pattern: &SearchPattern,
        scope: &SearchScope,
    ) -> Result<Vec<RawMatch>, ServiceError> {
        let simple = pattern.simple_name();
        let mut matches = Vec::new();

        for entry in self.unit_entries() {
            let in_scope = match scope {
                SearchScope::Workspace => true,
                SearchScope::Namespace(name) => &entry.id.namespace.name == name,
                SearchScope::Files(files) => files.contains(&entry.id.path()),
            };
            if !in_scope {
                continue;
            }
            let Some(text) = self.unit_text(&entry.id) else { continue };
            if !text.contains(simple) {
                continue;
            }
            search_unit(self, entry, text, pattern, &mut matches);
        }

        if *scope == SearchScope::Workspace {
            search_binaries(self, pattern, &mut matches);
        }

        matches.sort_by(|a, b| (&a.file, a.range.offset).cmp(&(&b.file, b.range.offset)));
        matches.dedup_by(|a, b| a.file == b.file && a.range == b.range);
        Ok(matches)
    }
}

fn search_unit(
    workspace: &Workspace,
    entry: &UnitEntry,
    text: &str,
    pattern: &SearchPattern,
    matches: &mut Vec<RawMatch>,
) {
    let qualified = pattern.qualified_name.as_str();
    let simple = pattern.simple_name();
    let file = entry.id.path();

    // Header: imports are matched by name, the namespace declaration never.
    let mut header_end = 0usize;
    for info in &entry.declarations {
        match info.id.kind {
            DeclarationKind::NamespaceDeclaration => header_end = header_end.max(info.range.end()),
            DeclarationKind::Import => {
                header_end = header_end.max(info.range.end());
                let import = ImportName::from_declaration_path(&info.id.path);
                let refers = import.name == qualified
                    || import.name.strip_prefix(qualified).is_some_and(|rest| rest.starts_with('.'));
                if refers && !pattern.namespace().is_empty() {
                    matches.push(RawMatch {
                        file: file.clone(),
                        range: info.name_range,
                        accuracy: Accuracy::Exact,
                        inside_comment: false,
                        enclosing_import: Some(info.id.clone()),
                        binary: false,
                    });
                }
            }
            _ => {}
        }
    }

    let visibility = simple_name_visibility(workspace, entry, text, pattern);
    let segments: Vec<&str> = qualified.split('.').collect();
    let tokens = &entry.parsed.tokens;
    let mut idx = 0usize;
    while idx < tokens.len() {
        let token = tokens[idx];
        if token.start < header_end || token.kind != TokenKind::Ident {
            idx += 1;
            continue;
        }
        let chain = identifier_chain(tokens, idx);
        let next = chain.last().map_or(idx + 1, |last| last + 1);

        let spells_qualified = segments.len() > 1
            && chain.len() >= segments.len()
            && segments.iter().zip(&chain).all(|(segment, t)| tokens[*t].text(text) == *segment);
        if spells_qualified {
            let last = tokens[chain[segments.len() - 1]];
            matches.push(RawMatch {
                file: file.clone(),
                range: SourceRange::from_bounds(token.start, last.end),
                accuracy: Accuracy::Exact,
                inside_comment: false,
                enclosing_import: None,
                binary: false,
            });
        } else if token.text(text) == simple && !entry.parsed.is_declaration_name(token.start) {
            if let Visibility::Visible(accuracy) = visibility {
                matches.push(RawMatch {
                    file: file.clone(),
                    range: SourceRange::from_bounds(token.start, token.end),
                    accuracy,
                    inside_comment: false,
                    enclosing_import: None,
                    binary: false,
                });
            }
        }
        idx = next;
    }

    if !pattern.namespace().is_empty() {
        search_doc_comments(entry, text, pattern, matches);
    }
}

/// Token indices of `a . b . c` starting at `start`. A chain never starts
/// right after a `.`.
fn identifier_chain(tokens: &[Token], start: usize) -> Vec<usize> {
    if start > 0 && tokens[start - 1].is_punct('.') {
        return vec![start];
    }
    let mut chain = vec![start];
    let mut idx = start;
    while idx + 2 < tokens.len()
        && tokens[idx + 1].is_punct('.')
        && tokens[idx + 2].kind == TokenKind::Ident
    {
        idx += 2;
        chain.push(idx);
    }
    chain
}

fn simple_name_visibility(
    workspace: &Workspace,
    entry: &UnitEntry,
    text: &str,
    pattern: &SearchPattern,
) -> Visibility {
    let qualified = pattern.qualified_name.as_str();
    let simple = pattern.simple_name();
    let namespace = pattern.namespace();
    let same_namespace = entry.id.namespace.name == namespace;

    if entry.parsed.declares_type(simple, text) {
        let declares_top_level = entry
            .declarations
            .iter()
            .any(|info| info.id.is_top_level_type() && info.id.path == simple);
        return if same_namespace && declares_top_level {
            Visibility::Visible(Accuracy::Exact)
        } else {
            Visibility::Hidden
        };
    }

    let imports: Vec<ImportName> = entry
        .declarations
        .iter()
        .filter(|info| info.id.kind == DeclarationKind::Import)
        .map(|info| ImportName::from_declaration_path(&info.id.path))
        .filter(|import| !import.is_static)
        .collect();

    for import in imports.iter().filter(|i| !i.is_on_demand()) {
        if import.simple_name() == simple {
            return if import.name == qualified {
                Visibility::Visible(Accuracy::Exact)
            } else {
                Visibility::Hidden
            };
        }
    }
    if same_namespace {
        return Visibility::Visible(Accuracy::Exact);
    }
    let on_demand: Vec<&str> =
        imports.iter().filter(|i| i.is_on_demand()).map(|i| i.container()).collect();
    if !on_demand.contains(&namespace) {
        return Visibility::Hidden;
    }
    let ambiguous = on_demand
        .iter()
        .filter(|other| **other != namespace)
        .any(|other| namespace_declares(workspace, other, simple));
    if ambiguous {
        Visibility::Visible(Accuracy::Inaccurate)
    } else {
        Visibility::Visible(Accuracy::Exact)
    }
}

fn namespace_declares(workspace: &Workspace, namespace: &str, simple: &str) -> bool {
    workspace.unit_entries().any(|entry| {
        entry.id.namespace.name == namespace
            && entry.declarations.iter().any(|info| info.id.is_top_level_type() && info.id.path == simple)
    })
}

fn search_doc_comments(
    entry: &UnitEntry,
    text: &str,
    pattern: &SearchPattern,
    matches: &mut Vec<RawMatch>,
) {
    let qualified = pattern.qualified_name.as_str();
    for comment in entry.parsed.comments.iter().filter(|c| c.doc) {
        let body = &text[comment.range.offset..comment.range.end()];
        for found in QUALIFIED_NAME.find_iter(body) {
            let name = found.as_str();
            let refers = name == qualified
                || name.strip_prefix(qualified).is_some_and(|rest| rest.starts_with('.'));
            if !refers {
                continue;
            }
            matches.push(RawMatch {
                file: entry.id.path(),
                range: SourceRange::new(comment.range.offset + found.start(), qualified.len()),
                accuracy: Accuracy::Exact,
                inside_comment: true,
                enclosing_import: None,
                binary: false,
            });
        }
    }
}

/// One match per compiled artifact that mentions `p/q/T`.
fn search_binaries(workspace: &Workspace, pattern: &SearchPattern, matches: &mut Vec<RawMatch>) {
    let internal = pattern.qualified_name.replace('.', "/");
    let needle = internal.as_bytes();
    for (path, bytes) in workspace.binary_files() {
        let own = path.as_str().ends_with(&format!("{internal}.class"))
            || path.as_str().contains(&format!("{internal}$"));
        if own || needle.is_empty() {
            continue;
        }
        let hit = bytes.windows(needle.len()).enumerate().find(|(idx, window)| {
            *window == needle
                && bytes
                    .get(idx + needle.len())
                    .map_or(true, |b| !(b.is_ascii_alphanumeric() || *b == b'_'))
        });
        if let Some((offset, _)) = hit {
            tracing::debug!("Binary reference to {} in {}", pattern.qualified_name, path);
            matches.push(RawMatch {
                file: path.clone(),
                range: SourceRange::new(offset, needle.len()),
                accuracy: Accuracy::Exact,
                inside_comment: false,
                enclosing_import: None,
                binary: true,
            });
        }
    }
}
