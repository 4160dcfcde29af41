//! Edit construction against parsed source files.
//!
//! Edits are plain byte-range replacements computed from the declaration
//! ranges of the snapshot. Import rewriting keeps the existing block as is
//! and only touches the lines it adds or removes, so reverting a rewrite
//! restores the original bytes.

use super::parse::TokenKind;
use super::{UnitEntry, Workspace};
use crate::change::imports::is_implicit;
use crate::change::{ImportName, ImportRewrite, TextEdit};
use crate::domain::{DeclarationId, DeclarationInfo, DeclarationKind, UnitId};
use crate::error::ServiceError;
use crate::services::{AstRewriteService, EditOp, InsertAnchor, SourceModel};
use crate::utils::indent::{line_indent, reindent};

const INDENT_UNIT: &str = "    ";

impl Workspace {
    fn entry_and_text(&self, unit: &UnitId) -> Result<(&UnitEntry, &str), ServiceError> {
        let entry = self
            .unit_entry(&unit.path())
            .filter(|entry| &entry.id == unit)
            .ok_or_else(|| ServiceError::NotFound(unit.path().to_string()))?;
        let text = self
            .unit_text(unit)
            .ok_or_else(|| ServiceError::NotFound(unit.path().to_string()))?;
        Ok((entry, text))
    }
}

fn find_declaration<'a>(
    entry: &'a UnitEntry,
    id: &DeclarationId,
) -> Result<&'a DeclarationInfo, ServiceError> {
    entry
        .declarations
        .iter()
        .find(|info| &info.id == id)
        .ok_or_else(|| ServiceError::NotFound(id.path.clone()))
}

fn separator(kind: DeclarationKind) -> &'static str {
    if kind == DeclarationKind::Import {
        "\n"
    } else {
        "\n\n"
    }
}

fn insert_edits(
    entry: &UnitEntry,
    text: &str,
    anchor: &InsertAnchor,
    body: &str,
) -> Result<Vec<TextEdit>, ServiceError> {
    match anchor {
        InsertAnchor::Before(id) => {
            let info = find_declaration(entry, id)?;
            let indent = line_indent(text, info.range.offset);
            Ok(vec![TextEdit::insert(
                info.range.offset,
                format!("{}{}{indent}", reindent(body, &indent), separator(id.kind)),
            )])
        }
        InsertAnchor::After(id) => {
            let info = find_declaration(entry, id)?;
            let indent = line_indent(text, info.range.offset);
            Ok(vec![TextEdit::insert(
                info.range.end(),
                format!("{}{indent}{}", separator(id.kind), reindent(body, &indent)),
            )])
        }
        InsertAnchor::IntoType(id) => {
            let info = find_declaration(entry, id)?;
            let Some(type_body) = info.body_range else {
                return Err(ServiceError::Unsupported(format!("{} has no body", id.path)));
            };
            let type_indent = line_indent(text, info.range.offset);
            let last_member = entry
                .declarations
                .iter()
                .filter(|d| d.id.parent_type_path() == Some(id.path.as_str()))
                .last();
            if let Some(last) = last_member {
                let indent = line_indent(text, last.range.offset);
                let indent =
                    if indent.is_empty() { format!("{type_indent}{INDENT_UNIT}") } else { indent };
                return Ok(vec![TextEdit::insert(
                    last.range.end(),
                    format!("\n\n{indent}{}", reindent(body, &indent)),
                )]);
            }
            let member_indent = format!("{type_indent}{INDENT_UNIT}");
            let interior_start = type_body.offset + 1;
            let close = type_body.end().saturating_sub(1);
            let interior = &text[interior_start..close];
            let content_end = interior_start + interior.trim_end().len();
            let lead = if content_end == interior_start { "\n" } else { "\n\n" };
            Ok(vec![TextEdit::replace(
                content_end,
                close - content_end,
                format!("{lead}{member_indent}{}\n{type_indent}", reindent(body, &member_indent)),
            )])
        }
        InsertAnchor::EndOfUnit => {
            let anchor = entry
                .declarations
                .iter()
                .filter(|d| d.id.is_top_level_type() || d.id.kind == DeclarationKind::Import)
                .chain(
                    entry
                        .declarations
                        .iter()
                        .filter(|d| d.id.kind == DeclarationKind::NamespaceDeclaration),
                )
                .map(|d| d.range.end())
                .max();
            Ok(vec![match anchor {
                Some(end) => TextEdit::insert(end, format!("\n\n{body}")),
                None => TextEdit::insert(0, format!("{body}\n")),
            }])
        }
    }
}

fn remove_edit(text: &str, info: &DeclarationInfo) -> TextEdit {
    let start = info.range.offset;
    let end = info.range.end();
    let before = text[..start].trim_end().len();
    if before == 0 {
        let after = end + (text[end..].len() - text[end..].trim_start().len());
        return TextEdit::delete(0, after);
    }
    TextEdit::delete(before, end - before)
}

fn set_namespace_edits(entry: &UnitEntry, text: &str, name: &str) -> Vec<TextEdit> {
    match (&entry.parsed.namespace, name.is_empty()) {
        (Some(current), _) if current.name == name => Vec::new(),
        (Some(current), true) => {
            let end = current.range.end();
            let trailing = text[end..].len() - text[end..].trim_start().len();
            vec![TextEdit::delete(current.range.offset, current.range.length + trailing)]
        }
        (Some(current), false) => vec![TextEdit::replace(
            current.name_range.offset,
            current.name_range.length,
            name,
        )],
        (None, true) => Vec::new(),
        (None, false) => vec![TextEdit::insert(0, format!("package {name};\n\n"))],
    }
}

/// Rename identifier tokens spelling the old simple name outside the
/// header. Tokens qualified by something else (`x.Foo`) are left alone.
fn rename_type_edits(entry: &UnitEntry, text: &str, path: &str, new_name: &str) -> Vec<TextEdit> {
    let old = path.rsplit('.').next().unwrap_or(path);
    let header_end = entry
        .declarations
        .iter()
        .filter(|d| {
            matches!(d.id.kind, DeclarationKind::Import | DeclarationKind::NamespaceDeclaration)
        })
        .map(|d| d.range.end())
        .max()
        .unwrap_or(0);
    let tokens = &entry.parsed.tokens;
    tokens
        .iter()
        .enumerate()
        .filter(|(idx, token)| {
            token.kind == TokenKind::Ident
                && token.start >= header_end
                && token.text(text) == old
                && !(*idx > 0 && tokens[idx - 1].is_punct('.'))
        })
        .map(|(_, token)| TextEdit::replace(token.start, token.end - token.start, new_name))
        .collect()
}

impl AstRewriteService for Workspace {
    fn create_edits(&self, unit: &UnitId, op: &EditOp) -> Result<Vec<TextEdit>, ServiceError> {
        let (entry, text) = self.entry_and_text(unit)?;
        match op {
            EditOp::Insert { anchor, text: body } => insert_edits(entry, text, anchor, body),
            EditOp::Remove(id) => Ok(vec![remove_edit(text, find_declaration(entry, id)?)]),
            EditOp::Replace { declaration, text: body } => {
                let info = find_declaration(entry, declaration)?;
                Ok(vec![TextEdit::replace(info.range.offset, info.range.length, body.clone())])
            }
            EditOp::SetNamespace(name) => Ok(set_namespace_edits(entry, text, name)),
            EditOp::RenameType { path, new_name } => {
                Ok(rename_type_edits(entry, text, path, new_name))
            }
        }
    }

    fn rewrite_imports(
        &self,
        unit: &UnitId,
        rewrite: &ImportRewrite,
    ) -> Result<Vec<TextEdit>, ServiceError> {
        let (entry, text) = self.entry_and_text(unit)?;
        let existing: Vec<(ImportName, &DeclarationInfo)> = entry
            .declarations
            .iter()
            .filter(|info| info.id.kind == DeclarationKind::Import)
            .map(|info| (ImportName::from_declaration_path(&info.id.path), info))
            .collect();
        let mut removed: Vec<bool> = existing
            .iter()
            .map(|(name, _)| rewrite.removals.contains(name) && !rewrite.additions.contains(name))
            .collect();
        let kept: Vec<&ImportName> =
            existing.iter().zip(&removed).filter(|(_, gone)| !**gone).map(|((name, _), _)| name).collect();

        let namespace = unit.namespace.name.as_str();
        let mut additions: Vec<&ImportName> = rewrite
            .additions
            .iter()
            .filter(|add| add.name.contains('.'))
            .filter(|add| !existing.iter().any(|(name, _)| name == *add))
            .filter(|add| !(rewrite.filter_implicit && is_implicit(add, namespace)))
            .filter(|add| {
                !kept.iter().any(|name| {
                    name.is_on_demand()
                        && name.is_static == add.is_static
                        && name.container() == add.container()
                })
            })
            .collect();

        // A removed import whose simple name comes back is retargeted in place.
        let mut retargeted: Vec<Option<&ImportName>> = vec![None; existing.len()];
        for (idx, (old, _)) in existing.iter().enumerate() {
            if !removed[idx] || old.is_on_demand() {
                continue;
            }
            let same_name = additions.iter().position(|add| {
                !add.is_on_demand()
                    && add.is_static == old.is_static
                    && add.simple_name() == old.simple_name()
            });
            if let Some(pos) = same_name {
                retargeted[idx] = Some(additions.remove(pos));
                removed[idx] = false;
            }
        }
        let survivors: Vec<(&ImportName, &DeclarationInfo)> = existing
            .iter()
            .zip(&retargeted)
            .zip(&removed)
            .filter(|(_, gone)| !**gone)
            .map(|(((name, info), new), _)| (new.unwrap_or(name), *info))
            .collect();

        let any_removed = removed.iter().any(|gone| *gone);
        let any_retargeted = retargeted.iter().any(Option::is_some);
        if !any_removed && !any_retargeted && additions.is_empty() {
            return Ok(Vec::new());
        }
        let block =
            additions.iter().map(|add| add.statement()).collect::<Vec<_>>().join("\n");
        let package_end = entry.parsed.namespace.as_ref().map(|ns| ns.range.end());

        let (Some((_, first)), Some((_, last))) = (existing.first(), existing.last()) else {
            return Ok(vec![match package_end {
                Some(end) => TextEdit::insert(end, format!("\n\n{block}")),
                None => TextEdit::insert(0, format!("{block}\n\n")),
            }]);
        };

        if survivors.is_empty() {
            if !additions.is_empty() {
                let start = first.range.offset;
                return Ok(vec![TextEdit::replace(start, last.range.end() - start, block)]);
            }
            return Ok(vec![match package_end {
                Some(end) => TextEdit::delete(end, last.range.end() - end),
                None => {
                    let end = last.range.end();
                    let trailing = text[end..].len() - text[end..].trim_start().len();
                    TextEdit::delete(first.range.offset, end + trailing - first.range.offset)
                }
            }]);
        }

        let mut edits: Vec<TextEdit> = existing
            .iter()
            .zip(&retargeted)
            .filter_map(|((_, info), new)| {
                new.map(|new| TextEdit::replace(info.name_range.offset, info.name_range.length, new.name.clone()))
            })
            .collect();
        let mut idx = 0usize;
        while idx < existing.len() {
            if !removed[idx] {
                idx += 1;
                continue;
            }
            let run_start = idx;
            while idx < existing.len() && removed[idx] {
                idx += 1;
            }
            let run_last = existing[idx - 1].1;
            if run_start > 0 {
                let predecessor = existing[run_start - 1].1;
                let from = predecessor.range.end();
                edits.push(TextEdit::delete(from, run_last.range.end() - from));
            } else {
                // A removal run at the very top always has a surviving successor.
                let successor = existing[idx].1;
                let from = existing[run_start].1.range.offset;
                edits.push(TextEdit::delete(from, successor.range.offset - from));
            }
        }

        for add in additions {
            let anchor = survivors.iter().filter(|(name, _)| *name <= add).last();
            match anchor {
                Some((_, info)) => {
                    edits.push(TextEdit::insert(info.range.end(), format!("\n{}", add.statement())))
                }
                None => {
                    let first_survivor = survivors[0].1;
                    edits.push(TextEdit::insert(
                        first_survivor.range.offset,
                        format!("{}\n", add.statement()),
                    ));
                }
            }
        }
        Ok(edits)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{unit, workspace};
    use super::*;
    use crate::change::apply_edits;
    use similar_asserts::assert_eq;

    fn rewrite_with(source: &str, build: impl FnOnce(&mut ImportRewrite)) -> String {
        let (_tmp, ws) = workspace(&[("src/pkg/a/Bar.java", source)]);
        let id = unit(&ws, "src/pkg/a/Bar.java");
        let mut rewrite = ImportRewrite::default();
        build(&mut rewrite);
        let edits = ws.rewrite_imports(&id, &rewrite).expect("rewrite");
        let (changed, undo) = apply_edits(source, &edits).expect("apply");
        let (restored, _) = apply_edits(&changed, &undo).expect("undo");
        assert_eq!(restored, source);
        changed
    }

    #[test]
    fn first_import_goes_below_the_package() {
        let source = "package pkg.a;\n\npublic class Bar {\n    Foo foo;\n}\n";
        let changed = rewrite_with(source, |r| r.add_import("pkg.b.Foo"));
        assert_eq!(
            changed,
            "package pkg.a;\n\nimport pkg.b.Foo;\n\npublic class Bar {\n    Foo foo;\n}\n"
        );
    }

    #[test]
    fn removing_the_last_import_restores_the_header() {
        let source = "package pkg.a;\n\nimport pkg.b.Foo;\n\npublic class Bar {}\n";
        let changed = rewrite_with(source, |r| {
            r.remove_import("pkg.b.Foo");
            r.add_import("pkg.a.Foo");
        });
        assert_eq!(changed, "package pkg.a;\n\npublic class Bar {}\n");
    }

    #[test]
    fn additions_are_sorted_into_the_block() {
        let source =
            "package pkg.a;\n\nimport java.util.List;\nimport pkg.c.Qux;\nimport pkg.d.Old;\n\nclass Bar {}\n";
        let changed = rewrite_with(source, |r| {
            r.add_import("pkg.b.Foo");
            r.add_import("java.lang.String");
            r.remove_import("pkg.d.Old");
            r.add_static_import("pkg.b.Foo", "MAX");
        });
        assert_eq!(
            changed,
            "package pkg.a;\n\nimport java.util.List;\nimport pkg.b.Foo;\nimport pkg.c.Qux;\nimport static pkg.b.Foo.MAX;\n\nclass Bar {}\n"
        );
    }

    #[test]
    fn retargeted_imports_keep_their_slot() {
        let source = "package pkg.a;\n\nimport zeta.Z;\nimport pkg.c.Foo;\nimport alpha.A;\n\nclass Bar {}\n";
        let changed = rewrite_with(source, |r| {
            r.remove_import("pkg.c.Foo");
            r.add_import("pkg.b.Foo");
            r.add_import("pkg.b.Extra");
        });
        assert_eq!(
            changed,
            "package pkg.a;\n\nimport zeta.Z;\nimport pkg.b.Foo;\nimport alpha.A;\nimport pkg.b.Extra;\n\nclass Bar {}\n"
        );
    }

    #[test]
    fn on_demand_imports_cover_additions() {
        let source = "package pkg.a;\n\nimport pkg.b.*;\n\nclass Bar {}\n";
        let (_tmp, ws) = workspace(&[("src/pkg/a/Bar.java", source)]);
        let id = unit(&ws, "src/pkg/a/Bar.java");
        let mut rewrite = ImportRewrite::default();
        rewrite.add_import("pkg.b.Foo");
        assert!(ws.rewrite_imports(&id, &rewrite).expect("rewrite").is_empty());
    }

    #[test]
    fn insert_into_empty_type_and_remove_member() {
        let source = "package pkg.a;\n\nclass Bar {\n}\n\nclass Baz {\n    int y;\n\n    int x = 1;\n}\n";
        let (_tmp, ws) = workspace(&[("src/pkg/a/Bar.java", source)]);
        let id = unit(&ws, "src/pkg/a/Bar.java");
        let bar = DeclarationId::new(id.clone(), DeclarationKind::Type, "Bar", 0);
        let x = DeclarationId::new(id.clone(), DeclarationKind::Field, "Baz.x", 0);

        let mut edits = ws
            .create_edits(&id, &EditOp::Insert {
                anchor: InsertAnchor::IntoType(bar),
                text: "int x = 1;".to_string(),
            })
            .expect("insert");
        edits.extend(ws.create_edits(&id, &EditOp::Remove(x)).expect("remove"));
        let (changed, _) = apply_edits(source, &edits).expect("apply");
        assert_eq!(
            changed,
            "package pkg.a;\n\nclass Bar {\n    int x = 1;\n}\n\nclass Baz {\n    int y;\n}\n"
        );
    }

    #[test]
    fn namespace_and_type_renames() {
        let source = "package pkg.a;\n\n/** Foo docs. */\npublic class Foo {\n    public Foo() {}\n    Foo self() { return new Foo(); }\n    other.Foo o;\n}\n";
        let (_tmp, ws) = workspace(&[("src/pkg/a/Foo.java", source)]);
        let id = unit(&ws, "src/pkg/a/Foo.java");
        let mut edits = ws.create_edits(&id, &EditOp::SetNamespace("pkg.b".into())).expect("ns");
        edits.extend(
            ws.create_edits(
                &id,
                &EditOp::RenameType { path: "Foo".into(), new_name: "CopyOfFoo".into() },
            )
            .expect("rename"),
        );
        let (changed, _) = apply_edits(source, &edits).expect("apply");
        assert_eq!(
            changed,
            "package pkg.b;\n\n/** Foo docs. */\npublic class CopyOfFoo {\n    public CopyOfFoo() {}\n    CopyOfFoo self() { return new CopyOfFoo(); }\n    other.Foo o;\n}\n"
        );
    }
}
