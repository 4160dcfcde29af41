//! Picks exactly one policy for a selection.
//!
//! Pure and side-effect free: the model is only read. Mixed granularities
//! are never split up; anything the rules below do not accept ends in the
//! null policy.

use super::policies::{
    FileLikePolicy, ImportMovePolicy, MemberMovePolicy, NamespacePolicy, NullPolicy,
    SourceRootPolicy, SubFileCopyPolicy,
};
use super::policy::ReorgPolicy;
use crate::domain::{DeclarationKind, Element, ReorgMode, SelectionItem};
use crate::services::{ResourceKind, SourceModel};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyKind {
    Resources,
    Namespaces,
    Roots,
    Members,
    Imports,
    SubFile,
    None,
}

impl PolicyKind {
    pub fn id(&self, mode: ReorgMode) -> &'static str {
        match (self, mode) {
            (PolicyKind::Resources, ReorgMode::Move) => "moveResources",
            (PolicyKind::Resources, ReorgMode::Copy) => "copyResources",
            (PolicyKind::Namespaces, ReorgMode::Move) => "moveNamespaces",
            (PolicyKind::Namespaces, ReorgMode::Copy) => "copyNamespaces",
            (PolicyKind::Roots, ReorgMode::Move) => "moveRoots",
            (PolicyKind::Roots, ReorgMode::Copy) => "copyRoots",
            (PolicyKind::Members, _) => "moveMembers",
            (PolicyKind::Imports, _) => "moveImports",
            (PolicyKind::SubFile, _) => "copyMembers",
            (PolicyKind::None, _) => "no_policy",
        }
    }
}

/// The selection the policies actually work on: resources backed by a
/// language element become that element, and a top-level type that is the
/// only type of its file stands for the whole file. Duplicates are dropped.
pub fn actual_selection(model: &dyn SourceModel, items: &[SelectionItem]) -> Vec<SelectionItem> {
    let mut actual: Vec<SelectionItem> = Vec::with_capacity(items.len());
    for item in items {
        let resolved = match item {
            SelectionItem::Resource { path } if !path.is_root() => {
                match model.element_for_resource(path) {
                    Some(element) => SelectionItem::Element(element),
                    None => item.clone(),
                }
            }
            SelectionItem::Element(Element::Declaration(decl))
                if decl.is_top_level_type() && model.top_level_types(&decl.unit).len() == 1 =>
            {
                SelectionItem::Element(Element::SourceFile(decl.unit.clone()))
            }
            _ => item.clone(),
        };
        if !actual.contains(&resolved) {
            actual.push(resolved);
        }
    }
    actual
}

pub fn policy_kind(model: &dyn SourceModel, mode: ReorgMode, items: &[SelectionItem]) -> PolicyKind {
    if items.is_empty() || items.iter().any(|item| !model.exists(item)) {
        return PolicyKind::None;
    }
    let is_root = |item: &SelectionItem| matches!(item, SelectionItem::Element(Element::SourceRoot { .. }));
    let workspace_root = items.iter().any(|item| match item {
        SelectionItem::Resource { path } => model.resource_kind(path) == Some(ResourceKind::Root),
        SelectionItem::Element(_) => false,
    });
    if workspace_root {
        return PolicyKind::None;
    }
    if items.iter().any(|item| model.item_is_archive(item)) && !items.iter().all(is_root) {
        return PolicyKind::None;
    }
    if !share_parent(model, items) {
        return PolicyKind::None;
    }

    let elements: Vec<&Element> = items.iter().filter_map(SelectionItem::as_element).collect();
    let declarations: Vec<DeclarationKind> =
        elements.iter().filter_map(|e| e.as_declaration()).map(|decl| decl.kind).collect();
    let only_elements = elements.len() == items.len();

    if only_elements && elements.iter().all(|e| matches!(e, Element::Namespace(_))) {
        return PolicyKind::Namespaces;
    }
    if items.iter().all(is_root) {
        return PolicyKind::Roots;
    }
    let file_like = |item: &SelectionItem| {
        matches!(item, SelectionItem::Resource { .. } | SelectionItem::Element(Element::SourceFile(_)))
    };
    if items.iter().all(file_like) {
        return PolicyKind::Resources;
    }
    if !only_elements || declarations.len() != elements.len() {
        return PolicyKind::None;
    }
    if declarations.iter().all(DeclarationKind::is_member) {
        return match mode {
            ReorgMode::Move => PolicyKind::Members,
            ReorgMode::Copy => PolicyKind::SubFile,
        };
    }
    if declarations.iter().all(|kind| *kind == DeclarationKind::Import) {
        return match mode {
            ReorgMode::Move => PolicyKind::Imports,
            ReorgMode::Copy => PolicyKind::SubFile,
        };
    }
    if mode == ReorgMode::Copy && !declarations.contains(&DeclarationKind::NamespaceDeclaration) {
        return PolicyKind::SubFile;
    }
    PolicyKind::None
}

fn share_parent(model: &dyn SourceModel, items: &[SelectionItem]) -> bool {
    let mut parents = items.iter().map(|item| model.parent(item).map(|p| model.canonical(&p)));
    match parents.next() {
        Some(Some(first)) => parents.all(|parent| parent.as_ref() == Some(&first)),
        _ => false,
    }
}

/// Total: every selection yields exactly one policy, the null policy when
/// nothing else applies.
pub fn classify(model: &dyn SourceModel, mode: ReorgMode, items: &[SelectionItem]) -> Box<dyn ReorgPolicy> {
    let actual = actual_selection(model, items);
    let kind = policy_kind(model, mode, &actual);
    tracing::debug!("Selection of {} item(s) classified as {}", actual.len(), kind.id(mode));
    match kind {
        PolicyKind::Resources => Box::new(FileLikePolicy::new(mode, &actual)),
        PolicyKind::Namespaces => Box::new(NamespacePolicy::new(mode, &actual)),
        PolicyKind::Roots => Box::new(SourceRootPolicy::new(mode, &actual)),
        PolicyKind::Members => Box::new(MemberMovePolicy::new(&actual)),
        PolicyKind::Imports => Box::new(ImportMovePolicy::new(&actual)),
        PolicyKind::SubFile => Box::new(SubFileCopyPolicy::new(&actual)),
        PolicyKind::None => Box::new(NullPolicy::new(mode, &actual)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workspace::test_support::workspace;

    fn items(handles: &[&str]) -> Vec<SelectionItem> {
        handles.iter().map(|h| h.parse().expect("handle")).collect()
    }

    fn fixture() -> (tempfile::TempDir, crate::workspace::Workspace) {
        workspace(&[
            (
                "src/pkg/a/Foo.java",
                "package pkg.a;\n\nimport java.util.List;\n\npublic class Foo {\n    int x;\n    void run() {}\n}\n",
            ),
            ("src/pkg/a/Two.java", "package pkg.a;\nclass Two {}\nclass Other {\n    int y;\n}\n"),
            ("src/pkg/b/Baz.java", "package pkg.b;\nclass Baz {}\n"),
            ("docs/readme.txt", "hello"),
            ("docs/notes.txt", "notes"),
            ("lib/ext/Api.java", "package ext;\npublic class Api {}\n"),
        ])
    }

    #[test]
    fn selections_map_to_one_policy() {
        let (_tmp, ws) = fixture();
        let cases: &[(&[&str], ReorgMode, &str)] = &[
            (&["/docs/readme.txt", "/docs/notes.txt"], ReorgMode::Move, "moveResources"),
            (&["/src/pkg/a/Foo.java", "=src<pkg.a{Two.java"], ReorgMode::Copy, "copyResources"),
            (&["=src<pkg.a", "=src<pkg.b"], ReorgMode::Move, "moveNamespaces"),
            (&["=src"], ReorgMode::Copy, "copyRoots"),
            (&["=src<pkg.a{Foo.java[field:Foo.x#0", "=src<pkg.a{Foo.java[method:Foo.run#0"], ReorgMode::Move, "moveMembers"),
            (&["=src<pkg.a{Foo.java[import:java.util.List#0"], ReorgMode::Move, "moveImports"),
            (&["=src<pkg.a{Foo.java[field:Foo.x#0"], ReorgMode::Copy, "copyMembers"),
            (&["=src<pkg.a{Two.java[type:Two#0", "=src<pkg.a{Two.java[type:Other#0"], ReorgMode::Move, "moveMembers"),
            // Different parents.
            (&["=src<pkg.a{Foo.java[field:Foo.x#0", "=src<pkg.a{Two.java[field:Other.y#0"], ReorgMode::Move, "no_policy"),
            // Mixed granularity.
            (&["=src<pkg.a", "/docs/readme.txt"], ReorgMode::Move, "no_policy"),
            (&["=src<pkg.a{Foo.java[package:pkg.a#0"], ReorgMode::Copy, "no_policy"),
            (&["=lib<ext{Api.java"], ReorgMode::Copy, "no_policy"),
            (&["/docs/missing.txt"], ReorgMode::Move, "no_policy"),
            (&["/"], ReorgMode::Move, "no_policy"),
            (&[], ReorgMode::Copy, "no_policy"),
        ];
        for (handles, mode, expected) in cases {
            let policy = classify(&ws, *mode, &items(handles));
            assert_eq!(policy.policy_id(), *expected, "selection {handles:?}");
        }
    }

    #[test]
    fn sole_top_level_type_stands_for_its_file() {
        let (_tmp, ws) = fixture();
        let actual = actual_selection(
            &ws,
            &items(&["=src<pkg.a{Foo.java[type:Foo#0", "/src/pkg/a/Foo.java", "=src<pkg.a{Two.java[type:Two#0"]),
        );
        assert_eq!(
            actual,
            items(&["=src<pkg.a{Foo.java", "=src<pkg.a{Two.java[type:Two#0"])
        );
    }
}
