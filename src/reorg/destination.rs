//! Structural legality of a destination, shared by every policy.

use crate::domain::{Destination, Element, NamespaceId, ResourcePath, SelectionItem};
use crate::services::{ResourceKind, SourceModel};
use crate::status::Validation;

/// Checks every policy runs before its own kind-specific rules. The order
/// matters: the first failing check names the problem.
pub fn verify_common(
    model: &dyn SourceModel,
    items: &[SelectionItem],
    destination: &Destination,
    allow_pseudo_root: bool,
) -> Validation {
    let target = &destination.target;
    if !model.exists(target) {
        return Validation::fatal(format!("The destination '{}' does not exist.", target.label()));
    }
    if let SelectionItem::Resource { path } = target {
        if model.resource_kind(path) == Some(ResourceKind::Root) && !allow_pseudo_root {
            return Validation::fatal("The workspace root is not a valid destination.");
        }
    }
    if model.item_is_read_only(target) {
        return Validation::fatal(format!("The destination '{}' is read-only.", target.label()));
    }
    if !model.item_structure_known(target) {
        return Validation::fatal(format!(
            "The structure of '{}' is not known. Fix its syntax errors first.",
            target.label()
        ));
    }
    if model.item_is_archive(target) {
        return Validation::fatal(format!(
            "The destination '{}' is inside a library and cannot be changed.",
            target.label()
        ));
    }

    let canonical_target = model.canonical(target);
    for item in items {
        if is_same_or_inside(model, target, item) {
            return Validation::fatal(format!(
                "'{}' cannot be moved or copied into itself.",
                item.label()
            ));
        }
        let parent = model.parent(item).map(|parent| model.canonical(&parent));
        if parent.as_ref() == Some(&canonical_target) {
            return Validation::fatal(format!(
                "'{}' is already in '{}'.",
                item.label(),
                target.label()
            ));
        }
    }
    Validation::Ok
}

/// Whether `target` is `item` or lies anywhere below it.
fn is_same_or_inside(model: &dyn SourceModel, target: &SelectionItem, item: &SelectionItem) -> bool {
    if let (
        SelectionItem::Element(Element::Declaration(target)),
        SelectionItem::Element(Element::Declaration(item)),
    ) = (target, item)
    {
        return target == item || target.is_inside(item);
    }
    if matches!(item, SelectionItem::Element(Element::Declaration(_))) {
        return false;
    }
    match (model.backing_resource(target), model.backing_resource(item)) {
        (Some(target), Some(item)) => target.is_same_or_descendant_of(&item),
        _ => false,
    }
}

/// A destination that files can be created in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerTarget {
    pub folder: ResourcePath,
    /// Set when the folder is a namespace (or a source root, as its default
    /// namespace).
    pub namespace: Option<NamespaceId>,
}

pub fn resolve_container(model: &dyn SourceModel, target: &SelectionItem) -> Option<ContainerTarget> {
    let folder = match target {
        SelectionItem::Resource { path } => match model.resource_kind(path)? {
            ResourceKind::Root | ResourceKind::Folder => path.clone(),
            ResourceKind::File => return None,
        },
        SelectionItem::Element(element @ (Element::SourceRoot { .. } | Element::Namespace(_))) => {
            model.resource_of(element)?
        }
        SelectionItem::Element(_) => return None,
    };
    Some(ContainerTarget { folder, namespace: model.as_namespace(target) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workspace::test_support::workspace;

    fn item(handle: &str) -> SelectionItem {
        handle.parse().expect("handle")
    }

    #[test]
    fn self_and_parent_are_fatal() {
        let (_tmp, ws) = workspace(&[
            ("src/pkg/a/Foo.java", "package pkg.a;\nclass Foo {\n    int x;\n}\n"),
            ("src/pkg/b/Baz.java", "package pkg.b;\nclass Baz {}\n"),
        ]);
        let foo = item("=src<pkg.a{Foo.java");
        for target in ["=src<pkg.a", "=src<pkg.a{Foo.java", "/src/pkg/a"] {
            let validation = verify_common(&ws, &[foo.clone()], &Destination::on(item(target)), false);
            assert!(!validation.is_ok(), "{target} should be rejected");
        }
        let ok = verify_common(&ws, &[foo], &Destination::on(item("=src<pkg.b")), false);
        assert!(ok.is_ok());

        let field = item("=src<pkg.a{Foo.java[field:Foo.x#0");
        let own_type = Destination::on(item("=src<pkg.a{Foo.java[type:Foo#0"));
        assert!(!verify_common(&ws, &[field.clone()], &own_type, false).is_ok());
        let itself = Destination::on(field.clone());
        assert!(!verify_common(&ws, &[field], &itself, false).is_ok());
    }

    #[test]
    fn folder_into_its_own_subfolder_is_fatal() {
        let (_tmp, ws) = workspace(&[("docs/a/b/readme.txt", "x"), ("other/keep.txt", "y")]);
        let docs = item("/docs/a");
        let validation = verify_common(&ws, &[docs.clone()], &Destination::on(item("/docs/a/b")), false);
        assert_eq!(validation, Validation::fatal("'docs/a' cannot be moved or copied into itself."));
        assert!(verify_common(&ws, &[docs], &Destination::on(item("/other")), false).is_ok());
    }

    #[test]
    fn pseudo_root_and_libraries_are_rejected() {
        let (_tmp, ws) = workspace(&[
            ("docs/readme.txt", "x"),
            ("lib/ext/Api.java", "package ext;\npublic class Api {}\n"),
        ]);
        let readme = item("/docs/readme.txt");
        let root = Destination::on(SelectionItem::resource(ResourcePath::root()));
        assert!(!verify_common(&ws, &[readme.clone()], &root, false).is_ok());
        assert!(verify_common(&ws, &[readme.clone()], &root, true).is_ok());
        let library = Destination::on(item("=lib<ext"));
        assert!(!verify_common(&ws, &[readme], &library, false).is_ok());
    }

    #[test]
    fn containers_resolve_to_folders() {
        let (_tmp, ws) = workspace(&[("src/pkg/a/Foo.java", "package pkg.a;\nclass Foo {}\n")]);
        let target = resolve_container(&ws, &item("/src/pkg/a")).expect("container");
        assert_eq!(target.folder.as_str(), "src/pkg/a");
        assert_eq!(target.namespace.map(|ns| ns.name), Some("pkg.a".to_string()));
        let root = resolve_container(&ws, &item("=src")).expect("root");
        assert_eq!(root.namespace.map(|ns| ns.name), Some(String::new()));
        assert!(resolve_container(&ws, &item("=src<pkg.a{Foo.java")).is_none());
    }
}
