//! Read-only view of the workspace and its language model.

use crate::domain::{
    DeclarationId, DeclarationInfo, DeclarationKind, Element, NamespaceId, ResourcePath,
    SelectionItem, UnitId,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    /// The workspace root; a pseudo-root container that cannot be selected.
    Root,
    Folder,
    File,
}

pub trait SourceModel {
    fn resource_kind(&self, path: &ResourcePath) -> Option<ResourceKind>;

    /// Direct children of a folder, sorted.
    fn members(&self, folder: &ResourcePath) -> Vec<ResourcePath>;

    /// Language element backed by `path`, if any.
    fn element_for_resource(&self, path: &ResourcePath) -> Option<Element>;

    fn element_exists(&self, element: &Element) -> bool;

    fn source_roots(&self) -> Vec<ResourcePath>;

    /// Non-default namespaces of a root plus its default namespace.
    fn namespaces(&self, root: &ResourcePath) -> Vec<NamespaceId>;

    fn units(&self, namespace: &NamespaceId) -> Vec<UnitId>;

    /// All declarations of a file in source order (nested ones included).
    fn declarations(&self, unit: &UnitId) -> Vec<DeclarationInfo>;

    /// Decoded text of a text file.
    fn text(&self, file: &ResourcePath) -> Option<&str>;

    fn content_hash(&self, file: &ResourcePath) -> Option<&str>;

    fn is_read_only(&self, path: &ResourcePath) -> bool;

    /// Inside a library root, or a compiled artifact.
    fn is_archive(&self, path: &ResourcePath) -> bool;

    /// False when the file could not be fully parsed.
    fn is_structure_known(&self, unit: &UnitId) -> bool;

    /// On-disk state still matches what the model was built from.
    fn is_in_sync(&self, path: &ResourcePath) -> bool;

    /// Every decoded non-source text file.
    fn text_files(&self) -> Vec<ResourcePath>;

    fn resource_of(&self, element: &Element) -> Option<ResourcePath> {
        match element {
            Element::SourceRoot { path } => Some(path.clone()),
            Element::Namespace(ns) => Some(ns.folder()),
            Element::SourceFile(unit) => Some(unit.path()),
            Element::Declaration(_) => None,
        }
    }

    fn exists(&self, item: &SelectionItem) -> bool {
        match item {
            SelectionItem::Resource { path } => self.resource_kind(path).is_some(),
            SelectionItem::Element(element) => self.element_exists(element),
        }
    }

    /// Every fragment of the dotted namespace `name` across all roots.
    fn fragments(&self, name: &str) -> Vec<NamespaceId> {
        self.source_roots()
            .into_iter()
            .flat_map(|root| self.namespaces(&root))
            .filter(|ns| ns.name == name)
            .collect()
    }

    fn declaration(&self, id: &DeclarationId) -> Option<DeclarationInfo> {
        self.declarations(&id.unit).into_iter().find(|info| &info.id == id)
    }

    fn types(&self, unit: &UnitId) -> Vec<DeclarationInfo> {
        self.declarations(unit)
            .into_iter()
            .filter(|info| info.id.kind == DeclarationKind::Type)
            .collect()
    }

    fn top_level_types(&self, unit: &UnitId) -> Vec<DeclarationInfo> {
        self.declarations(unit).into_iter().filter(|info| info.id.is_top_level_type()).collect()
    }

    fn imports(&self, unit: &UnitId) -> Vec<DeclarationInfo> {
        self.declarations(unit)
            .into_iter()
            .filter(|info| info.id.kind == DeclarationKind::Import)
            .collect()
    }

    fn unit_text(&self, unit: &UnitId) -> Option<&str> {
        self.text(&unit.path())
    }

    /// Direct children of a type declaration, in source order.
    fn type_members(&self, ty: &DeclarationId) -> Vec<DeclarationInfo> {
        self.declarations(&ty.unit)
            .into_iter()
            .filter(|info| info.id.parent_type_path() == Some(ty.path.as_str()))
            .collect()
    }

    /// Structural parent. Resources have folder parents, elements have model
    /// parents; a source root's parent is the folder that contains it.
    fn parent(&self, item: &SelectionItem) -> Option<SelectionItem> {
        match item {
            SelectionItem::Resource { path } => path.parent().map(SelectionItem::resource),
            SelectionItem::Element(element) => match element {
                Element::SourceRoot { path } => path.parent().map(SelectionItem::resource),
                Element::Namespace(ns) => {
                    Some(Element::SourceRoot { path: ns.root.clone() }.into())
                }
                Element::SourceFile(unit) => Some(Element::Namespace(unit.namespace.clone()).into()),
                Element::Declaration(decl) => Some(match decl.parent_type() {
                    Some(ty) => Element::Declaration(ty).into(),
                    None => Element::SourceFile(decl.unit.clone()).into(),
                }),
            },
        }
    }

    /// Elements with a backing resource compare as that resource.
    fn canonical(&self, item: &SelectionItem) -> SelectionItem {
        match item {
            SelectionItem::Element(element) => match self.resource_of(element) {
                Some(path) => SelectionItem::resource(path),
                None => item.clone(),
            },
            SelectionItem::Resource { .. } => item.clone(),
        }
    }

    /// Backing file or folder; declarations use their file.
    fn backing_resource(&self, item: &SelectionItem) -> Option<ResourcePath> {
        match item {
            SelectionItem::Resource { path } => Some(path.clone()),
            SelectionItem::Element(Element::Declaration(decl)) => Some(decl.unit.path()),
            SelectionItem::Element(element) => self.resource_of(element),
        }
    }

    fn item_is_read_only(&self, item: &SelectionItem) -> bool {
        self.backing_resource(item).is_some_and(|path| self.is_read_only(&path))
    }

    fn item_is_archive(&self, item: &SelectionItem) -> bool {
        self.backing_resource(item).is_some_and(|path| self.is_archive(&path))
    }

    fn item_structure_known(&self, item: &SelectionItem) -> bool {
        match item {
            SelectionItem::Element(element) => match element.unit() {
                Some(unit) => self.is_structure_known(unit),
                None => true,
            },
            SelectionItem::Resource { path } => match self.element_for_resource(path) {
                Some(Element::SourceFile(unit)) => self.is_structure_known(&unit),
                _ => true,
            },
        }
    }

    /// The folder-like element or resource new entries would be created in.
    fn as_namespace(&self, item: &SelectionItem) -> Option<NamespaceId> {
        match item {
            SelectionItem::Element(Element::Namespace(ns)) => Some(ns.clone()),
            SelectionItem::Element(Element::SourceRoot { path }) => {
                Some(NamespaceId::new(path.clone(), ""))
            }
            SelectionItem::Resource { path } => match self.element_for_resource(path) {
                Some(Element::Namespace(ns)) => Some(ns),
                Some(Element::SourceRoot { path }) => Some(NamespaceId::new(path, "")),
                _ => None,
            },
            _ => None,
        }
    }
}
