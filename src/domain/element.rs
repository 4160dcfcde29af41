//! Selection items, language elements and destinations.
//!
//! Elements are addressed by stable handles (root path, dotted namespace,
//! file name, declaration kind + path + ordinal) and never by live syntax
//! nodes, so they survive a re-parse between phases.

use crate::utils::paths::{file_name, join_path, normalize_path, parent_path, strip_extension};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Workspace-relative, `/`-separated path. The empty path is the workspace
/// root (the pseudo-root container).
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourcePath(String);

impl ResourcePath {
    pub fn new(path: impl AsRef<str>) -> Self {
        Self(normalize_path(path.as_ref()))
    }

    pub fn root() -> Self {
        Self(String::new())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn name(&self) -> &str {
        file_name(&self.0)
    }

    pub fn parent(&self) -> Option<ResourcePath> {
        parent_path(&self.0).map(ResourcePath)
    }

    pub fn join(&self, name: &str) -> ResourcePath {
        ResourcePath(join_path(&self.0, name))
    }

    /// Sibling path with the last segment replaced.
    pub fn with_name(&self, name: &str) -> ResourcePath {
        match self.parent() {
            Some(parent) => parent.join(name),
            None => ResourcePath::new(name),
        }
    }

    pub fn extension(&self) -> Option<&str> {
        let name = self.name();
        match name.rfind('.') {
            Some(0) | None => None,
            Some(idx) => Some(&name[idx + 1..]),
        }
    }

    /// Strict descendant check.
    pub fn is_descendant_of(&self, ancestor: &ResourcePath) -> bool {
        if self == ancestor {
            return false;
        }
        if ancestor.is_root() {
            return true;
        }
        self.0.len() > ancestor.0.len()
            && self.0.starts_with(&ancestor.0)
            && self.0.as_bytes()[ancestor.0.len()] == b'/'
    }

    pub fn is_same_or_descendant_of(&self, ancestor: &ResourcePath) -> bool {
        self == ancestor || self.is_descendant_of(ancestor)
    }

    /// Path of `self` below `ancestor`, if it is one.
    pub fn relative_to(&self, ancestor: &ResourcePath) -> Option<&str> {
        if self == ancestor {
            return Some("");
        }
        if !self.is_descendant_of(ancestor) {
            return None;
        }
        if ancestor.is_root() {
            Some(&self.0)
        } else {
            Some(&self.0[ancestor.0.len() + 1..])
        }
    }
}

impl fmt::Display for ResourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            write!(f, "<workspace>")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// A namespace (package) inside one source root. The same dotted name may
/// exist in several roots; each is a separate fragment.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NamespaceId {
    pub root: ResourcePath,
    pub name: String,
}

impl NamespaceId {
    pub fn new(root: ResourcePath, name: impl Into<String>) -> Self {
        Self { root, name: name.into() }
    }

    pub fn is_default(&self) -> bool {
        self.name.is_empty()
    }

    pub fn folder(&self) -> ResourcePath {
        if self.name.is_empty() {
            self.root.clone()
        } else {
            self.root.join(&self.name.replace('.', "/"))
        }
    }

    pub fn last_segment(&self) -> &str {
        match self.name.rfind('.') {
            Some(idx) => &self.name[idx + 1..],
            None => &self.name,
        }
    }

    /// `pkg.a` + `Foo` -> `pkg.a.Foo`; the default namespace adds nothing.
    pub fn qualify(&self, simple: &str) -> String {
        qualify(&self.name, simple)
    }

    /// Another fragment of the same dotted name, or this very fragment.
    pub fn is_same_namespace(&self, other: &NamespaceId) -> bool {
        self.name == other.name
    }

    pub fn with_root(&self, root: ResourcePath) -> NamespaceId {
        NamespaceId { root, name: self.name.clone() }
    }
}

pub fn qualify(namespace: &str, simple: &str) -> String {
    if namespace.is_empty() {
        simple.to_string()
    } else {
        format!("{namespace}.{simple}")
    }
}

/// A source file inside a namespace.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UnitId {
    pub namespace: NamespaceId,
    pub name: String,
}

impl UnitId {
    pub fn new(namespace: NamespaceId, name: impl Into<String>) -> Self {
        Self { namespace, name: name.into() }
    }

    pub fn path(&self) -> ResourcePath {
        self.namespace.folder().join(&self.name)
    }

    /// Name of the type a file is expected to declare (`Foo.java` -> `Foo`).
    pub fn primary_type_name(&self) -> &str {
        strip_extension(&self.name)
    }

    pub fn in_namespace(&self, namespace: NamespaceId) -> UnitId {
        UnitId { namespace, name: self.name.clone() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclarationKind {
    Type,
    Field,
    Method,
    Initializer,
    Import,
    NamespaceDeclaration,
}

impl DeclarationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeclarationKind::Type => "type",
            DeclarationKind::Field => "field",
            DeclarationKind::Method => "method",
            DeclarationKind::Initializer => "initializer",
            DeclarationKind::Import => "import",
            DeclarationKind::NamespaceDeclaration => "package",
        }
    }

    /// Kinds that live in a type body (or, for types, at the top level).
    pub fn is_member(&self) -> bool {
        matches!(
            self,
            DeclarationKind::Type
                | DeclarationKind::Field
                | DeclarationKind::Method
                | DeclarationKind::Initializer
        )
    }
}

impl FromStr for DeclarationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "type" => Ok(DeclarationKind::Type),
            "field" => Ok(DeclarationKind::Field),
            "method" => Ok(DeclarationKind::Method),
            "initializer" => Ok(DeclarationKind::Initializer),
            "import" => Ok(DeclarationKind::Import),
            "package" => Ok(DeclarationKind::NamespaceDeclaration),
            other => Err(format!("unknown declaration kind '{other}'")),
        }
    }
}

/// A declaration inside a source file.
///
/// `path` is the dotted path of the declaration inside its file
/// (`Foo`, `Foo.Inner`, `Foo.x`). Imports use the imported name
/// (`pkg.b.Baz`, `pkg.b.*`, `static pkg.T.m`), the namespace declaration
/// uses the namespace name. `ordinal` separates overloads and repeated
/// initializers sharing a path.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DeclarationId {
    pub unit: UnitId,
    pub kind: DeclarationKind,
    pub path: String,
    pub ordinal: usize,
}

impl DeclarationId {
    pub fn new(unit: UnitId, kind: DeclarationKind, path: impl Into<String>, ordinal: usize) -> Self {
        Self { unit, kind, path: path.into(), ordinal }
    }

    pub fn simple_name(&self) -> &str {
        match self.kind {
            DeclarationKind::Import | DeclarationKind::NamespaceDeclaration => &self.path,
            _ => match self.path.rfind('.') {
                Some(idx) => &self.path[idx + 1..],
                None => &self.path,
            },
        }
    }

    /// Dotted path of the enclosing type, `None` at file level.
    pub fn parent_type_path(&self) -> Option<&str> {
        match self.kind {
            DeclarationKind::Import | DeclarationKind::NamespaceDeclaration => None,
            _ => self.path.rfind('.').map(|idx| &self.path[..idx]),
        }
    }

    pub fn parent_type(&self) -> Option<DeclarationId> {
        self.parent_type_path()
            .map(|path| DeclarationId::new(self.unit.clone(), DeclarationKind::Type, path, 0))
    }

    pub fn is_top_level_type(&self) -> bool {
        self.kind == DeclarationKind::Type && !self.path.contains('.')
    }

    /// Fully qualified name of a type declaration (`pkg.a.Foo.Inner`).
    pub fn qualified_type_name(&self) -> String {
        self.unit.namespace.qualify(&self.path)
    }

    /// Whether `self` sits (transitively) inside the type `ancestor`.
    pub fn is_inside(&self, ancestor: &DeclarationId) -> bool {
        ancestor.kind == DeclarationKind::Type
            && self.unit == ancestor.unit
            && self.path.len() > ancestor.path.len()
            && self.path.starts_with(&ancestor.path)
            && self.path.as_bytes()[ancestor.path.len()] == b'.'
            && !matches!(self.kind, DeclarationKind::Import | DeclarationKind::NamespaceDeclaration)
    }

    pub fn with_unit(&self, unit: UnitId) -> DeclarationId {
        DeclarationId { unit, ..self.clone() }
    }
}

/// Language-model entities.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "element", rename_all = "snake_case")]
pub enum Element {
    SourceRoot { path: ResourcePath },
    Namespace(NamespaceId),
    SourceFile(UnitId),
    Declaration(DeclarationId),
}

impl Element {
    pub fn name(&self) -> &str {
        match self {
            Element::SourceRoot { path } => path.name(),
            Element::Namespace(ns) => &ns.name,
            Element::SourceFile(unit) => &unit.name,
            Element::Declaration(decl) => decl.simple_name(),
        }
    }

    pub fn unit(&self) -> Option<&UnitId> {
        match self {
            Element::SourceFile(unit) => Some(unit),
            Element::Declaration(decl) => Some(&decl.unit),
            _ => None,
        }
    }

    pub fn as_declaration(&self) -> Option<&DeclarationId> {
        match self {
            Element::Declaration(decl) => Some(decl),
            _ => None,
        }
    }

    /// Human-readable label for prompts and log lines.
    pub fn label(&self) -> String {
        match self {
            Element::SourceRoot { path } => path.to_string(),
            Element::Namespace(ns) if ns.is_default() => format!("(default) in {}", ns.root),
            Element::Namespace(ns) => ns.name.clone(),
            Element::SourceFile(unit) => unit.name.clone(),
            Element::Declaration(decl) => decl.path.clone(),
        }
    }
}

/// One entry of a user selection: either a plain filesystem resource or a
/// language element.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "item", rename_all = "snake_case")]
pub enum SelectionItem {
    Resource { path: ResourcePath },
    Element(Element),
}

impl SelectionItem {
    pub fn resource(path: ResourcePath) -> Self {
        SelectionItem::Resource { path }
    }

    pub fn as_resource(&self) -> Option<&ResourcePath> {
        match self {
            SelectionItem::Resource { path } => Some(path),
            SelectionItem::Element(_) => None,
        }
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            SelectionItem::Resource { .. } => None,
            SelectionItem::Element(element) => Some(element),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            SelectionItem::Resource { path } => path.name(),
            SelectionItem::Element(element) => element.name(),
        }
    }

    pub fn label(&self) -> String {
        match self {
            SelectionItem::Resource { path } => path.to_string(),
            SelectionItem::Element(element) => element.label(),
        }
    }
}

impl From<Element> for SelectionItem {
    fn from(element: Element) -> Self {
        SelectionItem::Element(element)
    }
}

/// Whether sources survive the operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReorgMode {
    Move,
    Copy,
}

impl ReorgMode {
    pub fn verb(&self) -> &'static str {
        match self {
            ReorgMode::Move => "move",
            ReorgMode::Copy => "copy",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Location {
    Before,
    After,
    #[default]
    On,
}

impl Location {
    pub fn as_str(&self) -> &'static str {
        match self {
            Location::Before => "before",
            Location::After => "after",
            Location::On => "on",
        }
    }
}

impl FromStr for Location {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "before" => Ok(Location::Before),
            "after" => Ok(Location::After),
            "on" => Ok(Location::On),
            other => Err(format!("unknown location '{other}'")),
        }
    }
}

/// Where selected entities should end up. `location` only orders
/// declarations relative to a sibling; containers always use `On`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Destination {
    pub target: SelectionItem,
    pub location: Location,
}

impl Destination {
    pub fn on(target: impl Into<SelectionItem>) -> Self {
        Self { target: target.into(), location: Location::On }
    }

    pub fn new(target: impl Into<SelectionItem>, location: Location) -> Self {
        let target = target.into();
        let location = match &target {
            SelectionItem::Element(Element::Declaration(_)) => location,
            _ => Location::On,
        };
        Self { target, location }
    }
}
