//! Directory-tree backend: a snapshot of a workspace on disk that
//! implements the model, search and rewrite services.
//!
//! The snapshot is taken once by [`Workspace::open`] and refreshed with
//! [`Workspace::reload`]. Every file keeps the hash of the bytes it was
//! decoded from so that changes can be checked for staleness when they are
//! performed.

pub mod parse;
pub mod perform;
pub mod rewrite;
pub mod scan;
pub mod search;

pub use perform::FsChangePerformer;
pub use scan::{ScanEntry, WorkspaceScanner};

use crate::domain::{
    DeclarationId, DeclarationInfo, DeclarationKind, Element, NamespaceId, ReorgConfig,
    ResourcePath, UnitId,
};
use crate::error::ServiceError;
use crate::services::{Refresh, ResourceKind, SourceModel};
use crate::utils::{content_hash, decode_bytes, is_binary_bytes, DecodedText};
use anyhow::{bail, Context, Result};
use parse::ParsedUnit;
use scan::{build_globset, build_path_globset};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
struct FileEntry {
    hash: String,
    text: Option<DecodedText>,
    /// Raw bytes of compiled artifacts, searched for binary references.
    binary: Option<Vec<u8>>,
}

/// A parsed source file.
#[derive(Debug, Clone)]
pub struct UnitEntry {
    pub id: UnitId,
    pub parsed: ParsedUnit,
    /// Namespace declaration, imports, then types and members in source order.
    pub declarations: Vec<DeclarationInfo>,
}

#[derive(Debug)]
pub struct Workspace {
    root: PathBuf,
    config: ReorgConfig,
    folders: BTreeSet<ResourcePath>,
    files: BTreeMap<ResourcePath, FileEntry>,
    source_roots: Vec<ResourcePath>,
    library_roots: Vec<ResourcePath>,
    namespaces: BTreeMap<ResourcePath, NamespaceId>,
    units: BTreeMap<ResourcePath, UnitEntry>,
    read_only: BTreeSet<ResourcePath>,
}

impl Workspace {
    pub fn open(root: impl Into<PathBuf>, config: &ReorgConfig) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            bail!("Workspace root is not a directory: {}", root.display());
        }
        let mut workspace = Self {
            root,
            config: config.clone(),
            folders: BTreeSet::new(),
            files: BTreeMap::new(),
            source_roots: Vec::new(),
            library_roots: Vec::new(),
            namespaces: BTreeMap::new(),
            units: BTreeMap::new(),
            read_only: BTreeSet::new(),
        };
        workspace.reload()?;
        Ok(workspace)
    }

    /// Re-scan the tree and re-parse every source file.
    pub fn reload(&mut self) -> Result<()> {
        let entries = WorkspaceScanner::new(self.root.clone())
            .exclude_globs(self.config.exclude_globs.clone())
            .respect_gitignore(self.config.respect_gitignore)
            .scan()
            .with_context(|| format!("Failed to scan {}", self.root.display()))?;
        let read_only_globs = build_globset(&self.config.read_only_globs)?;

        let mut folders = BTreeSet::new();
        let mut files = BTreeMap::new();
        let mut read_only = BTreeSet::new();
        for entry in entries {
            let absolute = self.absolute(&entry.path);
            if read_only_globs.is_match(entry.path.as_str()) || is_read_only_on_disk(&absolute) {
                read_only.insert(entry.path.clone());
            }
            if entry.is_dir {
                folders.insert(entry.path);
                continue;
            }
            let bytes = match std::fs::read(&absolute) {
                Ok(bytes) => bytes,
                Err(err) => {
                    tracing::warn!("Skipping unreadable file {}: {}", entry.path, err);
                    continue;
                }
            };
            let hash = content_hash(&bytes);
            let compiled = has_extension(&entry.path, &self.config.binary_extensions);
            let file = if compiled || is_binary_bytes(&bytes) {
                FileEntry { hash, text: None, binary: compiled.then_some(bytes) }
            } else {
                FileEntry { hash, text: Some(decode_bytes(&bytes)), binary: None }
            };
            files.insert(entry.path, file);
        }

        let (source_roots, library_roots) = self.find_roots(&folders)?;
        let namespaces = find_namespaces(&folders, &source_roots, &library_roots);

        let mut units = BTreeMap::new();
        for (path, file) in &files {
            let Some(text) = &file.text else { continue };
            if !has_extension(path, &self.config.source_extensions) {
                continue;
            }
            let Some(namespace) = path.parent().and_then(|folder| namespaces.get(&folder)) else {
                continue;
            };
            let id = UnitId::new(namespace.clone(), path.name());
            let parsed = parse::parse(&text.text);
            if !parsed.structure_known {
                tracing::debug!("Structure of {} is not fully known", path);
            }
            let declarations = unit_declarations(&id, &parsed, &text.text);
            units.insert(path.clone(), UnitEntry { id, parsed, declarations });
        }

        tracing::debug!(
            "Loaded workspace: {} folders, {} files, {} source roots, {} source files",
            folders.len(),
            files.len(),
            source_roots.len() + library_roots.len(),
            units.len()
        );

        self.folders = folders;
        self.files = files;
        self.source_roots = source_roots;
        self.library_roots = library_roots;
        self.namespaces = namespaces;
        self.units = units;
        self.read_only = read_only;
        Ok(())
    }

    /// Folders matching the root globs. A root that contains another root
    /// gives way to the deeper one (`src` vs `src/main/java`).
    fn find_roots(
        &self,
        folders: &BTreeSet<ResourcePath>,
    ) -> Result<(Vec<ResourcePath>, Vec<ResourcePath>)> {
        let source_globs = build_path_globset(&self.config.source_roots)?;
        let library_globs = build_path_globset(&self.config.library_roots)?;

        let candidates: Vec<(ResourcePath, bool)> = folders
            .iter()
            .filter_map(|folder| {
                if library_globs.is_match(folder.as_str()) {
                    Some((folder.clone(), true))
                } else if source_globs.is_match(folder.as_str()) {
                    Some((folder.clone(), false))
                } else {
                    None
                }
            })
            .collect();

        let mut sources = Vec::new();
        let mut libraries = Vec::new();
        for (folder, library) in &candidates {
            let shadowed = candidates.iter().any(|(other, _)| other.is_descendant_of(folder));
            let nested = candidates.iter().any(|(other, _)| folder.is_descendant_of(other));
            if shadowed || (nested && *library) {
                continue;
            }
            if *library {
                libraries.push(folder.clone());
            } else {
                sources.push(folder.clone());
            }
        }
        Ok((sources, libraries))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &ReorgConfig {
        &self.config
    }

    pub fn absolute(&self, path: &ResourcePath) -> PathBuf {
        if path.is_root() {
            self.root.clone()
        } else {
            self.root.join(path.as_str())
        }
    }

    pub fn unit_entry(&self, path: &ResourcePath) -> Option<&UnitEntry> {
        self.units.get(path)
    }

    pub fn unit_entries(&self) -> impl Iterator<Item = &UnitEntry> {
        self.units.values()
    }

    /// Compiled artifacts with their raw bytes.
    pub fn binary_files(&self) -> impl Iterator<Item = (&ResourcePath, &[u8])> {
        self.files
            .iter()
            .filter_map(|(path, file)| file.binary.as_deref().map(|bytes| (path, bytes)))
    }

    pub fn library_roots(&self) -> &[ResourcePath] {
        &self.library_roots
    }

    /// Resolve a workspace path, optionally followed by `::Decl.path`, to a
    /// selection item. Used by the CLI.
    pub fn resolve_path(&self, spec: &str) -> Option<crate::domain::SelectionItem> {
        use crate::domain::SelectionItem;

        if let Some((file, member)) = spec.split_once("::") {
            let unit = self.units.get(&ResourcePath::new(file))?;
            let info = unit
                .declarations
                .iter()
                .find(|info| info.id.kind.is_member() && info.id.path == member)?;
            return Some(Element::Declaration(info.id.clone()).into());
        }
        let path = ResourcePath::new(spec);
        if path.is_root() {
            return Some(SelectionItem::resource(path));
        }
        match self.element_for_resource(&path) {
            Some(element) => Some(element.into()),
            None if self.resource_kind(&path).is_some() => Some(SelectionItem::resource(path)),
            None => None,
        }
    }
}

impl Refresh for Workspace {
    fn refresh(&mut self) -> Result<(), ServiceError> {
        self.reload().map_err(|err| ServiceError::Load(format!("{err:#}")))
    }
}

fn is_read_only_on_disk(path: &Path) -> bool {
    std::fs::metadata(path).map(|meta| meta.permissions().readonly()).unwrap_or(false)
}

fn has_extension(path: &ResourcePath, extensions: &[String]) -> bool {
    let name = path.name().to_ascii_lowercase();
    extensions.iter().any(|ext| name.ends_with(ext.as_str()) && name.len() > ext.len())
}

pub fn is_identifier(segment: &str) -> bool {
    let mut chars = segment.chars();
    match chars.next() {
        Some(first) if first.is_alphabetic() || first == '_' || first == '$' => {}
        _ => return false,
    }
    chars.all(|ch| ch.is_alphanumeric() || ch == '_' || ch == '$')
}

/// Every folder under a root whose relative segments are identifiers is a
/// namespace; the root itself is the default namespace.
fn find_namespaces(
    folders: &BTreeSet<ResourcePath>,
    source_roots: &[ResourcePath],
    library_roots: &[ResourcePath],
) -> BTreeMap<ResourcePath, NamespaceId> {
    let mut namespaces = BTreeMap::new();
    let roots: Vec<&ResourcePath> = source_roots.iter().chain(library_roots).collect();
    for root in &roots {
        namespaces.insert((*root).clone(), NamespaceId::new((*root).clone(), ""));
    }
    for folder in folders {
        let Some(root) = roots.iter().find(|root| folder.is_descendant_of(root)) else {
            continue;
        };
        if roots.iter().any(|other| folder.is_same_or_descendant_of(other) && other.is_descendant_of(root)) {
            continue;
        }
        let Some(relative) = folder.relative_to(root) else { continue };
        if relative.split('/').all(is_identifier) {
            namespaces
                .insert(folder.clone(), NamespaceId::new((*root).clone(), relative.replace('/', ".")));
        }
    }
    namespaces
}

/// Handles and ranges for everything the parser found. Ordinals count
/// repeated `(kind, path)` pairs in source order.
fn unit_declarations(id: &UnitId, parsed: &ParsedUnit, text: &str) -> Vec<DeclarationInfo> {
    let mut ordinals: HashMap<(DeclarationKind, String), usize> = HashMap::new();
    let mut next_id = |kind: DeclarationKind, path: String| {
        let counter = ordinals.entry((kind, path.clone())).or_insert(0);
        let ordinal = *counter;
        *counter += 1;
        DeclarationId::new(id.clone(), kind, path, ordinal)
    };

    let mut declarations = Vec::new();
    if let Some(namespace) = &parsed.namespace {
        declarations.push(DeclarationInfo {
            id: next_id(DeclarationKind::NamespaceDeclaration, namespace.name.clone()),
            range: namespace.range,
            name_range: namespace.name_range,
            body_range: None,
            is_public: true,
            is_static: false,
            on_demand: false,
        });
    }
    for import in &parsed.imports {
        declarations.push(DeclarationInfo {
            id: next_id(DeclarationKind::Import, import.import.declaration_path()),
            range: import.range,
            name_range: import.name_range,
            body_range: None,
            is_public: true,
            is_static: import.import.is_static,
            on_demand: import.import.is_on_demand(),
        });
    }
    for decl in &parsed.declarations {
        declarations.push(DeclarationInfo {
            id: next_id(decl.kind, decl.path.clone()),
            range: decl.range,
            name_range: decl.name_range,
            body_range: decl.body_range,
            is_public: decl.is_public,
            is_static: decl.is_static,
            on_demand: false,
        });
    }
    debug_assert!(declarations.iter().all(|d| d.range.end() <= text.len()));
    declarations
}

impl SourceModel for Workspace {
    fn resource_kind(&self, path: &ResourcePath) -> Option<ResourceKind> {
        if path.is_root() {
            Some(ResourceKind::Root)
        } else if self.folders.contains(path) {
            Some(ResourceKind::Folder)
        } else if self.files.contains_key(path) {
            Some(ResourceKind::File)
        } else {
            None
        }
    }

    fn members(&self, folder: &ResourcePath) -> Vec<ResourcePath> {
        let mut members: Vec<ResourcePath> = self
            .folders
            .iter()
            .chain(self.files.keys())
            .filter(|path| path.parent().as_ref() == Some(folder))
            .cloned()
            .collect();
        members.sort();
        members
    }

    fn element_for_resource(&self, path: &ResourcePath) -> Option<Element> {
        if self.source_roots.contains(path) || self.library_roots.contains(path) {
            return Some(Element::SourceRoot { path: path.clone() });
        }
        if let Some(namespace) = self.namespaces.get(path) {
            return Some(Element::Namespace(namespace.clone()));
        }
        self.units.get(path).map(|unit| Element::SourceFile(unit.id.clone()))
    }

    fn element_exists(&self, element: &Element) -> bool {
        match element {
            Element::SourceRoot { path } => {
                self.source_roots.contains(path) || self.library_roots.contains(path)
            }
            Element::Namespace(namespace) => {
                self.namespaces.get(&namespace.folder()) == Some(namespace)
            }
            Element::SourceFile(unit) => {
                self.units.get(&unit.path()).is_some_and(|entry| &entry.id == unit)
            }
            Element::Declaration(decl) => self
                .units
                .get(&decl.unit.path())
                .is_some_and(|entry| entry.declarations.iter().any(|info| &info.id == decl)),
        }
    }

    fn source_roots(&self) -> Vec<ResourcePath> {
        let mut roots: Vec<ResourcePath> =
            self.source_roots.iter().chain(&self.library_roots).cloned().collect();
        roots.sort();
        roots
    }

    fn namespaces(&self, root: &ResourcePath) -> Vec<NamespaceId> {
        self.namespaces.values().filter(|ns| &ns.root == root).cloned().collect()
    }

    fn units(&self, namespace: &NamespaceId) -> Vec<UnitId> {
        let folder = namespace.folder();
        self.units
            .iter()
            .filter(|(path, entry)| path.parent().as_ref() == Some(&folder) && &entry.id.namespace == namespace)
            .map(|(_, entry)| entry.id.clone())
            .collect()
    }

    fn declarations(&self, unit: &UnitId) -> Vec<DeclarationInfo> {
        self.units
            .get(&unit.path())
            .filter(|entry| &entry.id == unit)
            .map(|entry| entry.declarations.clone())
            .unwrap_or_default()
    }

    fn text(&self, file: &ResourcePath) -> Option<&str> {
        self.files.get(file)?.text.as_ref().map(|decoded| decoded.text.as_str())
    }

    fn content_hash(&self, file: &ResourcePath) -> Option<&str> {
        self.files.get(file).map(|entry| entry.hash.as_str())
    }

    fn is_read_only(&self, path: &ResourcePath) -> bool {
        self.read_only.contains(path)
    }

    fn is_archive(&self, path: &ResourcePath) -> bool {
        self.library_roots.iter().any(|root| path.is_same_or_descendant_of(root))
            || self.files.get(path).is_some_and(|file| file.binary.is_some())
    }

    fn is_structure_known(&self, unit: &UnitId) -> bool {
        self.units.get(&unit.path()).is_some_and(|entry| entry.parsed.structure_known)
    }

    fn is_in_sync(&self, path: &ResourcePath) -> bool {
        let absolute = self.absolute(path);
        match self.files.get(path) {
            Some(entry) => std::fs::read(&absolute)
                .map(|bytes| content_hash(&bytes) == entry.hash)
                .unwrap_or(false),
            None if path.is_root() || self.folders.contains(path) => absolute.is_dir(),
            None => !absolute.exists(),
        }
    }

    fn text_files(&self) -> Vec<ResourcePath> {
        self.files
            .iter()
            .filter(|(path, file)| file.text.is_some() && !self.units.contains_key(*path))
            .map(|(path, _)| path.clone())
            .collect()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    /// Write `files` under a fresh temp dir and open it as a workspace.
    pub fn workspace(files: &[(&str, &str)]) -> (TempDir, Workspace) {
        let tmp = TempDir::new().expect("Failed to create temp dir");
        for (path, content) in files {
            let absolute = tmp.path().join(path);
            if let Some(parent) = absolute.parent() {
                fs::create_dir_all(parent).expect("Failed to create dirs");
            }
            fs::write(&absolute, content).expect("Failed to write file");
        }
        let workspace =
            Workspace::open(tmp.path(), &ReorgConfig::default()).expect("Failed to open workspace");
        (tmp, workspace)
    }

    pub fn unit(workspace: &Workspace, path: &str) -> UnitId {
        workspace.unit_entry(&ResourcePath::new(path)).expect("unit").id.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::workspace;
    use super::*;

    #[test]
    fn nested_roots_give_way_to_deeper_ones() {
        let (_tmp, ws) = workspace(&[
            ("src/main/java/pkg/a/Foo.java", "package pkg.a;\npublic class Foo {}\n"),
            ("src/test/java/pkg/a/FooTest.java", "package pkg.a;\nclass FooTest {}\n"),
            ("lib/ext/Api.java", "package ext;\npublic class Api {}\n"),
            ("README.md", "# demo\n"),
        ]);
        let roots: Vec<String> = ws.source_roots().iter().map(|r| r.as_str().to_string()).collect();
        assert_eq!(roots, vec!["lib", "src/main/java", "src/test/java"]);
        assert_eq!(ws.fragments("pkg.a").len(), 2);
        assert!(ws.is_archive(&ResourcePath::new("lib/ext/Api.java")));
        assert_eq!(ws.text_files(), vec![ResourcePath::new("README.md")]);
    }

    #[test]
    fn elements_resolve_from_resources() {
        let (_tmp, ws) = workspace(&[(
            "src/pkg/a/Foo.java",
            "package pkg.a;\n\nimport java.util.List;\n\npublic class Foo {\n    int x;\n    void run() {}\n    void run(int n) {}\n}\n",
        )]);
        let foo = ResourcePath::new("src/pkg/a/Foo.java");
        let Some(Element::SourceFile(unit)) = ws.element_for_resource(&foo) else {
            panic!("expected source file");
        };
        assert_eq!(unit.namespace.name, "pkg.a");
        assert!(matches!(
            ws.element_for_resource(&ResourcePath::new("src")),
            Some(Element::SourceRoot { .. })
        ));

        let handles: Vec<String> =
            ws.declarations(&unit).iter().map(|d| Element::Declaration(d.id.clone()).to_string()).collect();
        assert_eq!(
            handles,
            vec![
                "=src<pkg.a{Foo.java[package:pkg.a#0",
                "=src<pkg.a{Foo.java[import:java.util.List#0",
                "=src<pkg.a{Foo.java[type:Foo#0",
                "=src<pkg.a{Foo.java[field:Foo.x#0",
                "=src<pkg.a{Foo.java[method:Foo.run#0",
                "=src<pkg.a{Foo.java[method:Foo.run#1",
            ]
        );
    }

    #[test]
    fn in_sync_detects_disk_edits() {
        let (tmp, ws) = workspace(&[("src/pkg/A.java", "package pkg;\nclass A {}\n")]);
        let path = ResourcePath::new("src/pkg/A.java");
        assert!(ws.is_in_sync(&path));
        std::fs::write(tmp.path().join("src/pkg/A.java"), "package pkg;\nclass A { }\n")
            .expect("write");
        assert!(!ws.is_in_sync(&path));
    }

    #[test]
    fn resolve_path_accepts_member_suffix() {
        let (_tmp, ws) =
            workspace(&[("src/pkg/A.java", "package pkg;\nclass A {\n    int x;\n}\n")]);
        let item = ws.resolve_path("src/pkg/A.java::A.x").expect("member");
        assert_eq!(item.to_string(), "=src<pkg{A.java[field:A.x#0");
        assert!(ws.resolve_path("src/pkg/Missing.java").is_none());
    }
}
