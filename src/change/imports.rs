//! Recorded import additions and removals for one source file.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// `pkg.b.Foo`, `pkg.b.*` or (static) `pkg.b.Foo.member`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ImportName {
    pub is_static: bool,
    pub name: String,
}

impl ImportName {
    pub fn single(name: impl Into<String>) -> Self {
        Self { is_static: false, name: name.into() }
    }

    pub fn static_member(name: impl Into<String>) -> Self {
        Self { is_static: true, name: name.into() }
    }

    /// Parse a declaration path as produced by the source model
    /// (`static ` prefix for static imports).
    pub fn from_declaration_path(path: &str) -> Self {
        match path.strip_prefix("static ") {
            Some(rest) => Self::static_member(rest.trim()),
            None => Self::single(path.trim()),
        }
    }

    pub fn declaration_path(&self) -> String {
        if self.is_static {
            format!("static {}", self.name)
        } else {
            self.name.clone()
        }
    }

    pub fn is_on_demand(&self) -> bool {
        self.name.ends_with(".*")
    }

    /// Namespace part of a single-type import (`pkg.b` for `pkg.b.Foo`).
    /// For static imports this is the declaring type.
    pub fn container(&self) -> &str {
        let name = self.name.strip_suffix(".*").unwrap_or(&self.name);
        if self.is_on_demand() {
            return name;
        }
        match name.rfind('.') {
            Some(idx) => &name[..idx],
            None => "",
        }
    }

    pub fn simple_name(&self) -> &str {
        match self.name.rfind('.') {
            Some(idx) => &self.name[idx + 1..],
            None => &self.name,
        }
    }

    pub fn statement(&self) -> String {
        format!("import {};", self.declaration_path())
    }
}

impl fmt::Display for ImportName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.declaration_path())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportRewrite {
    pub additions: BTreeSet<ImportName>,
    pub removals: BTreeSet<ImportName>,
    /// Drop additions that are visible without an import (same namespace,
    /// `java.lang`).
    pub filter_implicit: bool,
}

impl Default for ImportRewrite {
    fn default() -> Self {
        Self { additions: BTreeSet::new(), removals: BTreeSet::new(), filter_implicit: true }
    }
}

impl ImportRewrite {
    pub fn add_import(&mut self, name: impl Into<String>) {
        self.add(ImportName::single(name));
    }

    pub fn add_static_import(&mut self, declaring_type: &str, member: &str) {
        self.add(ImportName::static_member(format!("{declaring_type}.{member}")));
    }

    pub fn remove_import(&mut self, name: impl Into<String>) {
        self.remove(ImportName::single(name));
    }

    pub fn remove_static_import(&mut self, name: impl Into<String>) {
        self.remove(ImportName::static_member(name));
    }

    pub fn add(&mut self, import: ImportName) {
        self.removals.remove(&import);
        self.additions.insert(import);
    }

    pub fn remove(&mut self, import: ImportName) {
        if !self.additions.remove(&import) {
            self.removals.insert(import);
        }
    }

    pub fn has_recorded_changes(&self) -> bool {
        !self.additions.is_empty() || !self.removals.is_empty()
    }
}

/// Whether `import` is visible without an explicit import from a file in
/// `namespace`.
pub fn is_implicit(import: &ImportName, namespace: &str) -> bool {
    if import.is_static || import.is_on_demand() {
        return false;
    }
    let container = import.container();
    container == namespace || container == "java.lang"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn import_name_parts() {
        let single = ImportName::single("pkg.b.Foo");
        assert_eq!(single.container(), "pkg.b");
        assert_eq!(single.simple_name(), "Foo");
        let star = ImportName::single("pkg.b.*");
        assert!(star.is_on_demand());
        assert_eq!(star.container(), "pkg.b");
        let stat = ImportName::from_declaration_path("static pkg.b.Foo.MAX");
        assert!(stat.is_static);
        assert_eq!(stat.container(), "pkg.b.Foo");
        assert_eq!(stat.statement(), "import static pkg.b.Foo.MAX;");
    }

    #[test]
    fn remove_cancels_pending_add() {
        let mut rewrite = ImportRewrite::default();
        rewrite.add_import("pkg.b.Foo");
        rewrite.remove_import("pkg.b.Foo");
        assert!(!rewrite.has_recorded_changes());
        rewrite.remove_import("pkg.a.Foo");
        rewrite.add_import("pkg.a.Foo");
        assert!(rewrite.removals.is_empty());
        assert_eq!(rewrite.additions.len(), 1);
    }

    #[test]
    fn implicit_imports() {
        assert!(is_implicit(&ImportName::single("pkg.a.Foo"), "pkg.a"));
        assert!(is_implicit(&ImportName::single("java.lang.String"), "pkg.a"));
        assert!(!is_implicit(&ImportName::single("pkg.b.Foo"), "pkg.a"));
        assert!(!is_implicit(&ImportName::single("pkg.a.*"), "pkg.a"));
    }
}
