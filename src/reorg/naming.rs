//! Fresh names for copies that would otherwise collide at the destination.

use crate::domain::{Element, NamespaceId, ResourcePath};
use crate::services::SourceModel;
use std::collections::HashSet;

/// Proposes `Copy of X`-style names. Names handed out during one operation
/// are remembered, so a batch of same-named items never collides with
/// itself.
#[derive(Debug, Default)]
pub struct NewNameProposer {
    proposed: HashSet<(String, String)>,
}

impl NewNameProposer {
    pub fn new() -> Self {
        Self::default()
    }

    fn first_free(
        &mut self,
        container: &str,
        candidate: impl Fn(usize) -> String,
        taken: impl Fn(&str) -> bool,
    ) -> String {
        let mut n = 1;
        loop {
            let name = candidate(n);
            if !taken(&name) && self.proposed.insert((container.to_string(), name.clone())) {
                return name;
            }
            n += 1;
        }
    }

    /// `Copy of X`, `Copy (2) of X`, ... for plain files and folders.
    pub fn resource_name(&mut self, model: &dyn SourceModel, name: &str, folder: &ResourcePath) -> String {
        let candidates = |n: usize| match n {
            1 => format!("Copy of {name}"),
            n => format!("Copy ({n}) of {name}"),
        };
        self.first_free(folder.as_str(), candidates, |candidate| {
            model.resource_kind(&folder.join(candidate)).is_some()
        })
    }

    /// `CopyOfFoo.java`, `Copy2OfFoo.java`, ... for source files.
    pub fn unit_name(&mut self, model: &dyn SourceModel, name: &str, folder: &ResourcePath) -> String {
        let candidates = |n: usize| match n {
            1 => format!("CopyOf{name}"),
            n => format!("Copy{n}Of{name}"),
        };
        self.first_free(folder.as_str(), candidates, |candidate| {
            model.resource_kind(&folder.join(candidate)).is_some()
        })
    }

    /// `pkg.copyOfA`, `pkg.copy2OfA`, ... for namespaces inside `root`.
    pub fn namespace_name(&mut self, model: &dyn SourceModel, namespace: &NamespaceId, root: &ResourcePath) -> String {
        let prefix = match namespace.name.rfind('.') {
            Some(idx) => &namespace.name[..=idx],
            None => "",
        };
        let last = capitalize(namespace.last_segment());
        let candidates = |n: usize| match n {
            1 => format!("{prefix}copyOf{last}"),
            n => format!("{prefix}copy{n}Of{last}"),
        };
        self.first_free(root.as_str(), candidates, |candidate| {
            model.element_exists(&Element::Namespace(NamespaceId::new(root.clone(), candidate)))
        })
    }

    /// `copyOfX` for members and `CopyOfX` for types; `existing` lists the
    /// names already declared in the destination scope.
    pub fn declaration_name(&mut self, scope: &str, name: &str, is_type: bool, existing: &[String]) -> String {
        let (copy, suffix) = if is_type { ("Copy", name.to_string()) } else { ("copy", capitalize(name)) };
        let candidates = |n: usize| match n {
            1 => format!("{copy}Of{suffix}"),
            n => format!("{copy}{n}Of{suffix}"),
        };
        self.first_free(scope, candidates, |candidate| existing.iter().any(|e| e == candidate))
    }
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workspace::test_support::workspace;

    #[test]
    fn resource_copies_count_up() {
        let (_tmp, ws) = workspace(&[
            ("docs/readme.txt", "a"),
            ("docs/Copy of readme.txt", "b"),
        ]);
        let mut proposer = NewNameProposer::new();
        let docs = ResourcePath::new("docs");
        assert_eq!(proposer.resource_name(&ws, "readme.txt", &docs), "Copy (2) of readme.txt");
        assert_eq!(proposer.resource_name(&ws, "readme.txt", &docs), "Copy (3) of readme.txt");
    }

    #[test]
    fn unit_and_namespace_copies() {
        let (_tmp, ws) = workspace(&[
            ("src/pkg/a/Foo.java", "package pkg.a;\nclass Foo {}\n"),
            ("src/pkg/a/CopyOfFoo.java", "package pkg.a;\nclass CopyOfFoo {}\n"),
        ]);
        let mut proposer = NewNameProposer::new();
        let folder = ResourcePath::new("src/pkg/a");
        assert_eq!(proposer.unit_name(&ws, "Foo.java", &folder), "Copy2OfFoo.java");

        let ns = NamespaceId::new(ResourcePath::new("src"), "pkg.a");
        assert_eq!(proposer.namespace_name(&ws, &ns, &ResourcePath::new("src")), "pkg.copyOfA");
    }

    #[test]
    fn declaration_copies_skip_existing_names() {
        let mut proposer = NewNameProposer::new();
        let existing = vec!["x".to_string(), "copyOfX".to_string()];
        assert_eq!(proposer.declaration_name("U", "x", false, &existing), "copy2OfX");
        assert_eq!(proposer.declaration_name("U", "x", false, &existing), "copy3OfX");
        assert_eq!(proposer.declaration_name("U", "Inner", true, &[]), "CopyOfInner");
    }
}
