//! Textual handles for selection items.
//!
//! ```text
//! /src/pkg/a/readme.txt               resource
//! =src                                source root
//! =src<pkg.a                          namespace (default namespace: "=src<")
//! =src<pkg.a{Foo.java                 source file
//! =src<pkg.a{Foo.java[field:Foo.x#0   declaration
//! ```

use super::element::{
    DeclarationId, DeclarationKind, Element, NamespaceId, ResourcePath, SelectionItem, UnitId,
};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid handle '{handle}': {reason}")]
pub struct HandleParseError {
    pub handle: String,
    pub reason: String,
}

impl HandleParseError {
    fn new(handle: &str, reason: impl Into<String>) -> Self {
        Self { handle: handle.to_string(), reason: reason.into() }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Element::SourceRoot { path } => write!(f, "={}", path.as_str()),
            Element::Namespace(ns) => write!(f, "={}<{}", ns.root.as_str(), ns.name),
            Element::SourceFile(unit) => {
                write!(f, "={}<{}{{{}", unit.namespace.root.as_str(), unit.namespace.name, unit.name)
            }
            Element::Declaration(decl) => write!(
                f,
                "={}<{}{{{}[{}:{}#{}",
                decl.unit.namespace.root.as_str(),
                decl.unit.namespace.name,
                decl.unit.name,
                decl.kind.as_str(),
                decl.path,
                decl.ordinal
            ),
        }
    }
}

impl fmt::Display for SelectionItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionItem::Resource { path } => write!(f, "/{}", path.as_str()),
            SelectionItem::Element(element) => write!(f, "{element}"),
        }
    }
}

impl FromStr for Element {
    type Err = HandleParseError;

    fn from_str(handle: &str) -> Result<Self, Self::Err> {
        let body = handle
            .strip_prefix('=')
            .ok_or_else(|| HandleParseError::new(handle, "element handles start with '='"))?;

        let Some((root, rest)) = body.split_once('<') else {
            if body.is_empty() {
                return Err(HandleParseError::new(handle, "missing source root"));
            }
            return Ok(Element::SourceRoot { path: ResourcePath::new(body) });
        };
        let root = ResourcePath::new(root);

        let Some((namespace, rest)) = rest.split_once('{') else {
            return Ok(Element::Namespace(NamespaceId::new(root, rest)));
        };
        let namespace = NamespaceId::new(root, namespace);

        let Some((unit_name, rest)) = rest.split_once('[') else {
            if rest.is_empty() {
                return Err(HandleParseError::new(handle, "missing file name"));
            }
            return Ok(Element::SourceFile(UnitId::new(namespace, rest)));
        };
        let unit = UnitId::new(namespace, unit_name);

        let (kind, rest) = rest
            .split_once(':')
            .ok_or_else(|| HandleParseError::new(handle, "expected 'kind:path'"))?;
        let kind =
            DeclarationKind::from_str(kind).map_err(|reason| HandleParseError::new(handle, reason))?;
        let (path, ordinal) = match rest.rsplit_once('#') {
            Some((path, ordinal)) => {
                let ordinal = ordinal
                    .parse::<usize>()
                    .map_err(|_| HandleParseError::new(handle, "ordinal is not a number"))?;
                (path, ordinal)
            }
            None => (rest, 0),
        };
        if path.is_empty() {
            return Err(HandleParseError::new(handle, "empty declaration path"));
        }
        Ok(Element::Declaration(DeclarationId::new(unit, kind, path, ordinal)))
    }
}

impl FromStr for SelectionItem {
    type Err = HandleParseError;

    fn from_str(handle: &str) -> Result<Self, Self::Err> {
        if let Some(path) = handle.strip_prefix('/') {
            return Ok(SelectionItem::resource(ResourcePath::new(path)));
        }
        if handle.starts_with('=') {
            return Element::from_str(handle).map(SelectionItem::Element);
        }
        Err(HandleParseError::new(handle, "expected '/' (resource) or '=' (element)"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_element_level() {
        let root: Element = "=src".parse().expect("root");
        assert_eq!(root, Element::SourceRoot { path: ResourcePath::new("src") });

        let ns: Element = "=src<pkg.a".parse().expect("namespace");
        assert_eq!(ns, Element::Namespace(NamespaceId::new(ResourcePath::new("src"), "pkg.a")));

        let default_ns: Element = "=src<".parse().expect("default namespace");
        assert_eq!(
            default_ns,
            Element::Namespace(NamespaceId::new(ResourcePath::new("src"), ""))
        );

        let decl: Element = "=mod/src<pkg.a{Foo.java[method:Foo.run#1".parse().expect("decl");
        let Element::Declaration(decl) = decl else { panic!("expected declaration") };
        assert_eq!(decl.unit.namespace.root.as_str(), "mod/src");
        assert_eq!(decl.kind, DeclarationKind::Method);
        assert_eq!(decl.path, "Foo.run");
        assert_eq!(decl.ordinal, 1);
    }

    #[test]
    fn display_and_parse_agree() {
        for handle in [
            "=src<pkg.a{Foo.java[field:Foo.x#0",
            "=src<pkg.a{Foo.java[import:static pkg.b.T.m#0",
            "=src<{Main.java",
            "/src/pkg/a/readme.txt",
            "/",
        ] {
            let item: SelectionItem = handle.parse().expect("parse");
            assert_eq!(item.to_string(), handle);
        }
    }

    #[test]
    fn rejects_malformed_handles() {
        assert!("src/pkg".parse::<SelectionItem>().is_err());
        assert!("=src<pkg{Foo.java[bogus:Foo#0".parse::<SelectionItem>().is_err());
        assert!("=src<pkg{Foo.java[field:Foo.x#x".parse::<SelectionItem>().is_err());
    }
}
