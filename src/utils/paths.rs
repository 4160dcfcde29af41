//! Workspace-relative path helpers.
//!
//! Workspace paths are always `/`-separated and relative to the workspace
//! root. The root itself is the empty string.

pub fn normalize_path(path: &str) -> String {
    let replaced = path.replace('\\', "/");
    let parts: Vec<&str> =
        replaced.split('/').filter(|part| !part.is_empty() && *part != ".").collect();
    parts.join("/")
}

/// Parent of a workspace path, `None` for the root.
pub fn parent_path(path: &str) -> Option<String> {
    if path.is_empty() {
        return None;
    }
    match path.rfind('/') {
        Some(idx) => Some(path[..idx].to_string()),
        None => Some(String::new()),
    }
}

pub fn file_name(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}

pub fn join_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        normalize_path(name)
    } else {
        normalize_path(&format!("{parent}/{name}"))
    }
}

/// `Foo.java` -> `Foo`. Names without an extension are returned unchanged.
pub fn strip_extension(name: &str) -> &str {
    match name.rfind('.') {
        Some(0) | None => name,
        Some(idx) => &name[..idx],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_separators() {
        assert_eq!(normalize_path("./src\\pkg//a/"), "src/pkg/a");
        assert_eq!(normalize_path(""), "");
    }

    #[test]
    fn parent_of_top_level_entry_is_root() {
        assert_eq!(parent_path("src"), Some(String::new()));
        assert_eq!(parent_path("src/pkg/Foo.java").as_deref(), Some("src/pkg"));
        assert_eq!(parent_path(""), None);
    }

    #[test]
    fn strip_extension_keeps_dotfiles() {
        assert_eq!(strip_extension("Foo.java"), "Foo");
        assert_eq!(strip_extension(".reorg"), ".reorg");
        assert_eq!(strip_extension("Makefile"), "Makefile");
    }
}
