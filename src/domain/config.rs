//! Engine and workspace configuration.

use serde::{Deserialize, Deserializer, Serialize};
use std::path::PathBuf;

pub fn default_source_roots() -> &'static [&'static str] {
    &["src", "src/main/java", "src/test/java", "*/src", "*/src/main/java", "*/src/test/java"]
}

pub fn default_library_roots() -> &'static [&'static str] {
    &["lib", "*/lib"]
}

pub fn default_exclude_globs() -> &'static [&'static str] {
    &["target/**", "*/target/**", "build/**", "*/build/**", "out/**", "bin/**", ".reorg/**"]
}

/// Resolved configuration (defaults < file < env < CLI).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReorgConfig {
    /// Globs (relative to the workspace root) naming source root folders.
    #[serde(deserialize_with = "string_or_list")]
    pub source_roots: Vec<String>,
    /// Roots holding archived or external code; never a destination.
    #[serde(deserialize_with = "string_or_list")]
    pub library_roots: Vec<String>,
    #[serde(deserialize_with = "extension_list")]
    pub source_extensions: Vec<String>,
    #[serde(deserialize_with = "extension_list")]
    pub binary_extensions: Vec<String>,
    #[serde(deserialize_with = "string_or_list")]
    pub read_only_globs: Vec<String>,
    #[serde(deserialize_with = "string_or_list")]
    pub exclude_globs: Vec<String>,
    pub respect_gitignore: bool,
    pub update_references: bool,
    pub update_qualified_names: bool,
    /// Comma-separated file name patterns searched for qualified names.
    pub qualified_name_patterns: String,
    pub history_file: PathBuf,
}

impl Default for ReorgConfig {
    fn default() -> Self {
        Self {
            source_roots: default_source_roots().iter().map(|s| s.to_string()).collect(),
            library_roots: default_library_roots().iter().map(|s| s.to_string()).collect(),
            source_extensions: vec![".java".to_string()],
            binary_extensions: vec![".class".to_string()],
            read_only_globs: Vec::new(),
            exclude_globs: default_exclude_globs().iter().map(|s| s.to_string()).collect(),
            respect_gitignore: true,
            update_references: true,
            update_qualified_names: false,
            qualified_name_patterns: "*.xml,*.properties".to_string(),
            history_file: PathBuf::from(".reorg/history.jsonl"),
        }
    }
}

impl ReorgConfig {
    pub fn qualified_name_pattern_list(&self) -> Vec<String> {
        split_csv(&self.qualified_name_patterns)
    }
}

pub fn split_csv(value: &str) -> Vec<String> {
    value.split(',').map(str::trim).filter(|part| !part.is_empty()).map(str::to_string).collect()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrList {
    One(String),
    Many(Vec<String>),
}

/// Accept either `"a, b"` or `["a", "b"]`.
fn string_or_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = StringOrList::deserialize(deserializer)?;
    Ok(match raw {
        StringOrList::One(value) => split_csv(&value),
        StringOrList::Many(values) => values
            .into_iter()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .collect(),
    })
}

fn extension_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let values = string_or_list(deserializer)?;
    Ok(values
        .into_iter()
        .map(|ext| if ext.starts_with('.') { ext } else { format!(".{ext}") })
        .map(|ext| ext.to_ascii_lowercase())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_java_layouts() {
        let cfg = ReorgConfig::default();
        assert!(cfg.source_roots.contains(&"src/main/java".to_string()));
        assert_eq!(cfg.source_extensions, vec![".java"]);
        assert!(cfg.update_references);
        assert!(!cfg.update_qualified_names);
        assert_eq!(cfg.qualified_name_pattern_list(), vec!["*.xml", "*.properties"]);
    }

    #[test]
    fn extensions_are_normalized() {
        let cfg: ReorgConfig =
            toml::from_str("source_extensions = \"java, JAV\"\nbinary_extensions = [\"class\"]\n")
                .expect("parse");
        assert_eq!(cfg.source_extensions, vec![".java", ".jav"]);
        assert_eq!(cfg.binary_extensions, vec![".class"]);
    }
}
