//! Config file loading

use crate::domain::ReorgConfig;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

const CANDIDATES: &[&str] = &[
    "repo-reorg.toml",
    ".repo-reorg.toml",
    "reorg.toml",
    ".reorg.toml",
    "reorg.yml",
    "reorg.yaml",
];

const SECTIONS: &[&str] = &["repo-reorg", "reorg"];

/// Load the config for `workspace_root`. An explicitly passed file must
/// parse; a discovered one that does not is reported and ignored.
pub fn load_config(workspace_root: &Path, config_path: Option<&Path>) -> Result<ReorgConfig> {
    let explicit = config_path.is_some();
    let discovered = match config_path {
        Some(path) => Some(path.to_path_buf()),
        None => discover_config(workspace_root),
    };
    let Some(config_file) = discovered else {
        return Ok(ReorgConfig::default());
    };

    let parsed = fs::read_to_string(&config_file)
        .with_context(|| format!("Failed reading config file: {}", config_file.display()))
        .and_then(|content| parse_config(&content, &config_file));
    match parsed {
        Ok(config) => {
            tracing::debug!("Loaded config from {}", config_file.display());
            Ok(config)
        }
        Err(err) if explicit => Err(err),
        Err(err) => {
            tracing::warn!("Ignoring config {}: {:#}", config_file.display(), err);
            Ok(ReorgConfig::default())
        }
    }
}

fn parse_config(content: &str, config_file: &Path) -> Result<ReorgConfig> {
    let ext = config_file.extension().and_then(|e| e.to_str()).unwrap_or("").to_ascii_lowercase();
    match ext.as_str() {
        "toml" => parse_toml_config(content, config_file),
        "yaml" | "yml" => parse_yaml_config(content, config_file),
        other => anyhow::bail!(
            "Unsupported config extension '.{}' for file {}",
            other,
            config_file.display()
        ),
    }
}

/// TOML, optionally nested under `[repo-reorg]` or `[reorg]`.
fn parse_toml_config(content: &str, config_file: &Path) -> Result<ReorgConfig> {
    let raw: toml::Value = toml::from_str(content)
        .with_context(|| format!("Invalid TOML syntax: {}", config_file.display()))?;
    let section = SECTIONS.iter().find_map(|name| raw.get(*name)).cloned();
    section
        .unwrap_or(raw)
        .try_into()
        .with_context(|| format!("Invalid TOML config: {}", config_file.display()))
}

fn parse_yaml_config(content: &str, config_file: &Path) -> Result<ReorgConfig> {
    let raw: serde_yaml::Value = serde_yaml::from_str(content)
        .with_context(|| format!("Invalid YAML syntax: {}", config_file.display()))?;
    let section = SECTIONS.iter().find_map(|name| raw.get(*name)).cloned();
    serde_yaml::from_value(section.unwrap_or(raw))
        .with_context(|| format!("Invalid YAML config: {}", config_file.display()))
}

fn discover_config(workspace_root: &Path) -> Option<PathBuf> {
    CANDIDATES.iter().map(|name| workspace_root.join(name)).find(|path| path.exists())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_when_missing() {
        let tmp = TempDir::new().expect("tmp");
        let cfg = load_config(tmp.path(), None).expect("config");
        assert_eq!(cfg, ReorgConfig::default());
    }

    #[test]
    fn nested_toml_section() {
        let tmp = TempDir::new().expect("tmp");
        fs::write(
            tmp.path().join("repo-reorg.toml"),
            "[repo-reorg]\nsource_roots = \"code, tests\"\nupdate_qualified_names = true\n",
        )
        .expect("write");
        let cfg = load_config(tmp.path(), None).expect("config");
        assert_eq!(cfg.source_roots, vec!["code", "tests"]);
        assert!(cfg.update_qualified_names);
    }

    #[test]
    fn yaml_config() {
        let tmp = TempDir::new().expect("tmp");
        fs::write(tmp.path().join("reorg.yml"), "library_roots:\n  - vendor\nrespect_gitignore: false\n")
            .expect("write");
        let cfg = load_config(tmp.path(), None).expect("config");
        assert_eq!(cfg.library_roots, vec!["vendor"]);
        assert!(!cfg.respect_gitignore);
    }

    #[test]
    fn explicit_broken_config_is_an_error() {
        let tmp = TempDir::new().expect("tmp");
        let path = tmp.path().join("bad.toml");
        fs::write(&path, "update_references = \"sometimes\"\n").expect("write");
        assert!(load_config(tmp.path(), Some(&path)).is_err());

        let ini = tmp.path().join("reorg.ini");
        fs::write(&ini, "x=1\n").expect("write");
        assert!(load_config(tmp.path(), Some(&ini)).is_err());
    }

    #[test]
    fn discovered_broken_config_falls_back_to_defaults() {
        let tmp = TempDir::new().expect("tmp");
        fs::write(tmp.path().join("reorg.toml"), "source_roots = 123\n").expect("write");
        let cfg = load_config(tmp.path(), None).expect("should not error on discovery");
        assert_eq!(cfg, ReorgConfig::default());
    }
}
