//! Layering of environment variables and command-line flags over the file
//! config (CLI > Env > File > Defaults).

use crate::domain::ReorgConfig;
use anyhow::{Context, Result};
use figment::providers::{Env, Serialized};
use figment::Figment;

pub const ENV_PREFIX: &str = "REPO_REORG_";

/// Values given on the command line; `None` leaves the config alone.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub source_roots: Option<Vec<String>>,
    pub library_roots: Option<Vec<String>>,
    pub exclude_globs: Option<Vec<String>>,
    pub respect_gitignore: Option<bool>,
    pub update_references: Option<bool>,
    pub update_qualified_names: Option<bool>,
    pub qualified_name_patterns: Option<String>,
}

/// Overlay `REPO_REORG_*` variables (`REPO_REORG_UPDATE_REFERENCES=false`,
/// `REPO_REORG_SOURCE_ROOTS="code,tests"`).
pub fn apply_env(config: ReorgConfig) -> Result<ReorgConfig> {
    Figment::from(Serialized::defaults(config))
        .merge(Env::prefixed(ENV_PREFIX))
        .extract()
        .with_context(|| format!("Invalid {ENV_PREFIX}* environment variable"))
}

pub fn merge_cli_with_config(mut config: ReorgConfig, cli: CliOverrides) -> ReorgConfig {
    if let Some(roots) = cli.source_roots {
        config.source_roots = roots;
    }
    if let Some(roots) = cli.library_roots {
        config.library_roots = roots;
    }
    if let Some(globs) = cli.exclude_globs {
        for glob in globs {
            if !config.exclude_globs.contains(&glob) {
                config.exclude_globs.push(glob);
            }
        }
    }
    if let Some(value) = cli.respect_gitignore {
        config.respect_gitignore = value;
    }
    if let Some(value) = cli.update_references {
        config.update_references = value;
    }
    if let Some(value) = cli.update_qualified_names {
        config.update_qualified_names = value;
    }
    if let Some(patterns) = cli.qualified_name_patterns {
        config.qualified_name_patterns = patterns;
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_wins_and_excludes_accumulate() {
        let merged = merge_cli_with_config(
            ReorgConfig::default(),
            CliOverrides {
                update_references: Some(false),
                exclude_globs: Some(vec!["gen/**".to_string(), "out/**".to_string()]),
                qualified_name_patterns: Some("*.xml".to_string()),
                ..CliOverrides::default()
            },
        );
        assert!(!merged.update_references);
        assert_eq!(merged.qualified_name_patterns, "*.xml");
        assert!(merged.exclude_globs.contains(&"gen/**".to_string()));
        assert_eq!(merged.exclude_globs.iter().filter(|g| *g == "out/**").count(), 1);
        assert_eq!(merged.source_roots, ReorgConfig::default().source_roots);
    }

    #[test]
    fn environment_overlays_the_file_config() {
        std::env::set_var("REPO_REORG_QUALIFIED_NAME_PATTERNS", "*.conf");
        let config = apply_env(ReorgConfig::default());
        std::env::remove_var("REPO_REORG_QUALIFIED_NAME_PATTERNS");
        let config = config.expect("env");
        assert_eq!(config.qualified_name_patterns, "*.conf");
        assert!(config.update_references);
    }
}
