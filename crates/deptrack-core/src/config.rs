use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Engine configuration, consumed by `DependencyTracker::initialize`.
///
/// Locating and reading a configuration file is the embedding application's
/// job; this type only defines the deserializable shape and its defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Glob patterns, relative to the analysis root, that directory scans
    /// never descend into.
    #[serde(default = "default_exclude")]
    pub exclude: Vec<String>,
    /// Analyze independent files on parallel workers.
    #[serde(default = "default_true")]
    pub parallel: bool,
    #[serde(default)]
    pub follow_symlinks: bool,
    /// Upper bound on a single analyzer `parse` call, in milliseconds.
    /// `0` disables the bound.
    #[serde(default = "default_parse_timeout_ms")]
    pub parse_timeout_ms: u64,
    /// Maximum directory depth for scans; unlimited when absent.
    #[serde(default)]
    pub max_depth: Option<usize>,
}

fn default_exclude() -> Vec<String> {
    vec![
        "**/target/**".to_string(),
        "**/node_modules/**".to_string(),
        "**/vendor/**".to_string(),
        "**/.git/**".to_string(),
    ]
}

fn default_true() -> bool {
    true
}

fn default_parse_timeout_ms() -> u64 {
    30_000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            exclude: default_exclude(),
            parallel: true,
            follow_symlinks: false,
            parse_timeout_ms: default_parse_timeout_ms(),
            max_depth: None,
        }
    }
}

impl Config {
    /// Deserialize a configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("failed to parse config: {e}")))
    }

    /// The per-file parse bound, or `None` when disabled.
    pub fn parse_timeout(&self) -> Option<Duration> {
        if self.parse_timeout_ms == 0 {
            None
        } else {
            Some(Duration::from_millis(self.parse_timeout_ms))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.parallel);
        assert!(!config.follow_symlinks);
        assert!(config.exclude.iter().any(|p| p.contains("node_modules")));
        assert_eq!(config.parse_timeout(), Some(Duration::from_secs(30)));
        assert!(config.max_depth.is_none());
    }

    #[test]
    fn test_from_toml_str() {
        let config = Config::from_toml_str(
            r#"
exclude = ["**/generated/**"]
parallel = false
parse_timeout_ms = 500
max_depth = 4
"#,
        )
        .unwrap();
        assert_eq!(config.exclude, vec!["**/generated/**"]);
        assert!(!config.parallel);
        assert_eq!(config.parse_timeout(), Some(Duration::from_millis(500)));
        assert_eq!(config.max_depth, Some(4));
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert!(config.parallel);
        assert_eq!(config.parse_timeout_ms, 30_000);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = Config::from_toml_str("parallel = \"maybe\"").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_zero_timeout_disables_bound() {
        let config = Config::from_toml_str("parse_timeout_ms = 0").unwrap();
        assert_eq!(config.parse_timeout(), None);
    }
}
