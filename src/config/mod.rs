//! Harness configuration management for `hotshell.toml`.
//!
//! A deliberately small surface: everything has a default so the harness
//! runs with no config file at all. Unknown keys warn instead of erroring -
//! they usually mean a typo, and a dev tool should say so rather than die.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Config file name, looked up under the watch root.
pub const CONFIG_FILE: &str = "hotshell.toml";

// ============================================================================
// ConfigError
// ============================================================================

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error when reading `{0}`")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Config file parsing error")]
    Toml(#[from] toml::de::Error),
}

// ============================================================================
// HarnessConfig
// ============================================================================

/// Top-level harness configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    pub watch: WatchSection,
    pub build: BuildSection,
}

/// `[watch]` section: trigger timing and extra ignore rules.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WatchSection {
    /// Quiet window after the last raw event before a trigger fires.
    pub debounce_ms: u64,

    /// Minimum spacing between consecutive triggers.
    pub cooldown_ms: u64,

    /// Directory names ignored in addition to the built-in set.
    pub ignore_dirs: Vec<String>,

    /// File suffixes ignored in addition to the built-in set.
    pub ignore_extensions: Vec<String>,
}

impl Default for WatchSection {
    fn default() -> Self {
        Self {
            debounce_ms: 300,
            cooldown_ms: 800,
            ignore_dirs: Vec::new(),
            ignore_extensions: Vec::new(),
        }
    }
}

/// `[build]` section: how view-crate artifacts are produced.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BuildSection {
    /// Cargo profile used for view-crate builds.
    pub profile: String,

    /// Scratch directory name under the root (gitignored, holds artifacts).
    pub scratch_dir: String,
}

impl Default for BuildSection {
    fn default() -> Self {
        Self {
            profile: "dev".into(),
            scratch_dir: ".hotshell".into(),
        }
    }
}

impl HarnessConfig {
    /// Load `hotshell.toml` from the root if present; defaults otherwise.
    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        let path = root.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw =
            std::fs::read_to_string(&path).map_err(|e| ConfigError::Io(path.clone(), e))?;
        let (config, unknown) = Self::parse(&raw)?;
        for field in &unknown {
            crate::log!("config"; "unknown field `{}` ignored", field);
        }
        Ok(config)
    }

    /// Parse config text, collecting unknown field paths.
    fn parse(raw: &str) -> Result<(Self, Vec<String>), ConfigError> {
        let de = toml::de::Deserializer::new(raw);
        let mut unknown = Vec::new();
        let config = serde_ignored::deserialize(de, |path| unknown.push(path.to_string()))?;
        Ok((config, unknown))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = HarnessConfig::default();
        assert_eq!(config.watch.debounce_ms, 300);
        assert_eq!(config.watch.cooldown_ms, 800);
        assert_eq!(config.build.profile, "dev");
        assert_eq!(config.build.scratch_dir, ".hotshell");
    }

    #[test]
    fn test_parse_partial_overrides() {
        let raw = r#"
            [watch]
            debounce_ms = 150
            ignore_dirs = ["fixtures"]
        "#;
        let (config, unknown) = HarnessConfig::parse(raw).unwrap();
        assert!(unknown.is_empty());
        assert_eq!(config.watch.debounce_ms, 150);
        assert_eq!(config.watch.cooldown_ms, 800); // untouched default
        assert_eq!(config.watch.ignore_dirs, vec!["fixtures".to_string()]);
    }

    #[test]
    fn test_parse_unknown_fields_collected() {
        let raw = r#"
            [watch]
            debounce = 150

            [serve]
            port = 3000
        "#;
        let (config, unknown) = HarnessConfig::parse(raw).unwrap();
        assert_eq!(config.watch.debounce_ms, 300);
        assert!(unknown.iter().any(|f| f == "watch.debounce"));
        assert!(unknown.iter().any(|f| f.starts_with("serve")));
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let temp = tempfile::TempDir::new().unwrap();
        let config = HarnessConfig::load(temp.path()).unwrap();
        assert_eq!(config.build.scratch_dir, ".hotshell");
    }
}
