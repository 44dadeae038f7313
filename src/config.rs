//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/mxlab/mxlab.toml` (or an explicit `--config` file)
//! 3. Environment variables: `MXLAB_*` prefix
//! 4. Command line overrides (`--api-url`)

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::ApplicationError;
use crate::domain::DEFAULT_HISTORY_LIMIT;

/// Raw settings for intermediate parsing (fields are Option to detect "not specified").
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub api_base_url: Option<String>,
    pub draft_dir: Option<PathBuf>,
    pub timeout_secs: Option<u64>,
    pub history_limit: Option<usize>,
}

/// Unified configuration for mxlab.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Backend location (default: http://localhost:8000)
    pub api_base_url: String,
    /// Where edit drafts are kept (default: ~/.mxlab/drafts)
    pub draft_dir: PathBuf,
    /// HTTP request timeout in seconds
    pub timeout_secs: u64,
    /// Undo snapshots kept per draft
    pub history_limit: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000".into(),
            draft_dir: default_draft_dir(),
            timeout_secs: 30,
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

/// Get the default draft directory (~/.mxlab/drafts).
fn default_draft_dir() -> PathBuf {
    directories::BaseDirs::new()
        .map(|dirs| dirs.home_dir().join(".mxlab").join("drafts"))
        .unwrap_or_else(|| PathBuf::from("~/.mxlab/drafts"))
}

/// Get the XDG config directory for mxlab.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "mxlab").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("mxlab.toml"))
}

/// Expand `~`, `$VAR` and `${VAR}` in a path string.
pub fn expand_env_vars(path: &str) -> String {
    shellexpand::full(path)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| path.to_string())
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

impl Settings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Expand shell variables and tilde in path-like fields.
    fn expand_paths(&mut self) {
        let expanded = expand_env_vars(self.draft_dir.to_string_lossy().as_ref());
        self.draft_dir = PathBuf::from(expanded);
    }

    /// Overlay wins for every field it specifies.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            api_base_url: overlay
                .api_base_url
                .clone()
                .unwrap_or_else(|| self.api_base_url.clone()),
            draft_dir: overlay
                .draft_dir
                .clone()
                .unwrap_or_else(|| self.draft_dir.clone()),
            timeout_secs: overlay.timeout_secs.unwrap_or(self.timeout_secs),
            history_limit: overlay.history_limit.unwrap_or(self.history_limit),
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `config_file` - Explicit config file; replaces the global XDG file when given
    ///
    /// # Precedence (lowest to highest)
    /// 1. Compiled defaults
    /// 2. Config file (explicit, else `$XDG_CONFIG_HOME/mxlab/mxlab.toml` if present)
    /// 3. Environment variables: `MXLAB_*` prefix
    pub fn load(config_file: Option<&Path>) -> Result<Self, ApplicationError> {
        let mut current = Self::default();

        match config_file {
            Some(path) => {
                if !path.exists() {
                    return Err(ApplicationError::Config {
                        message: format!("config file not found: {}", path.display()),
                    });
                }
                current = current.merge_with(&load_raw_settings(path)?);
            }
            None => {
                if let Some(global_path) = global_config_path() {
                    if global_path.exists() {
                        current = current.merge_with(&load_raw_settings(&global_path)?);
                    }
                }
            }
        }

        current = Self::apply_env_overrides(current)?;
        current.expand_paths();

        Ok(current)
    }

    /// Apply MXLAB_* environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        let config = Config::builder()
            .add_source(
                Environment::with_prefix("MXLAB")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get_string("api_base_url") {
            settings.api_base_url = val;
        }
        if let Ok(val) = config.get_string("draft_dir") {
            settings.draft_dir = PathBuf::from(val);
        }
        if let Ok(val) = config.get_int("timeout_secs") {
            settings.timeout_secs = u64::try_from(val).map_err(|_| ApplicationError::Config {
                message: format!("MXLAB_TIMEOUT_SECS must be positive, got {val}"),
            })?;
        }
        if let Ok(val) = config.get_int("history_limit") {
            settings.history_limit =
                usize::try_from(val).map_err(|_| ApplicationError::Config {
                    message: format!("MXLAB_HISTORY_LIMIT must be positive, got {val}"),
                })?;
        }

        Ok(settings)
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# mxlab configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/mxlab/mxlab.toml  (or --config <file>)
#   Env:    MXLAB_* environment variables
#   CLI:    --api-url

# Backend location
# api_base_url = "http://localhost:8000"

# Where edit drafts are kept
# draft_dir = "~/.mxlab/drafts"

# HTTP request timeout in seconds
# timeout_secs = 30

# Undo snapshots kept per draft
# history_limit = 50
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}
