//! Configuration file support.
//!
//! Two configuration file locations are read:
//! - Global: `~/.tunable/config.toml` - User-wide defaults
//! - Project: `.tunable/config.toml` - Project-specific overrides
//!
//! Project config takes precedence over global config.
//!
//! ```toml
//! [cli]
//! quit_after_show = true
//! quit_after_save = true
//! prompt_overwrite = false
//!
//! [loader]
//! prefixes = ["hasher_"]
//! auto_load = true
//! on_error = "warn"
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::cli::CliSettings;
use crate::select::LoadErrorMode;

/// Tool configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Behaviour of the command-line actions
    pub cli: CliConfig,

    /// Module loading
    pub loader: LoaderConfig,
}

/// `[cli]` section. Unset keys keep the built-in behaviour.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Exit with status 1 after `--tunables-show`
    pub quit_after_show: Option<bool>,

    /// Exit with status 1 after `--tunables-save`
    pub quit_after_save: Option<bool>,

    /// Ask before overwriting an existing file on save
    pub prompt_overwrite: Option<bool>,
}

/// `[loader]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Unit name prefixes, tried newest first
    pub prefixes: Vec<String>,

    /// Load a unit named after an unknown choice before rejecting it
    pub auto_load: Option<bool>,

    /// `error`, `warn`, or `ignore` when `--module` finds no unit
    pub on_error: Option<LoadErrorMode>,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        if other.cli.quit_after_show.is_some() {
            self.cli.quit_after_show = other.cli.quit_after_show;
        }
        if other.cli.quit_after_save.is_some() {
            self.cli.quit_after_save = other.cli.quit_after_save;
        }
        if other.cli.prompt_overwrite.is_some() {
            self.cli.prompt_overwrite = other.cli.prompt_overwrite;
        }

        // Later prefixes win, so the overriding file's go last.
        for prefix in other.loader.prefixes {
            if !self.loader.prefixes.contains(&prefix) {
                self.loader.prefixes.push(prefix);
            }
        }
        if other.loader.auto_load.is_some() {
            self.loader.auto_load = other.loader.auto_load;
        }
        if other.loader.on_error.is_some() {
            self.loader.on_error = other.loader.on_error;
        }
    }

    /// Effective command-line behaviour.
    pub fn cli_settings(&self) -> CliSettings {
        let defaults = CliSettings::default();
        CliSettings {
            quit_after_show: self.cli.quit_after_show.unwrap_or(defaults.quit_after_show),
            quit_after_save: self.cli.quit_after_save.unwrap_or(defaults.quit_after_save),
            prompt_overwrite: self
                .cli
                .prompt_overwrite
                .unwrap_or(defaults.prompt_overwrite),
        }
    }

    pub fn auto_load(&self) -> bool {
        self.loader.auto_load.unwrap_or(true)
    }

    pub fn load_error_mode(&self) -> LoadErrorMode {
        self.loader.on_error.unwrap_or_default()
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (.tunable/config.toml)
/// 2. Global config (~/.tunable/config.toml)
/// 3. Defaults
pub fn load_config(global_path: Option<&Path>, project_path: &Path) -> Config {
    let mut config = Config::default();

    if let Some(global_path) = global_path {
        if global_path.exists() {
            config.merge(Config::load_or_default(global_path));
        }
    }

    if project_path.exists() {
        config.merge(Config::load_or_default(project_path));
    }

    config
}

/// Get the global config directory (~/.tunable).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".tunable"))
}

/// Get the global config path (~/.tunable/config.toml).
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("config.toml"))
}

/// Get the project config path (.tunable/config.toml).
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(".tunable").join("config.toml")
}
