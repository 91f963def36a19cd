//! Application configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/decksmith/config.toml)
//! 3. Environment variables (DECKSMITH_* prefix)
//!
//! Environment variables take precedence over config file values.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::media::{Corner, Edge, MaskColor, Percent};

/// Environment variable prefix
const ENV_PREFIX: &str = "DECKSMITH";

/// File name searched for tag rules when `tags_file` is unset
pub const TAGS_FILE_NAME: &str = "tags_config.txt";

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Parent directory for per-run staging directories
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,

    /// Explicit tag rules file (searched for when unset)
    #[serde(default)]
    pub tags_file: Option<PathBuf>,

    /// Log filter level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Write logs here instead of stderr
    #[serde(default)]
    pub log_file: Option<PathBuf>,

    /// Defaults for the image transforms
    #[serde(default)]
    pub image: ImageDefaults,
}

/// Default parameters for crop and mask runs
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ImageDefaults {
    pub crop_percent: Percent,
    pub crop_from: Edge,
    pub mask_width_percent: Percent,
    pub mask_height_percent: Percent,
    pub mask_corner: Corner,
    pub mask_color: MaskColor,
}

impl Default for ImageDefaults {
    fn default() -> Self {
        Self {
            crop_percent: Percent::DEFAULT,
            crop_from: Edge::Right,
            mask_width_percent: Percent::DEFAULT,
            mask_height_percent: Percent::DEFAULT,
            mask_corner: Corner::BottomRight,
            mask_color: MaskColor::Black,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            work_dir: default_work_dir(),
            tags_file: None,
            log_level: default_log_level(),
            log_file: None,
            image: ImageDefaults::default(),
        }
    }
}

impl Config {
    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (DECKSMITH_WORK_DIR, DECKSMITH_TAGS_FILE, ...)
    /// 2. Config file (~/.config/decksmith/config.toml or DECKSMITH_CONFIG)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load configuration, preferring a path given on the command line
    pub fn load_with_cli_override(path: Option<&PathBuf>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => Self::load(),
        }
    }

    /// Load configuration from a specific path
    ///
    /// Environment variables are still applied as overrides.
    /// If the file doesn't exist, defaults are used.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        // DECKSMITH_WORK_DIR
        if let Ok(val) = std::env::var(format!("{}_WORK_DIR", ENV_PREFIX)) {
            if !val.is_empty() {
                self.work_dir = PathBuf::from(val);
            }
        }

        // DECKSMITH_TAGS_FILE
        if let Ok(val) = std::env::var(format!("{}_TAGS_FILE", ENV_PREFIX)) {
            self.tags_file = if val.is_empty() {
                None
            } else {
                Some(PathBuf::from(val))
            };
        }

        // DECKSMITH_LOG_LEVEL
        if let Ok(val) = std::env::var(format!("{}_LOG_LEVEL", ENV_PREFIX)) {
            if !val.is_empty() {
                self.log_level = val;
            }
        }

        // DECKSMITH_LOG_FILE
        if let Ok(val) = std::env::var(format!("{}_LOG_FILE", ENV_PREFIX)) {
            self.log_file = if val.is_empty() {
                None
            } else {
                Some(PathBuf::from(val))
            };
        }
    }

    /// Save configuration to the default file
    pub fn save(&self) -> Result<()> {
        self.save_to_path(&Self::config_file_path())
    }

    /// Save configuration to a specific file
    pub fn save_to_path(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;
        Ok(())
    }

    /// Get the config file path
    ///
    /// Can be overridden with DECKSMITH_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            return PathBuf::from(path);
        }

        config_dir().join("config.toml")
    }

    /// Candidate locations for the tag rules file, in lookup order
    ///
    /// An explicit `tags_file` is the only candidate when set.
    pub fn tags_file_candidates(&self) -> Vec<PathBuf> {
        if let Some(ref path) = self.tags_file {
            return vec![path.clone()];
        }

        let mut candidates = Vec::with_capacity(2);
        match std::env::current_dir() {
            Ok(cwd) => candidates.push(cwd.join(TAGS_FILE_NAME)),
            Err(_) => candidates.push(PathBuf::from(TAGS_FILE_NAME)),
        }
        candidates.push(config_dir().join(TAGS_FILE_NAME));
        candidates
    }

    /// First existing tag rules file, if any
    pub fn resolve_tags_file(&self) -> Option<PathBuf> {
        self.tags_file_candidates()
            .into_iter()
            .find(|path| path.is_file())
    }
}

/// Directory holding config.toml and the default tag rules
fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("decksmith")
}

/// Get the default work directory
fn default_work_dir() -> PathBuf {
    std::env::temp_dir().join("decksmith")
}

fn default_log_level() -> String {
    "warn".to_string()
}
