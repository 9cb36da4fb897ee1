//! Editor configuration.
//!
//! ## Learning: Serde for Serialization
//!
//! `#[derive(Serialize, Deserialize)]` generates the code that converts
//! these structs to and from TOML. `#[serde(default)]` fills missing fields
//! from `Default::default()`, so a config file only needs the keys it wants
//! to change.
//!
//! ```toml
//! [editor]
//! kill_ring_capacity = 64
//! code_parens = false
//!
//! [keyboard.bindings]
//! "ctrl+y" = "yank"
//! "ctrl+x" = "delete-current-box"
//! ```

use boxy_tree::Dialect;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Main editor configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Editing behavior
    pub editor: EditorConfig,

    /// Keyboard settings
    pub keyboard: KeyboardConfig,
}

impl Config {
    /// Loads config from the default location, falling back to defaults.
    pub fn load() -> Self {
        match Self::load_from_default_path() {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Using default config: {}", e);
                Self::default()
            }
        }
    }

    /// Loads config from a file.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    fn load_from_default_path() -> Result<Self, ConfigError> {
        let path = Self::default_path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Returns the default config file path.
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("boxy").join("config.toml"))
    }

    /// Saves the config to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(Self::default_path()?)
    }

    /// Saves the config to `path`, creating parent directories.
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Serialization dialect selected by this config.
    pub fn dialect(&self) -> Dialect {
        Dialect {
            code_parens: self.editor.code_parens,
        }
    }
}

/// Editing behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Number of kills remembered for yanking
    pub kill_ring_capacity: usize,

    /// Append a space run when moving to the end of a line that ends in a box
    pub pad_trailing_box: bool,

    /// Read and write `( ... )` as code boxes
    pub code_parens: bool,

    /// Show multi-line evaluator responses as rendered markdown
    pub markdown_responses: bool,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            kill_ring_capacity: 32,
            pad_trailing_box: true,
            code_parens: true,
            markdown_responses: true,
        }
    }
}

/// Keyboard configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyboardConfig {
    /// Extra bindings, key string to command name, layered over the defaults
    pub bindings: HashMap<String, String>,
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config directory not found")]
    NoConfigDir,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}
