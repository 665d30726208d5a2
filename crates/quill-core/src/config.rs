//! Editor configuration.
//!
//! ## Learning: Serde for Serialization
//!
//! Serde is Rust's standard for serialization/deserialization.
//! The `#[derive(Serialize, Deserialize)]` macro generates
//! code to convert structs to/from JSON, TOML, etc.
//!
//! `#[serde(default)]` uses Default::default() for missing fields,
//! making configs backward-compatible.
//!
//! ```toml
//! [editor]
//! reemit_dice_parens = false
//!
//! [editor.suggestions]
//! max_visible = 5
//!
//! [editor.autoformat]
//! dice = true
//! lists = true
//! headings = false
//!
//! [keyboard]
//! command_modifier = "ctrl"
//!
//! [keyboard.bindings]
//! "ctrl+shift+c" = "block.callout"
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::keymap::Modifiers;

/// Main editor configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Editing behavior
    pub editor: EditorConfig,

    /// Keyboard settings
    pub keyboard: KeyboardConfig,
}

impl Config {
    /// Loads config from the default location.
    pub fn load() -> Self {
        Self::load_from_default_path().unwrap_or_default()
    }

    /// Loads config from a file.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Loads from the default config path.
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
        Ok(config_dir.join("quill").join("config.toml"))
    }

    /// Saves the config to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(Self::default_path()?)
    }

    /// Saves the config to a file, creating parent directories.
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// Editing behavior configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Type a consumed leading `(` back in front of a dice roller
    pub reemit_dice_parens: bool,

    /// Suggestion popup settings
    pub suggestions: SuggestionConfig,

    /// Which Space-triggered autoformats are enabled
    pub autoformat: AutoformatConfig,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            reemit_dice_parens: false,
            suggestions: SuggestionConfig::default(),
            autoformat: AutoformatConfig::default(),
        }
    }
}

/// Suggestion popup configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuggestionConfig {
    /// Candidates shown at once
    pub max_visible: usize,
}

impl Default for SuggestionConfig {
    fn default() -> Self {
        Self { max_visible: 5 }
    }
}

/// Autoformat toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoformatConfig {
    /// `2d6 ` becomes a dice roller
    pub dice: bool,
    /// `1. `, `* `, `- ` start a list
    pub lists: bool,
    /// `# `, `## `, `### ` start a heading
    pub headings: bool,
}

impl Default for AutoformatConfig {
    fn default() -> Self {
        Self {
            dice: true,
            lists: true,
            headings: true,
        }
    }
}

/// Keyboard configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyboardConfig {
    /// Modifier that triggers formatting shortcuts
    pub command_modifier: CommandModifier,

    /// Custom key bindings, e.g. `"meta+1" = "block.h1"`
    pub bindings: BTreeMap<String, String>,
}

/// The platform "command" modifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandModifier {
    /// Cmd on macOS, Win elsewhere
    #[default]
    Meta,
    Ctrl,
}

impl CommandModifier {
    /// Returns the modifier set for this choice.
    pub fn modifiers(&self) -> Modifiers {
        match self {
            CommandModifier::Meta => Modifiers::META,
            CommandModifier::Ctrl => Modifiers::CTRL,
        }
    }
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
