//! Configuration loading and management.

use crate::dispatch::Prefix;
use regex::Regex;
use serde::Deserialize;
use std::path::Path;
use stray_parse::BoundsPolicy;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid prefix pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Bot configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Bot identity and prefixes.
    pub bot: BotConfig,
    /// Module set configuration.
    #[serde(default)]
    pub modules: ModulesConfig,
    /// Argument-handling defaults.
    #[serde(default)]
    pub args: ArgsConfig,
}

/// Bot identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    /// Bot name (used in logging).
    pub name: String,
    /// Literal command prefixes, tried in order (e.g. `["!"]`).
    #[serde(default)]
    pub prefixes: Vec<String>,
    /// Optional pattern prefix, tried after the literals. Matched at the
    /// start of the message only.
    #[serde(default)]
    pub prefix_pattern: Option<String>,
}

/// Module set configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ModulesConfig {
    /// Module ids loaded at startup.
    #[serde(default = "default_autoload")]
    pub autoload: Vec<String>,
}

impl Default for ModulesConfig {
    fn default() -> Self {
        Self {
            autoload: default_autoload(),
        }
    }
}

fn default_autoload() -> Vec<String> {
    vec!["general".to_string(), "admin".to_string()]
}

/// Argument-handling defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArgsConfig {
    /// What number transformers do with out-of-bounds values.
    #[serde(default)]
    pub bounds_policy: PolicyConfig,
}

/// Serializable form of the number-bounds policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyConfig {
    /// Clamp out-of-bounds values to the violated bound.
    #[default]
    Clamp,
    /// Reject out-of-bounds values with a parse error.
    Reject,
}

impl From<PolicyConfig> for BoundsPolicy {
    fn from(policy: PolicyConfig) -> Self {
        match policy {
            PolicyConfig::Clamp => Self::Clamp,
            PolicyConfig::Reject => Self::Reject,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bot: BotConfig {
                name: "straybot".to_string(),
                prefixes: vec!["!".to_string()],
                prefix_pattern: None,
            },
            modules: ModulesConfig::default(),
            args: ArgsConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }

    /// Build the prefix list: literals first, then the pattern if set.
    pub fn prefixes(&self) -> Result<Vec<Prefix>, ConfigError> {
        let mut prefixes: Vec<Prefix> = self
            .bot
            .prefixes
            .iter()
            .map(|prefix| Prefix::literal(prefix.clone()))
            .collect();
        if let Some(pattern) = &self.bot.prefix_pattern {
            prefixes.push(Prefix::pattern(Regex::new(pattern)?));
        }
        Ok(prefixes)
    }
}
