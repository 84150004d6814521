//! Configuration loading and management
//!
//! Handles parsing of `.duty.toml` configuration files at the deck root.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::storage::CONFIG_FILE;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Club name shown in notification templates
    #[serde(default = "default_club")]
    pub club: String,

    /// Notification configuration
    #[serde(default)]
    pub notify: NotifyConfig,

    /// Assist (text generation) configuration
    #[serde(default)]
    pub assist: AssistConfig,

    /// Roster and credential configuration
    #[serde(default)]
    pub roster: RosterConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            club: default_club(),
            notify: NotifyConfig::default(),
            assist: AssistConfig::default(),
            roster: RosterConfig::default(),
        }
    }
}

fn default_club() -> String {
    "duty".to_string()
}

impl Config {
    /// Load configuration from `<deck>/.duty.toml`, falling back to defaults
    /// when the file is absent or unreadable.
    pub fn load_from_deck(deck: &Path) -> Self {
        let path = deck.join(CONFIG_FILE);
        let Ok(raw) = std::fs::read_to_string(&path) else {
            return Config::default();
        };
        match toml::from_str(&raw) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(path = %path.display(), %err, "invalid config, using defaults");
                Config::default()
            }
        }
    }
}

/// Notification channel selection and delivery settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Active channel: "http", "outbox", or "off"
    #[serde(default = "default_channel")]
    pub channel: String,

    /// HTTP provider endpoint (http channel only)
    #[serde(default)]
    pub api_url: Option<String>,

    /// Environment variable holding the provider API key
    #[serde(default = "default_notify_key_env")]
    pub api_key_env: String,

    /// From address for outbound mail
    #[serde(default = "default_from")]
    pub from: String,

    /// Base URL used to build deep links into task pages
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

fn default_channel() -> String {
    "outbox".to_string()
}

fn default_notify_key_env() -> String {
    "DUTY_NOTIFY_API_KEY".to_string()
}

fn default_from() -> String {
    "noreply@duty.local".to_string()
}

fn default_base_url() -> String {
    "http://localhost:3000".to_string()
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            channel: default_channel(),
            api_url: None,
            api_key_env: default_notify_key_env(),
            from: default_from(),
            base_url: default_base_url(),
        }
    }
}

/// Assist endpoint settings (prompt-in/text-out)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistConfig {
    /// Text-generation endpoint URL; assist is disabled when unset
    #[serde(default)]
    pub api_url: Option<String>,

    /// Environment variable holding the endpoint API key
    #[serde(default = "default_assist_key_env")]
    pub api_key_env: String,

    /// Model identifier passed through to the endpoint
    #[serde(default = "default_model")]
    pub model: String,
}

fn default_assist_key_env() -> String {
    "DUTY_ASSIST_API_KEY".to_string()
}

fn default_model() -> String {
    "text-default".to_string()
}

impl Default for AssistConfig {
    fn default() -> Self {
        Self {
            api_url: None,
            api_key_env: default_assist_key_env(),
            model: default_model(),
        }
    }
}

/// Roster and credential settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterConfig {
    /// Iteration count for the credential hash stretch
    #[serde(default = "default_hash_iterations")]
    pub hash_iterations: u32,
}

fn default_hash_iterations() -> u32 {
    600_000
}

impl Default for RosterConfig {
    fn default() -> Self {
        Self {
            hash_iterations: default_hash_iterations(),
        }
    }
}
