//! Configuration file handling for dealercall
//!
//! Precedence, lowest first: config file, `VOICE_*` environment, flags.
//!
//! ```toml
//! output = "json"
//! no_color = false
//!
//! [voice]
//! api_key = "..."
//! assistant_id = "asst_123"
//! phone_number_id = "pn_456"
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use dealercall_core::config::keys;
use dealercall_core::{ConfigSource, VoiceCallConfig};
use serde::{Deserialize, Serialize};

/// Configuration for the CLI tool
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Default output format
    pub output: Option<String>,
    /// Disable colored output
    pub no_color: Option<bool>,
    /// Voice API settings
    pub voice: Option<VoiceCallConfig>,
}

/// Voice settings given on the command line
#[derive(Debug, Clone, Default)]
pub struct VoiceOverrides {
    pub base_url: Option<String>,
    pub assistant_id: Option<String>,
    pub phone_number_id: Option<String>,
    pub webhook_url: Option<String>,
    pub max_retries: Option<u32>,
    pub timeout_ms: Option<u64>,
}

impl VoiceOverrides {
    /// Flags as a config source keyed like the environment
    fn to_source(&self) -> HashMap<String, String> {
        let mut source = HashMap::new();
        let mut set = |key: &str, value: Option<String>| {
            if let Some(value) = value {
                source.insert(key.to_string(), value);
            }
        };
        set(keys::BASE_URL, self.base_url.clone());
        set(keys::ASSISTANT_ID, self.assistant_id.clone());
        set(keys::PHONE_NUMBER_ID, self.phone_number_id.clone());
        set(keys::WEBHOOK_URL, self.webhook_url.clone());
        set(keys::MAX_RETRIES, self.max_retries.map(|v| v.to_string()));
        set(keys::TIMEOUT_MS, self.timeout_ms.map(|v| v.to_string()));
        source
    }
}

impl Config {
    /// Load configuration from the default config file
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Get the default config file path
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?
            .join("dealercall");

        Ok(config_dir.join("config.toml"))
    }

    /// Layer the environment and command-line flags over the file
    pub fn voice_config(&self, env: &dyn ConfigSource, flags: &VoiceOverrides) -> VoiceCallConfig {
        self.voice
            .clone()
            .unwrap_or_default()
            .overlay(env)
            .overlay(&flags.to_source())
    }

    /// Output format name, if the file sets one
    pub fn output(&self) -> Option<&str> {
        self.output.as_deref()
    }

    pub fn no_color(&self) -> bool {
        self.no_color.unwrap_or(false)
    }
}
