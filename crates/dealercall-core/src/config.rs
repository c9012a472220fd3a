//! Voice API configuration
//!
//! Configuration is resolved once from a key/value [`ConfigSource`] (the
//! process environment in production, a map in tests) or loaded from a
//! TOML file, then passed explicitly to every component. Nothing here is
//! process-global and no credential has a built-in fallback.
//!
//! # Example
//!
//! ```rust
//! use std::collections::HashMap;
//! use dealercall_core::VoiceCallConfig;
//!
//! let mut env = HashMap::new();
//! env.insert("VOICE_API_KEY".to_string(), "key".to_string());
//! env.insert("VOICE_ASSISTANT_ID".to_string(), "asst".to_string());
//! env.insert("VOICE_PHONE_NUMBER_ID".to_string(), "pn".to_string());
//!
//! let config = VoiceCallConfig::resolve(&env);
//! assert!(config.is_configured());
//! assert_eq!(config.base_url, "https://api.vapi.ai");
//! ```

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;
use url::Url;

use crate::error::ConfigResult;

/// Provider's public endpoint
pub const DEFAULT_BASE_URL: &str = "https://api.vapi.ai";
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_RETRY_BACKOFF_MS: u64 = 250;

/// Recognised configuration keys
pub mod keys {
    pub const API_KEY: &str = "VOICE_API_KEY";
    pub const BASE_URL: &str = "VOICE_BASE_URL";
    pub const ASSISTANT_ID: &str = "VOICE_ASSISTANT_ID";
    pub const DEFAULT_ASSISTANT_ID: &str = "VOICE_DEFAULT_ASSISTANT_ID";
    pub const PHONE_NUMBER_ID: &str = "VOICE_PHONE_NUMBER_ID";
    pub const WEBHOOK_URL: &str = "VOICE_WEBHOOK_URL";
    pub const MAX_RETRIES: &str = "VOICE_MAX_RETRIES";
    pub const TIMEOUT_MS: &str = "VOICE_TIMEOUT_MS";
    pub const RETRY_BACKOFF_MS: &str = "VOICE_RETRY_BACKOFF_MS";

    /// All keys with a one-line description, for help output
    pub const ALL: &[(&str, &str)] = &[
        (API_KEY, "Voice API key, sent as a bearer token"),
        (BASE_URL, "Voice API base URL (default: https://api.vapi.ai)"),
        (ASSISTANT_ID, "Assistant used for outbound calls"),
        (DEFAULT_ASSISTANT_ID, "Fallback assistant if no specific one is set"),
        (PHONE_NUMBER_ID, "Provider id of the number calls are placed from"),
        (WEBHOOK_URL, "Endpoint the provider pushes call events to (optional)"),
        (MAX_RETRIES, "Retries for connection failures (default: 3)"),
        (TIMEOUT_MS, "Per-request deadline in milliseconds (default: 30000)"),
        (RETRY_BACKOFF_MS, "Base delay between retries in milliseconds (default: 250)"),
    ];
}

/// Key/value lookup for configuration values
pub trait ConfigSource {
    /// Raw value for `key`, if set
    fn get(&self, key: &str) -> Option<String>;
}

/// Reads configuration from the process environment
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvSource;

impl ConfigSource for EnvSource {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl ConfigSource for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned()
    }
}

impl ConfigSource for HashMap<&str, &str> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).map(|v| v.to_string())
    }
}

/// Everything needed to talk to the voice API
///
/// Never mutated after construction; use [`validate`](Self::validate) to
/// check it before use.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceCallConfig {
    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assistant_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_assistant_id: Option<String>,

    #[serde(default)]
    pub phone_number_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,

    /// Retry budget for failures that never reached the provider
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Per-request deadline
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Base delay between retries (multiplied by the attempt number)
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Values that were present but malformed at resolve time
    #[serde(skip)]
    rejected: Vec<String>,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

fn default_retry_backoff_ms() -> u64 {
    DEFAULT_RETRY_BACKOFF_MS
}

impl Default for VoiceCallConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_base_url(),
            assistant_id: None,
            default_assistant_id: None,
            phone_number_id: String::new(),
            webhook_url: None,
            max_retries: default_max_retries(),
            timeout_ms: default_timeout_ms(),
            retry_backoff_ms: default_retry_backoff_ms(),
            rejected: Vec::new(),
        }
    }
}

impl fmt::Debug for VoiceCallConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let api_key = if self.api_key.is_empty() {
            "<unset>"
        } else {
            "<redacted>"
        };
        f.debug_struct("VoiceCallConfig")
            .field("api_key", &api_key)
            .field("base_url", &self.base_url)
            .field("assistant_id", &self.assistant_id)
            .field("default_assistant_id", &self.default_assistant_id)
            .field("phone_number_id", &self.phone_number_id)
            .field("webhook_url", &self.webhook_url)
            .field("max_retries", &self.max_retries)
            .field("timeout_ms", &self.timeout_ms)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .finish()
    }
}

/// Result of [`VoiceCallConfig::status`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigStatus {
    pub configured: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

/// Non-blank, trimmed value for `key`
fn lookup(source: &dyn ConfigSource, key: &str) -> Option<String> {
    source
        .get(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl VoiceCallConfig {
    /// Resolve configuration from a source, applying defaults
    pub fn resolve(source: &dyn ConfigSource) -> Self {
        Self::default().overlay(source)
    }

    /// Resolve configuration from the process environment
    pub fn from_env() -> Self {
        Self::resolve(&EnvSource)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration from a TOML file
    pub fn from_toml_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Apply every key present in `source` on top of this config
    ///
    /// Keys absent (or blank) in `source` keep their current value.
    pub fn overlay(mut self, source: &dyn ConfigSource) -> Self {
        if let Some(v) = lookup(source, keys::API_KEY) {
            self.api_key = v;
        }
        if let Some(v) = lookup(source, keys::BASE_URL) {
            self.base_url = v;
        }
        if let Some(v) = lookup(source, keys::ASSISTANT_ID) {
            self.assistant_id = Some(v);
        }
        if let Some(v) = lookup(source, keys::DEFAULT_ASSISTANT_ID) {
            self.default_assistant_id = Some(v);
        }
        if let Some(v) = lookup(source, keys::PHONE_NUMBER_ID) {
            self.phone_number_id = v;
        }
        if let Some(v) = lookup(source, keys::WEBHOOK_URL) {
            self.webhook_url = Some(v);
        }
        if let Some(v) = lookup(source, keys::MAX_RETRIES) {
            match v.parse() {
                Ok(n) => self.max_retries = n,
                Err(_) => self.reject(keys::MAX_RETRIES, &v),
            }
        }
        if let Some(v) = lookup(source, keys::TIMEOUT_MS) {
            match v.parse() {
                Ok(n) => self.timeout_ms = n,
                Err(_) => self.reject(keys::TIMEOUT_MS, &v),
            }
        }
        if let Some(v) = lookup(source, keys::RETRY_BACKOFF_MS) {
            match v.parse() {
                Ok(n) => self.retry_backoff_ms = n,
                Err(_) => self.reject(keys::RETRY_BACKOFF_MS, &v),
            }
        }
        self
    }

    fn reject(&mut self, key: &str, value: &str) {
        warn!(key, value, "Ignoring malformed configuration value");
        self.rejected
            .push(format!("{} must be a non-negative integer, got '{}'.", key, value));
    }

    /// Check the configuration; an empty list means it is usable
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.api_key.trim().is_empty() {
            errors.push(format!("Voice API key is required. Set {}.", keys::API_KEY));
        }

        if self.base_url.trim().is_empty() {
            errors.push(format!(
                "Voice API base URL is required. Set {}.",
                keys::BASE_URL
            ));
        } else if !is_http_url(&self.base_url) {
            errors.push(format!(
                "Voice API base URL '{}' is not a valid http(s) URL.",
                self.base_url
            ));
        }

        if self.assistant_id().is_none() {
            errors.push(format!(
                "Voice assistant ID is required. Set {} or {}.",
                keys::ASSISTANT_ID,
                keys::DEFAULT_ASSISTANT_ID
            ));
        }

        if self.phone_number_id.trim().is_empty() {
            errors.push(format!(
                "Voice phone number ID is required. Set {}.",
                keys::PHONE_NUMBER_ID
            ));
        }

        if let Some(webhook) = &self.webhook_url {
            if !is_http_url(webhook) {
                errors.push(format!(
                    "Webhook URL '{}' is not a valid http(s) URL.",
                    webhook
                ));
            }
        }

        if self.timeout_ms == 0 {
            errors.push(format!("{} must be greater than zero.", keys::TIMEOUT_MS));
        }

        errors.extend(self.rejected.iter().cloned());
        errors
    }

    /// Shorthand for `validate().is_empty()`
    pub fn is_configured(&self) -> bool {
        self.validate().is_empty()
    }

    /// Validation errors plus non-fatal warnings
    pub fn status(&self) -> ConfigStatus {
        let errors = self.validate();
        let mut warnings = Vec::new();

        if self.webhook_url.is_none() {
            warnings.push(
                "Webhook URL not configured. Call completion events will not be pushed; poll for call status."
                    .to_string(),
            );
        }
        if self.max_retries == 0 {
            warnings.push(
                "Retries are disabled. Connection failures are reported on the first attempt."
                    .to_string(),
            );
        }

        ConfigStatus {
            configured: errors.is_empty(),
            errors,
            warnings,
        }
    }

    /// Configured assistant, preferring `assistant_id` over the default
    pub fn assistant_id(&self) -> Option<&str> {
        self.assistant_id
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .or_else(|| {
                self.default_assistant_id
                    .as_deref()
                    .filter(|s| !s.trim().is_empty())
            })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

fn is_http_url(raw: &str) -> bool {
    Url::parse(raw.trim())
        .map(|u| matches!(u.scheme(), "http" | "https") && u.has_host())
        .unwrap_or(false)
}

/// Resolve configuration from a source
pub fn resolve(source: &dyn ConfigSource) -> VoiceCallConfig {
    VoiceCallConfig::resolve(source)
}

/// Validate a configuration, returning human-readable errors
pub fn validate(config: &VoiceCallConfig) -> Vec<String> {
    config.validate()
}

/// Whether the configuration resolved from `source` is usable
pub fn is_configured(source: &dyn ConfigSource) -> bool {
    validate(&resolve(source)).is_empty()
}

/// Status of the configuration resolved from `source`
pub fn status(source: &dyn ConfigSource) -> ConfigStatus {
    resolve(source).status()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serial_test::serial;

    fn complete() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            (keys::API_KEY, "test-key"),
            (keys::ASSISTANT_ID, "asst-1"),
            (keys::PHONE_NUMBER_ID, "pn-1"),
        ])
    }

    #[test]
    fn test_resolve_applies_defaults() {
        let config = resolve(&complete());

        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.timeout_ms, 30_000);
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert_eq!(config.webhook_url, None);
        assert!(config.is_configured());
    }

    #[test]
    fn test_resolve_reads_every_key() {
        let mut source = complete();
        source.insert(keys::BASE_URL, "http://localhost:9000");
        source.insert(keys::DEFAULT_ASSISTANT_ID, "asst-default");
        source.insert(keys::WEBHOOK_URL, "https://example.com/hooks/voice");
        source.insert(keys::MAX_RETRIES, "5");
        source.insert(keys::TIMEOUT_MS, " 1500 ");
        source.insert(keys::RETRY_BACKOFF_MS, "10");

        let config = resolve(&source);
        assert_eq!(config.base_url, "http://localhost:9000");
        assert_eq!(config.default_assistant_id.as_deref(), Some("asst-default"));
        assert_eq!(
            config.webhook_url.as_deref(),
            Some("https://example.com/hooks/voice")
        );
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.timeout_ms, 1500);
        assert_eq!(config.retry_backoff_ms, 10);
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_empty_source_reports_every_missing_value() {
        let errors = validate(&resolve(&HashMap::<String, String>::new()));

        assert_eq!(errors.len(), 3);
        assert!(errors[0].contains("API key"));
        assert!(errors[1].contains("assistant ID"));
        assert!(errors[2].contains("phone number ID"));
    }

    #[test]
    fn test_missing_assistant_ids_not_configured() {
        let mut source = complete();
        source.remove(keys::ASSISTANT_ID);

        let status = status(&source);
        assert!(!status.configured);
        assert!(status.errors.iter().any(|e| e.contains("assistant ID")));
        assert!(!is_configured(&source));
    }

    #[test]
    fn test_default_assistant_id_alone_is_enough() {
        let mut source = complete();
        source.remove(keys::ASSISTANT_ID);
        source.insert(keys::DEFAULT_ASSISTANT_ID, "asst-fallback");

        let config = resolve(&source);
        assert!(config.is_configured());
        assert_eq!(config.assistant_id(), Some("asst-fallback"));
    }

    #[test]
    fn test_assistant_id_preferred_over_default() {
        let mut source = complete();
        source.insert(keys::DEFAULT_ASSISTANT_ID, "asst-fallback");
        assert_eq!(resolve(&source).assistant_id(), Some("asst-1"));
    }

    #[test]
    fn test_blank_values_count_as_missing() {
        let mut source = complete();
        source.insert(keys::API_KEY, "   ");
        source.insert(keys::BASE_URL, "");

        let config = resolve(&source);
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.validate().len(), 1);
        assert!(config.validate()[0].contains("API key"));
    }

    #[test]
    fn test_invalid_urls_rejected() {
        let mut source = complete();
        source.insert(keys::BASE_URL, "api.vapi.ai");
        source.insert(keys::WEBHOOK_URL, "ftp://example.com/hook");

        let errors = resolve(&source).validate();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].contains("base URL"));
        assert!(errors[1].contains("Webhook URL"));
    }

    #[test]
    fn test_malformed_numbers_keep_default_but_invalidate() {
        let mut source = complete();
        source.insert(keys::MAX_RETRIES, "three");

        let config = resolve(&source);
        assert_eq!(config.max_retries, DEFAULT_MAX_RETRIES);
        let errors = config.validate();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains(keys::MAX_RETRIES));
    }

    #[test]
    fn test_zero_timeout_invalid() {
        let mut source = complete();
        source.insert(keys::TIMEOUT_MS, "0");
        assert!(!resolve(&source).is_configured());
    }

    #[test]
    fn test_status_warnings() {
        let status = resolve(&complete()).status();
        assert!(status.configured);
        assert!(status.errors.is_empty());
        assert_eq!(status.warnings.len(), 1);
        assert!(status.warnings[0].contains("Webhook"));

        let mut source = complete();
        source.insert(keys::WEBHOOK_URL, "https://example.com/hook");
        source.insert(keys::MAX_RETRIES, "0");
        let status = resolve(&source).status();
        assert_eq!(status.warnings.len(), 1);
        assert!(status.warnings[0].contains("Retries"));
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config = resolve(&complete());
        let debug = format!("{:?}", config);
        assert!(!debug.contains("test-key"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_overlay_keeps_unset_values() {
        let base = VoiceCallConfig::from_toml_str(
            r#"
            api_key = "file-key"
            assistant_id = "file-asst"
            phone_number_id = "file-pn"
            timeout_ms = 5000
            "#,
        )
        .unwrap();

        let env = HashMap::from([(keys::API_KEY, "env-key")]);
        let config = base.overlay(&env);

        assert_eq!(config.api_key, "env-key");
        assert_eq!(config.assistant_id.as_deref(), Some("file-asst"));
        assert_eq!(config.timeout_ms, 5000);
        assert_eq!(config.max_retries, DEFAULT_MAX_RETRIES);
    }

    #[test]
    fn test_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("voice.toml");
        std::fs::write(
            &path,
            "api_key = \"k\"\ndefault_assistant_id = \"a\"\nphone_number_id = \"p\"\nwebhook_url = \"https://example.com/h\"\n",
        )
        .unwrap();

        let config = VoiceCallConfig::from_toml_file(&path).unwrap();
        assert!(config.status().warnings.is_empty());
        assert!(config.is_configured());
    }

    #[test]
    fn test_from_toml_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let result = VoiceCallConfig::from_toml_file(dir.path().join("absent.toml"));
        assert!(matches!(result, Err(crate::ConfigError::Io(_))));
    }

    #[test]
    #[serial]
    fn test_from_env() {
        std::env::set_var(keys::API_KEY, "env-key");
        std::env::set_var(keys::ASSISTANT_ID, "env-asst");
        std::env::set_var(keys::PHONE_NUMBER_ID, "env-pn");
        std::env::set_var(keys::TIMEOUT_MS, "2500");

        let config = VoiceCallConfig::from_env();

        std::env::remove_var(keys::API_KEY);
        std::env::remove_var(keys::ASSISTANT_ID);
        std::env::remove_var(keys::PHONE_NUMBER_ID);
        std::env::remove_var(keys::TIMEOUT_MS);

        assert!(config.is_configured());
        assert_eq!(config.timeout_ms, 2500);
        assert!(!is_configured(&EnvSource));
    }
}
