//! Status command - show the resolved voice configuration

use anyhow::Result;
use dealercall_core::config::keys;
use dealercall_core::VoiceCallConfig;

use crate::output::{OutputContext, OutputFormat};

/// Report whether calls can be placed, and why not
pub fn status(config: &VoiceCallConfig, ctx: &OutputContext) -> Result<()> {
    let status = config.status();

    if ctx.format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    let api_key = if config.api_key.is_empty() {
        "-".to_string()
    } else {
        "<set>".to_string()
    };
    let pairs = vec![
        ("Configured", if status.configured { "yes" } else { "no" }.to_string()),
        ("API key", api_key),
        ("Base URL", config.base_url.clone()),
        (
            "Assistant",
            config.assistant_id().unwrap_or("-").to_string(),
        ),
        (
            "Phone number ID",
            if config.phone_number_id.is_empty() {
                "-".to_string()
            } else {
                config.phone_number_id.clone()
            },
        ),
        (
            "Webhook URL",
            config.webhook_url.clone().unwrap_or_else(|| "-".to_string()),
        ),
        ("Max retries", config.max_retries.to_string()),
        ("Timeout", format!("{} ms", config.timeout_ms)),
    ];
    ctx.print_kv(&pairs);

    for error in &status.errors {
        ctx.error(error);
    }
    for warning in &status.warnings {
        ctx.warn(warning);
    }
    if !status.configured && ctx.format == OutputFormat::Table {
        ctx.info(&settings_help());
    }
    Ok(())
}

/// Environment variables the configuration is read from
fn settings_help() -> String {
    let width = keys::ALL.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    let mut help = String::from("Settings (environment, or the [voice] table of the config file):");
    for (key, description) in keys::ALL {
        help.push_str(&format!("\n  {:<width$}  {}", key, description, width = width));
    }
    help
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_help_lists_every_key() {
        let help = settings_help();
        for (key, description) in keys::ALL {
            assert!(help.contains(key), "missing {}", key);
            assert!(help.contains(description));
        }
        assert!(help.contains("  VOICE_API_KEY  "));
        assert_eq!(help.lines().count(), keys::ALL.len() + 1);
    }
}
