//! Config command implementation.

use crate::cli::{ConfigAction, Output};
use crate::config::Settings;
use anyhow::Result;

/// Run the config command.
pub fn run_config(action: &ConfigAction, settings: Settings) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let toml_str = toml::to_string_pretty(&settings)
                .map_err(|e| anyhow::anyhow!("Failed to serialize config: {}", e))?;
            println!("{}", toml_str);
        }

        ConfigAction::Set { key, value } => {
            let mut settings = settings;
            set_value(&mut settings, key, value)?;
            settings.save()?;
            Output::success(&format!("Set {} = {}", key, value));
            Output::info(&format!(
                "Saved to {}",
                Settings::default_config_path().display()
            ));
        }

        ConfigAction::Edit => {
            let config_path = Settings::default_config_path();

            // Create default config if it doesn't exist
            if !config_path.exists() {
                settings.save()?;
                Output::info(&format!("Created default config at {:?}", config_path));
            }

            let editor = std::env::var("EDITOR").unwrap_or_else(|_| "vim".to_string());

            Output::info(&format!("Opening config in {}...", editor));

            let status = std::process::Command::new(&editor)
                .arg(&config_path)
                .status();

            match status {
                Ok(s) if s.success() => {
                    Output::success("Config saved.");
                }
                Ok(_) => {
                    Output::warning("Editor exited with non-zero status.");
                }
                Err(e) => {
                    Output::error(&format!("Failed to open editor: {}", e));
                    Output::info(&format!("Config file is at: {:?}", config_path));
                }
            }
        }

        ConfigAction::Path => {
            let config_path = Settings::default_config_path();
            println!("{}", config_path.display());
        }
    }

    Ok(())
}

/// Apply a dotted-key assignment to the settings.
fn set_value(settings: &mut Settings, key: &str, value: &str) -> Result<()> {
    match key {
        "general.data_dir" => settings.general.data_dir = value.to_string(),
        "general.log_level" => settings.general.log_level = value.to_string(),
        "story.model" => settings.story.model = value.to_string(),
        "story.target_word_count" => settings.story.target_word_count = value.parse()?,
        "story.temperature" => settings.story.temperature = value.parse()?,
        "story.max_chapter_attempts" => settings.story.max_chapter_attempts = value.parse()?,
        "generation.timeout_seconds" => settings.generation.timeout_seconds = value.parse()?,
        "retry.max_attempts" => settings.retry.max_attempts = value.parse()?,
        "retry.base_delay_ms" => settings.retry.base_delay_ms = value.parse()?,
        "retry.max_delay_ms" => settings.retry.max_delay_ms = value.parse()?,
        "retry.jitter" => settings.retry.jitter = value.parse()?,
        "ledger.prompts_dir" => settings.ledger.prompts_dir = value.to_string(),
        "ledger.progress_file" => settings.ledger.progress_file = value.to_string(),
        "prompts.custom_dir" => settings.prompts.custom_dir = Some(value.to_string()),
        other => {
            anyhow::bail!(
                "Unknown config key '{}'. Use 'lull config show' to see available keys.",
                other
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_known_keys() {
        let mut settings = Settings::default();
        set_value(&mut settings, "story.model", "gpt-4o").unwrap();
        set_value(&mut settings, "story.target_word_count", "6000").unwrap();
        set_value(&mut settings, "retry.jitter", "false").unwrap();
        assert_eq!(settings.story.model, "gpt-4o");
        assert_eq!(settings.story.target_word_count, 6000);
        assert!(!settings.retry.jitter);
    }

    #[test]
    fn test_set_unknown_key_rejected() {
        let mut settings = Settings::default();
        assert!(set_value(&mut settings, "nope.nothing", "x").is_err());
    }

    #[test]
    fn test_set_bad_number_rejected() {
        let mut settings = Settings::default();
        assert!(set_value(&mut settings, "story.target_word_count", "lots").is_err());
    }
}
