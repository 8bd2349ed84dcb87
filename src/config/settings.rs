//! Configuration settings for Lull.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub story: StorySettings,
    pub generation: GenerationSettings,
    pub retry: RetrySettings,
    pub ledger: LedgerSettings,
    pub prompts: PromptSettings,
}


/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data (runs, checkpoints).
    pub data_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.lull".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Story generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorySettings {
    /// Default target word count for a full story.
    pub target_word_count: u32,
    /// Average word budget per scene (chapters are 25 scenes each).
    pub avg_words_per_scene: u32,
    /// Minimum chapter count after clamping.
    pub min_chapters: u32,
    /// Maximum chapter count after clamping.
    pub max_chapters: u32,
    /// Model used for outline and chapter generation.
    pub model: String,
    /// Sampling temperature for generation requests.
    pub temperature: f32,
    /// How many times a single chapter may be regenerated on a
    /// malformed response before the run fails.
    pub max_chapter_attempts: u32,
}

impl Default for StorySettings {
    fn default() -> Self {
        Self {
            target_word_count: 8000,
            avg_words_per_scene: 40, // 25 scenes -> 1000 words per chapter
            min_chapters: 4,
            max_chapters: 12,
            model: "gpt-4o-mini".to_string(),
            temperature: 0.7,
            max_chapter_attempts: 3,
        }
    }
}

/// Generation call settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    /// Per-request timeout in seconds. A timeout is a transient failure.
    pub timeout_seconds: u64,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            timeout_seconds: 300,
        }
    }
}

/// Retry/backoff settings applied to every external generation call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Maximum attempts per call (first try included).
    pub max_attempts: u32,
    /// Base delay between retries, in milliseconds.
    pub base_delay_ms: u64,
    /// Multiplicative backoff factor.
    pub backoff_factor: f64,
    /// Cap on the computed delay, in milliseconds.
    pub max_delay_ms: u64,
    /// Add up to 10% random jitter to each delay.
    pub jitter: bool,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 2000,
            backoff_factor: 2.0,
            max_delay_ms: 60_000,
            jitter: true,
        }
    }
}

/// Progress ledger settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerSettings {
    /// Directory of topic prompt files (*.txt), processed in sorted order.
    pub prompts_dir: String,
    /// Append-only file of processed prompt names.
    pub progress_file: String,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            prompts_dir: "~/.lull/prompts".to_string(),
            progress_file: "~/.lull/prompt_progress.txt".to_string(),
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}


impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to the default configuration file.
    pub fn save(&self) -> crate::error::Result<()> {
        self.save_to(&Self::default_config_path())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::LullError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("lull")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Get the directory holding per-run checkpoints.
    pub fn runs_dir(&self) -> PathBuf {
        self.data_dir().join("runs")
    }

    /// Get the expanded prompts directory path.
    pub fn prompts_dir(&self) -> PathBuf {
        Self::expand_path(&self.ledger.prompts_dir)
    }

    /// Get the expanded progress file path.
    pub fn progress_file(&self) -> PathBuf {
        Self::expand_path(&self.ledger.progress_file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.story.target_word_count, 8000);
        assert_eq!(settings.story.avg_words_per_scene, 40);
        assert_eq!(settings.retry.max_attempts, 3);
        assert!(settings.story.min_chapters < settings.story.max_chapters);
    }

    #[test]
    fn test_partial_config_falls_back_to_defaults() {
        let toml_str = r#"
            [story]
            target_word_count = 4000
        "#;
        let settings: Settings = toml::from_str(toml_str).unwrap();
        assert_eq!(settings.story.target_word_count, 4000);
        // Untouched sections keep their defaults
        assert_eq!(settings.story.max_chapters, 12);
        assert_eq!(settings.retry.base_delay_ms, 2000);
    }

    #[test]
    fn test_roundtrip() {
        let settings = Settings::default();
        let serialized = toml::to_string_pretty(&settings).unwrap();
        let parsed: Settings = toml::from_str(&serialized).unwrap();
        assert_eq!(parsed.story.model, settings.story.model);
    }
}
