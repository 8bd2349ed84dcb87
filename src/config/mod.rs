//! Configuration module for Lull.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{ChapterPrompts, OutlinePrompts, Prompts};
pub use settings::{
    GeneralSettings, GenerationSettings, LedgerSettings, PromptSettings, RetrySettings,
    Settings, StorySettings,
};
