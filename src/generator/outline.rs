//! Outline Requester: topic + word target -> validated master outline.

use super::TextGenerator;
use crate::config::{Prompts, StorySettings};
use crate::error::{LullError, Result};
use crate::retry::{retry_with_backoff, RetryPolicy};
use crate::sanitize;
use crate::story::{chapter_count_for_words, Outline, SCENES_PER_CHAPTER};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Issues the single generation request that produces the master outline.
pub struct OutlineRequester {
    generator: Arc<dyn TextGenerator>,
    prompts: Prompts,
    story: StorySettings,
    retry: RetryPolicy,
}

impl OutlineRequester {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        prompts: Prompts,
        story: StorySettings,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            generator,
            prompts,
            story,
            retry,
        }
    }

    /// Request an outline for `topic` sized for `target_words`.
    ///
    /// The chapter count is computed from the word target and clamped to the
    /// configured bounds; a response with any other count is rejected by the
    /// sanitizer.
    pub async fn request(&self, topic: &str, target_words: u32) -> Result<Outline> {
        if topic.trim().is_empty() {
            return Err(LullError::InvalidInput("Topic must not be empty".to_string()));
        }
        if target_words == 0 {
            return Err(LullError::InvalidInput(
                "Target word count must be positive".to_string(),
            ));
        }

        let total_chapters = chapter_count_for_words(target_words, &self.story);
        info!(
            "Requesting outline for '{}' ({} chapters, {} word target)",
            topic, total_chapters, target_words
        );

        let mut vars = HashMap::new();
        vars.insert("topic".to_string(), topic.to_string());
        vars.insert("total_chapters".to_string(), total_chapters.to_string());
        vars.insert(
            "scenes_per_chapter".to_string(),
            SCENES_PER_CHAPTER.to_string(),
        );

        let system = self
            .prompts
            .render_with_custom(&self.prompts.outline.system, &vars);
        let user = self
            .prompts
            .render_with_custom(&self.prompts.outline.user, &vars);

        let response = retry_with_backoff(&self.retry, "outline generation", || {
            self.generator.generate(&system, &user)
        })
        .await?;

        sanitize::parse_outline(&response, total_chapters)
    }
}
