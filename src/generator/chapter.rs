//! Chapter Expander: outline entry + prior chapters -> one validated chapter.

use super::TextGenerator;
use crate::config::{Prompts, StorySettings};
use crate::error::{LullError, Result};
use crate::retry::{retry_with_backoff, RetryPolicy};
use crate::sanitize;
use crate::story::{Chapter, Outline, SCENES_PER_CHAPTER};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// How much of the previous chapter's closing narration is quoted back into
/// the next chapter's prompt for continuity.
const CONTEXT_TAIL_CHARS: usize = 200;

/// Expands one chapter at a time, feeding prior chapters back as context.
///
/// A chapter is atomic: either the sanitizer yields all 25 valid scenes, or
/// the same request is retried up to the configured attempt limit, after
/// which the whole run fails.
pub struct ChapterExpander {
    generator: Arc<dyn TextGenerator>,
    prompts: Prompts,
    story: StorySettings,
    retry: RetryPolicy,
}

impl ChapterExpander {
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

    /// Generate chapter `chapter_number` of the outlined story.
    pub async fn expand(
        &self,
        outline: &Outline,
        completed: &[Chapter],
        chapter_number: u32,
    ) -> Result<Chapter> {
        let chapter_outline = outline
            .chapter_outlines
            .get(chapter_number as usize - 1)
            .ok_or_else(|| {
                LullError::InvalidInput(format!(
                    "No outline entry for chapter {}",
                    chapter_number
                ))
            })?;

        let mut vars = HashMap::new();
        vars.insert("chapter_number".to_string(), chapter_number.to_string());
        vars.insert(
            "chapter_outline".to_string(),
            serde_json::to_string_pretty(chapter_outline)?,
        );
        vars.insert(
            "position_notes".to_string(),
            self.position_notes(chapter_number, outline.total_chapters)
                .to_string(),
        );
        vars.insert("context".to_string(), build_context(completed));
        vars.insert(
            "scenes_per_chapter".to_string(),
            SCENES_PER_CHAPTER.to_string(),
        );

        let system = self
            .prompts
            .render_with_custom(&self.prompts.chapter.system, &vars);
        let user = self
            .prompts
            .render_with_custom(&self.prompts.chapter.user, &vars);

        let max_attempts = self.story.max_chapter_attempts.max(1);
        for attempt in 1..=max_attempts {
            info!(
                "Generating chapter {} '{}' (attempt {} of {})",
                chapter_number, chapter_outline.chapter_title, attempt, max_attempts
            );

            let label = format!("chapter {} generation", chapter_number);
            let response = retry_with_backoff(&self.retry, &label, || {
                self.generator.generate(&system, &user)
            })
            .await?;

            match sanitize::parse_chapter_scenes(&response, chapter_number) {
                Ok(scenes) => {
                    return Ok(Chapter {
                        chapter_number,
                        chapter_title: chapter_outline.chapter_title.clone(),
                        scenes,
                    });
                }
                Err(e) if e.is_malformed() => {
                    warn!(
                        "Chapter {} attempt {} produced a malformed response: {}",
                        chapter_number, attempt, e
                    );
                }
                Err(e) => return Err(e),
            }
        }

        Err(LullError::ChapterGeneration {
            chapter: chapter_number,
            attempts: max_attempts,
        })
    }

    fn position_notes(&self, chapter_number: u32, total_chapters: u32) -> &str {
        if chapter_number == 1 {
            &self.prompts.chapter.first_chapter_notes
        } else if chapter_number == total_chapters {
            &self.prompts.chapter.last_chapter_notes
        } else {
            &self.prompts.chapter.middle_chapter_notes
        }
    }
}

/// Condense completed chapters into continuity context: one line per chapter
/// plus the closing narration of the most recent scene.
fn build_context(completed: &[Chapter]) -> String {
    if completed.is_empty() {
        return "This is the beginning of the story.".to_string();
    }

    let mut context = String::from("Previous chapters summary:\n");
    for chapter in completed {
        context.push_str(&format!(
            "- Chapter {}: {}\n",
            chapter.chapter_number, chapter.chapter_title
        ));
    }
    if let Some(last_scene) = completed.last().and_then(|c| c.scenes.last()) {
        context.push_str(&format!(
            "Ended with: {}\n",
            narration_tail(&last_scene.narration_text, CONTEXT_TAIL_CHARS)
        ));
    }
    context
}

/// Last `max_chars` of a narration, respecting char boundaries.
fn narration_tail(text: &str, max_chars: usize) -> &str {
    let char_count = text.chars().count();
    if char_count <= max_chars {
        return text;
    }
    let skip = char_count - max_chars;
    let (idx, _) = text.char_indices().nth(skip).expect("index within bounds");
    &text[idx..]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::testing::ScriptedGenerator;
    use crate::story::{ChapterOutline, Scene};
    use std::time::Duration;

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 2,
            base_delay: Duration::from_millis(1),
            factor: 2.0,
            max_delay: Duration::from_millis(5),
            jitter: false,
        }
    }

    fn test_outline(chapters: u32) -> Outline {
        Outline {
            story_title: "s".to_string(),
            video_title: "v".to_string(),
            video_description: String::new(),
            thumbnail_description: String::new(),
            historical_context: String::new(),
            total_chapters: chapters,
            chapter_outlines: (1..=chapters)
                .map(|n| ChapterOutline {
                    chapter_number: n,
                    chapter_title: format!("Chapter {}", n),
                    historical_setting: "Rome".to_string(),
                    key_events: vec![],
                    historical_facts: vec![],
                    emotional_tone: "calm".to_string(),
                })
                .collect(),
        }
    }

    fn chapter_json() -> String {
        let entries: Vec<String> = (1..=SCENES_PER_CHAPTER)
            .map(|n| {
                format!(
                    r#"{{"scene_number": {}, "narration_text": "Narration {}", "image_prompt": "Image {}"}}"#,
                    n, n, n
                )
            })
            .collect();
        format!(r#"{{"scenes": [{}]}}"#, entries.join(","))
    }

    fn completed_chapter(number: u32) -> Chapter {
        Chapter {
            chapter_number: number,
            chapter_title: format!("Chapter {}", number),
            scenes: (1..=SCENES_PER_CHAPTER)
                .map(|s| Scene {
                    scene_number: s,
                    narration_text: format!("The torches dimmed over scene {}.", s),
                    image_prompt: format!("Image {}", s),
                    chapter_number: number,
                })
                .collect(),
        }
    }

    fn expander(generator: Arc<ScriptedGenerator>) -> ChapterExpander {
        ChapterExpander::new(
            generator,
            Prompts::default(),
            StorySettings::default(),
            fast_retry(),
        )
    }

    #[tokio::test]
    async fn test_expand_valid_chapter() {
        let generator = Arc::new(ScriptedGenerator::new(vec![Ok(chapter_json())]));
        let outline = test_outline(3);
        let chapter = expander(generator.clone())
            .expand(&outline, &[], 1)
            .await
            .unwrap();
        assert_eq!(chapter.chapter_number, 1);
        assert_eq!(chapter.scenes.len(), 25);
        assert_eq!(generator.call_count(), 1);
    }

    #[tokio::test]
    async fn test_malformed_chapter_retried_then_succeeds() {
        let generator = Arc::new(ScriptedGenerator::new(vec![
            Ok("not json at all".to_string()),
            Ok(chapter_json()),
        ]));
        let outline = test_outline(3);
        let chapter = expander(generator.clone())
            .expand(&outline, &[], 2)
            .await
            .unwrap();
        assert_eq!(chapter.chapter_number, 2);
        assert_eq!(generator.call_count(), 2);
    }

    #[tokio::test]
    async fn test_persistent_malformed_fails_chapter() {
        // max_chapter_attempts defaults to 3
        let generator = Arc::new(ScriptedGenerator::new(vec![
            Ok("bad".to_string()),
            Ok("bad".to_string()),
            Ok("bad".to_string()),
        ]));
        let outline = test_outline(3);
        let result = expander(generator.clone()).expand(&outline, &[], 2).await;
        assert!(matches!(
            result,
            Err(LullError::ChapterGeneration {
                chapter: 2,
                attempts: 3
            })
        ));
        assert_eq!(generator.call_count(), 3);
    }

    #[tokio::test]
    async fn test_unknown_chapter_rejected() {
        let generator = Arc::new(ScriptedGenerator::new(vec![]));
        let outline = test_outline(2);
        let result = expander(generator).expand(&outline, &[], 5).await;
        assert!(matches!(result, Err(LullError::InvalidInput(_))));
    }

    #[test]
    fn test_build_context_empty() {
        assert_eq!(build_context(&[]), "This is the beginning of the story.");
    }

    #[test]
    fn test_build_context_includes_tail() {
        let chapters = vec![completed_chapter(1), completed_chapter(2)];
        let context = build_context(&chapters);
        assert!(context.contains("- Chapter 1: Chapter 1"));
        assert!(context.contains("- Chapter 2: Chapter 2"));
        assert!(context.contains("The torches dimmed over scene 25."));
    }

    #[test]
    fn test_narration_tail_char_boundary() {
        let text = "éèêë".repeat(100);
        let tail = narration_tail(&text, 10);
        assert_eq!(tail.chars().count(), 10);
    }

    #[test]
    fn test_narration_tail_short_text() {
        assert_eq!(narration_tail("short", 200), "short");
    }
}
