//! Story data model.
//!
//! Records produced by the two-stage generation process: a master `Outline`
//! created once per run, and a `Story` that grows one `Chapter` at a time.

use crate::config::StorySettings;
use crate::error::{LullError, Result};
use serde::{Deserialize, Serialize};

/// Every chapter contains exactly this many scenes. The chapter prompt asks
/// for this count and the sanitizer rejects anything else.
pub const SCENES_PER_CHAPTER: u32 = 25;

/// The master plan for a story: title, video metadata, and one entry per chapter.
///
/// Created once per run and immutable thereafter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outline {
    pub story_title: String,
    pub video_title: String,
    pub video_description: String,
    pub thumbnail_description: String,
    pub historical_context: String,
    pub total_chapters: u32,
    pub chapter_outlines: Vec<ChapterOutline>,
}

/// Outline entry for a single chapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChapterOutline {
    pub chapter_number: u32,
    pub chapter_title: String,
    pub historical_setting: String,
    pub key_events: Vec<String>,
    pub historical_facts: Vec<String>,
    pub emotional_tone: String,
}

/// The atomic narration + illustration-prompt unit within a chapter.
///
/// `scene_number` is 1..25 within a chapter, and global (strictly increasing,
/// no gaps) in the story's flattened scene list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub scene_number: u32,
    pub narration_text: String,
    pub image_prompt: String,
    pub chapter_number: u32,
}

/// A narrative unit of exactly 25 scenes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
    pub chapter_number: u32,
    pub chapter_title: String,
    pub scenes: Vec<Scene>,
}

/// The assembled story record, grown one chapter at a time.
///
/// `scenes` is the flattened list across all chapters with global scene
/// numbers; it is rebuilt incrementally as chapters are appended so the
/// checkpointed file is always internally consistent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Story {
    pub video_title: String,
    pub video_description: String,
    pub thumbnail_description: String,
    pub total_words: u32,
    pub total_chapters: u32,
    pub chapters: Vec<Chapter>,
    pub scenes: Vec<Scene>,
}

impl Story {
    /// Create an empty story shell from an outline and the run's word target.
    pub fn from_outline(outline: &Outline, total_words: u32) -> Self {
        Self {
            video_title: outline.video_title.clone(),
            video_description: outline.video_description.clone(),
            thumbnail_description: outline.thumbnail_description.clone(),
            total_words,
            total_chapters: outline.total_chapters,
            chapters: Vec::new(),
            scenes: Vec::new(),
        }
    }

    /// The next chapter to generate (1-based).
    pub fn next_chapter_number(&self) -> u32 {
        self.chapters.len() as u32 + 1
    }

    /// Whether all chapters have been generated.
    pub fn is_complete(&self) -> bool {
        self.chapters.len() as u32 == self.total_chapters
    }

    /// Append a completed chapter and extend the flattened scene list with
    /// global scene numbers.
    ///
    /// Chapters must arrive in order; a chapter is atomic, so this is only
    /// called with exactly 25 validated scenes.
    pub fn push_chapter(&mut self, chapter: Chapter) -> Result<()> {
        if chapter.chapter_number != self.next_chapter_number() {
            return Err(LullError::InvalidInput(format!(
                "Chapter {} appended out of order (expected {})",
                chapter.chapter_number,
                self.next_chapter_number()
            )));
        }
        if chapter.scenes.len() as u32 != SCENES_PER_CHAPTER {
            return Err(LullError::CardinalityMismatch {
                what: format!("chapter {} scenes", chapter.chapter_number),
                expected: SCENES_PER_CHAPTER as usize,
                actual: chapter.scenes.len(),
            });
        }

        let base = (chapter.chapter_number - 1) * SCENES_PER_CHAPTER;
        for scene in &chapter.scenes {
            let mut global = scene.clone();
            global.scene_number = base + scene.scene_number;
            self.scenes.push(global);
        }
        self.chapters.push(chapter);
        Ok(())
    }

    /// Validate the story invariants.
    ///
    /// Chapter numbers contiguous 1..N, exactly 25 scenes per chapter with
    /// local numbers 1..25, global scene numbers strictly increasing with no
    /// gaps, and non-empty narration for every scene.
    pub fn validate(&self) -> Result<()> {
        if self.chapters.len() as u32 != self.total_chapters {
            return Err(LullError::CardinalityMismatch {
                what: "chapters".to_string(),
                expected: self.total_chapters as usize,
                actual: self.chapters.len(),
            });
        }

        for (idx, chapter) in self.chapters.iter().enumerate() {
            let expected_number = idx as u32 + 1;
            if chapter.chapter_number != expected_number {
                return Err(LullError::InvalidInput(format!(
                    "Chapter number {} at position {} (expected {})",
                    chapter.chapter_number, idx, expected_number
                )));
            }
            if chapter.scenes.len() as u32 != SCENES_PER_CHAPTER {
                return Err(LullError::CardinalityMismatch {
                    what: format!("chapter {} scenes", chapter.chapter_number),
                    expected: SCENES_PER_CHAPTER as usize,
                    actual: chapter.scenes.len(),
                });
            }
            for (sidx, scene) in chapter.scenes.iter().enumerate() {
                if scene.scene_number != sidx as u32 + 1 {
                    return Err(LullError::InvalidInput(format!(
                        "Scene number {} at position {} in chapter {}",
                        scene.scene_number, sidx, chapter.chapter_number
                    )));
                }
                if scene.narration_text.trim().is_empty() {
                    return Err(LullError::MalformedResponse(format!(
                        "Empty narration in chapter {} scene {}",
                        chapter.chapter_number, scene.scene_number
                    )));
                }
            }
        }

        let expected_scenes = self.total_chapters * SCENES_PER_CHAPTER;
        if self.scenes.len() as u32 != expected_scenes {
            return Err(LullError::CardinalityMismatch {
                what: "flattened scenes".to_string(),
                expected: expected_scenes as usize,
                actual: self.scenes.len(),
            });
        }
        for (idx, scene) in self.scenes.iter().enumerate() {
            if scene.scene_number != idx as u32 + 1 {
                return Err(LullError::InvalidInput(format!(
                    "Global scene number {} at position {}",
                    scene.scene_number, idx
                )));
            }
        }

        Ok(())
    }

    /// Word-count statistics for the generated story.
    pub fn stats(&self) -> StoryStats {
        let scene_word_counts: Vec<usize> = self
            .scenes
            .iter()
            .map(|s| s.narration_text.split_whitespace().count())
            .collect();
        let total_words: usize = scene_word_counts.iter().sum();
        let avg_words_per_scene = if scene_word_counts.is_empty() {
            0.0
        } else {
            total_words as f64 / scene_word_counts.len() as f64
        };
        let word_count_ratio = if self.total_words == 0 {
            0.0
        } else {
            total_words as f64 / self.total_words as f64
        };

        StoryStats {
            total_words,
            scene_count: self.scenes.len(),
            chapter_count: self.chapters.len(),
            avg_words_per_scene,
            target_total_words: self.total_words,
            word_count_ratio,
        }
    }
}

/// Statistics about a generated story.
#[derive(Debug, Clone, Serialize)]
pub struct StoryStats {
    pub total_words: usize,
    pub scene_count: usize,
    pub chapter_count: usize,
    pub avg_words_per_scene: f64,
    pub target_total_words: u32,
    pub word_count_ratio: f64,
}

/// Compute the target chapter count for a word budget.
///
/// `round(total_words / words_per_chapter)` clamped to the configured bounds,
/// where `words_per_chapter` is 25 scenes at the configured per-scene budget.
pub fn chapter_count_for_words(total_words: u32, settings: &StorySettings) -> u32 {
    let words_per_chapter = SCENES_PER_CHAPTER * settings.avg_words_per_scene;
    let raw = (total_words as f64 / words_per_chapter as f64).round() as u32;
    raw.clamp(settings.min_chapters, settings.max_chapters)
}
