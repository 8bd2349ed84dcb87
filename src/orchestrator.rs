//! Pipeline orchestrator for Lull.
//!
//! Coordinates the two-stage generation process: one outline request, then a
//! strictly sequential chapter loop (chapter k+1 depends on chapter k's
//! content), checkpointing after every chapter so an interrupted run resumes
//! without re-billing completed work.

use crate::checkpoint::CheckpointStore;
use crate::config::{Prompts, Settings};
use crate::error::Result;
use crate::generator::{ChapterExpander, OpenAiGenerator, OutlineRequester, TextGenerator};
use crate::retry::RetryPolicy;
use crate::story::{Outline, Story, StoryStats};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};

/// The main orchestrator for the Lull pipeline.
pub struct Orchestrator {
    settings: Settings,
    outline_requester: OutlineRequester,
    chapter_expander: ChapterExpander,
    store: CheckpointStore,
}

impl Orchestrator {
    /// Create a new orchestrator with the OpenAI-backed generator.
    pub fn new(settings: Settings) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        let generator: Arc<dyn TextGenerator> = Arc::new(OpenAiGenerator::new(
            &settings.story.model,
            settings.story.temperature,
            Duration::from_secs(settings.generation.timeout_seconds),
        ));

        Self::with_components(settings, prompts, generator)
    }

    /// Create an orchestrator with a custom generator (used in tests).
    pub fn with_components(
        settings: Settings,
        prompts: Prompts,
        generator: Arc<dyn TextGenerator>,
    ) -> Result<Self> {
        let store = CheckpointStore::new(settings.runs_dir())?;
        let retry = RetryPolicy::from(&settings.retry);

        let outline_requester = OutlineRequester::new(
            generator.clone(),
            prompts.clone(),
            settings.story.clone(),
            retry.clone(),
        );
        let chapter_expander =
            ChapterExpander::new(generator, prompts, settings.story.clone(), retry);

        Ok(Self {
            settings,
            outline_requester,
            chapter_expander,
            store,
        })
    }

    /// Get the checkpoint store.
    pub fn store(&self) -> &CheckpointStore {
        &self.store
    }

    /// Get the settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Generate a complete story for a topic, checkpointing as it goes.
    #[instrument(skip(self), fields(topic = %topic))]
    pub async fn generate_story(
        &self,
        topic: &str,
        target_words: Option<u32>,
    ) -> Result<RunResult> {
        let target_words = target_words.unwrap_or(self.settings.story.target_word_count);
        let run_id = CheckpointStore::new_run_id();

        let outline = self.outline_requester.request(topic, target_words).await?;
        let story = Story::from_outline(&outline, target_words);

        // Resume point if the process dies before any chapter completes
        self.store.begin_run(&run_id, &outline, &story)?;
        info!(
            "Outline for '{}' persisted ({} chapters), run {}",
            outline.story_title, outline.total_chapters, run_id
        );

        self.complete_run(run_id, outline, story).await
    }

    /// Resume a prior run from its last persisted checkpoint.
    #[instrument(skip(self))]
    pub async fn resume(&self, run_id: &str) -> Result<RunResult> {
        let (outline, story) = self.store.resume(run_id)?;
        info!(
            "Resuming run {} at chapter {} of {}",
            run_id,
            story.next_chapter_number(),
            story.total_chapters
        );
        self.complete_run(run_id.to_string(), outline, story).await
    }

    /// Generate the remaining chapters sequentially, checkpointing each one.
    async fn complete_run(
        &self,
        run_id: String,
        outline: Outline,
        mut story: Story,
    ) -> Result<RunResult> {
        while !story.is_complete() {
            let chapter_number = story.next_chapter_number();
            let chapter = self
                .chapter_expander
                .expand(&outline, &story.chapters, chapter_number)
                .await?;

            story.push_chapter(chapter)?;
            self.store.save_story(&run_id, &story)?;
            info!(
                "Chapter {} of {} generated and checkpointed",
                chapter_number, story.total_chapters
            );
        }

        story.validate()?;
        let stats = story.stats();
        info!(
            "Story complete: {} chapters, {} scenes, {} words (target {})",
            stats.chapter_count, stats.scene_count, stats.total_words, stats.target_total_words
        );

        Ok(RunResult {
            outline_path: self.store.outline_path(&run_id),
            story_path: self.store.story_path(&run_id),
            run_id,
            story,
            stats,
        })
    }
}

/// Result of a completed generation run.
#[derive(Debug)]
pub struct RunResult {
    /// Run identifier (timestamp).
    pub run_id: String,
    /// The finished, validated story.
    pub story: Story,
    /// Word-count statistics.
    pub stats: StoryStats,
    /// Path of the persisted outline artifact.
    pub outline_path: PathBuf,
    /// Path of the persisted story artifact.
    pub story_path: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LullError;
    use crate::generator::testing::ScriptedGenerator;
    use crate::story::SCENES_PER_CHAPTER;

    fn test_settings(data_dir: &std::path::Path) -> Settings {
        let mut settings = Settings::default();
        settings.general.data_dir = data_dir.to_string_lossy().to_string();
        settings.retry.max_attempts = 2;
        settings.retry.base_delay_ms = 1;
        settings.retry.jitter = false;
        settings
    }

    fn outline_json(chapters: u32) -> String {
        let outlines: Vec<String> = (1..=chapters)
            .map(|n| {
                format!(
                    r#"{{"chapter_number": {}, "chapter_title": "Chapter {}", "historical_setting": "Rome", "key_events": ["e"], "historical_facts": ["f"], "emotional_tone": "calm"}}"#,
                    n, n
                )
            })
            .collect();
        format!(
            r#"{{"story_title": "The Eternal City", "video_title": "Ancient Rome", "video_description": "d", "thumbnail_description": "t", "historical_context": "c", "total_chapters": {}, "chapter_outlines": [{}]}}"#,
            chapters,
            outlines.join(",")
        )
    }

    fn chapter_json(chapter: u32) -> String {
        let entries: Vec<String> = (1..=SCENES_PER_CHAPTER)
            .map(|n| {
                format!(
                    r#"{{"scene_number": {}, "narration_text": "Chapter {} scene {} narration", "image_prompt": "Chapter {} scene {} image"}}"#,
                    n, chapter, n, chapter, n
                )
            })
            .collect();
        format!(r#"{{"scenes": [{}]}}"#, entries.join(","))
    }

    fn orchestrator(
        data_dir: &std::path::Path,
        responses: Vec<Result<String>>,
    ) -> (Orchestrator, Arc<ScriptedGenerator>) {
        let generator = Arc::new(ScriptedGenerator::new(responses));
        let orchestrator = Orchestrator::with_components(
            test_settings(data_dir),
            Prompts::default(),
            generator.clone(),
        )
        .unwrap();
        (orchestrator, generator)
    }

    #[tokio::test]
    async fn test_uninterrupted_run() {
        let dir = tempfile::tempdir().unwrap();
        let mut responses = vec![Ok(outline_json(8))];
        responses.extend((1..=8).map(|c| Ok(chapter_json(c))));
        let (orchestrator, _) = orchestrator(dir.path(), responses);

        let result = orchestrator
            .generate_story("Ancient Rome", Some(8000))
            .await
            .unwrap();

        assert_eq!(result.story.chapters.len(), 8);
        assert_eq!(result.story.scenes.len(), 200);
        assert_eq!(result.stats.chapter_count, 8);
        result.story.validate().unwrap();
        assert!(result.story_path.exists());
        assert!(result.outline_path.exists());
    }

    #[tokio::test]
    async fn test_interrupted_run_leaves_checkpoint_then_resume_matches_uninterrupted() {
        // Run A: outline + chapters 1..3 succeed, then chapter 4 keeps
        // producing malformed responses until the run aborts.
        let dir_a = tempfile::tempdir().unwrap();
        let mut responses = vec![Ok(outline_json(8))];
        responses.extend((1..=3).map(|c| Ok(chapter_json(c))));
        responses.extend((0..3).map(|_| Ok("no json here".to_string())));
        let (orchestrator_a, _) = orchestrator(dir_a.path(), responses);

        let err = orchestrator_a
            .generate_story("Ancient Rome", Some(8000))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LullError::ChapterGeneration {
                chapter: 4,
                attempts: 3
            }
        ));

        // Checkpoint still contains exactly chapters 1..3
        let runs = orchestrator_a.store().list_runs().unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].chapters_done, 3);
        assert!(!runs[0].complete);
        let run_id = runs[0].run_id.clone();

        // Resume against the same data dir completes chapters 4..8
        let resume_responses = (4..=8).map(|c| Ok(chapter_json(c))).collect();
        let (orchestrator_b, generator_b) = orchestrator(dir_a.path(), resume_responses);
        let resumed = orchestrator_b.resume(&run_id).await.unwrap();
        assert_eq!(generator_b.call_count(), 5);

        // A single uninterrupted run with identical service responses
        let dir_c = tempfile::tempdir().unwrap();
        let mut responses = vec![Ok(outline_json(8))];
        responses.extend((1..=8).map(|c| Ok(chapter_json(c))));
        let (orchestrator_c, _) = orchestrator(dir_c.path(), responses);
        let uninterrupted = orchestrator_c
            .generate_story("Ancient Rome", Some(8000))
            .await
            .unwrap();

        // Field-for-field identical
        assert_eq!(resumed.story, uninterrupted.story);
    }

    #[tokio::test]
    async fn test_resume_of_complete_run_regenerates_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut responses = vec![Ok(outline_json(4))];
        responses.extend((1..=4).map(|c| Ok(chapter_json(c))));
        let (orchestrator_a, _) = orchestrator(dir.path(), responses);
        let result = orchestrator_a
            .generate_story("Ancient Rome", Some(4000))
            .await
            .unwrap();

        let (orchestrator_b, generator_b) = orchestrator(dir.path(), vec![]);
        let resumed = orchestrator_b.resume(&result.run_id).await.unwrap();
        assert_eq!(generator_b.call_count(), 0);
        assert_eq!(resumed.story, result.story);
    }

    #[tokio::test]
    async fn test_malformed_outline_aborts_without_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let (orchestrator, _) =
            orchestrator(dir.path(), vec![Ok("sorry, no story today".to_string())]);

        let err = orchestrator
            .generate_story("Ancient Rome", Some(8000))
            .await
            .unwrap_err();
        assert!(matches!(err, LullError::MalformedResponse(_)));
        assert!(orchestrator.store().list_runs().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_scene_missing_image_prompt_fails_chapter_keeps_checkpoint() {
        // Chapter 2's responses always miss image_prompt in one scene
        let mut entries: Vec<String> = (1..=24)
            .map(|n| {
                format!(
                    r#"{{"scene_number": {}, "narration_text": "n{}", "image_prompt": "i{}"}}"#,
                    n, n, n
                )
            })
            .collect();
        entries.push(r#"{"scene_number": 25, "narration_text": "n25"}"#.to_string());
        let bad_chapter = format!(r#"{{"scenes": [{}]}}"#, entries.join(","));

        let dir = tempfile::tempdir().unwrap();
        let responses = vec![
            Ok(outline_json(4)),
            Ok(chapter_json(1)),
            Ok(bad_chapter.clone()),
            Ok(bad_chapter.clone()),
            Ok(bad_chapter),
        ];
        let (orchestrator, _) = orchestrator(dir.path(), responses);

        let err = orchestrator
            .generate_story("Ancient Rome", Some(4000))
            .await
            .unwrap_err();
        assert!(matches!(err, LullError::ChapterGeneration { chapter: 2, .. }));

        let runs = orchestrator.store().list_runs().unwrap();
        assert_eq!(runs[0].chapters_done, 1);
    }
}
