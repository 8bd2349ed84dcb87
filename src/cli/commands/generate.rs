//! Generate command implementation.

use crate::cli::{preflight, Output};
use crate::config::Settings;
use crate::orchestrator::{Orchestrator, RunResult};
use anyhow::Result;

/// Run the generate command.
pub async fn run_generate(topic: &str, words: Option<u32>, settings: Settings) -> Result<()> {
    preflight::check(preflight::Operation::Generate)?;

    let orchestrator = Orchestrator::new(settings)?;

    Output::info(&format!("Generating a bedtime story about '{}'", topic));
    Output::info("This makes several API calls and can take a while.");

    let spinner = Output::spinner("Generating...");
    let outcome = orchestrator.generate_story(topic, words).await;
    spinner.finish_and_clear();

    match outcome {
        Ok(result) => {
            print_result(&result);
            Ok(())
        }
        Err(e) => {
            Output::error(&format!("Generation failed: {}", e));
            Output::info("Completed chapters are checkpointed. See 'lull runs' to resume.");
            Err(e.into())
        }
    }
}

/// Print a completed run summary.
pub(super) fn print_result(result: &RunResult) {
    Output::success(&format!("Story complete: {}", result.story.video_title));
    println!();
    Output::kv("Run ID", &result.run_id);
    Output::kv("Chapters", &result.stats.chapter_count.to_string());
    Output::kv("Scenes", &result.stats.scene_count.to_string());
    Output::kv(
        "Words",
        &format!(
            "{} (target {})",
            result.stats.total_words, result.stats.target_total_words
        ),
    );
    Output::kv("Outline", &result.outline_path.display().to_string());
    Output::kv("Story", &result.story_path.display().to_string());
}
