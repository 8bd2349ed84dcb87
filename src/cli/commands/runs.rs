//! Runs command - list checkpointed runs.

use crate::checkpoint::CheckpointStore;
use crate::cli::Output;
use crate::config::Settings;
use anyhow::Result;

/// Run the runs command.
pub fn run_runs(settings: Settings) -> Result<()> {
    let store = CheckpointStore::new(settings.runs_dir())?;
    let runs = store.list_runs()?;

    if runs.is_empty() {
        Output::info("No runs yet. Use 'lull generate <topic>' to create one.");
        return Ok(());
    }

    Output::header(&format!("Runs ({})", runs.len()));
    println!();

    let mut incomplete = 0;
    for run in &runs {
        Output::run_info(
            &run.run_id,
            &run.story_title,
            run.chapters_done,
            run.total_chapters,
            run.complete,
        );
        if !run.complete {
            incomplete += 1;
        }
    }

    if incomplete > 0 {
        println!();
        Output::info(&format!(
            "{} run(s) can be resumed with 'lull resume <run-id>'.",
            incomplete
        ));
    }

    Ok(())
}
