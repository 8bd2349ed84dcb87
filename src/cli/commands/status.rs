//! Status command - topic prompt queue overview.

use crate::cli::Output;
use crate::config::Settings;
use crate::ledger::PromptLedger;
use anyhow::Result;

/// Run the status command.
pub fn run_status(reset: bool, settings: Settings) -> Result<()> {
    let ledger = PromptLedger::new(settings.prompts_dir(), settings.progress_file())?;

    if reset {
        ledger.reset()?;
        Output::success("Prompt progress reset. All prompts are queued again.");
        return Ok(());
    }

    let status = ledger.status()?;

    Output::header("Prompt Queue");
    println!();
    Output::kv("Prompts directory", &settings.prompts_dir().display().to_string());
    Output::kv("Total prompts", &status.total_prompts.to_string());
    Output::kv("Processed", &status.processed.to_string());
    Output::kv("Remaining", &status.remaining.to_string());

    match &status.next_prompt {
        Some(name) => Output::kv("Next", name),
        None if status.total_prompts == 0 => {
            println!();
            Output::info(&format!(
                "No prompts found. Add *.txt files to {} to queue topics.",
                settings.prompts_dir().display()
            ));
        }
        None => {
            println!();
            Output::success("All prompts processed.");
        }
    }

    Ok(())
}
