//! Next command - process the next unprocessed topic prompt.

use super::generate::print_result;
use crate::cli::{preflight, Output};
use crate::config::Settings;
use crate::ledger::PromptLedger;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the next command.
pub async fn run_next(settings: Settings) -> Result<()> {
    preflight::check(preflight::Operation::Generate)?;

    let ledger = PromptLedger::new(settings.prompts_dir(), settings.progress_file())?;

    let Some((name, topic)) = ledger.next_unprocessed()? else {
        Output::info("All topic prompts have been processed.");
        Output::info(&format!(
            "Add *.txt prompt files to {} to queue more.",
            settings.prompts_dir().display()
        ));
        return Ok(());
    };

    Output::info(&format!("Next prompt: '{}'", name));

    let orchestrator = Orchestrator::new(settings)?;
    match orchestrator.generate_story(&topic, None).await {
        Ok(result) => {
            // Only a fully validated story retires the prompt
            ledger.mark_processed(&name)?;
            print_result(&result);
            Ok(())
        }
        Err(e) => {
            Output::error(&format!("Generation failed: {}", e));
            Output::info(&format!(
                "Prompt '{}' stays in the queue. Resume the run or retry with 'lull next'.",
                name
            ));
            Err(e.into())
        }
    }
}
