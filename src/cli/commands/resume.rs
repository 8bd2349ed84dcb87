//! Resume command implementation.

use super::generate::print_result;
use crate::cli::{preflight, Output};
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the resume command.
pub async fn run_resume(run_id: &str, settings: Settings) -> Result<()> {
    preflight::check(preflight::Operation::Generate)?;

    let orchestrator = Orchestrator::new(settings)?;

    Output::info(&format!("Resuming run {}", run_id));

    let spinner = Output::spinner("Generating remaining chapters...");
    let outcome = orchestrator.resume(run_id).await;
    spinner.finish_and_clear();

    match outcome {
        Ok(result) => {
            print_result(&result);
            Ok(())
        }
        Err(e) => {
            Output::error(&format!("Resume failed: {}", e));
            Err(e.into())
        }
    }
}
