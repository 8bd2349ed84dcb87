//! Progress ledger for batch topic processing.
//!
//! A directory of `*.txt` topic prompts, processed in sorted order, and an
//! append-only progress file of already-processed prompt names. The ledger is
//! an explicit value handed to the CLI flow, not hidden global state.

use crate::error::{LullError, Result};
use std::io::Write;
use std::path::PathBuf;
use tracing::info;

/// Tracks which topic prompts have already been turned into stories.
pub struct PromptLedger {
    prompts_dir: PathBuf,
    progress_file: PathBuf,
}

/// Snapshot of ledger progress.
#[derive(Debug, Clone)]
pub struct LedgerStatus {
    pub total_prompts: usize,
    pub processed: usize,
    pub remaining: usize,
    pub next_prompt: Option<String>,
}

impl PromptLedger {
    pub fn new(prompts_dir: impl Into<PathBuf>, progress_file: impl Into<PathBuf>) -> Result<Self> {
        let prompts_dir = prompts_dir.into();
        std::fs::create_dir_all(&prompts_dir)
            .map_err(|e| LullError::Ledger(format!("Cannot create {:?}: {}", prompts_dir, e)))?;
        Ok(Self {
            prompts_dir,
            progress_file: progress_file.into(),
        })
    }

    /// All available topic names (file stems), in sorted order.
    pub fn all_topics(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let entries = std::fs::read_dir(&self.prompts_dir)
            .map_err(|e| LullError::Ledger(format!("Cannot read {:?}: {}", self.prompts_dir, e)))?;
        for entry in entries {
            let entry = entry.map_err(|e| LullError::Ledger(e.to_string()))?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("txt") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    /// Names already marked as processed.
    pub fn processed(&self) -> Result<Vec<String>> {
        if !self.progress_file.exists() {
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(&self.progress_file)
            .map_err(|e| LullError::Ledger(format!("Cannot read {:?}: {}", self.progress_file, e)))?;
        Ok(content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// The first available topic not yet processed, with its prompt content.
    pub fn next_unprocessed(&self) -> Result<Option<(String, String)>> {
        let processed = self.processed()?;
        for name in self.all_topics()? {
            if !processed.contains(&name) {
                let path = self.prompts_dir.join(format!("{}.txt", name));
                let content = std::fs::read_to_string(&path)
                    .map_err(|e| LullError::Ledger(format!("Cannot read {:?}: {}", path, e)))?;
                return Ok(Some((name, content.trim().to_string())));
            }
        }
        Ok(None)
    }

    /// Mark a prompt as processed by appending its name to the progress file.
    pub fn mark_processed(&self, name: &str) -> Result<()> {
        if let Some(parent) = self.progress_file.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| LullError::Ledger(format!("Cannot create {:?}: {}", parent, e)))?;
        }
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.progress_file)
            .map_err(|e| LullError::Ledger(format!("Cannot open {:?}: {}", self.progress_file, e)))?;
        writeln!(file, "{}", name)
            .map_err(|e| LullError::Ledger(format!("Cannot append to {:?}: {}", self.progress_file, e)))?;
        info!("Marked '{}' as processed", name);
        Ok(())
    }

    /// Current processing status.
    pub fn status(&self) -> Result<LedgerStatus> {
        let all = self.all_topics()?;
        let processed = self.processed()?;
        let next_prompt = self.next_unprocessed()?.map(|(name, _)| name);
        let done = all.iter().filter(|n| processed.contains(n)).count();
        Ok(LedgerStatus {
            total_prompts: all.len(),
            processed: done,
            remaining: all.len() - done,
            next_prompt,
        })
    }

    /// Reset progress (start over).
    pub fn reset(&self) -> Result<()> {
        if self.progress_file.exists() {
            std::fs::remove_file(&self.progress_file)
                .map_err(|e| LullError::Ledger(format!("Cannot remove {:?}: {}", self.progress_file, e)))?;
        }
        info!("Progress reset");
        Ok(())
    }
}
