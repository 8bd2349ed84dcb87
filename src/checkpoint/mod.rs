//! Checkpoint store for resumable story generation.
//!
//! Each run gets a directory keyed by a timestamp run id holding two JSON
//! artifacts: `outline.json` (written once) and `story.json` (rewritten after
//! every completed chapter). Writes go to a temporary file in the same
//! directory and are atomically renamed into place, so a crash mid-write can
//! never leave a corrupted checkpoint visible to a resume read.

use crate::error::{LullError, Result};
use crate::story::{Outline, Story};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

const OUTLINE_FILE: &str = "outline.json";
const STORY_FILE: &str = "story.json";

/// Durable store of per-run generation progress.
///
/// Single-writer: the controller is the only writer for a given run.
pub struct CheckpointStore {
    runs_dir: PathBuf,
}

/// Summary of a checkpointed run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: String,
    pub story_title: String,
    pub chapters_done: u32,
    pub total_chapters: u32,
    pub complete: bool,
}

impl CheckpointStore {
    /// Open (creating if needed) a store rooted at `runs_dir`.
    pub fn new(runs_dir: impl Into<PathBuf>) -> Result<Self> {
        let runs_dir = runs_dir.into();
        std::fs::create_dir_all(&runs_dir)
            .map_err(|e| LullError::CheckpointIo(format!("Cannot create {:?}: {}", runs_dir, e)))?;
        Ok(Self { runs_dir })
    }

    /// New run id from the current local time.
    pub fn new_run_id() -> String {
        chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
    }

    /// Directory holding a run's artifacts.
    pub fn run_dir(&self, run_id: &str) -> PathBuf {
        self.runs_dir.join(run_id)
    }

    /// Path of a run's outline artifact.
    pub fn outline_path(&self, run_id: &str) -> PathBuf {
        self.run_dir(run_id).join(OUTLINE_FILE)
    }

    /// Path of a run's story artifact.
    pub fn story_path(&self, run_id: &str) -> PathBuf {
        self.run_dir(run_id).join(STORY_FILE)
    }

    /// Whether a run has been started (outline persisted).
    pub fn run_exists(&self, run_id: &str) -> bool {
        self.outline_path(run_id).exists()
    }

    /// Persist the outline and the empty story shell for a new run.
    ///
    /// This is the resume point if the process dies before any chapter
    /// completes.
    pub fn begin_run(&self, run_id: &str, outline: &Outline, story: &Story) -> Result<()> {
        let dir = self.run_dir(run_id);
        std::fs::create_dir_all(&dir)
            .map_err(|e| LullError::CheckpointIo(format!("Cannot create {:?}: {}", dir, e)))?;
        write_json_atomic(&self.outline_path(run_id), outline)?;
        write_json_atomic(&self.story_path(run_id), story)?;
        info!("Run {} checkpointed at {:?}", run_id, dir);
        Ok(())
    }

    /// Rewrite the story checkpoint after a completed chapter.
    pub fn save_story(&self, run_id: &str, story: &Story) -> Result<PathBuf> {
        let path = self.story_path(run_id);
        write_json_atomic(&path, story)?;
        Ok(path)
    }

    /// Load the last persisted state of a run: the outline plus the partial
    /// story with every chapter checkpointed so far.
    pub fn resume(&self, run_id: &str) -> Result<(Outline, Story)> {
        let outline_path = self.outline_path(run_id);
        if !outline_path.exists() {
            return Err(LullError::CheckpointIo(format!(
                "No checkpoint for run '{}'",
                run_id
            )));
        }
        let outline: Outline = read_json(&outline_path)?;
        let story: Story = read_json(&self.story_path(run_id))?;
        Ok((outline, story))
    }

    /// List all checkpointed runs, oldest first.
    pub fn list_runs(&self) -> Result<Vec<RunSummary>> {
        let mut summaries = Vec::new();
        let entries = std::fs::read_dir(&self.runs_dir)
            .map_err(|e| LullError::CheckpointIo(format!("Cannot read {:?}: {}", self.runs_dir, e)))?;

        for entry in entries {
            let entry = entry.map_err(|e| LullError::CheckpointIo(e.to_string()))?;
            if !entry.path().is_dir() {
                continue;
            }
            let run_id = entry.file_name().to_string_lossy().to_string();
            if !self.run_exists(&run_id) {
                continue;
            }
            let (outline, story) = self.resume(&run_id)?;
            summaries.push(RunSummary {
                run_id,
                story_title: outline.story_title,
                chapters_done: story.chapters.len() as u32,
                total_chapters: story.total_chapters,
                complete: story.is_complete(),
            });
        }

        summaries.sort_by(|a, b| a.run_id.cmp(&b.run_id));
        Ok(summaries)
    }
}

/// Serialize to pretty JSON and atomically replace `path`.
fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| LullError::CheckpointIo(format!("No parent directory for {:?}", path)))?;

    let bytes = serde_json::to_vec_pretty(value)
        .map_err(|e| LullError::CheckpointIo(format!("Serialize for {:?}: {}", path, e)))?;

    let mut tmp = tempfile::NamedTempFile::new_in(parent)
        .map_err(|e| LullError::CheckpointIo(format!("Temp file in {:?}: {}", parent, e)))?;
    tmp.write_all(&bytes)
        .map_err(|e| LullError::CheckpointIo(format!("Write {:?}: {}", path, e)))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| LullError::CheckpointIo(format!("Sync {:?}: {}", path, e)))?;
    tmp.persist(path)
        .map_err(|e| LullError::CheckpointIo(format!("Rename into {:?}: {}", path, e)))?;
    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| LullError::CheckpointIo(format!("Read {:?}: {}", path, e)))?;
    serde_json::from_str(&content)
        .map_err(|e| LullError::CheckpointIo(format!("Parse {:?}: {}", path, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::story::{Chapter, ChapterOutline, Scene, SCENES_PER_CHAPTER};

    fn test_outline(chapters: u32) -> Outline {
        Outline {
            story_title: "Test Story".to_string(),
            video_title: "Test Video".to_string(),
            video_description: "desc".to_string(),
            thumbnail_description: "thumb".to_string(),
            historical_context: "ctx".to_string(),
            total_chapters: chapters,
            chapter_outlines: (1..=chapters)
                .map(|n| ChapterOutline {
                    chapter_number: n,
                    chapter_title: format!("Chapter {}", n),
                    historical_setting: "setting".to_string(),
                    key_events: vec![],
                    historical_facts: vec![],
                    emotional_tone: "calm".to_string(),
                })
                .collect(),
        }
    }

    fn test_chapter(number: u32) -> Chapter {
        Chapter {
            chapter_number: number,
            chapter_title: format!("Chapter {}", number),
            scenes: (1..=SCENES_PER_CHAPTER)
                .map(|s| Scene {
                    scene_number: s,
                    narration_text: format!("Narration {}", s),
                    image_prompt: format!("Image {}", s),
                    chapter_number: number,
                })
                .collect(),
        }
    }

    #[test]
    fn test_begin_and_resume_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path()).unwrap();

        let outline = test_outline(2);
        let story = Story::from_outline(&outline, 2000);
        store.begin_run("run1", &outline, &story).unwrap();

        let (resumed_outline, resumed_story) = store.resume("run1").unwrap();
        assert_eq!(resumed_outline, outline);
        assert_eq!(resumed_story, story);
        assert_eq!(resumed_story.next_chapter_number(), 1);
    }

    #[test]
    fn test_read_after_write_sees_exact_chapter_count() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path()).unwrap();

        let outline = test_outline(3);
        let mut story = Story::from_outline(&outline, 3000);
        store.begin_run("run1", &outline, &story).unwrap();

        for k in 1..=3u32 {
            story.push_chapter(test_chapter(k)).unwrap();
            store.save_story("run1", &story).unwrap();

            let (_, resumed) = store.resume("run1").unwrap();
            assert_eq!(resumed.chapters.len() as u32, k);
            assert_eq!(resumed.next_chapter_number(), k + 1);
        }
    }

    #[test]
    fn test_resume_unknown_run() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path()).unwrap();
        assert!(matches!(
            store.resume("nope"),
            Err(LullError::CheckpointIo(_))
        ));
    }

    #[test]
    fn test_no_temp_files_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path()).unwrap();

        let outline = test_outline(1);
        let mut story = Story::from_outline(&outline, 1000);
        store.begin_run("run1", &outline, &story).unwrap();
        story.push_chapter(test_chapter(1)).unwrap();
        store.save_story("run1", &story).unwrap();

        let names: Vec<String> = std::fs::read_dir(store.run_dir("run1"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names.len(), 2);
        assert!(names.contains(&"outline.json".to_string()));
        assert!(names.contains(&"story.json".to_string()));
    }

    #[test]
    fn test_list_runs() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path()).unwrap();

        let outline = test_outline(1);
        let mut story = Story::from_outline(&outline, 1000);
        store.begin_run("20250101_000000", &outline, &story).unwrap();

        story.push_chapter(test_chapter(1)).unwrap();
        store.save_story("20250101_000000", &story).unwrap();

        let outline2 = test_outline(2);
        let story2 = Story::from_outline(&outline2, 2000);
        store.begin_run("20250102_000000", &outline2, &story2).unwrap();

        let runs = store.list_runs().unwrap();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].run_id, "20250101_000000");
        assert!(runs[0].complete);
        assert_eq!(runs[1].chapters_done, 0);
        assert!(!runs[1].complete);
    }
}
