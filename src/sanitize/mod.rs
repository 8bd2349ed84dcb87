//! Response sanitizer: raw generation output -> validated records.
//!
//! Pure transformations only. The generation service returns free-form text
//! that is expected to contain a JSON payload; this module strips the
//! wrapping, applies a bounded set of repair passes, and validates field
//! presence and cardinality. Cardinality mismatches are surfaced as errors,
//! never padded or truncated away.

use crate::error::{LullError, Result};
use crate::story::{ChapterOutline, Outline, Scene, SCENES_PER_CHAPTER};
use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;
use tracing::debug;

/// Extract the JSON object embedded in a raw response.
///
/// Handles code fences and leading/trailing prose by slicing from the first
/// `{` to the last `}`.
pub fn extract_json(raw: &str) -> Result<&str> {
    let start = raw.find('{');
    let end = raw.rfind('}');
    match (start, end) {
        (Some(s), Some(e)) if e > s => Ok(&raw[s..=e]),
        _ => Err(LullError::MalformedResponse(
            "No JSON object found in response".to_string(),
        )),
    }
}

/// Remove trailing commas before closing braces/brackets.
pub fn strip_trailing_commas(input: &str) -> String {
    static TRAILING_COMMA: OnceLock<Regex> = OnceLock::new();
    let re = TRAILING_COMMA.get_or_init(|| Regex::new(r",\s*([}\]])").expect("valid regex"));
    re.replace_all(input, "$1").into_owned()
}

/// Normalize typographic quotes to plain ASCII quotes.
pub fn normalize_quotes(input: &str) -> String {
    input
        .replace(['\u{201C}', '\u{201D}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'")
}

/// The ordered list of repair passes attempted after a parse failure.
/// Passes are applied cumulatively; each is independently unit-testable.
const REPAIR_PASSES: &[(&str, fn(&str) -> String)] = &[
    ("strip_trailing_commas", strip_trailing_commas),
    ("normalize_quotes", normalize_quotes),
];

/// Parse the JSON object out of a raw response, attempting repairs on failure.
pub fn parse_value(raw: &str) -> Result<serde_json::Value> {
    let json = extract_json(raw)?;

    match serde_json::from_str(json) {
        Ok(value) => Ok(value),
        Err(first_err) => {
            let mut repaired = json.to_string();
            for (name, pass) in REPAIR_PASSES {
                repaired = pass(&repaired);
                if let Ok(value) = serde_json::from_str(&repaired) {
                    debug!("Response parsed after repair pass '{}'", name);
                    return Ok(value);
                }
            }
            Err(LullError::MalformedResponse(format!(
                "Invalid JSON after {} repair passes: {}",
                REPAIR_PASSES.len(),
                first_err
            )))
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawOutline {
    story_title: Option<String>,
    video_title: Option<String>,
    #[serde(default)]
    video_description: String,
    #[serde(default)]
    thumbnail_description: String,
    #[serde(default)]
    historical_context: String,
    total_chapters: Option<u32>,
    #[serde(default)]
    chapter_outlines: Vec<RawChapterOutline>,
}

#[derive(Debug, Deserialize)]
struct RawChapterOutline {
    chapter_number: Option<u32>,
    chapter_title: Option<String>,
    #[serde(default)]
    historical_setting: String,
    #[serde(default)]
    key_events: Vec<String>,
    #[serde(default)]
    historical_facts: Vec<String>,
    #[serde(default)]
    emotional_tone: String,
}

#[derive(Debug, Deserialize)]
struct RawChapterPayload {
    #[serde(alias = "content")]
    scenes: Vec<RawScene>,
}

#[derive(Debug, Deserialize)]
struct RawScene {
    #[serde(alias = "text")]
    narration_text: Option<String>,
    #[serde(alias = "image_description")]
    image_prompt: Option<String>,
}

/// Coerce a raw outline response into a validated `Outline`.
///
/// `expected_chapters` is the count computed from the word target; any other
/// chapter count in the response is a `CardinalityMismatch`.
pub fn parse_outline(raw: &str, expected_chapters: u32) -> Result<Outline> {
    let value = parse_value(raw)?;
    let outline: RawOutline = serde_json::from_value(value)
        .map_err(|e| LullError::MalformedResponse(format!("Unexpected outline shape: {}", e)))?;

    let story_title = require_field(outline.story_title, "story_title")?;
    let video_title = require_field(outline.video_title, "video_title")?;
    let total_chapters = outline.total_chapters.ok_or_else(|| {
        LullError::MalformedResponse("Missing 'total_chapters' in outline".to_string())
    })?;

    if total_chapters != expected_chapters {
        return Err(LullError::CardinalityMismatch {
            what: "total_chapters".to_string(),
            expected: expected_chapters as usize,
            actual: total_chapters as usize,
        });
    }
    if outline.chapter_outlines.len() != expected_chapters as usize {
        return Err(LullError::CardinalityMismatch {
            what: "chapter_outlines".to_string(),
            expected: expected_chapters as usize,
            actual: outline.chapter_outlines.len(),
        });
    }

    let mut chapter_outlines = Vec::with_capacity(outline.chapter_outlines.len());
    for (idx, raw_chapter) in outline.chapter_outlines.into_iter().enumerate() {
        let expected_number = idx as u32 + 1;
        let chapter_number = raw_chapter.chapter_number.unwrap_or(expected_number);
        if chapter_number != expected_number {
            return Err(LullError::MalformedResponse(format!(
                "Chapter numbers not contiguous: found {} at position {}",
                chapter_number, expected_number
            )));
        }
        let chapter_title = require_field(
            raw_chapter.chapter_title,
            &format!("chapter_outlines[{}].chapter_title", idx),
        )?;
        chapter_outlines.push(ChapterOutline {
            chapter_number,
            chapter_title,
            historical_setting: raw_chapter.historical_setting,
            key_events: raw_chapter.key_events,
            historical_facts: raw_chapter.historical_facts,
            emotional_tone: raw_chapter.emotional_tone,
        });
    }

    Ok(Outline {
        story_title,
        video_title,
        video_description: outline.video_description,
        thumbnail_description: outline.thumbnail_description,
        historical_context: outline.historical_context,
        total_chapters,
        chapter_outlines,
    })
}

/// Coerce a raw chapter response into exactly 25 validated scenes.
///
/// Local scene numbers are assigned by position (1..25). Missing narration or
/// image prompts are malformed; the wrong scene count is a
/// `CardinalityMismatch`. The caller decides retry vs. fail.
pub fn parse_chapter_scenes(raw: &str, chapter_number: u32) -> Result<Vec<Scene>> {
    let value = parse_value(raw)?;
    let payload: RawChapterPayload = serde_json::from_value(value)
        .map_err(|e| LullError::MalformedResponse(format!("Unexpected chapter shape: {}", e)))?;

    if payload.scenes.len() != SCENES_PER_CHAPTER as usize {
        return Err(LullError::CardinalityMismatch {
            what: format!("chapter {} scenes", chapter_number),
            expected: SCENES_PER_CHAPTER as usize,
            actual: payload.scenes.len(),
        });
    }

    let mut scenes = Vec::with_capacity(payload.scenes.len());
    for (idx, raw_scene) in payload.scenes.into_iter().enumerate() {
        let local_number = idx as u32 + 1;
        let narration_text = raw_scene.narration_text.ok_or_else(|| {
            LullError::MalformedResponse(format!(
                "Missing 'narration_text' in scene {}",
                local_number
            ))
        })?;
        if narration_text.trim().is_empty() {
            return Err(LullError::MalformedResponse(format!(
                "Empty narration in scene {}",
                local_number
            )));
        }
        let image_prompt = raw_scene.image_prompt.ok_or_else(|| {
            LullError::MalformedResponse(format!(
                "Missing 'image_prompt' in scene {}",
                local_number
            ))
        })?;

        scenes.push(Scene {
            scene_number: local_number,
            narration_text,
            image_prompt,
            chapter_number,
        });
    }

    Ok(scenes)
}

fn require_field(field: Option<String>, name: &str) -> Result<String> {
    match field {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(LullError::MalformedResponse(format!(
            "Missing '{}' in response",
            name
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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
            r#"{{"story_title": "The Eternal City", "video_title": "Rome", "video_description": "d", "thumbnail_description": "t", "historical_context": "c", "total_chapters": {}, "chapter_outlines": [{}]}}"#,
            chapters,
            outlines.join(",")
        )
    }

    fn chapter_json(scenes: u32) -> String {
        let entries: Vec<String> = (1..=scenes)
            .map(|n| {
                format!(
                    r#"{{"scene_number": {}, "narration_text": "Narration {}", "image_prompt": "Image {}"}}"#,
                    n, n, n
                )
            })
            .collect();
        format!(r#"{{"scenes": [{}]}}"#, entries.join(","))
    }

    #[test]
    fn test_extract_json_with_fences() {
        let raw = "Here is the outline:\n```json\n{\"a\": 1}\n```\nEnjoy!";
        assert_eq!(extract_json(raw).unwrap(), "{\"a\": 1}");
    }

    #[test]
    fn test_extract_json_missing() {
        let raw = "Sorry, I cannot help with that.";
        assert!(matches!(
            extract_json(raw),
            Err(LullError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_strip_trailing_commas() {
        let input = r#"{"a": [1, 2,], "b": {"c": 3,},}"#;
        let repaired = strip_trailing_commas(input);
        assert!(serde_json::from_str::<serde_json::Value>(&repaired).is_ok());
    }

    #[test]
    fn test_normalize_quotes() {
        let input = "{\u{201C}a\u{201D}: 1}";
        assert_eq!(normalize_quotes(input), r#"{"a": 1}"#);
    }

    #[test]
    fn test_parse_value_repairs_trailing_comma() {
        let raw = r#"{"scenes": [{"scene_number": 1,},]}"#;
        assert!(parse_value(raw).is_ok());
    }

    #[test]
    fn test_valid_outline_survives_unchanged() {
        let raw = outline_json(8);
        let outline = parse_outline(&raw, 8).unwrap();
        assert_eq!(outline.story_title, "The Eternal City");
        assert_eq!(outline.total_chapters, 8);
        assert_eq!(outline.chapter_outlines.len(), 8);
        assert_eq!(outline.chapter_outlines[7].chapter_number, 8);
    }

    #[test]
    fn test_outline_wrong_chapter_count() {
        let raw = outline_json(8);
        let result = parse_outline(&raw, 6);
        assert!(matches!(
            result,
            Err(LullError::CardinalityMismatch { .. })
        ));
    }

    #[test]
    fn test_outline_missing_title() {
        let raw = r#"{"video_title": "Rome", "total_chapters": 1, "chapter_outlines": [{"chapter_title": "One"}]}"#;
        let result = parse_outline(raw, 1);
        assert!(matches!(result, Err(LullError::MalformedResponse(_))));
    }

    #[test]
    fn test_outline_missing_total_chapters_is_not_defaulted() {
        let raw = r#"{"story_title": "s", "video_title": "v", "chapter_outlines": [{"chapter_title": "One"}]}"#;
        let result = parse_outline(raw, 1);
        assert!(matches!(result, Err(LullError::MalformedResponse(_))));
    }

    #[test]
    fn test_valid_chapter_survives_unchanged() {
        let raw = chapter_json(25);
        let scenes = parse_chapter_scenes(&raw, 3).unwrap();
        assert_eq!(scenes.len(), 25);
        assert_eq!(scenes[0].scene_number, 1);
        assert_eq!(scenes[24].scene_number, 25);
        assert_eq!(scenes[0].narration_text, "Narration 1");
        assert!(scenes.iter().all(|s| s.chapter_number == 3));
    }

    #[test]
    fn test_chapter_wrong_scene_count_not_padded() {
        let raw = chapter_json(24);
        let result = parse_chapter_scenes(&raw, 1);
        assert!(matches!(
            result,
            Err(LullError::CardinalityMismatch {
                expected: 25,
                actual: 24,
                ..
            })
        ));
    }

    #[test]
    fn test_chapter_field_aliases() {
        // "text" and "image_description" are accepted aliases
        let entries: Vec<String> = (1..=25)
            .map(|n| {
                format!(
                    r#"{{"text": "Narration {}", "image_description": "Image {}"}}"#,
                    n, n
                )
            })
            .collect();
        let raw = format!(r#"{{"content": [{}]}}"#, entries.join(","));
        let scenes = parse_chapter_scenes(&raw, 1).unwrap();
        assert_eq!(scenes.len(), 25);
        assert_eq!(scenes[4].narration_text, "Narration 5");
        assert_eq!(scenes[4].image_prompt, "Image 5");
    }

    #[test]
    fn test_chapter_missing_image_prompt() {
        let mut entries: Vec<String> = (1..=24)
            .map(|n| {
                format!(
                    r#"{{"narration_text": "Narration {}", "image_prompt": "Image {}"}}"#,
                    n, n
                )
            })
            .collect();
        entries.push(r#"{"narration_text": "Narration 25"}"#.to_string());
        let raw = format!(r#"{{"scenes": [{}]}}"#, entries.join(","));
        let result = parse_chapter_scenes(&raw, 1);
        assert!(matches!(result, Err(LullError::MalformedResponse(_))));
    }

    #[test]
    fn test_chapter_empty_narration_rejected() {
        let mut entries: Vec<String> = (1..=24)
            .map(|n| {
                format!(
                    r#"{{"narration_text": "Narration {}", "image_prompt": "Image {}"}}"#,
                    n, n
                )
            })
            .collect();
        entries.push(r#"{"narration_text": "  ", "image_prompt": "Image 25"}"#.to_string());
        let raw = format!(r#"{{"scenes": [{}]}}"#, entries.join(","));
        let result = parse_chapter_scenes(&raw, 1);
        assert!(matches!(result, Err(LullError::MalformedResponse(_))));
    }

    #[test]
    fn test_chapter_with_markdown_wrapping() {
        let raw = format!("Here is chapter 1:\n```json\n{}\n```", chapter_json(25));
        let scenes = parse_chapter_scenes(&raw, 1).unwrap();
        assert_eq!(scenes.len(), 25);
    }
}
