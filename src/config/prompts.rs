//! Prompt templates for Lull.
//!
//! Prompts can be customized by placing TOML files in the custom prompts directory.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    pub outline: OutlinePrompts,
    pub chapter: ChapterPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: std::collections::HashMap<String, String>,
}


/// Tone and style guidance shared by the outline and chapter prompts.
const TONE_GUIDELINES: &str = r#"TONE AND STYLE GUIDELINES:

1. SOOTHING NARRATIVE VOICE
Speak slowly and softly, as if sharing a secret by candlelight, inviting the listener into a calm, cozy space.
Let the words flow gently, without sudden shifts, like a slow, steady heartbeat guiding them toward rest.

2. SENSORY-RICH DESCRIPTIONS
Describe historical settings through the five senses to create immersive, dreamlike scenes.
Use soft, calming imagery: flickering torchlight, the scent of parchment, footsteps echoing on ancient stone.

3. BALANCED HISTORICAL ACCURACY
Let history gently reveal itself through feelings and small moments.
Avoid overwhelming the listener with names or dates; focus on the mood and atmosphere of the time.

4. THOUGHTFUL PACING
Begin with soft, slow scene-setting. Allow stories to breathe and unfold at their own gentle pace.
Introduce quiet tension or soft drama, emphasizing feelings and choices, not action or urgency.

5. LANGUAGE CHOICES
Use words that flow like a lullaby, simple yet rich. Avoid heavy or academic terms and harsh sounds.

6. EMOTIONAL RESONANCE
Bring out the quiet emotions that connect us across time: hope, longing, courage, and peace.
When conflict arises, focus on strategy, silence, or resolution rather than violence."#;

/// Prompts for master outline generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutlinePrompts {
    pub system: String,
    pub user: String,
}

impl Default for OutlinePrompts {
    fn default() -> Self {
        Self {
            system: format!(
                r#"You are an expert historian and master storyteller specializing in ancient history bedtime stories.
Your stories are historically accurate but calming and engaging for bedtime listening.

{}

Always respond with a single JSON object and nothing else."#,
                TONE_GUIDELINES
            ),

            user: r#"Create a detailed outline for a {{total_chapters}}-chapter bedtime story about {{topic}}.

Each chapter will contain exactly {{scenes_per_chapter}} scenes.

Return a JSON object with this structure:
{
  "story_title": "Compelling title for the story",
  "video_title": "[Topic]: [Intriguing Subtitle] | Whispers of History",
  "video_description": "SEO-optimized description with timestamps and tags",
  "thumbnail_description": "Detailed prompt for thumbnail image generation",
  "historical_context": "Brief historical context for the story",
  "total_chapters": {{total_chapters}},
  "chapter_outlines": [
    {
      "chapter_number": 1,
      "chapter_title": "Title for Chapter 1",
      "historical_setting": "Time period and location",
      "key_events": ["Event 1", "Event 2", "Event 3"],
      "historical_facts": ["Fact 1", "Fact 2"],
      "emotional_tone": "Contemplative, awe-inspiring"
    }
  ]
}

The chapter_outlines array must contain exactly {{total_chapters}} entries with contiguous chapter numbers."#.to_string(),
        }
    }
}

/// Prompts for single-chapter expansion.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChapterPrompts {
    pub system: String,
    pub user: String,
    /// Position guidance injected as {{position_notes}}.
    pub first_chapter_notes: String,
    pub middle_chapter_notes: String,
    pub last_chapter_notes: String,
}

impl Default for ChapterPrompts {
    fn default() -> Self {
        Self {
            system: format!(
                r#"You are writing one chapter of an ancient history bedtime story.

{}

Always respond with a single JSON object and nothing else."#,
                TONE_GUIDELINES
            ),

            user: r#"Write Chapter {{chapter_number}} of the story.

Chapter Outline:
{{chapter_outline}}

{{position_notes}}

Requirements:
- Create exactly {{scenes_per_chapter}} scenes
- Each scene needs narration_text and image_prompt
- Write in the soothing tone described above
- Maintain continuity with previous chapters
- Avoid repetitive framing devices across chapters

Previous Story Context:
{{context}}

Return a JSON object with this structure:
{
  "scenes": [
    {
      "scene_number": 1,
      "narration_text": "Scene narration text...",
      "image_prompt": "Detailed visual description for image generation..."
    }
  ]
}

Make sure each scene's image_prompt is a literal, detailed visual description of what happens in the narration."#.to_string(),

            first_chapter_notes: r#"This is the FIRST chapter of the story. Begin with an engaging, evocative hook that draws the listener in.
Do NOT use phrases like "Close your eyes, little one" or similar bedtime framing devices.
Instead, begin with vivid historical imagery or an interesting fact that transports the listener to the time period."#.to_string(),

            middle_chapter_notes: r#"This is a MIDDLE chapter of the story. It should flow naturally from the previous chapters.
Begin by continuing the narrative thread from the previous chapter, maintaining continuity.
End the chapter with a gentle transition that leads naturally to the next chapter."#.to_string(),

            last_chapter_notes: r#"This is the LAST chapter of the story. The chapter should build toward a satisfying conclusion.
Only in the final scene, you may end with a gentle closing like "Sleep well..." if appropriate.
Ensure the ending provides closure while maintaining the soothing, reflective tone."#.to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&std::collections::HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let outline_path = custom_path.join("outline.toml");
            if outline_path.exists() {
                let content = std::fs::read_to_string(&outline_path)?;
                prompts.outline = toml::from_str(&content)?;
            }

            let chapter_path = custom_path.join("chapter.toml");
            if chapter_path.exists() {
                let content = std::fs::read_to_string(&chapter_path)?;
                prompts.chapter = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    pub fn render(template: &str, vars: &std::collections::HashMap<String, String>) -> String {
        let mut result = template.to_string();
        for (key, value) in vars {
            result = result.replace(&format!("{{{{{}}}}}", key), value);
        }
        result
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(
        &self,
        template: &str,
        vars: &std::collections::HashMap<String, String>,
    ) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }
}
