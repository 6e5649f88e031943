use serde::Deserialize;
use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::SystemTime;
use log::{ info, warn };
use tokio::sync::RwLock;

use crate::models::api::StoryTheme;
use crate::models::chat::{ PersonalityId, PersonalityProfile };

#[derive(Debug)]
pub enum PromptError {
    TemplateNotFound(String),
    IoError(std::io::Error),
    JsonError(serde_json::Error),
}

impl fmt::Display for PromptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PromptError::TemplateNotFound(key) => write!(f, "Prompt template '{}' is missing or incomplete", key),
            PromptError::IoError(e) => write!(f, "Prompt file IO error: {}", e),
            PromptError::JsonError(e) => write!(f, "Prompt JSON parsing error: {}", e),
        }
    }
}

impl Error for PromptError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            PromptError::IoError(e) => Some(e),
            PromptError::JsonError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for PromptError {
    fn from(err: std::io::Error) -> Self {
        PromptError::IoError(err)
    }
}

impl From<serde_json::Error> for PromptError {
    fn from(err: serde_json::Error) -> Self {
        PromptError::JsonError(err)
    }
}

const BUDDY_PERSONA: &str =
    "You are 'AI-Bud', a fun, energetic, and playful best friend for a child. Use emojis, keep sentences simple, and be encouraging. Avoid long paragraphs.";
const TUTOR_PERSONA: &str =
    "You are 'AI-Bud', a patient and helpful tutor. Explain things simply, use analogies, and ask guiding questions to help them learn. Use book emojis.";
const SAGE_PERSONA: &str =
    "You are 'AI-Bud', a calm and wise companion. Help the child process emotions, breathe, and find peace. Use nature metaphors and be soothing.";
const CUSTOM_PERSONA: &str =
    "You are playing a character named '{name}'. Rules: {instructions}. Remember you are talking to a child, so keep it safe and appropriate.";
const DEFAULT_PERSONA: &str = "You are a friendly AI companion.";

const BEHAVIOR_SUFFIX: &str =
    "Keep your responses friendly, upbeat, and kid-safe.

CRITICAL: You have a \"Magic Crayon\". If the child asks for a drawing or to \"see\" something, YOU MUST NOT describe it yourself in the regular message. Instead, use your Magic Crayon (the \"draw\" field or tag) to send the description to the image generator.";

const JSON_CONTRACT: &str =
    "### MANDATORY RESPONSE FORMAT ###
You are a backend service that MUST respond in valid JSON.
The JSON must have these keys:
1. \"text\": (string) Your friendly, kid-safe response message. NEVER describe the drawing here.
2. \"mood\": (string) ONE OF: happy, sad, surprised, thinking, idle.
3. \"draw\": (string | null) A vivid, detailed description for the image generator.

Example: { \"text\": \"I'd love to draw that for you! 🎨\", \"mood\": \"happy\", \"draw\": \"a giant sparkly moon in a purple sky with stars\" }";

const DIRECTIVE_CONTRACT: &str =
    "### MANDATORY RESPONSE FORMAT ###
Reply with your friendly, kid-safe message as plain text. NEVER describe the drawing in the message.
At the very end of the message add a mood tag: {MOOD: happy}, using ONE OF: happy, sad, surprised, thinking, idle.
If the child wants a picture, also add a drawing tag with a vivid, detailed description: {DRAW: a giant sparkly moon in a purple sky with stars}.

Example: I'd love to draw that for you! 🎨 {MOOD: happy} {DRAW: a giant sparkly moon in a purple sky with stars}";

const QUIZ_TEMPLATE: &str =
    "You are AI-Bud, a fun and energetic buddy for a child. Generate exactly 3 super fun and exciting multiple-choice quiz questions for a child about \"{topic}\".

CRITICAL: Ensure all 3 questions are UNIQUE and cover different aspects of the topic. Do not repeat facts or ask similar questions in the same batch.

Make the questions engaging, use simple words, and include emojis in the question text.
Return ONLY a JSON object with this exact format (no markdown):
{
  \"questions\": [
    {
      \"question\": \"The question text with emojis! 🌟\",
      \"options\": [\"Option A\", \"Option B\", \"Option C\", \"Option D\"],
      \"correctAnswer\": \"The text of the correct option\",
      \"explanation\": \"A short, fun, and encouraging explanation of why it's correct! ✨\"
    }
  ]
}";

const STORY_START_TEMPLATE: &str = "Start a new {genre} story about {topic}.";
const STORY_CONTINUE_TEMPLATE: &str =
    "Previous part of the story: \"{previous}\"\nThe child chose to: \"{choice}\"";
const STORY_TEMPLATE: &str =
    "You are a storyteller for a child.
{context}

Generate the next short paragraph of the story (max 60 words).
Then provide 2 fun choices for what happens next.

Return ONLY a JSON object with this exact format (no markdown):
{
  \"storyText\": \"The next part of the story...\",
  \"choices\": [\"Option 1 text\", \"Option 2 text\"]
}";

const PERSONALITY_IDEA_TEMPLATE: &str =
    "Create a fun character personality for a child's AI buddy based on this idea: \"{idea}\".
Be creative and unique!

Return ONLY a JSON object with this exact format (no markdown):
{
  \"name\": \"Cool Character Name\",
  \"description\": \"Very short catchy description\",
  \"systemPrompt\": \"Detailed instructions on how to behave. Include tone, catchphrases, and safe boundaries.\"
}";

const DEFAULT_STORY_GENRE: &str = "fantasy";
const DEFAULT_STORY_TOPIC: &str = "a magical playground";
const DEFAULT_CUSTOM_RULES: &str = "Be friendly.";

/// Every template the companion sends to a model. Keys absent from a prompts
/// file keep their built-in text.
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct PromptConfig {
    pub personas: HashMap<String, String>,
    pub custom_persona: String,
    pub default_persona: String,
    pub behavior_suffix: String,
    pub json_contract: String,
    pub directive_contract: String,
    pub quiz: String,
    pub story_start: String,
    pub story_continue: String,
    pub story: String,
    pub personality_idea: String,
    #[serde(skip)]
    pub last_loaded: Option<SystemTime>,
}

impl Default for PromptConfig {
    fn default() -> Self {
        let personas = [
            ("buddy", BUDDY_PERSONA),
            ("tutor", TUTOR_PERSONA),
            ("sage", SAGE_PERSONA),
        ]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        Self {
            personas,
            custom_persona: CUSTOM_PERSONA.to_string(),
            default_persona: DEFAULT_PERSONA.to_string(),
            behavior_suffix: BEHAVIOR_SUFFIX.to_string(),
            json_contract: JSON_CONTRACT.to_string(),
            directive_contract: DIRECTIVE_CONTRACT.to_string(),
            quiz: QUIZ_TEMPLATE.to_string(),
            story_start: STORY_START_TEMPLATE.to_string(),
            story_continue: STORY_CONTINUE_TEMPLATE.to_string(),
            story: STORY_TEMPLATE.to_string(),
            personality_idea: PERSONALITY_IDEA_TEMPLATE.to_string(),
            last_loaded: None,
        }
    }
}

impl PromptConfig {
    fn validate(&self) -> Result<(), PromptError> {
        let required = [
            ("quiz", &self.quiz, "{topic}"),
            ("story", &self.story, "{context}"),
            ("story_continue", &self.story_continue, "{previous}"),
            ("personality_idea", &self.personality_idea, "{idea}"),
        ];
        for (key, template, placeholder) in required {
            if !template.contains(placeholder) {
                return Err(PromptError::TemplateNotFound(format!("{} ({})", key, placeholder)));
            }
        }
        for preset in ["buddy", "tutor", "sage"] {
            if !self.personas.contains_key(preset) {
                warn!("Prompts file has no '{}' persona; the default persona will be used", preset);
            }
        }
        Ok(())
    }
}

/// Prompt set shared by every request; swapped wholesale on reload.
pub type SharedPrompts = Arc<RwLock<Arc<PromptConfig>>>;

pub fn share(config: Arc<PromptConfig>) -> SharedPrompts {
    Arc::new(RwLock::new(config))
}

/// Takes the current prompt set so a concurrent reload cannot change it mid-request.
pub async fn snapshot(shared: &SharedPrompts) -> Arc<PromptConfig> {
    Arc::clone(&*shared.read().await)
}

pub fn load_prompts_from_str(json: &str) -> Result<PromptConfig, PromptError> {
    let config: PromptConfig = serde_json::from_str(json)?;
    config.validate()?;
    Ok(config)
}

pub fn load_prompts<P: AsRef<Path>>(path: P) -> Result<Arc<PromptConfig>, PromptError> {
    let file_content = fs::read_to_string(path.as_ref())?;
    let mut config = load_prompts_from_str(&file_content)?;
    config.last_loaded = Some(SystemTime::now());
    info!("Loaded prompt templates from {}", path.as_ref().display());
    Ok(Arc::new(config))
}

pub fn reload_prompts_if_changed<P: AsRef<Path>>(
    path: P,
    current_config: &Arc<PromptConfig>
) -> Result<Option<Arc<PromptConfig>>, PromptError> {
    let metadata = fs::metadata(&path)?;

    if let Ok(modified) = metadata.modified() {
        if let Some(last_loaded) = current_config.last_loaded {
            if modified > last_loaded {
                info!("Prompts file changed, reloading...");
                return load_prompts(&path).map(Some);
            }
        } else {
            info!("No last_loaded timestamp, reloading prompts...");
            return load_prompts(&path).map(Some);
        }
    }
    Ok(None)
}

/// Persona template for a profile; unknown ids and missing presets use the default persona.
pub fn get_persona_prompt(config: &PromptConfig, personality: &PersonalityProfile) -> String {
    let preset = |key: &str| {
        config.personas.get(key).cloned().unwrap_or_else(|| config.default_persona.clone())
    };

    match &personality.id {
        PersonalityId::Buddy | PersonalityId::Tutor | PersonalityId::Sage =>
            preset(personality.id.as_str()),
        PersonalityId::Custom => {
            let rules = personality.custom_instructions
                .as_deref()
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .unwrap_or(DEFAULT_CUSTOM_RULES);
            config.custom_persona.replace("{name}", &personality.name).replace("{instructions}", rules)
        }
        PersonalityId::Unrecognized(_) => config.default_persona.clone(),
    }
}

/// Persona plus the shared safety suffix; the provider contract is appended later.
pub fn get_system_prompt(config: &PromptConfig, personality: &PersonalityProfile) -> String {
    format!("{}\n{}", get_persona_prompt(config, personality), config.behavior_suffix)
}

pub fn get_quiz_prompt(config: &PromptConfig, topic: &str) -> String {
    config.quiz.replace("{topic}", topic)
}

pub fn get_story_prompt(
    config: &PromptConfig,
    previous_segment: &str,
    choice: &str,
    theme: Option<&StoryTheme>
) -> String {
    let context = if previous_segment.trim().is_empty() {
        let genre = theme
            .and_then(|t| t.genre.as_deref())
            .filter(|g| !g.trim().is_empty())
            .unwrap_or(DEFAULT_STORY_GENRE);
        let topic = theme
            .and_then(|t| t.topic.as_deref())
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(DEFAULT_STORY_TOPIC);
        config.story_start.replace("{genre}", genre).replace("{topic}", topic)
    } else {
        config.story_continue.replace("{previous}", previous_segment).replace("{choice}", choice)
    };
    config.story.replace("{context}", &context)
}

pub fn get_personality_idea_prompt(config: &PromptConfig, idea: &str) -> String {
    config.personality_idea.replace("{idea}", idea)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn profile(id: &str) -> PersonalityProfile {
        PersonalityProfile {
            id: PersonalityId::from(id.to_string()),
            name: "Zog".to_string(),
            description: String::new(),
            custom_instructions: None,
        }
    }

    #[test]
    fn every_personality_id_selects_a_template() {
        let config = PromptConfig::default();
        assert!(get_persona_prompt(&config, &profile("buddy")).contains("playful best friend"));
        assert!(get_persona_prompt(&config, &profile("tutor")).contains("patient and helpful tutor"));
        assert!(get_persona_prompt(&config, &profile("sage")).contains("calm and wise"));
        assert!(get_persona_prompt(&config, &profile("custom")).contains("named 'Zog'"));
        assert_eq!(get_persona_prompt(&config, &profile("dragon")), DEFAULT_PERSONA);
    }

    #[test]
    fn custom_persona_embeds_instructions_or_a_friendly_default() {
        let config = PromptConfig::default();
        let with_rules = PersonalityProfile::custom("Robo", "Beep", Some("Speak like a robot"));
        assert!(get_persona_prompt(&config, &with_rules).contains("Rules: Speak like a robot."));

        let blank = PersonalityProfile::custom("Robo", "Beep", Some("   "));
        assert!(get_persona_prompt(&config, &blank).contains("Rules: Be friendly."));
    }

    #[test]
    fn system_prompt_always_carries_the_safety_suffix() {
        let config = PromptConfig::default();
        let prompt = get_system_prompt(&config, &profile("unknown"));
        assert!(prompt.starts_with(DEFAULT_PERSONA));
        assert!(prompt.contains("kid-safe"));
        assert!(prompt.contains("Magic Crayon"));
    }

    #[test]
    fn story_prompt_starts_or_continues() {
        let config = PromptConfig::default();
        let start = get_story_prompt(&config, "", "", None);
        assert!(start.contains("Start a new fantasy story about a magical playground."));

        let theme = StoryTheme { topic: Some("space cats".to_string()), genre: Some("sci-fi".to_string()) };
        let themed = get_story_prompt(&config, "  ", "", Some(&theme));
        assert!(themed.contains("Start a new sci-fi story about space cats."));

        let next = get_story_prompt(&config, "The cat flew.", "land on the moon", Some(&theme));
        assert!(next.contains("Previous part of the story: \"The cat flew.\""));
        assert!(next.contains("The child chose to: \"land on the moon\""));
        assert!(!next.contains("Start a new"));
    }

    #[test]
    fn quiz_and_idea_prompts_substitute_their_input() {
        let config = PromptConfig::default();
        assert!(get_quiz_prompt(&config, "Science: volcanoes").contains("about \"Science: volcanoes\""));
        assert!(get_personality_idea_prompt(&config, "a wizard cat").contains("idea: \"a wizard cat\""));
    }

    #[test]
    fn partial_prompt_files_keep_builtin_defaults() {
        let config = load_prompts_from_str(
            r#"{ "personas": { "buddy": "You are Sparky." }, "default_persona": "Hello friend." }"#
        ).unwrap();
        assert_eq!(get_persona_prompt(&config, &profile("buddy")), "You are Sparky.");
        assert_eq!(get_persona_prompt(&config, &profile("tutor")), "Hello friend.");
        assert_eq!(config.quiz, QUIZ_TEMPLATE);
    }

    #[test]
    fn templates_missing_placeholders_are_rejected() {
        let err = load_prompts_from_str(r#"{ "quiz": "Make a quiz." }"#).unwrap_err();
        assert!(matches!(err, PromptError::TemplateNotFound(ref k) if k.starts_with("quiz")));
        assert!(matches!(load_prompts_from_str("not json"), Err(PromptError::JsonError(_))));
    }

    #[test]
    fn reload_picks_up_files_without_a_timestamp() {
        let path = std::env::temp_dir().join(format!("ai-bud-prompts-{}.json", uuid::Uuid::new_v4()));
        let mut file = fs::File::create(&path).unwrap();
        write!(file, r#"{{ "default_persona": "Reloaded persona." }}"#).unwrap();

        let current = Arc::new(PromptConfig::default());
        let reloaded = reload_prompts_if_changed(&path, &current).unwrap().unwrap();
        assert_eq!(reloaded.default_persona, "Reloaded persona.");
        assert!(reloaded.last_loaded.is_some());

        assert!(reload_prompts_if_changed(&path, &reloaded).unwrap().is_none());
        fs::remove_file(&path).unwrap();
    }
}
