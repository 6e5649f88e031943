use log::{ error, info, warn };
use serde_json::json;
use std::sync::Arc;

use crate::config::prompt::{ self, SharedPrompts };
use crate::llm::chat::{ ChatClient, ProviderRequest };
use crate::llm::{ credential_keys_hint, LlmError };
use crate::models::api::StoryTheme;

const TEXT_MAX_TOKENS: u32 = 1000;

pub const QUIZ_FAILURE: &str = "Failed to generate quiz";
pub const STORY_FAILURE: &str = "High demand! Please try again in a moment.";
pub const PERSONALITY_IDEA_FAILURE: &str = "Failed to dream up a personality";

/// One (provider, model) pair in the text generation fallback chain.
#[derive(Clone)]
pub struct TextTarget {
    pub client: Arc<dyn ChatClient>,
    pub model: String,
}

impl TextTarget {
    pub fn new(client: Arc<dyn ChatClient>, model: impl Into<String>) -> Self {
        Self { client, model: model.into() }
    }

    fn label(&self) -> String {
        format!("{}/{}", self.client.llm_type().label(), self.model)
    }
}

/// Strips markdown fences and narrows the text to its outermost `{...}` span.
pub fn clean_json_output(raw: &str) -> String {
    let cleaned = raw.replace("```json", "").replace("```", "");
    let cleaned = cleaned.trim();
    match (cleaned.find('{'), cleaned.rfind('}')) {
        (Some(start), Some(end)) if end > start => cleaned[start..=end].to_string(),
        _ => cleaned.to_string(),
    }
}

fn error_json(message: &str) -> String {
    json!({ "error": message }).to_string()
}

pub struct TextGenerator {
    targets: Vec<TextTarget>,
    prompts: SharedPrompts,
}

impl TextGenerator {
    pub fn new(targets: Vec<TextTarget>, prompts: SharedPrompts) -> Self {
        Self { targets, prompts }
    }

    pub fn targets(&self) -> &[TextTarget] {
        &self.targets
    }

    /// Tries every target in order and returns the first successful completion.
    pub async fn generate_text(&self, prompt: &str) -> Result<String, LlmError> {
        if self.targets.is_empty() {
            return Err(LlmError::MissingCredential(credential_keys_hint()));
        }

        let mut notes = Vec::with_capacity(self.targets.len());
        for target in &self.targets {
            let request = ProviderRequest::single_prompt(
                prompt,
                Some(target.model.clone()),
                TEXT_MAX_TOKENS
            );
            match target.client.chat(&request).await {
                Ok(text) => {
                    info!("Text generated by {}", target.label());
                    return Ok(text);
                }
                Err(e) => {
                    warn!("Text generation with {} failed: {}", target.label(), e);
                    notes.push(format!("{}: {}", target.label(), e));
                }
            }
        }
        Err(LlmError::Exhausted(notes.join(" | ")))
    }

    async fn generate_json(&self, prompt: &str, failure: &str, what: &str) -> String {
        match self.generate_text(prompt).await {
            Ok(text) => clean_json_output(&text),
            Err(e) => {
                error!("{} error: {}", what, e);
                error_json(failure)
            }
        }
    }

    pub async fn generate_quiz(&self, topic: &str) -> String {
        let prompts = prompt::snapshot(&self.prompts).await;
        let prompt = prompt::get_quiz_prompt(&prompts, topic);
        self.generate_json(&prompt, QUIZ_FAILURE, "Quiz").await
    }

    pub async fn generate_story_segment(
        &self,
        previous_segment: &str,
        choice: &str,
        theme: Option<&StoryTheme>
    ) -> String {
        let prompts = prompt::snapshot(&self.prompts).await;
        let prompt = prompt::get_story_prompt(&prompts, previous_segment, choice, theme);
        self.generate_json(&prompt, STORY_FAILURE, "Story").await
    }

    pub async fn generate_personality_idea(&self, idea: &str) -> String {
        let prompts = prompt::snapshot(&self.prompts).await;
        let prompt = prompt::get_personality_idea_prompt(&prompts, idea);
        self.generate_json(&prompt, PERSONALITY_IDEA_FAILURE, "Personality idea").await
    }
}
