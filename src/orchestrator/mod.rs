pub mod directive;
pub mod image;
pub mod strategy;

use log::{ error, info, warn };
use std::sync::Arc;
use uuid::Uuid;

use crate::config::prompt::{ self, SharedPrompts };
use crate::llm::chat::ChatClient;
use crate::llm::{ credential_keys_hint, LlmError, LlmType };
use crate::models::chat::{ ConversationMessage, PersonalityProfile, StandardizedReply };
use self::image::ImageUrlBuilder;
use self::strategy::{ strategy_for, ProviderFamily, ReplyContext, ReplyStrategy };

/// Number of prior messages forwarded to a provider.
pub const HISTORY_FOR_PROMPT_LEN: usize = 5;

/// A configured provider paired with the strategy for its family.
pub struct ProviderRoute {
    client: Arc<dyn ChatClient>,
    strategy: Box<dyn ReplyStrategy>,
}

impl ProviderRoute {
    pub fn new(client: Arc<dyn ChatClient>, images: ImageUrlBuilder) -> Self {
        let family = ProviderFamily::for_llm(client.llm_type());
        Self {
            strategy: strategy_for(family, images),
            client,
        }
    }

    pub fn llm_type(&self) -> LlmType {
        self.client.llm_type()
    }

    pub fn label(&self) -> &'static str {
        self.client.llm_type().label()
    }

    async fn attempt(&self, ctx: &ReplyContext<'_>) -> Result<StandardizedReply, LlmError> {
        let request = self.strategy.build_request(ctx);
        let raw = self.client.chat(&request).await?;
        self.strategy.parse_response(&raw)
    }
}

pub fn recent_history(history: &[ConversationMessage]) -> &[ConversationMessage] {
    &history[history.len().saturating_sub(HISTORY_FOR_PROMPT_LEN)..]
}

pub fn missing_credentials_reply() -> StandardizedReply {
    StandardizedReply::text_only(
        format!(
            "I'm missing my AI API Key! 🔑 Please ask my creator to add {} to the .env.local file.",
            credential_keys_hint()
        )
    )
}

fn failure_reply(failures: &[(&'static str, String)]) -> StandardizedReply {
    match failures {
        [(label, error)] =>
            StandardizedReply::text_only(format!("Oops! {} failed. ☁️ Error: {}", label, error)),
        _ => {
            let labels = failures
                .iter()
                .map(|(label, _)| *label)
                .collect::<Vec<_>>()
                .join(" and ");
            let notes = failures
                .iter()
                .map(|(label, error)| format!("{}: {}", label, error))
                .collect::<Vec<_>>()
                .join(" | ");
            StandardizedReply::text_only(
                format!(
                    "Oh no! My brain is a little foggy right now. ☁️ Both {} failed. Notes: {}",
                    labels,
                    notes
                )
            )
        }
    }
}

/// Turns a child's message into a `StandardizedReply`, walking the provider
/// routes in order until one produces a usable answer.
pub struct Orchestrator {
    routes: Vec<ProviderRoute>,
    prompts: SharedPrompts,
}

impl Orchestrator {
    pub fn new(routes: Vec<ProviderRoute>, prompts: SharedPrompts) -> Self {
        Self { routes, prompts }
    }

    pub fn providers(&self) -> Vec<LlmType> {
        self.routes.iter().map(ProviderRoute::llm_type).collect()
    }

    /// Never fails: configuration gaps and provider errors come back as reply text.
    pub async fn generate_reply(
        &self,
        message: &str,
        history: &[ConversationMessage],
        personality: &PersonalityProfile,
        attached_image: Option<&str>
    ) -> StandardizedReply {
        let request_id = Uuid::new_v4();
        if self.routes.is_empty() {
            warn!("[{}] No provider credential configured; sending apology", request_id);
            return missing_credentials_reply();
        }

        let prompts = prompt::snapshot(&self.prompts).await;
        let system_prompt = prompt::get_system_prompt(&prompts, personality);
        let history = recent_history(history);
        let ctx = ReplyContext {
            prompts: &prompts,
            system_prompt: &system_prompt,
            history,
            message,
            attached_image,
        };

        let mut failures: Vec<(&'static str, String)> = Vec::new();
        for route in &self.routes {
            info!(
                "[{}] Asking {} (personality={}, history={}, image={})",
                request_id,
                route.label(),
                personality.id,
                history.len(),
                attached_image.is_some()
            );
            match route.attempt(&ctx).await {
                Ok(reply) => {
                    if !failures.is_empty() {
                        info!("[{}] {} answered after fallback", request_id, route.label());
                    }
                    return reply;
                }
                Err(e) => {
                    error!("[{}] {} failed: {}", request_id, route.label(), e);
                    failures.push((route.label(), e.to_string()));
                }
            }
        }

        warn!("[{}] Every provider failed", request_id);
        failure_reply(&failures)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::prompt::{ share, PromptConfig };
    use crate::llm::chat::mock::MockChatClient;
    use crate::llm::chat::ResponseMode;
    use crate::models::chat::Mood;
    use crate::orchestrator::image::DEFAULT_IMAGE_ENDPOINT;

    fn images() -> ImageUrlBuilder {
        ImageUrlBuilder::new(DEFAULT_IMAGE_ENDPOINT).unwrap()
    }

    fn orchestrator(clients: Vec<Arc<MockChatClient>>) -> Orchestrator {
        let routes = clients
            .into_iter()
            .map(|c| ProviderRoute::new(c as Arc<dyn ChatClient>, images()))
            .collect();
        Orchestrator::new(routes, share(Arc::new(PromptConfig::default())))
    }

    #[tokio::test]
    async fn no_credentials_yields_an_apology_naming_the_keys() {
        let reply = orchestrator(vec![]).generate_reply("hi", &[], &PersonalityProfile::buddy(), None).await;
        assert!(reply.text.contains("OPENAI_API_KEY"));
        assert!(reply.text.contains("GEMINI_API_KEY"));
        assert_eq!(reply.mood, None);
        assert_eq!(reply.image_url, None);
    }

    #[tokio::test]
    async fn single_provider_success_is_returned_directly() {
        let openai = Arc::new(
            MockChatClient::replying(LlmType::OpenAI, r#"{"text":"Hi!","mood":"Happy","draw":null}"#)
        );
        let reply = orchestrator(vec![openai.clone()]).generate_reply(
            "hello",
            &[],
            &PersonalityProfile::tutor(),
            None
        ).await;

        assert_eq!(reply, StandardizedReply {
            text: "Hi!".to_string(),
            mood: Some(Mood::Happy),
            image_url: None,
        });
        let request = &openai.requests()[0];
        assert_eq!(request.response_mode, ResponseMode::JsonObject);
        assert!(request.system.as_deref().unwrap().contains("patient and helpful tutor"));
    }

    #[tokio::test]
    async fn single_provider_failure_is_reported_in_character() {
        let openai = Arc::new(MockChatClient::failing(LlmType::OpenAI, "rate limited"));
        let reply = orchestrator(vec![openai]).generate_reply("hi", &[], &PersonalityProfile::buddy(), None).await;
        assert!(reply.text.starts_with("Oops! OpenAI failed."));
        assert!(reply.text.contains("rate limited"));
    }

    #[tokio::test]
    async fn secondary_answers_without_leaking_the_primary_failure() {
        let openai = Arc::new(MockChatClient::failing(LlmType::OpenAI, "server exploded"));
        let gemini = Arc::new(
            MockChatClient::replying(LlmType::Gemini, "A balloon for you! {DRAW: a red balloon} {MOOD: happy}")
        );
        let reply = orchestrator(vec![openai.clone(), gemini.clone()]).generate_reply(
            "draw a balloon",
            &[],
            &PersonalityProfile::buddy(),
            None
        ).await;

        assert_eq!(openai.call_count(), 1);
        assert_eq!(gemini.call_count(), 1);
        assert_eq!(reply.text, "A balloon for you!");
        assert!(!reply.text.contains("exploded"));
        assert_eq!(reply.mood, Some(Mood::Happy));
        assert!(reply.image_url.unwrap().contains("a_red_balloon"));
        assert_eq!(gemini.requests()[0].response_mode, ResponseMode::Text);
    }

    #[tokio::test]
    async fn malformed_primary_output_triggers_fallback() {
        let openai = Arc::new(MockChatClient::replying(LlmType::OpenAI, "Sure thing, no JSON here"));
        let gemini = Arc::new(MockChatClient::replying(LlmType::Gemini, "Hello! {MOOD: happy}"));
        let reply = orchestrator(vec![openai, gemini]).generate_reply(
            "hi",
            &[],
            &PersonalityProfile::sage(),
            None
        ).await;
        assert_eq!(reply.text, "Hello!");
    }

    #[tokio::test]
    async fn both_failing_concatenates_every_note() {
        let openai = Arc::new(MockChatClient::failing(LlmType::OpenAI, "quota"));
        let gemini = Arc::new(MockChatClient::failing(LlmType::Gemini, "overloaded"));
        let reply = orchestrator(vec![openai.clone(), gemini.clone()]).generate_reply(
            "hi",
            &[],
            &PersonalityProfile::buddy(),
            None
        ).await;

        assert!(reply.text.contains("Both OpenAI and Gemini failed"));
        assert!(reply.text.contains("OpenAI: provider returned HTTP 503: quota"));
        assert!(reply.text.contains("Gemini: provider returned HTTP 503: overloaded"));
        assert_eq!(openai.call_count(), 1);
        assert_eq!(gemini.call_count(), 1);
    }

    #[tokio::test]
    async fn only_the_last_five_messages_are_forwarded() {
        let history: Vec<ConversationMessage> = (0..8)
            .map(|i| {
                if i % 2 == 0 {
                    ConversationMessage::user(format!("u{}", i))
                } else {
                    ConversationMessage::assistant(format!("a{}", i))
                }
            })
            .collect();
        let gemini = Arc::new(MockChatClient::replying(LlmType::Gemini, "ok {MOOD: idle}"));
        orchestrator(vec![gemini.clone()]).generate_reply(
            "latest",
            &history,
            &PersonalityProfile::buddy(),
            Some("data:image/png;base64,AAAA")
        ).await;

        let sent = &gemini.requests()[0].messages;
        let texts: Vec<&str> = sent.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["a3", "u4", "a5", "u6", "a7", "latest"]);
        assert_eq!(sent.last().unwrap().image.as_deref(), Some("data:image/png;base64,AAAA"));
    }

    #[test]
    fn short_histories_are_kept_whole() {
        let history = vec![ConversationMessage::user("one"), ConversationMessage::assistant("two")];
        assert_eq!(recent_history(&history).len(), 2);
        assert!(recent_history(&[]).is_empty());
    }

    #[tokio::test]
    async fn unrecognized_personality_uses_the_default_persona() {
        let gemini = Arc::new(MockChatClient::replying(LlmType::Gemini, "Hi"));
        let mut profile = PersonalityProfile::buddy();
        profile.id = "wizard".to_string().into();
        let reply = orchestrator(vec![gemini.clone()]).generate_reply("hi", &[], &profile, None).await;

        assert_eq!(reply.text, "Hi");
        let system = gemini.requests()[0].system.clone().unwrap();
        assert!(system.starts_with("You are a friendly AI companion."));
    }
}
