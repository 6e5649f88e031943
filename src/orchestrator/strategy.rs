use log::{ debug, info };
use serde_json::Value as JsonValue;

use super::directive::extract_directives;
use super::image::ImageUrlBuilder;
use crate::config::prompt::PromptConfig;
use crate::llm::chat::{ ChatRole, ProviderMessage, ProviderRequest, ResponseMode };
use crate::llm::{ LlmError, LlmType };
use crate::models::chat::{ ConversationMessage, Mood, Sender, StandardizedReply };

const CHAT_MAX_TOKENS: u32 = 500;

/// How a provider family is told to shape its reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderFamily {
    /// Strict JSON object with `text`, `mood`, `draw`.
    JsonContract,
    /// Free text ending in `{MOOD: ..}` / `{DRAW: ..}` tags.
    InlineDirectives,
}

impl ProviderFamily {
    pub fn for_llm(llm_type: LlmType) -> Self {
        match llm_type {
            LlmType::OpenAI => ProviderFamily::JsonContract,
            LlmType::Gemini => ProviderFamily::InlineDirectives,
        }
    }
}

/// Everything a strategy needs to build one chat request.
pub struct ReplyContext<'a> {
    pub prompts: &'a PromptConfig,
    /// Persona plus behaviour suffix, without any output contract.
    pub system_prompt: &'a str,
    /// Already truncated to the forwarding window.
    pub history: &'a [ConversationMessage],
    pub message: &'a str,
    pub attached_image: Option<&'a str>,
}

pub trait ReplyStrategy: Send + Sync {
    fn family(&self) -> ProviderFamily;
    fn build_request(&self, ctx: &ReplyContext<'_>) -> ProviderRequest;
    fn parse_response(&self, raw: &str) -> Result<StandardizedReply, LlmError>;
}

pub fn strategy_for(family: ProviderFamily, images: ImageUrlBuilder) -> Box<dyn ReplyStrategy> {
    match family {
        ProviderFamily::JsonContract => Box::new(JsonContractStrategy { images }),
        ProviderFamily::InlineDirectives => Box::new(DirectiveStrategy { images }),
    }
}

fn conversation_messages(ctx: &ReplyContext<'_>) -> Vec<ProviderMessage> {
    let mut messages: Vec<ProviderMessage> = ctx.history
        .iter()
        .map(|msg| ProviderMessage {
            role: match msg.sender {
                Sender::User => ChatRole::User,
                Sender::Assistant => ChatRole::Assistant,
            },
            text: msg.text.clone(),
            image: msg.attached_image.clone(),
        })
        .collect();
    messages.push(ProviderMessage {
        role: ChatRole::User,
        text: ctx.message.to_string(),
        image: ctx.attached_image.map(str::to_string),
    });
    messages
}

fn parse_mood(raw: &str) -> Option<Mood> {
    match raw.parse::<Mood>() {
        Ok(mood) => Some(mood),
        Err(e) => {
            debug!("Dropping mood from model output: {}", e);
            None
        }
    }
}

fn finish_reply(
    images: &ImageUrlBuilder,
    text: String,
    mood: Option<Mood>,
    draw: Option<String>
) -> Result<StandardizedReply, LlmError> {
    let image_url = draw.as_deref().and_then(|d| images.build(d));
    if draw.is_some() {
        info!("Drawing request: description={:?} url={:?}", draw, image_url);
    }
    if text.is_empty() && image_url.is_none() {
        return Err(LlmError::Malformed("reply contained no usable text".to_string()));
    }
    Ok(StandardizedReply { text, mood, image_url })
}

pub struct JsonContractStrategy {
    images: ImageUrlBuilder,
}

impl ReplyStrategy for JsonContractStrategy {
    fn family(&self) -> ProviderFamily {
        ProviderFamily::JsonContract
    }

    fn build_request(&self, ctx: &ReplyContext<'_>) -> ProviderRequest {
        ProviderRequest {
            model: None,
            system: Some(format!("{}\n\n{}", ctx.system_prompt, ctx.prompts.json_contract)),
            messages: conversation_messages(ctx),
            response_mode: ResponseMode::JsonObject,
            max_tokens: CHAT_MAX_TOKENS,
        }
    }

    fn parse_response(&self, raw: &str) -> Result<StandardizedReply, LlmError> {
        let value: JsonValue = serde_json::from_str(raw.trim())?;
        let object = value
            .as_object()
            .ok_or_else(|| LlmError::Malformed("expected a JSON object".to_string()))?;

        let field = |key: &str| {
            object
                .get(key)
                .and_then(JsonValue::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        // Tags that leak into the text field are scrubbed and used as a fallback.
        let inline = extract_directives(&field("text").unwrap_or_default());
        let mood = match field("mood").or(inline.mood) {
            Some(raw_mood) => parse_mood(&raw_mood),
            None => Some(Mood::Idle),
        };
        let draw = field("draw").or_else(|| field("drawing")).or(inline.draw);

        finish_reply(&self.images, inline.text, mood, draw)
    }
}

pub struct DirectiveStrategy {
    images: ImageUrlBuilder,
}

impl ReplyStrategy for DirectiveStrategy {
    fn family(&self) -> ProviderFamily {
        ProviderFamily::InlineDirectives
    }

    fn build_request(&self, ctx: &ReplyContext<'_>) -> ProviderRequest {
        ProviderRequest {
            model: None,
            system: Some(format!("{}\n\n{}", ctx.system_prompt, ctx.prompts.directive_contract)),
            messages: conversation_messages(ctx),
            response_mode: ResponseMode::Text,
            max_tokens: CHAT_MAX_TOKENS,
        }
    }

    fn parse_response(&self, raw: &str) -> Result<StandardizedReply, LlmError> {
        if raw.trim().is_empty() {
            return Err(LlmError::Malformed("empty reply".to_string()));
        }
        let directives = extract_directives(raw);
        debug!("Directives: mood={:?} draw={:?}", directives.mood, directives.draw);
        let mood = directives.mood.as_deref().and_then(parse_mood);
        finish_reply(&self.images, directives.text, mood, directives.draw)
    }
}
