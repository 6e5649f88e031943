pub mod openai;
pub mod gemini;
pub mod mock;

use async_trait::async_trait;
use std::sync::Arc;
use super::{ LlmConfig, LlmError, LlmType };
use self::openai::OpenAIChatClient;
use self::gemini::GeminiChatClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProviderMessage {
    pub role: ChatRole,
    pub text: String,
    /// Data URL or remote URL of an attached picture.
    pub image: Option<String>,
}

impl ProviderMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self { role: ChatRole::User, text: text.into(), image: None }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseMode {
    Text,
    JsonObject,
}

/// Provider-neutral request; each client maps it onto its own wire format.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderRequest {
    /// Overrides the client's default model when set.
    pub model: Option<String>,
    pub system: Option<String>,
    pub messages: Vec<ProviderMessage>,
    pub response_mode: ResponseMode,
    pub max_tokens: u32,
}

impl ProviderRequest {
    pub fn single_prompt(prompt: &str, model: Option<String>, max_tokens: u32) -> Self {
        Self {
            model,
            system: None,
            messages: vec![ProviderMessage::user(prompt)],
            response_mode: ResponseMode::Text,
            max_tokens,
        }
    }
}

#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Sends one request and returns the raw text of the first candidate.
    async fn chat(&self, request: &ProviderRequest) -> Result<String, LlmError>;

    fn get_model(&self) -> String;
    fn get_base_url(&self) -> Option<String>;
    fn llm_type(&self) -> LlmType;
}

pub fn new_client(config: &LlmConfig) -> Result<Arc<dyn ChatClient>, LlmError> {
    let client: Arc<dyn ChatClient> = match config.llm_type {
        LlmType::OpenAI => {
            let specific_client = OpenAIChatClient::from_config(config)?;
            Arc::new(specific_client)
        }
        LlmType::Gemini => {
            let specific_client = GeminiChatClient::from_config(config)?;
            Arc::new(specific_client)
        }
    };
    Ok(client)
}

/// Turns a non-success HTTP response into `LlmError::Status`, keeping the body for diagnostics.
pub(crate) async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, LlmError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(LlmError::Status {
        status: status.as_u16(),
        body: truncate_for_log(&body, 300),
    })
}

pub(crate) fn truncate_for_log(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let head: String = text.chars().take(max_chars).collect();
    format!("{}…", head)
}

/// Splits `data:<mime>;base64,<payload>` into its mime type and payload.
pub fn parse_data_url(url: &str) -> Option<(&str, &str)> {
    let rest = url.strip_prefix("data:")?;
    let (meta, payload) = rest.split_once(',')?;
    let mime = meta.strip_suffix(";base64")?;
    if mime.is_empty() || payload.is_empty() {
        return None;
    }
    Some((mime, payload))
}
