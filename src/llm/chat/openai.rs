use async_trait::async_trait;
use log::info;
use reqwest::{Client as HttpClient, header::{HeaderMap, HeaderValue, CONTENT_TYPE, AUTHORIZATION}};
use serde::{Deserialize, Serialize};

use super::{check_status, ChatClient, ChatRole, ProviderMessage, ProviderRequest, ResponseMode};
use crate::llm::{LlmConfig, LlmError, LlmType};

pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";

pub struct OpenAIChatClient {
    http: HttpClient,
    model: String,
    base_url: String,
}

#[derive(Serialize, Debug, PartialEq)]
struct OpenAIMessage {
    role: &'static str,
    content: OpenAIContent,
}

#[derive(Serialize, Debug, PartialEq)]
#[serde(untagged)]
enum OpenAIContent {
    Text(String),
    Parts(Vec<OpenAIContentPart>),
}

#[derive(Serialize, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
enum OpenAIContentPart {
    Text { text: String },
    ImageUrl { image_url: OpenAIImageUrl },
}

#[derive(Serialize, Debug, PartialEq)]
struct OpenAIImageUrl {
    url: String,
}

#[derive(Serialize, Debug)]
struct OpenAIChatRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
    max_tokens: u32,
}

#[derive(Serialize, Debug)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: String,
}

#[derive(Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
}

#[derive(Deserialize)]
struct OpenAIResponseMessage {
    content: Option<String>,
}

fn to_openai_message(role: &'static str, message: &ProviderMessage) -> OpenAIMessage {
    let content = match &message.image {
        Some(url) =>
            OpenAIContent::Parts(
                vec![
                    OpenAIContentPart::Text { text: message.text.clone() },
                    OpenAIContentPart::ImageUrl { image_url: OpenAIImageUrl { url: url.clone() } }
                ]
            ),
        None => OpenAIContent::Text(message.text.clone()),
    };
    OpenAIMessage { role, content }
}

impl OpenAIChatClient {
    pub fn new(
        api_key: String,
        model: Option<String>,
        base_url: Option<String>,
    ) -> Result<Self, LlmError> {
        let chat_model = model.unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string());
        let api_url = base_url.unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string());
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", api_key))
                .map_err(|e| LlmError::MissingCredential(format!("OPENAI_API_KEY (invalid format: {})", e)))?
        );

        let http = HttpClient::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            http,
            model: chat_model,
            base_url: api_url,
        })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let api_key = config.api_key
            .clone()
            .ok_or_else(|| LlmError::MissingCredential(LlmType::OpenAI.credential_key().to_string()))?;

        Self::new(
            api_key,
            config.completion_model.clone(),
            config.base_url.clone(),
        )
    }

    fn build_body(&self, request: &ProviderRequest) -> OpenAIChatRequest {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        if let Some(system) = &request.system {
            messages.push(OpenAIMessage {
                role: "system",
                content: OpenAIContent::Text(system.clone()),
            });
        }
        for message in &request.messages {
            let role = match message.role {
                ChatRole::User => "user",
                ChatRole::Assistant => "assistant",
            };
            messages.push(to_openai_message(role, message));
        }

        let response_format = match request.response_mode {
            ResponseMode::JsonObject => Some(ResponseFormat { format_type: "json_object".to_string() }),
            ResponseMode::Text => None,
        };

        OpenAIChatRequest {
            model: request.model.clone().unwrap_or_else(|| self.model.clone()),
            messages,
            response_format,
            max_tokens: request.max_tokens,
        }
    }
}

fn extract_content(resp: OpenAIResponse) -> Result<String, LlmError> {
    let content = resp.choices
        .into_iter()
        .next()
        .ok_or_else(|| LlmError::Malformed("No response from OpenAI API".to_string()))?
        .message.content
        .unwrap_or_default();
    if content.trim().is_empty() {
        return Err(LlmError::Malformed("OpenAI returned an empty message".to_string()));
    }
    Ok(content)
}

#[async_trait]
impl ChatClient for OpenAIChatClient {
    async fn chat(&self, request: &ProviderRequest) -> Result<String, LlmError> {
        let url = format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/'));
        let body = self.build_body(request);
        info!("OpenAIChatClient::chat() → model={} messages={}", body.model, body.messages.len());

        let resp = self.http.post(&url).json(&body).send().await?;
        let resp = check_status(resp).await?;
        let parsed = resp.json::<OpenAIResponse>().await?;
        extract_content(parsed)
    }

    fn get_model(&self) -> String {
        self.model.clone()
    }

    fn get_base_url(&self) -> Option<String> {
        Some(self.base_url.clone())
    }

    fn llm_type(&self) -> LlmType {
        LlmType::OpenAI
    }
}
