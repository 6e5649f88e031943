use async_trait::async_trait;
use log::{ info, warn };
use reqwest::{ Client as HttpClient, header::{ HeaderMap, HeaderValue, CONTENT_TYPE } };
use serde::{ Deserialize, Serialize };

use super::{ check_status, parse_data_url, ChatClient, ChatRole, ProviderMessage, ProviderRequest, ResponseMode };
use crate::llm::{ LlmConfig, LlmError, LlmType };

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    contents: Vec<GeminiContent>,
    generation_config: GenerationConfig,
}

#[derive(Serialize, Debug)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<GeminiPart>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GeminiPart {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<GeminiInlineData>,
}

impl GeminiPart {
    fn text(text: impl Into<String>) -> Self {
        Self { text: Some(text.into()), inline_data: None }
    }
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GeminiInlineData {
    mime_type: String,
    data: String,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleResponse {
    #[serde(default)]
    candidates: Vec<GoogleCandidate>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleCandidate {
    content: Option<GoogleContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct GoogleContent {
    #[serde(default)]
    parts: Vec<GooglePart>,
}

#[derive(Deserialize)]
struct GooglePart {
    text: Option<String>,
}

fn to_gemini_content(message: &ProviderMessage) -> GeminiContent {
    let role = match message.role {
        ChatRole::User => "user",
        ChatRole::Assistant => "model",
    };
    let mut parts = vec![GeminiPart::text(message.text.clone())];
    if let Some(image) = &message.image {
        match parse_data_url(image) {
            Some((mime_type, data)) => {
                parts.push(GeminiPart {
                    text: None,
                    inline_data: Some(GeminiInlineData {
                        mime_type: mime_type.to_string(),
                        data: data.to_string(),
                    }),
                });
            }
            None => {
                warn!("Gemini only accepts inline images; passing remote image as a link");
                parts.push(GeminiPart::text(format!("(shared picture: {})", image)));
            }
        }
    }
    GeminiContent { role: Some(role), parts }
}

fn extract_text(resp: GoogleResponse) -> Result<String, LlmError> {
    let candidate = resp.candidates
        .into_iter()
        .next()
        .ok_or_else(|| LlmError::Malformed("Gemini returned no candidates".to_string()))?;

    let text = candidate.content
        .map(|c| {
            c.parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(
            LlmError::Malformed(
                format!(
                    "Gemini returned no text (finish reason: {})",
                    candidate.finish_reason.as_deref().unwrap_or("unknown")
                )
            )
        );
    }
    Ok(text)
}

pub struct GeminiChatClient {
    http: HttpClient,
    model: String,
    base_url: String,
}

impl GeminiChatClient {
    pub fn new(
        api_key: String,
        model: Option<String>,
        base_url: Option<String>
    ) -> Result<Self, LlmError> {
        let chat_model = model.unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string());
        let api_url = base_url.unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string());

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            "x-goog-api-key",
            HeaderValue::from_str(&api_key).map_err(|e|
                LlmError::MissingCredential(format!("GEMINI_API_KEY (invalid format: {})", e))
            )?
        );
        let http = HttpClient::builder().default_headers(headers).build()?;

        Ok(Self {
            http,
            model: chat_model,
            base_url: api_url,
        })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let api_key = config.api_key
            .clone()
            .ok_or_else(|| LlmError::MissingCredential(LlmType::Gemini.credential_key().to_string()))?;
        Self::new(api_key, config.completion_model.clone(), config.base_url.clone())
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url.trim_end_matches('/'), model)
    }

    fn build_body(&self, request: &ProviderRequest) -> GeminiRequest {
        let system_instruction = request.system.as_ref().map(|s| GeminiContent {
            role: None,
            parts: vec![GeminiPart::text(s.clone())],
        });
        let response_mime_type = match request.response_mode {
            ResponseMode::JsonObject => Some("application/json"),
            ResponseMode::Text => None,
        };

        GeminiRequest {
            system_instruction,
            contents: request.messages.iter().map(to_gemini_content).collect(),
            generation_config: GenerationConfig {
                max_output_tokens: request.max_tokens,
                response_mime_type,
            },
        }
    }
}

#[async_trait]
impl ChatClient for GeminiChatClient {
    async fn chat(&self, request: &ProviderRequest) -> Result<String, LlmError> {
        let model = request.model.clone().unwrap_or_else(|| self.model.clone());
        info!(
            "GeminiChatClient::chat() → model={} base_url={} turns={}",
            model,
            self.base_url,
            request.messages.len()
        );

        let body = self.build_body(request);
        let resp = self.http.post(self.endpoint(&model)).json(&body).send().await?;
        let resp = check_status(resp).await?;
        let parsed = resp.json::<GoogleResponse>().await?;
        extract_text(parsed)
    }

    fn get_model(&self) -> String {
        self.model.clone()
    }

    fn get_base_url(&self) -> Option<String> {
        Some(self.base_url.clone())
    }

    fn llm_type(&self) -> LlmType {
        LlmType::Gemini
    }
}
