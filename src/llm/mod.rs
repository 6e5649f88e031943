pub mod chat;
pub mod speech;
use serde::{ Deserialize, Serialize };
use std::str::FromStr;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmType {
    OpenAI,
    Gemini,
}

impl LlmType {
    pub const ALL: [LlmType; 2] = [LlmType::OpenAI, LlmType::Gemini];

    pub fn label(&self) -> &'static str {
        match self {
            LlmType::OpenAI => "OpenAI",
            LlmType::Gemini => "Gemini",
        }
    }

    /// Environment variable holding the credential for this provider.
    pub fn credential_key(&self) -> &'static str {
        match self {
            LlmType::OpenAI => "OPENAI_API_KEY",
            LlmType::Gemini => "GEMINI_API_KEY",
        }
    }
}

impl fmt::Display for LlmType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct ParseLlmTypeError {
    message: String,
}

impl fmt::Display for ParseLlmTypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ParseLlmTypeError {}
impl FromStr for LlmType {
    type Err = ParseLlmTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(LlmType::OpenAI),
            "gemini" | "google" => Ok(LlmType::Gemini),
            _ =>
                Err(ParseLlmTypeError {
                    message: format!("Invalid LLM type: '{}'", s),
                }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub llm_type: LlmType,
    pub api_key: Option<String>,
    pub completion_model: Option<String>,
    pub text_models: Vec<String>,
    pub base_url: Option<String>,
}

impl LlmConfig {
    pub fn new(llm_type: LlmType, api_key: &str) -> Self {
        Self {
            llm_type,
            api_key: normalize_api_key(api_key),
            completion_model: None,
            text_models: Vec::new(),
            base_url: None,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

/// "`OPENAI_API_KEY` or `GEMINI_API_KEY`", for user-facing messages.
pub fn credential_keys_hint() -> String {
    LlmType::ALL
        .iter()
        .map(|t| format!("`{}`", t.credential_key()))
        .collect::<Vec<_>>()
        .join(" or ")
}

/// Trims a credential and maps the empty string to `None`.
pub fn normalize_api_key(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Splits a comma separated model list, dropping blanks.
pub fn parse_model_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("missing credential `{0}`")]
    MissingCredential(String),
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("provider returned HTTP {status}: {body}")]
    Status {
        status: u16,
        body: String,
    },
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("all providers failed: {0}")]
    Exhausted(String),
}

impl From<serde_json::Error> for LlmError {
    fn from(err: serde_json::Error) -> Self {
        LlmError::Malformed(err.to_string())
    }
}
