use serde::{ Serialize, Deserialize };

use super::chat::{ ConversationMessage, PersonalityProfile };

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ReplyRequest {
    pub message: String,
    #[serde(default)]
    pub history: Vec<ConversationMessage>,
    /// Falls back to the buddy preset when absent.
    #[serde(default)]
    pub personality: Option<PersonalityProfile>,
    #[serde(default, alias = "attachedImage")]
    pub image: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct QuizRequest {
    pub topic: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct StoryTheme {
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub genre: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct StoryRequest {
    #[serde(default)]
    pub previous_segment: String,
    #[serde(default)]
    pub choice: String,
    #[serde(default)]
    pub theme: Option<StoryTheme>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct PersonalityIdeaRequest {
    pub idea: String,
}

/// JSON document produced by one of the text generators, passed through as a string.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TextResponse {
    pub content: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct TtsRequest {
    pub text: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct TtsResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct TranscribeRequest {
    /// Base64 audio, optionally wrapped in a data URL.
    pub audio: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct TranscribeResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ErrorResponse {
    pub error: String,
}
