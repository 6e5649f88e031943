use chrono::{ DateTime, Utc };
use serde::{ Deserialize, Serialize };
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    #[serde(alias = "ai")]
    Assistant,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub sender: Sender,
    #[serde(default)]
    pub text: String,
    /// Base64 data URL or remote URL.
    #[serde(default, alias = "image", skip_serializing_if = "Option::is_none")]
    pub attached_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl ConversationMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self { id: None, sender: Sender::User, text: text.into(), attached_image: None, timestamp: None }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self { id: None, sender: Sender::Assistant, text: text.into(), attached_image: None, timestamp: None }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PersonalityId {
    Buddy,
    Tutor,
    Sage,
    Custom,
    Unrecognized(String),
}

impl PersonalityId {
    pub fn as_str(&self) -> &str {
        match self {
            PersonalityId::Buddy => "buddy",
            PersonalityId::Tutor => "tutor",
            PersonalityId::Sage => "sage",
            PersonalityId::Custom => "custom",
            PersonalityId::Unrecognized(other) => other,
        }
    }
}

impl From<String> for PersonalityId {
    fn from(value: String) -> Self {
        match value.trim().to_lowercase().as_str() {
            "buddy" => PersonalityId::Buddy,
            "tutor" => PersonalityId::Tutor,
            "sage" => PersonalityId::Sage,
            "custom" => PersonalityId::Custom,
            _ => PersonalityId::Unrecognized(value),
        }
    }
}

impl From<PersonalityId> for String {
    fn from(value: PersonalityId) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for PersonalityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalityProfile {
    pub id: PersonalityId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, alias = "systemPrompt", skip_serializing_if = "Option::is_none")]
    pub custom_instructions: Option<String>,
}

impl PersonalityProfile {
    fn preset(id: PersonalityId, name: &str, description: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            description: description.to_string(),
            custom_instructions: None,
        }
    }

    pub fn buddy() -> Self {
        Self::preset(PersonalityId::Buddy, "Buddy", "Fun & Playful")
    }

    pub fn tutor() -> Self {
        Self::preset(PersonalityId::Tutor, "Tutor", "Helpful & Smart")
    }

    pub fn sage() -> Self {
        Self::preset(PersonalityId::Sage, "Sage", "Calm & Wise")
    }

    pub fn custom(name: &str, description: &str, instructions: Option<&str>) -> Self {
        Self {
            id: PersonalityId::Custom,
            name: name.to_string(),
            description: description.to_string(),
            custom_instructions: instructions.map(str::to_string),
        }
    }

    pub fn presets() -> Vec<Self> {
        vec![Self::buddy(), Self::tutor(), Self::sage()]
    }
}

impl Default for PersonalityProfile {
    fn default() -> Self {
        Self::buddy()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Happy,
    Sad,
    Surprised,
    Thinking,
    Idle,
}

impl FromStr for Mood {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "happy" => Ok(Mood::Happy),
            "sad" => Ok(Mood::Sad),
            "surprised" => Ok(Mood::Surprised),
            "thinking" => Ok(Mood::Thinking),
            "idle" => Ok(Mood::Idle),
            other => Err(format!("Unknown mood: '{}'", other)),
        }
    }
}

/// The only shape handed back to callers, whichever provider produced it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StandardizedReply {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mood: Option<Mood>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl StandardizedReply {
    pub fn text_only(text: impl Into<String>) -> Self {
        Self { text: text.into(), mood: None, image_url: None }
    }
}
