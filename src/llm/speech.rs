use base64::{ engine::general_purpose::STANDARD as BASE64, Engine as _ };
use log::{ error, info };
use reqwest::{ multipart, Client as HttpClient };
use serde::{ Deserialize, Serialize };
use serde_json::Value as JsonValue;

use super::chat::{ parse_data_url, truncate_for_log };
use super::LlmError;

pub const DEFAULT_VOICE_ID: &str = "EXAVITQu4vr4xnSDxMaL";
pub const DEFAULT_TTS_MODEL: &str = "eleven_turbo_v2_5";
pub const DEFAULT_ELEVENLABS_BASE_URL: &str = "https://api.elevenlabs.io";
pub const DEFAULT_TRANSCRIPTION_MODEL: &str = "whisper-1";

const VOICE_STABILITY: f32 = 0.5;
const VOICE_SIMILARITY_BOOST: f32 = 0.75;

#[derive(Debug, Clone)]
pub struct SpeechConfig {
    pub elevenlabs_api_key: Option<String>,
    pub voice_id: String,
    pub tts_model: String,
    pub elevenlabs_base_url: String,
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub transcription_model: String,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            elevenlabs_api_key: None,
            voice_id: DEFAULT_VOICE_ID.to_string(),
            tts_model: DEFAULT_TTS_MODEL.to_string(),
            elevenlabs_base_url: DEFAULT_ELEVENLABS_BASE_URL.to_string(),
            openai_api_key: None,
            openai_base_url: super::chat::openai::DEFAULT_OPENAI_BASE_URL.to_string(),
            transcription_model: DEFAULT_TRANSCRIPTION_MODEL.to_string(),
        }
    }
}

#[derive(Serialize, Debug)]
struct TtsRequest<'a> {
    text: &'a str,
    model_id: &'a str,
    voice_settings: VoiceSettings,
}

#[derive(Serialize, Debug)]
struct VoiceSettings {
    stability: f32,
    similarity_boost: f32,
}

#[derive(Deserialize)]
struct TranscriptionResponse {
    text: String,
}

/// Pulls a human readable message out of an ElevenLabs error body.
fn elevenlabs_error_detail(body: &str) -> String {
    let parsed: Option<JsonValue> = serde_json::from_str(body).ok();
    parsed
        .as_ref()
        .and_then(|v| v.get("detail"))
        .and_then(|detail| {
            detail
                .get("message")
                .and_then(JsonValue::as_str)
                .or_else(|| detail.as_str())
        })
        .map(str::to_string)
        .unwrap_or_else(|| "Speech generation failed".to_string())
}

/// Accepts raw base64 or a data URL; returns the mime type (if known) and bytes.
fn decode_audio(audio: &str) -> Result<(Option<String>, Vec<u8>), LlmError> {
    let (mime, payload) = match parse_data_url(audio) {
        Some((mime, payload)) => (Some(mime.to_string()), payload),
        None => (None, audio.trim()),
    };
    let bytes = BASE64.decode(payload).map_err(|e|
        LlmError::Malformed(format!("audio is not valid base64: {}", e))
    )?;
    if bytes.is_empty() {
        return Err(LlmError::Malformed("audio payload is empty".to_string()));
    }
    Ok((mime, bytes))
}

fn file_extension(mime: &str) -> &'static str {
    match mime.split(';').next().unwrap_or_default() {
        "audio/mpeg" | "audio/mp3" => "mp3",
        "audio/wav" | "audio/x-wav" => "wav",
        "audio/ogg" => "ogg",
        "audio/mp4" | "audio/m4a" => "m4a",
        _ => "webm",
    }
}

pub struct SpeechClient {
    http: HttpClient,
    config: SpeechConfig,
}

impl SpeechClient {
    pub fn new(config: SpeechConfig) -> Result<Self, LlmError> {
        let http = HttpClient::builder().build()?;
        Ok(Self { http, config })
    }

    pub fn tts_enabled(&self) -> bool {
        self.config.elevenlabs_api_key.is_some()
    }

    /// Converts text to speech and returns the audio as base64.
    pub async fn synthesize(&self, text: &str) -> Result<String, LlmError> {
        let api_key = self.config.elevenlabs_api_key
            .as_deref()
            .ok_or_else(|| LlmError::MissingCredential("ELEVENLABS_API_KEY".to_string()))?;

        let url = format!(
            "{}/v1/text-to-speech/{}",
            self.config.elevenlabs_base_url.trim_end_matches('/'),
            self.config.voice_id
        );
        let body = TtsRequest {
            text,
            model_id: &self.config.tts_model,
            voice_settings: VoiceSettings {
                stability: VOICE_STABILITY,
                similarity_boost: VOICE_SIMILARITY_BOOST,
            },
        };

        let resp = self.http.post(&url).header("xi-api-key", api_key).json(&body).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let raw = resp.text().await.unwrap_or_default();
            let detail = elevenlabs_error_detail(&raw);
            error!("ElevenLabs error ({}): {}", status, truncate_for_log(&raw, 300));
            return Err(LlmError::Status { status: status.as_u16(), body: detail });
        }

        let audio = resp.bytes().await?;
        info!("ElevenLabs synthesized {} bytes of audio", audio.len());
        Ok(BASE64.encode(&audio))
    }

    /// Transcribes base64 (or data URL) audio with the OpenAI transcription endpoint.
    pub async fn transcribe(&self, audio: &str) -> Result<String, LlmError> {
        let api_key = self.config.openai_api_key
            .as_deref()
            .ok_or_else(|| LlmError::MissingCredential("OPENAI_API_KEY".to_string()))?;

        let (mime, bytes) = decode_audio(audio)?;
        let mime = mime.unwrap_or_else(|| "audio/webm".to_string());
        let file_name = format!("audio.{}", file_extension(&mime));
        let part = multipart::Part::bytes(bytes).file_name(file_name).mime_str(&mime)?;
        let form = multipart::Form::new()
            .text("model", self.config.transcription_model.clone())
            .part("file", part);

        let url = format!(
            "{}/v1/audio/transcriptions",
            self.config.openai_base_url.trim_end_matches('/')
        );
        let resp = self.http.post(&url).bearer_auth(api_key).multipart(form).send().await?;
        let resp = super::chat::check_status(resp).await?;
        let parsed = resp.json::<TranscriptionResponse>().await?;
        info!("Transcribed {} characters of speech", parsed.text.chars().count());
        Ok(parsed.text)
    }
}
