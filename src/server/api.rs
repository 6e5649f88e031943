use crate::agent::Companion;
use crate::llm::LlmError;
use crate::models::api::{
    ErrorResponse,
    PersonalityIdeaRequest,
    QuizRequest,
    ReplyRequest,
    StoryRequest,
    TextResponse,
    TranscribeRequest,
    TranscribeResponse,
    TtsRequest,
    TtsResponse,
};
use crate::models::chat::{ PersonalityProfile, StandardizedReply };

use axum::{
    extract::{ Request, State },
    http::{ HeaderMap, StatusCode },
    middleware::{ self, Next },
    response::{ IntoResponse, Response },
    routing::{ get, post },
    Json,
    Router,
};
use governor::{ clock::DefaultClock, state::{ InMemoryState, NotKeyed }, Quota, RateLimiter };
use log::{ error, info, warn };
use serde::Serialize;
use std::num::NonZeroU32;
use std::sync::Arc;
use tower_http::cors::{ Any, CorsLayer };

pub type RequestLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

const DEFAULT_REQUESTS_PER_SECOND: NonZeroU32 = match NonZeroU32::new(10) {
    Some(n) => n,
    None => unreachable!(),
};

pub const MISSING_ELEVENLABS_KEY: &str = "Missing ElevenLabs API Key in .env.local";
pub const MISSING_OPENAI_KEY: &str = "Missing OpenAI API Key in .env.local";

#[derive(Serialize)]
struct ReloadResponse {
    success: bool,
    message: String,
    details: Option<Vec<String>>,
}

#[derive(Clone)]
pub struct AppState {
    companion: Arc<Companion>,
    api_key: Option<String>,
    limiter: Arc<RequestLimiter>,
}

impl AppState {
    pub fn new(companion: Arc<Companion>, api_key: Option<String>, requests_per_second: u32) -> Self {
        let per_second = NonZeroU32::new(requests_per_second).unwrap_or_else(|| {
            warn!("RATE_LIMIT_PER_SECOND must be positive; using {}", DEFAULT_REQUESTS_PER_SECOND);
            DEFAULT_REQUESTS_PER_SECOND
        });
        Self {
            companion,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            limiter: Arc::new(RateLimiter::direct(Quota::per_second(per_second))),
        }
    }
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    let api = Router::new()
        .route("/api/reply", post(reply_handler))
        .route("/api/quiz", post(quiz_handler))
        .route("/api/story", post(story_handler))
        .route("/api/personality-idea", post(personality_idea_handler))
        .route("/api/tts", post(tts_handler))
        .route("/api/transcribe", post(transcribe_handler))
        .route("/api/personalities", get(personalities_handler))
        .route("/api/reload-prompts", get(reload_prompts_handler))
        .layer(middleware::from_fn_with_state(state.clone(), require_api_key));

    Router::new()
        .route("/health", get(health_handler))
        .merge(api)
        .layer(middleware::from_fn_with_state(state.clone(), rate_limit))
        .layer(cors)
        .with_state(state)
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(ErrorResponse { error: message.to_string() })).into_response()
}

fn provided_api_key(headers: &HeaderMap, query: Option<&str>) -> Option<String> {
    if let Some(value) = headers.get("x-api-key").and_then(|v| v.to_str().ok()) {
        return Some(value.to_string());
    }
    query.and_then(|q| {
        url::form_urlencoded::parse(q.as_bytes())
            .find(|(k, _)| k == "api_key")
            .map(|(_, v)| v.into_owned())
    })
}

async fn require_api_key(State(state): State<AppState>, req: Request, next: Next) -> Response {
    if let Some(expected) = &state.api_key {
        let provided = provided_api_key(req.headers(), req.uri().query());
        if provided.as_deref() != Some(expected.as_str()) {
            warn!("Rejected {} {}: invalid or missing API key", req.method(), req.uri().path());
            return error_response(StatusCode::UNAUTHORIZED, "Invalid or missing API key");
        }
    }
    next.run(req).await
}

async fn rate_limit(State(state): State<AppState>, req: Request, next: Next) -> Response {
    if state.limiter.check().is_err() {
        warn!("Global rate limit exceeded for {}. Rejecting request.", req.uri().path());
        return error_response(StatusCode::TOO_MANY_REQUESTS, "Too many requests");
    }
    next.run(req).await
}

async fn health_handler() -> &'static str {
    "ok"
}

async fn reply_handler(
    State(state): State<AppState>,
    Json(req): Json<ReplyRequest>
) -> Json<StandardizedReply> {
    let personality = req.personality.unwrap_or_default();
    let reply = state.companion.reply(
        &req.message,
        &req.history,
        &personality,
        req.image.as_deref()
    ).await;
    Json(reply)
}

async fn quiz_handler(State(state): State<AppState>, Json(req): Json<QuizRequest>) -> Json<TextResponse> {
    Json(TextResponse { content: state.companion.quiz(&req.topic).await })
}

async fn story_handler(State(state): State<AppState>, Json(req): Json<StoryRequest>) -> Json<TextResponse> {
    let content = state.companion.story(&req.previous_segment, &req.choice, req.theme.as_ref()).await;
    Json(TextResponse { content })
}

async fn personality_idea_handler(
    State(state): State<AppState>,
    Json(req): Json<PersonalityIdeaRequest>
) -> Json<TextResponse> {
    Json(TextResponse { content: state.companion.personality_idea(&req.idea).await })
}

async fn tts_handler(State(state): State<AppState>, Json(req): Json<TtsRequest>) -> Json<TtsResponse> {
    let response = match state.companion.speech().synthesize(&req.text).await {
        Ok(audio) => TtsResponse { audio_content: Some(audio), error: None },
        Err(e) => {
            error!("ElevenLabs TTS Error: {}", e);
            let message = match e {
                LlmError::MissingCredential(_) => MISSING_ELEVENLABS_KEY.to_string(),
                LlmError::Status { body, .. } => body,
                other => other.to_string(),
            };
            TtsResponse { audio_content: None, error: Some(message) }
        }
    };
    Json(response)
}

async fn transcribe_handler(
    State(state): State<AppState>,
    Json(req): Json<TranscribeRequest>
) -> Json<TranscribeResponse> {
    let response = match state.companion.speech().transcribe(&req.audio).await {
        Ok(text) => TranscribeResponse { text: Some(text), error: None },
        Err(e) => {
            error!("Transcription error: {}", e);
            let message = match e {
                LlmError::MissingCredential(_) => MISSING_OPENAI_KEY.to_string(),
                other => other.to_string(),
            };
            TranscribeResponse { text: None, error: Some(message) }
        }
    };
    Json(response)
}

async fn personalities_handler() -> Json<Vec<PersonalityProfile>> {
    Json(PersonalityProfile::presets())
}

async fn reload_prompts_handler(State(state): State<AppState>) -> impl IntoResponse {
    let (code, ok, detail) = match state.companion.reload_prompts_if_changed().await {
        Ok(true) => (StatusCode::OK, true, "Prompts reloaded".to_string()),
        Ok(false) => (StatusCode::OK, true, "Prompts unchanged".to_string()),
        Err(e) => (StatusCode::BAD_REQUEST, false, format!("Prompts error: {}", e)),
    };
    info!("Prompt reload requested: {}", detail);

    (
        code,
        Json(ReloadResponse {
            success: ok,
            message: if ok { "Reload complete".into() } else { "Reload errors".into() },
            details: Some(vec![detail]),
        }),
    )
}
