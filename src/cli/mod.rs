use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    // --- JSON-contract provider (OpenAI) ---
    /// API key for OpenAI. Empty disables the provider.
    #[arg(long, env = "OPENAI_API_KEY", default_value = "", hide_env_values = true)]
    pub openai_api_key: String,

    /// Base URL for the OpenAI API
    #[arg(long, env = "OPENAI_BASE_URL")] // No default, the client falls back to api.openai.com
    pub openai_base_url: Option<String>,

    /// Chat model used for companion replies
    #[arg(long, env = "OPENAI_MODEL", default_value = "gpt-4o-mini")]
    pub openai_model: String,

    /// Comma separated models tried in order for quizzes, stories and personality ideas
    #[arg(long, env = "OPENAI_TEXT_MODELS", default_value = "gpt-4o-mini")]
    pub openai_text_models: String,

    // --- Directive provider (Gemini) ---
    /// API key for Google Gemini. Empty disables the provider.
    #[arg(long, env = "GEMINI_API_KEY", default_value = "", hide_env_values = true)]
    pub gemini_api_key: String,

    /// Base URL for the Gemini API
    #[arg(long, env = "GEMINI_BASE_URL")]
    pub gemini_base_url: Option<String>,

    /// Chat model used for companion replies
    #[arg(long, env = "GEMINI_MODEL", default_value = "gemini-2.0-flash")]
    pub gemini_model: String,

    /// Comma separated models tried in order for text generation
    #[arg(long, env = "GEMINI_TEXT_MODELS", default_value = "gemini-2.0-flash,gemini-1.5-flash")]
    pub gemini_text_models: String,

    /// Provider asked first when both are configured (openai, gemini)
    #[arg(long, env = "PRIMARY_PROVIDER", default_value = "openai")]
    pub primary_provider: String,

    // --- Speech ---
    /// API key for ElevenLabs text-to-speech. Empty disables TTS.
    #[arg(long, env = "ELEVENLABS_API_KEY", default_value = "", hide_env_values = true)]
    pub elevenlabs_api_key: String,

    /// ElevenLabs voice id
    #[arg(long, env = "ELEVENLABS_VOICE_ID", default_value = "EXAVITQu4vr4xnSDxMaL")]
    pub elevenlabs_voice_id: String,

    /// ElevenLabs synthesis model
    #[arg(long, env = "ELEVENLABS_MODEL", default_value = "eleven_turbo_v2_5")]
    pub elevenlabs_model: String,

    // --- Images ---
    /// Endpoint the drawing description is appended to
    #[arg(long, env = "IMAGE_ENDPOINT", default_value = "https://image.pollinations.ai/prompt/")]
    pub image_endpoint: String,

    // --- General App Args ---
    /// Optional JSON file overriding prompt templates; built-in prompts are used when unset.
    #[arg(long, env = "PROMPTS_PATH")]
    pub prompts_path: Option<String>,

    /// Host address and port for the server to listen on.
    #[arg(long, env = "SERVER_ADDR", default_value = "127.0.0.1:4000")]
    pub server_addr: String,

    /// Optional API Key required on every /api request (X-API-Key header or api_key query).
    #[arg(long, env = "SERVER_API_KEY", hide_env_values = true)]
    pub server_api_key: Option<String>,

    /// Requests per second accepted across all clients.
    #[arg(long, env = "RATE_LIMIT_PER_SECOND", default_value = "10")]
    pub rate_limit_per_second: u32,

    /// Optional path to the TLS certificate file (PEM format). Requires --tls-key-path.
    #[arg(long, env = "TLS_CERT_PATH")]
    pub tls_cert_path: Option<String>,

    /// Optional path to the TLS private key file (PEM format). Requires --tls-cert-path.
    #[arg(long, env = "TLS_KEY_PATH")]
    pub tls_key_path: Option<String>,

    #[arg(long, env = "ENABLE_TLS", default_value = "false")]
    pub enable_tls: bool,
}
