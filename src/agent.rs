use crate::cli::Args;
use crate::config::prompt::{ self, PromptConfig, SharedPrompts };
use crate::generator::{ TextGenerator, TextTarget };
use crate::llm::chat::new_client as new_chat_client;
use crate::llm::speech::{ SpeechClient, SpeechConfig };
use crate::llm::{ normalize_api_key, parse_model_list, LlmConfig, LlmType };
use crate::models::api::StoryTheme;
use crate::models::chat::{ ConversationMessage, PersonalityProfile, StandardizedReply };
use crate::orchestrator::image::ImageUrlBuilder;
use crate::orchestrator::{ Orchestrator, ProviderRoute };

use log::{ info, warn };
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

/// Provider configurations with credentials, primary first.
pub fn provider_configs(args: &Args) -> Result<Vec<LlmConfig>, Box<dyn Error + Send + Sync>> {
    let primary: LlmType = args.primary_provider.parse()?;

    let mut openai = LlmConfig::new(LlmType::OpenAI, &args.openai_api_key);
    openai.base_url = args.openai_base_url.clone();
    openai.completion_model = Some(args.openai_model.clone());
    openai.text_models = parse_model_list(&args.openai_text_models);

    let mut gemini = LlmConfig::new(LlmType::Gemini, &args.gemini_api_key);
    gemini.base_url = args.gemini_base_url.clone();
    gemini.completion_model = Some(args.gemini_model.clone());
    gemini.text_models = parse_model_list(&args.gemini_text_models);

    let mut configs = vec![openai, gemini];
    configs.sort_by_key(|c| c.llm_type != primary);

    for config in configs.iter().filter(|c| !c.is_configured()) {
        warn!("{} not set; {} disabled", config.llm_type.credential_key(), config.llm_type);
    }
    Ok(configs.into_iter().filter(LlmConfig::is_configured).collect())
}

/// The companion behind every endpoint: chat replies, text generators, speech.
pub struct Companion {
    orchestrator: Orchestrator,
    generator: TextGenerator,
    speech: SpeechClient,
    prompts: SharedPrompts,
    prompts_path: Option<PathBuf>,
}

impl Companion {
    fn initialize_llm_clients(
        args: &Args,
        images: &ImageUrlBuilder
    ) -> Result<(Vec<ProviderRoute>, Vec<TextTarget>), Box<dyn Error + Send + Sync>> {
        let mut routes = Vec::new();
        let mut targets = Vec::new();

        for config in provider_configs(args)? {
            let client = new_chat_client(&config)?;
            info!(
                "Chat client configured: Type={}, Model={}, BaseURL={}",
                config.llm_type,
                client.get_model(),
                client.get_base_url().as_deref().unwrap_or("adapter default")
            );
            for model in &config.text_models {
                targets.push(TextTarget::new(Arc::clone(&client), model.clone()));
            }
            routes.push(ProviderRoute::new(client, images.clone()));
        }

        if routes.is_empty() {
            warn!("No chat provider configured; replies will ask for an API key");
        }
        Ok((routes, targets))
    }

    fn load_initial_prompts(path: Option<&PathBuf>) -> Result<Arc<PromptConfig>, Box<dyn Error + Send + Sync>> {
        match path {
            Some(path) => Ok(prompt::load_prompts(path)?),
            None => {
                info!("No prompts file configured; using built-in prompts");
                Ok(Arc::new(PromptConfig::default()))
            }
        }
    }

    pub fn new(args: &Args) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let prompts_path = args.prompts_path
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);
        let prompts = prompt::share(Self::load_initial_prompts(prompts_path.as_ref())?);
        let images = ImageUrlBuilder::new(&args.image_endpoint)?;

        let (routes, targets) = Self::initialize_llm_clients(args, &images)?;

        let speech = SpeechClient::new(SpeechConfig {
            elevenlabs_api_key: normalize_api_key(&args.elevenlabs_api_key),
            voice_id: args.elevenlabs_voice_id.clone(),
            tts_model: args.elevenlabs_model.clone(),
            openai_api_key: normalize_api_key(&args.openai_api_key),
            openai_base_url: args.openai_base_url
                .clone()
                .unwrap_or_else(|| SpeechConfig::default().openai_base_url),
            ..SpeechConfig::default()
        })?;
        if !speech.tts_enabled() {
            warn!("ELEVENLABS_API_KEY not set; text-to-speech disabled");
        }

        Ok(Self::from_parts(routes, targets, speech, prompts, prompts_path))
    }

    pub fn from_parts(
        routes: Vec<ProviderRoute>,
        targets: Vec<TextTarget>,
        speech: SpeechClient,
        prompts: SharedPrompts,
        prompts_path: Option<PathBuf>
    ) -> Self {
        Self {
            orchestrator: Orchestrator::new(routes, Arc::clone(&prompts)),
            generator: TextGenerator::new(targets, Arc::clone(&prompts)),
            speech,
            prompts,
            prompts_path,
        }
    }

    pub fn providers(&self) -> Vec<LlmType> {
        self.orchestrator.providers()
    }

    pub async fn reply(
        &self,
        message: &str,
        history: &[ConversationMessage],
        personality: &PersonalityProfile,
        attached_image: Option<&str>
    ) -> StandardizedReply {
        self.orchestrator.generate_reply(message, history, personality, attached_image).await
    }

    pub async fn quiz(&self, topic: &str) -> String {
        self.generator.generate_quiz(topic).await
    }

    pub async fn story(&self, previous_segment: &str, choice: &str, theme: Option<&StoryTheme>) -> String {
        self.generator.generate_story_segment(previous_segment, choice, theme).await
    }

    pub async fn personality_idea(&self, idea: &str) -> String {
        self.generator.generate_personality_idea(idea).await
    }

    pub fn speech(&self) -> &SpeechClient {
        &self.speech
    }

    /// Swaps in the prompts file if it changed since the last load.
    /// Requests already running keep the snapshot they started with.
    pub async fn reload_prompts_if_changed(&self) -> Result<bool, Box<dyn Error + Send + Sync>> {
        let Some(path) = &self.prompts_path else {
            return Ok(false);
        };

        let current = prompt::snapshot(&self.prompts).await;
        match prompt::reload_prompts_if_changed(path, &current)? {
            Some(new_config) => {
                *self.prompts.write().await = new_config;
                info!("Prompts successfully reloaded");
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
