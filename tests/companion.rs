use std::sync::Arc;

use ai_bud::agent::Companion;
use ai_bud::config::prompt::{ load_prompts_from_str, share, PromptConfig };
use ai_bud::generator::TextTarget;
use ai_bud::llm::chat::mock::MockChatClient;
use ai_bud::llm::speech::{ SpeechClient, SpeechConfig };
use ai_bud::llm::LlmType;
use ai_bud::models::chat::{ ConversationMessage, Mood, PersonalityProfile };
use ai_bud::orchestrator::image::{ ImageUrlBuilder, DEFAULT_IMAGE_ENDPOINT };
use ai_bud::orchestrator::ProviderRoute;
use serde_json::Value as JsonValue;

fn companion(
    openai: &Arc<MockChatClient>,
    gemini: &Arc<MockChatClient>,
    prompts: PromptConfig
) -> Companion {
    let images = ImageUrlBuilder::new(DEFAULT_IMAGE_ENDPOINT).unwrap();
    Companion::from_parts(
        vec![
            ProviderRoute::new(openai.clone(), images.clone()),
            ProviderRoute::new(gemini.clone(), images)
        ],
        vec![TextTarget::new(openai.clone(), "gpt-4o-mini"), TextTarget::new(gemini.clone(), "gemini-2.0-flash")],
        SpeechClient::new(SpeechConfig::default()).unwrap(),
        share(Arc::new(prompts)),
        None
    )
}

#[tokio::test]
async fn a_conversation_survives_a_primary_outage() {
    let openai = Arc::new(
        MockChatClient::new(
            LlmType::OpenAI,
            vec![
                Ok(r#"{"text":"Let's count stars! ✨","mood":"happy","draw":null}"#.into()),
                Err("upstream timeout".into())
            ]
        )
    );
    let gemini = Arc::new(
        MockChatClient::replying(
            LlmType::Gemini,
            "Here is a rocket for you! 🚀 {DRAW: a shiny red rocket} {MOOD: surprised}"
        )
    );
    let companion = companion(&openai, &gemini, PromptConfig::default());
    let tutor = PersonalityProfile::tutor();

    let first = companion.reply("teach me about stars", &[], &tutor, None).await;
    assert_eq!(first.text, "Let's count stars! ✨");
    assert_eq!(first.mood, Some(Mood::Happy));

    let history = vec![
        ConversationMessage::user("teach me about stars"),
        ConversationMessage::assistant(first.text.clone())
    ];
    let second = companion.reply("draw me a rocket", &history, &tutor, None).await;
    assert_eq!(second.text, "Here is a rocket for you! 🚀");
    assert_eq!(second.mood, Some(Mood::Surprised));
    assert!(second.image_url.unwrap().contains("a_shiny_red_rocket"));
    assert!(!second.text.contains("timeout"));

    let gemini_request = &gemini.requests()[0];
    assert_eq!(gemini_request.messages.len(), 3);
    assert!(gemini_request.system.as_deref().unwrap().contains("patient and helpful tutor"));
}

#[tokio::test]
async fn custom_prompts_flow_into_every_generator() {
    let prompts = load_prompts_from_str(
        r#"{ "quiz": "QUIZ ABOUT {topic}", "personality_idea": "INVENT {idea}" }"#
    ).unwrap();
    let openai = Arc::new(
        MockChatClient::new(
            LlmType::OpenAI,
            vec![
                Ok("```json\n{\"questions\":[]}\n```".into()),
                Ok("{\"name\":\"Captain Bolt\",\"description\":\"Robot pirate\",\"systemPrompt\":\"Arr\"}".into())
            ]
        )
    );
    let gemini = Arc::new(MockChatClient::new(LlmType::Gemini, vec![]));
    let companion = companion(&openai, &gemini, prompts);

    assert_eq!(companion.quiz("dinosaurs").await, "{\"questions\":[]}");
    let idea: JsonValue = serde_json::from_str(&companion.personality_idea("robot pirate").await).unwrap();
    assert_eq!(idea["name"], "Captain Bolt");

    let sent: Vec<String> = openai
        .requests()
        .into_iter()
        .map(|r| r.messages[0].text.clone())
        .collect();
    assert_eq!(sent, vec!["QUIZ ABOUT dinosaurs".to_string(), "INVENT robot pirate".to_string()]);
    assert_eq!(gemini.call_count(), 0);
}

#[tokio::test]
async fn story_falls_back_to_the_second_text_target() {
    let openai = Arc::new(MockChatClient::failing(LlmType::OpenAI, "quota"));
    let gemini = Arc::new(
        MockChatClient::replying(
            LlmType::Gemini,
            "{\"storyText\":\"A unicorn found a door.\",\"choices\":[\"Open it\",\"Knock\"]}"
        )
    );
    let companion = companion(&openai, &gemini, PromptConfig::default());

    let story: JsonValue = serde_json::from_str(&companion.story("", "", None).await).unwrap();
    assert_eq!(story["storyText"], "A unicorn found a door.");
    let prompt = &gemini.requests()[0].messages[0].text;
    assert!(prompt.contains("Start a new fantasy story about a magical playground."));
}
