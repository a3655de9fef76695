//! Live LLM tests. Run with `--features api` and API keys in the environment.

use std::sync::Arc;

use strictly_chess::{
    AiTurnOutcome, ChessConfig, ChessSession, Coach, Color, LlmClient, LlmConfig, LlmProvider,
    LlmSuggester, MoveSuggestionProvider, PlayMode, START_FEN, ShakmatyRules, parse_suggestion,
};
use tokio::sync::mpsc;
use tracing::instrument;

fn client_for(provider: LlmProvider, model: &str) -> LlmClient {
    dotenvy::dotenv().ok();
    let var = provider.api_key_var();
    let api_key = std::env::var(var).unwrap_or_else(|_| panic!("{var} not set"));
    LlmClient::new(LlmConfig::new(provider, api_key, model.to_string(), 50))
}

#[tokio::test]
#[cfg_attr(not(feature = "api"), ignore)]
#[instrument]
async fn test_anthropic_connectivity() {
    let client = client_for(LlmProvider::Anthropic, "claude-3-5-haiku-20241022");
    let response = client
        .generate("You are a helpful assistant.", "Say 'Hello, world!' and nothing else.")
        .await
        .expect("Failed to generate");

    assert!(!response.is_empty(), "Response should not be empty");
    eprintln!("Response: {}", response);
}

#[tokio::test]
#[cfg_attr(not(feature = "api"), ignore)]
#[instrument]
async fn test_openai_connectivity() {
    let client = client_for(LlmProvider::OpenAI, "gpt-4o-mini");
    let response = client
        .generate("You are a helpful assistant.", "Say 'Hello, world!' and nothing else.")
        .await
        .expect("Failed to generate");

    assert!(!response.is_empty(), "Response should not be empty");
    eprintln!("Response: {}", response);
}

#[tokio::test]
#[cfg_attr(not(feature = "api"), ignore)]
#[instrument]
async fn test_gemini_suggests_opening_move() {
    let suggester = LlmSuggester::new("gemini", client_for(LlmProvider::Gemini, "gemini-2.0-flash"));
    let answer = suggester
        .suggest_move(START_FEN)
        .await
        .expect("Failed to suggest");

    eprintln!("Suggestion: {}", answer);
    assert!(parse_suggestion(&answer).is_some(), "Answer should contain SAN");
}

#[tokio::test]
#[cfg_attr(not(feature = "api"), ignore)]
#[instrument]
async fn test_ai_opens_the_game() {
    dotenvy::dotenv().ok();
    let config = ChessConfig::default()
        .with_mode(PlayMode::Pvai)
        .with_ai_color(Color::White);
    let client = LlmClient::new(config.create_llm_config().expect("LLM config"));

    let (tx, _rx) = mpsc::unbounded_channel();
    let session = ChessSession::new(ShakmatyRules::new(), config.session_options(), tx)
        .expect("session")
        .with_suggester(Arc::new(LlmSuggester::new(config.model(), client.clone())));

    let outcome = session.request_ai_move().expect("AI to move").await.expect("task");
    eprintln!("Outcome: {:?}", outcome);
    // A model may still answer with nonsense; the session must stay usable either way.
    match outcome {
        AiTurnOutcome::Applied(state) => assert_eq!(state.move_history().len(), 1),
        AiTurnOutcome::Failed(_) => assert!(session.snapshot().move_history().is_empty()),
        AiTurnOutcome::Discarded(e) => panic!("nothing reset the game: {e}"),
    }
    assert!(!session.is_ai_thinking());

    let explanation = Coach::new(client)
        .explain_position(&session.position_encoding(), "centre control")
        .await;
    assert!(!explanation.is_empty());
}
