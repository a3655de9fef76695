//! Session and LLM configuration loaded from TOML.

use std::path::Path;
use std::time::Duration;

use derive_getters::Getters;
use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use strictly_chess_rules::Color;
use tracing::{debug, info, instrument, warn};

use crate::llm_client::{LlmConfig, LlmProvider};
use crate::session::{GameMode, SessionOptions};

/// Who sits at the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayMode {
    /// Two humans.
    #[default]
    Pvp,
    /// A human against the LLM.
    Pvai,
}

/// Configuration for a chess session.
///
/// Every field has a default, so an empty file is a valid configuration.
#[derive(Debug, Clone, Getters, Serialize, Deserialize)]
pub struct ChessConfig {
    /// Who plays.
    #[serde(default)]
    mode: PlayMode,

    /// Side the AI plays in `pvai` mode.
    #[serde(default = "default_ai_color")]
    ai_color: Color,

    /// LLM provider (openai, anthropic, or gemini).
    #[serde(default = "default_provider")]
    llm_provider: LlmProvider,

    /// LLM model name; the provider's default when absent.
    #[serde(default)]
    llm_model: Option<String>,

    /// Maximum tokens for LLM responses.
    #[serde(default = "default_max_tokens")]
    llm_max_tokens: u32,

    /// Seconds to wait for a move suggestion.
    #[serde(default = "default_suggestion_timeout_secs")]
    suggestion_timeout_secs: u64,

    /// Suggestions requested per AI turn before giving up.
    #[serde(default = "default_max_suggestion_attempts")]
    max_suggestion_attempts: u32,
}

fn default_ai_color() -> Color {
    Color::Black
}

fn default_provider() -> LlmProvider {
    LlmProvider::Gemini
}

fn default_max_tokens() -> u32 {
    150
}

fn default_suggestion_timeout_secs() -> u64 {
    30
}

fn default_max_suggestion_attempts() -> u32 {
    1
}

/// Model used when the configuration names none.
pub fn default_model(provider: LlmProvider) -> &'static str {
    match provider {
        LlmProvider::OpenAI => "gpt-4o-mini",
        LlmProvider::Anthropic => "claude-3-5-haiku-latest",
        LlmProvider::Gemini => "gemini-2.0-flash",
    }
}

impl Default for ChessConfig {
    fn default() -> Self {
        Self {
            mode: PlayMode::default(),
            ai_color: default_ai_color(),
            llm_provider: default_provider(),
            llm_model: None,
            llm_max_tokens: default_max_tokens(),
            suggestion_timeout_secs: default_suggestion_timeout_secs(),
            max_suggestion_attempts: default_max_suggestion_attempts(),
        }
    }
}

impl ChessConfig {
    /// Loads configuration from a TOML file.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        debug!("Loading config from file");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read config file: {}", e)))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| ConfigError::new(format!("Failed to parse config: {}", e)))?;

        info!(mode = ?config.mode, provider = ?config.llm_provider, "Config loaded successfully");
        Ok(config)
    }

    /// Overrides the play mode.
    pub fn with_mode(mut self, mode: PlayMode) -> Self {
        self.mode = mode;
        self
    }

    /// Hands the AI's side back to a human. Used when no LLM can be
    /// reached, since the AI would otherwise hold its side forever.
    pub fn without_ai(self) -> Self {
        if self.mode == PlayMode::Pvai {
            warn!(ai_color = %self.ai_color, "No AI available; playing pvp");
        }
        self.with_mode(PlayMode::Pvp)
    }

    /// Overrides the AI's side.
    pub fn with_ai_color(mut self, color: Color) -> Self {
        self.ai_color = color;
        self
    }

    /// Game mode described by this configuration.
    pub fn game_mode(&self) -> GameMode {
        match self.mode {
            PlayMode::Pvp => GameMode::PlayerVsPlayer,
            PlayMode::Pvai => GameMode::PlayerVsAi {
                ai_color: self.ai_color,
            },
        }
    }

    /// Session options described by this configuration.
    pub fn session_options(&self) -> SessionOptions {
        SessionOptions::default()
            .with_mode(self.game_mode())
            .with_suggestion_timeout(Duration::from_secs(self.suggestion_timeout_secs))
            .with_max_suggestion_attempts(self.max_suggestion_attempts)
    }

    /// Model that will be requested.
    pub fn model(&self) -> &str {
        self.llm_model
            .as_deref()
            .unwrap_or_else(|| default_model(self.llm_provider))
    }

    /// Creates LLM configuration, reading the provider's API key from the
    /// environment.
    #[instrument(skip(self), fields(provider = ?self.llm_provider, model = %self.model()))]
    pub fn create_llm_config(&self) -> Result<LlmConfig, ConfigError> {
        debug!("Creating LLM config");
        let var = self.llm_provider.api_key_var();
        let api_key = std::env::var(var)
            .map_err(|_| ConfigError::new(format!("{} environment variable not set", var)))?;

        Ok(LlmConfig::new(
            self.llm_provider,
            api_key,
            self.model().to_string(),
            self.llm_max_tokens,
        ))
    }
}

/// Configuration error.
#[derive(Debug, Clone, Display, Error)]
#[display("Config error: {} at {}:{}", message, file, line)]
pub struct ConfigError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ConfigError {
    /// Creates a new configuration error.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: String) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message,
            line: loc.line(),
            file: loc.file(),
        }
    }
}
