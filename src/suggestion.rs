//! Move suggestion providers and reading their untrusted answers.

use async_trait::async_trait;
use derive_more::{Display, Error};
use tracing::{debug, instrument, warn};

use crate::llm_client::{LlmClient, LlmError};

/// An oracle that proposes a move for the side to move.
///
/// Answers may be slow, wrong, or not chess at all; the session validates
/// everything that comes back.
#[async_trait]
pub trait MoveSuggestionProvider: Send + Sync {
    /// Proposes a move for the FEN `position`, as free text containing SAN.
    async fn suggest_move(&self, position: &str) -> Result<String, SuggestionError>;

    /// Display name for logs and notifications.
    fn name(&self) -> &str;
}

/// Suggestion provider failure.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
#[display("Suggestion error: {} at {}:{}", message, file, line)]
pub struct SuggestionError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl SuggestionError {
    /// Creates a new suggestion error with caller location tracking.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        let message = message.into();
        warn!(error_message = %message, "Suggestion error created");
        Self {
            message,
            line: loc.line(),
            file: loc.file(),
        }
    }
}

impl From<LlmError> for SuggestionError {
    #[track_caller]
    fn from(err: LlmError) -> Self {
        Self::new(err.message)
    }
}

/// Extracts a SAN token from a suggestion.
///
/// Accepts a bare move (`"Nf3"`) or a labelled one (`"Move: e5"`,
/// `"Best move: Nf3"`), drops annotation marks (`. ! ? + #`), and rejects
/// tokens containing anything SAN never uses.
#[instrument(level = "debug")]
pub fn parse_suggestion(text: &str) -> Option<String> {
    let text = text.trim();
    let candidate = labelled_move(text).or_else(|| {
        let mut words = text.split_whitespace();
        match (words.next(), words.next()) {
            (Some(only), None) => Some(only),
            _ => None,
        }
    })?;

    let san: String = candidate
        .chars()
        .filter(|c| !matches!(c, '.' | '!' | '?' | '+' | '#' | '"' | '\'' | '`' | '*'))
        .collect();

    let plausible = !san.is_empty()
        && san.len() <= 8
        && san
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '=' || c == '-');
    if plausible {
        debug!(san = %san, "Extracted move from suggestion");
        Some(san)
    } else {
        debug!(candidate, "Suggestion does not look like SAN");
        None
    }
}

/// Token after a `move` label, with an optional colon.
fn labelled_move(text: &str) -> Option<&str> {
    let lower = text.to_ascii_lowercase();
    lower.match_indices("move").find_map(|(idx, label)| {
        let rest = &text[idx + label.len()..];
        let rest = match rest.strip_prefix(':') {
            Some(after_colon) => after_colon,
            None if rest.starts_with(char::is_whitespace) => rest,
            None => return None,
        };
        rest.split_whitespace().next()
    })
}

/// Suggestion provider that asks an LLM to play as a grandmaster.
#[derive(Debug, Clone)]
pub struct LlmSuggester {
    name: String,
    client: LlmClient,
}

const SYSTEM_PROMPT: &str = "You are a chess grandmaster. You answer with a single legal move in \
Standard Algebraic Notation and nothing else.";

impl LlmSuggester {
    /// Creates a suggester named `name` backed by `client`.
    pub fn new(name: impl Into<String>, client: LlmClient) -> Self {
        Self {
            name: name.into(),
            client,
        }
    }

    /// Prompt for the position `fen`.
    pub fn prompt(fen: &str) -> String {
        let side = match fen.split_whitespace().nth(1) {
            Some("b") => "black",
            _ => "white",
        };
        format!(
            "Respond ONLY with the best next move in Standard Algebraic Notation (SAN) for this \
             position: {fen}.\nCurrent turn: {side}.\nFormat your response like this: \
             \"Move: e5\" or \"Best move: Nf3\"."
        )
    }
}

#[async_trait]
impl MoveSuggestionProvider for LlmSuggester {
    #[instrument(skip(self), fields(suggester = %self.name))]
    async fn suggest_move(&self, position: &str) -> Result<String, SuggestionError> {
        let answer = self
            .client
            .generate(SYSTEM_PROMPT, &Self::prompt(position))
            .await?;
        debug!(answer = %answer, "LLM answered");
        Ok(answer.trim().to_string())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
