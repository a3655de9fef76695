//! Position explanations and teaching tips from an LLM.
//!
//! Coaching never fails the caller: an unavailable model yields a fixed
//! apology instead of an error.

use tracing::{instrument, warn};

use crate::llm_client::LlmClient;

const SYSTEM_PROMPT: &str = "You are a patient chess coach.";

/// Shown when an explanation cannot be produced.
pub const EXPLANATION_FALLBACK: &str =
    "Unable to get analysis at this time. Please try again later.";

/// Shown when a teaching tip cannot be produced.
pub const TIP_FALLBACK: &str = "Unable to generate teaching tip for this move.";

/// LLM-backed chess coach.
#[derive(Debug, Clone)]
pub struct Coach {
    client: LlmClient,
}

impl Coach {
    /// Creates a coach backed by `client`.
    pub fn new(client: LlmClient) -> Self {
        Self { client }
    }

    /// Explains the position `fen` with attention to `focus`.
    #[instrument(skip(self))]
    pub async fn explain_position(&self, fen: &str, focus: &str) -> String {
        let prompt = format!(
            "Explain the current chess position (FEN: {fen}) in simple terms.\n\
             Focus on: {focus}.\n\
             Give strategic advice for the next move.\n\
             Keep it under 3 sentences.\n\
             Format: \"Explanation: [your analysis]\""
        );
        match self.client.generate(SYSTEM_PROMPT, &prompt).await {
            Ok(answer) => strip_explanation_label(&answer),
            Err(e) => {
                warn!(error = %e, "Explanation unavailable");
                EXPLANATION_FALLBACK.to_string()
            }
        }
    }

    /// Explains the move `san` played in the position `fen`.
    #[instrument(skip(self))]
    pub async fn teaching_tip(&self, fen: &str, san: &str) -> String {
        let prompt = format!(
            "Explain this chess move ({san}) in the context of this position: {fen}.\n\
             Include:\n\
             - Basic mechanics of the move\n\
             - Strategic purpose\n\
             - Potential follow-up moves\n\
             - Common mistakes to avoid\n\
             Keep it under 4 sentences."
        );
        match self.client.generate(SYSTEM_PROMPT, &prompt).await {
            Ok(answer) => answer.trim().to_string(),
            Err(e) => {
                warn!(error = %e, "Teaching tip unavailable");
                TIP_FALLBACK.to_string()
            }
        }
    }
}

/// Removes a leading `Explanation:` label, ignoring case.
fn strip_explanation_label(answer: &str) -> String {
    const LABEL: &str = "explanation:";
    let trimmed = answer.trim();
    let rest = match trimmed.get(..LABEL.len()) {
        Some(head) if head.eq_ignore_ascii_case(LABEL) => &trimmed[LABEL.len()..],
        _ => trimmed,
    };
    rest.trim().to_string()
}
