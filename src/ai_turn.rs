//! The AI's turn: asking the suggestion provider, validating its answer, and
//! applying it through the ordinary move workflow.
//!
//! At most one request is outstanding per session. A reset aborts the task
//! running the request. The request also carries the session generation it
//! was issued under, so an answer that slips past the abort is dropped
//! without touching the game.

use std::sync::Arc;
use std::time::Duration;

use derive_more::Display;
use strictly_chess_rules::{Position, RulesError};
use tokio::runtime::Handle;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, info, instrument, warn};

use crate::error::MoveError;
use crate::session::{ChessSession, GameMode, Mover, SessionCore, SessionEvent};
use crate::state::GameState;
use crate::suggestion::{SuggestionError, parse_suggestion};

/// Where the AI turn stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display)]
pub enum AiPhase {
    /// No request outstanding.
    #[default]
    Idle,
    /// Waiting for the suggestion provider.
    Requesting,
    /// Validating and applying an answer.
    Applying,
    /// The turn produced no move; passes straight back to idle.
    Failed,
}

/// Single-flight guard for AI requests.
#[derive(Debug, Default)]
pub(crate) struct AiTurn {
    phase: AiPhase,
    task: Option<AbortHandle>,
}

impl AiTurn {
    /// Starts a turn. Returns false if one is already in flight.
    pub(crate) fn begin(&mut self) -> bool {
        if self.is_thinking() {
            debug!(phase = %self.phase, "AI turn already in flight");
            return false;
        }
        self.transition(AiPhase::Requesting);
        true
    }

    /// Remembers the task running the current turn.
    pub(crate) fn track(&mut self, task: AbortHandle) {
        self.task = Some(task);
    }

    pub(crate) fn applying(&mut self) {
        self.transition(AiPhase::Applying);
    }

    /// Goes back to waiting for another suggestion in the same turn.
    pub(crate) fn retry(&mut self) {
        self.transition(AiPhase::Requesting);
    }

    /// Records the failure and returns to idle.
    pub(crate) fn fail(&mut self) {
        self.task = None;
        self.transition(AiPhase::Failed);
        self.transition(AiPhase::Idle);
    }

    pub(crate) fn finish(&mut self) {
        self.task = None;
        self.transition(AiPhase::Idle);
    }

    /// Abandons any turn in flight, aborting its task.
    pub(crate) fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            debug!("Aborting AI task");
            task.abort();
        }
        if self.phase != AiPhase::Idle {
            self.transition(AiPhase::Idle);
        }
    }

    pub(crate) fn is_thinking(&self) -> bool {
        matches!(self.phase, AiPhase::Requesting | AiPhase::Applying)
    }

    pub(crate) fn phase(&self) -> AiPhase {
        self.phase
    }

    fn transition(&mut self, next: AiPhase) {
        debug!(from = %self.phase, to = %next, "AI phase transition");
        self.phase = next;
    }
}

/// Why an AI turn produced no move.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum AiTurnError {
    /// No provider is configured, or it failed.
    #[display("Move suggestion provider unavailable: {}", _0)]
    ProviderUnavailable(SuggestionError),

    /// The provider did not answer in time.
    #[display("No suggestion within {:?}", _0)]
    Timeout(Duration),

    /// The answer contained no recognisable move.
    #[display("Could not read a move from {:?}", _0)]
    Unparsable(String),

    /// The answer named a move that is not legal here.
    #[display("Suggested move {} is not legal: {}", notation, reason)]
    IllegalSuggestion {
        /// Move as extracted from the answer.
        notation: String,
        /// Why it was refused.
        reason: String,
    },

    /// The rules provider failed while applying the suggestion.
    #[display("Rules provider failed on the suggested move: {}", _0)]
    RulesUnavailable(RulesError),

    /// The game was reset while the request was outstanding.
    #[display("Suggestion for generation {} arrived in generation {}", issued, current)]
    StaleResponse {
        /// Generation the request was issued under.
        issued: u64,
        /// Generation when the answer arrived.
        current: u64,
    },
}

impl AiTurnError {
    /// True when asking again may help.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AiTurnError::Unparsable(_) | AiTurnError::IllegalSuggestion { .. }
        )
    }
}

impl std::error::Error for AiTurnError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AiTurnError::ProviderUnavailable(e) => Some(e),
            AiTurnError::RulesUnavailable(e) => Some(e),
            _ => None,
        }
    }
}

/// How an AI turn ended.
#[derive(Debug, Clone)]
pub enum AiTurnOutcome {
    /// The suggestion was applied.
    Applied(Arc<GameState>),
    /// No move was made; the human keeps playing.
    Failed(AiTurnError),
    /// The answer belonged to an earlier game and was ignored.
    Discarded(AiTurnError),
}

impl SessionCore {
    /// Turns a raw answer into a committed move, or says why it cannot.
    fn apply_suggestion(
        &mut self,
        answer: &str,
        mode: &GameMode,
    ) -> Result<(Arc<GameState>, String), AiTurnError> {
        let san = parse_suggestion(answer)
            .ok_or_else(|| AiTurnError::Unparsable(answer.to_string()))?;
        let illegal = |reason: String| AiTurnError::IllegalSuggestion {
            notation: san.clone(),
            reason,
        };

        let (from, to) = self
            .rules
            .resolve_notation(&san)
            .map_err(|e| illegal(e.message))?;
        let from = Position::from_algebraic(&from).map_err(|e| illegal(e.to_string()))?;
        let to = Position::from_algebraic(&to).map_err(|e| illegal(e.to_string()))?;

        self.apply_move(Mover::Ai, from, to, mode)
            .map_err(|e| match e {
                MoveError::ProviderUnavailable(e) => AiTurnError::RulesUnavailable(e),
                other => illegal(other.to_string()),
            })
    }
}

impl ChessSession {
    /// Starts the AI's turn in the background.
    ///
    /// Returns `None` without doing anything when the AI is not to move, the
    /// game is over, or a request is already in flight. Requires a tokio
    /// runtime; without one the turn fails immediately.
    #[instrument(skip(self))]
    pub fn request_ai_move(&self) -> Option<JoinHandle<AiTurnOutcome>> {
        let Some(ai_color) = self.options.mode().ai_color() else {
            debug!("No AI side in this game");
            return None;
        };

        let mut core = self.lock();
        let state = core.store.snapshot();
        if !state.game_result().is_ongoing() || *state.turn() != ai_color {
            debug!(turn = %state.turn(), "Not the AI's move");
            return None;
        }
        if !core.ai.begin() {
            return None;
        }
        self.emit(SessionEvent::AiThinking(true));
        let generation = core.generation;
        let position = core.rules.current_position();

        // Spawning never polls the task inline, so the handle is tracked
        // before the task can take the lock.
        match Handle::try_current() {
            Ok(runtime) => {
                info!(generation, "AI turn started");
                let session = self.clone();
                let task =
                    runtime.spawn(async move { session.run_ai_turn(generation, position).await });
                core.ai.track(task.abort_handle());
                Some(task)
            }
            Err(e) => {
                warn!(error = %e, "No async runtime for the AI turn");
                self.give_up(
                    &mut core,
                    AiTurnError::ProviderUnavailable(SuggestionError::new(
                        "no async runtime to run the request on",
                    )),
                );
                None
            }
        }
    }

    #[instrument(skip(self, position))]
    async fn run_ai_turn(&self, generation: u64, position: String) -> AiTurnOutcome {
        let attempts = (*self.options.max_suggestion_attempts()).max(1);
        let mut attempt = 1;

        loop {
            let answer = self.ask(&position).await;

            let mut core = self.lock();
            if core.generation != generation {
                let stale = AiTurnError::StaleResponse {
                    issued: generation,
                    current: core.generation,
                };
                info!(error = %stale, "Discarding suggestion");
                return AiTurnOutcome::Discarded(stale);
            }

            let result = answer.and_then(|text| {
                core.ai.applying();
                core.apply_suggestion(&text, self.options.mode())
            });

            match result {
                Ok((state, notation)) => {
                    core.ai.finish();
                    self.announce_move(Mover::Ai, notation, &state);
                    self.emit(SessionEvent::AiThinking(false));
                    return AiTurnOutcome::Applied(state);
                }
                Err(e) if e.is_retryable() && attempt < attempts => {
                    warn!(error = %e, attempt, attempts, "Bad suggestion; asking again");
                    core.ai.retry();
                    attempt += 1;
                }
                Err(e) => {
                    self.give_up(&mut core, e.clone());
                    return AiTurnOutcome::Failed(e);
                }
            }
        }
    }

    /// One round trip to the provider, bounded by the suggestion timeout.
    async fn ask(&self, position: &str) -> Result<String, AiTurnError> {
        let Some(suggester) = self.suggester.as_ref() else {
            return Err(AiTurnError::ProviderUnavailable(SuggestionError::new(
                "no move suggestion provider configured",
            )));
        };
        let limit = *self.options.suggestion_timeout();

        match tokio::time::timeout(limit, suggester.suggest_move(position)).await {
            Ok(Ok(text)) => {
                debug!(answer = %text, "Suggestion received");
                Ok(text)
            }
            Ok(Err(e)) => Err(AiTurnError::ProviderUnavailable(e)),
            Err(_) => Err(AiTurnError::Timeout(limit)),
        }
    }

    fn give_up(&self, core: &mut SessionCore, error: AiTurnError) {
        warn!(error = %error, "AI turn failed; human play continues");
        core.ai.fail();
        self.emit(SessionEvent::AiUnavailable(error));
        self.emit(SessionEvent::AiThinking(false));
    }
}
