//! The chess session: one authoritative game, its move workflow, and the
//! events it publishes to presentation.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use derive_getters::Getters;
use derive_setters::Setters;
use serde::{Deserialize, Serialize};
use strictly_chess_rules::{Color, Fen, GameResult, PieceKind, Position, RulesError, RulesProvider};
use tokio::sync::mpsc;
use tracing::{debug, error, info, instrument, trace, warn};

use crate::ai_turn::{AiPhase, AiTurn, AiTurnError};
use crate::error::{IllegalMove, MoveError};
use crate::state::{GameState, Provenance};
use crate::store::GameStateStore;
use crate::suggestion::MoveSuggestionProvider;

/// Who controls each side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameMode {
    /// Humans play both sides.
    PlayerVsPlayer,
    /// A suggestion provider plays `ai_color`.
    PlayerVsAi {
        /// Side the AI plays.
        ai_color: Color,
    },
}

impl GameMode {
    /// Side played by the AI, if any.
    pub fn ai_color(&self) -> Option<Color> {
        match self {
            GameMode::PlayerVsPlayer => None,
            GameMode::PlayerVsAi { ai_color } => Some(*ai_color),
        }
    }

    /// True when `mover` is the one entitled to move `side`.
    pub fn controls(&self, mover: Mover, side: Color) -> bool {
        match (self.ai_color(), mover) {
            (None, Mover::Human) => true,
            (None, Mover::Ai) => false,
            (Some(ai), Mover::Human) => side != ai,
            (Some(ai), Mover::Ai) => side == ai,
        }
    }
}

/// Origin of a move request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mover {
    /// A person at the board.
    Human,
    /// The suggestion provider.
    Ai,
}

/// Tunables for a session.
#[derive(Debug, Clone, Getters, Setters)]
#[setters(prefix = "with_")]
pub struct SessionOptions {
    /// Who plays which side.
    mode: GameMode,
    /// Longest wait for one suggestion.
    suggestion_timeout: Duration,
    /// Suggestions requested per AI turn before giving up on bad answers.
    max_suggestion_attempts: u32,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            mode: GameMode::PlayerVsPlayer,
            suggestion_timeout: Duration::from_secs(30),
            max_suggestion_attempts: 1,
        }
    }
}

/// Messages sent from the session to presentation.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// A move was committed.
    MoveMade {
        /// Who moved.
        mover: Mover,
        /// SAN of the move.
        notation: String,
        /// Snapshot after the move.
        state: Arc<GameState>,
    },
    /// The AI started or stopped thinking.
    AiThinking(bool),
    /// The AI turn failed; human play continues.
    AiUnavailable(AiTurnError),
    /// The game reached a result.
    GameOver(GameResult),
    /// The session returned to the start position.
    Reset {
        /// Generation now current.
        generation: u64,
    },
}

/// Origin square picked by the player and where it may go.
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct Selection {
    /// Selected origin.
    square: Position,
    /// Legal destinations from the origin.
    destinations: Vec<Position>,
}

/// State guarded by the session lock.
pub(crate) struct SessionCore {
    pub(crate) rules: Box<dyn RulesProvider>,
    pub(crate) store: GameStateStore,
    provenance: Provenance,
    selection: Option<Selection>,
    pub(crate) ai: AiTurn,
    pub(crate) generation: u64,
}

impl SessionCore {
    /// Validates, applies, and commits a move. Nothing reaches the store
    /// unless every step succeeds; if the provider moved but the result
    /// could not be read back, the provider is put back in step with the
    /// committed snapshot before the error is returned.
    #[instrument(skip(self, mode), fields(generation = self.generation))]
    pub(crate) fn apply_move(
        &mut self,
        mover: Mover,
        from: Position,
        to: Position,
        mode: &GameMode,
    ) -> Result<(Arc<GameState>, String), MoveError> {
        let current = self.store.snapshot();

        if !current.game_result().is_ongoing() {
            warn!(result = %current.game_result(), "Move attempted after game end");
            return Err(IllegalMove::GameOver(*current.game_result()).into());
        }

        let to_move = *current.turn();
        if !mode.controls(mover, to_move) {
            warn!(?mover, %to_move, "Move attempted out of turn");
            return Err(IllegalMove::WrongTurn { to_move }.into());
        }

        let from_square = from.to_algebraic()?;
        let to_square = to.to_algebraic()?;

        let legal = self.rules.legal_moves_from(&from_square);
        if legal.is_empty() {
            debug!(from = %from_square, "No legal moves from origin");
            return Err(IllegalMove::NoMovesFrom(from).into());
        }
        if !legal.contains(&to_square) {
            debug!(from = %from_square, to = %to_square, ?legal, "Destination not legal");
            return Err(IllegalMove::DestinationNotLegal { from, to }.into());
        }

        let notation = self
            .rules
            .apply_move(&from_square, &to_square, Some(PieceKind::Queen))?;

        let fen = match Fen::parse(&self.rules.current_position()) {
            Ok(fen) => fen,
            Err(e) => {
                error!(error = %e, "Rules provider returned an unreadable position after a move");
                self.resync(&current);
                return Err(e.into());
            }
        };
        let mut provenance = self.provenance.clone();
        provenance.record(current.board(), fen.board(), to);
        let next = GameState::derive(&*self.rules, &fen, &provenance);

        self.provenance = provenance;
        let state = self.store.replace(next);
        info!(
            ?mover,
            notation = %notation,
            result = %state.game_result(),
            "Move committed"
        );
        Ok((state, notation))
    }

    /// Replays `committed` into a freshly reset provider. When that cannot
    /// reproduce the snapshot, the snapshot is rebuilt from the provider
    /// instead.
    #[instrument(skip_all, fields(moves = committed.move_history().len()))]
    fn resync(&mut self, committed: &GameState) {
        warn!("Replaying committed moves into the rules provider");
        self.rules.reset();

        let replayed = committed.move_history().iter().try_for_each(|san| {
            let (from, to) = self.rules.resolve_notation(san)?;
            self.rules
                .apply_move(&from, &to, Some(PieceKind::Queen))
                .map(drop)
        });
        let in_step = replayed
            .and_then(|()| Fen::parse(&self.rules.current_position()))
            .map(|fen| {
                self.provenance.stamp(fen.board()) == *committed.board()
                    && fen.side_to_move() == *committed.turn()
            });

        match in_step {
            Ok(true) => info!("Rules provider back in step with the snapshot"),
            Ok(false) => self.rebuild("replay reached a different position"),
            Err(e) => self.rebuild(&e.message),
        }
    }

    /// Replaces the snapshot with whatever the provider now holds.
    fn rebuild(&mut self, reason: &str) {
        error!(reason, "Rebuilding snapshot from the rules provider");
        self.provenance = Provenance::default();
        match GameState::read(&*self.rules, &self.provenance) {
            Ok(state) => {
                self.store.replace(state);
            }
            Err(e) => error!(error = %e, "Rules provider position still unreadable"),
        }
    }

    /// True when a human may select or move right now.
    fn human_may_act(&self, mode: &GameMode) -> bool {
        let state = self.store.snapshot();
        state.game_result().is_ongoing()
            && !self.ai.is_thinking()
            && mode.controls(Mover::Human, *state.turn())
    }
}

/// Owner of one chess game.
///
/// Cloning yields another handle to the same game. All mutation goes
/// through the move workflow under a single lock; the only suspended work,
/// waiting for a suggestion, happens outside it.
#[derive(Clone)]
pub struct ChessSession {
    pub(crate) core: Arc<Mutex<SessionCore>>,
    pub(crate) suggester: Option<Arc<dyn MoveSuggestionProvider>>,
    pub(crate) options: SessionOptions,
    events: mpsc::UnboundedSender<SessionEvent>,
}

impl ChessSession {
    /// Creates a session over `rules` in whatever position they hold.
    #[instrument(skip(rules, events))]
    pub fn new(
        rules: impl RulesProvider + 'static,
        options: SessionOptions,
        events: mpsc::UnboundedSender<SessionEvent>,
    ) -> Result<Self, RulesError> {
        let rules: Box<dyn RulesProvider> = Box::new(rules);
        let provenance = Provenance::default();
        let initial = GameState::read(&*rules, &provenance)?;
        info!("Creating chess session");

        Ok(Self {
            core: Arc::new(Mutex::new(SessionCore {
                rules,
                store: GameStateStore::new(initial),
                provenance,
                selection: None,
                ai: AiTurn::default(),
                generation: 0,
            })),
            suggester: None,
            options,
            events,
        })
    }

    /// Sets the provider consulted on the AI's turns.
    pub fn with_suggester(mut self, suggester: Arc<dyn MoveSuggestionProvider>) -> Self {
        info!(suggester = suggester.name(), "Attaching move suggestion provider");
        self.suggester = Some(suggester);
        self
    }

    /// Session options.
    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, SessionCore> {
        self.core.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn emit(&self, event: SessionEvent) {
        if self.events.send(event).is_err() {
            trace!("No event listener attached");
        }
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> Arc<GameState> {
        self.lock().store.snapshot()
    }

    /// Current FEN from the rules provider.
    pub fn position_encoding(&self) -> String {
        self.lock().rules.current_position()
    }

    /// Selects `pos` and returns its legal destinations.
    ///
    /// Returns nothing, and clears the selection, when the game is over,
    /// the AI is to move or thinking, or the square has no legal moves.
    #[instrument(skip(self))]
    pub fn select_square(&self, pos: Position) -> Vec<Position> {
        let mut core = self.lock();
        core.selection = None;

        if !core.human_may_act(&self.options.mode) {
            debug!("Selection refused: not the human's turn");
            return Vec::new();
        }
        let Ok(square) = pos.to_algebraic() else {
            debug!("Selection refused: off the board");
            return Vec::new();
        };

        let destinations: Vec<Position> = core
            .rules
            .legal_moves_from(&square)
            .iter()
            .filter_map(|s| Position::from_algebraic(s).ok())
            .collect();
        if !destinations.is_empty() {
            core.selection = Some(Selection {
                square: pos,
                destinations: destinations.clone(),
            });
        }
        debug!(count = destinations.len(), "Square selected");
        destinations
    }

    /// Current selection, if any.
    pub fn selection(&self) -> Option<Selection> {
        self.lock().selection.clone()
    }

    /// Plays a human move from `from` to `to`.
    ///
    /// On success the new snapshot is returned immediately; if the AI is
    /// now to move its turn starts in the background. Any failure leaves
    /// the game untouched. The selection is cleared either way.
    #[instrument(skip(self))]
    pub fn submit_move(&self, from: Position, to: Position) -> Result<Arc<GameState>, MoveError> {
        let state = {
            let mut core = self.lock();
            core.selection = None;
            let (state, notation) = core.apply_move(Mover::Human, from, to, &self.options.mode)?;
            self.announce_move(Mover::Human, notation, &state);
            state
        };

        if state.game_result().is_ongoing() && self.options.mode.ai_color() == Some(*state.turn()) {
            debug!("AI to move; starting AI turn");
            let _detached = self.request_ai_move();
        }
        Ok(state)
    }

    pub(crate) fn announce_move(&self, mover: Mover, notation: String, state: &Arc<GameState>) {
        self.emit(SessionEvent::MoveMade {
            mover,
            notation,
            state: Arc::clone(state),
        });
        if !state.game_result().is_ongoing() {
            info!(result = %state.game_result(), "Game over");
            self.emit(SessionEvent::GameOver(*state.game_result()));
        }
    }

    /// Starts a new game.
    ///
    /// Aborts any AI turn in flight and bumps the session generation, so a
    /// suggestion that still arrives is discarded.
    #[instrument(skip(self))]
    pub fn reset(&self) -> Result<Arc<GameState>, RulesError> {
        let mut core = self.lock();
        core.generation += 1;
        let was_thinking = core.ai.is_thinking();
        core.ai.cancel();
        core.rules.reset();
        core.provenance = Provenance::default();
        core.selection = None;

        let fresh = GameState::read(&*core.rules, &core.provenance)?;
        let state = core.store.replace(fresh);
        let generation = core.generation;
        info!(generation, "Session reset");

        if was_thinking {
            self.emit(SessionEvent::AiThinking(false));
        }
        self.emit(SessionEvent::Reset { generation });
        Ok(state)
    }

    /// True while a suggestion request is outstanding.
    pub fn is_ai_thinking(&self) -> bool {
        self.lock().ai.is_thinking()
    }

    /// Current phase of the AI turn.
    pub fn ai_phase(&self) -> AiPhase {
        self.lock().ai.phase()
    }

    /// Current session generation.
    pub fn generation(&self) -> u64 {
        self.lock().generation
    }
}
