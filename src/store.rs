//! Holder of the current game snapshot.

use std::sync::Arc;

use tracing::{debug, instrument};

use crate::state::GameState;

/// Single authoritative [`GameState`].
///
/// Readers get an immutable shared view; the only write is a whole-snapshot
/// swap, so nobody observes a new board paired with an old turn.
#[derive(Debug, Clone)]
pub struct GameStateStore {
    current: Arc<GameState>,
}

impl GameStateStore {
    /// Creates a store holding `initial`.
    pub(crate) fn new(initial: GameState) -> Self {
        Self {
            current: Arc::new(initial),
        }
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> Arc<GameState> {
        Arc::clone(&self.current)
    }

    /// Replaces the snapshot atomically.
    #[instrument(level = "debug", skip_all, fields(moves = next.move_history().len()))]
    pub(crate) fn replace(&mut self, next: GameState) -> Arc<GameState> {
        self.current = Arc::new(next);
        debug!(result = %self.current.game_result(), "Snapshot replaced");
        self.snapshot()
    }
}
