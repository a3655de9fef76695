//! The rules provider capability seam.
//!
//! The session never decides chess legality itself. Everything it needs to
//! know about the position (legal destinations, terminal flags, castling,
//! history) is asked of a [`RulesProvider`]. Squares cross this seam as
//! algebraic names (`"e2"`); the session converts them to [`Position`]s.
//!
//! [`Position`]: crate::Position

use crate::types::{CastlingRights, Color, PieceKind};
use derive_more::{Display, Error};
use tracing::{debug, instrument};

/// Capabilities the session consumes from a chess rules engine.
pub trait RulesProvider: Send {
    /// Current position as FEN.
    fn current_position(&self) -> String;

    /// Legal destination squares for the piece on `square`.
    ///
    /// Empty when the square is empty, holds a piece of the side not to
    /// move, or the piece has no legal moves. Castling is reported as the
    /// king's destination square.
    fn legal_moves_from(&self, square: &str) -> Vec<String>;

    /// Applies a legal move and returns its SAN.
    ///
    /// `promotion` is used only when the move is a pawn promotion; `None`
    /// promotes to a queen. The position is untouched on error.
    fn apply_move(
        &mut self,
        from: &str,
        to: &str,
        promotion: Option<PieceKind>,
    ) -> Result<String, RulesError>;

    /// Resolves a SAN move in the current position to `(from, to)` squares.
    fn resolve_notation(&self, san: &str) -> Result<(String, String), RulesError>;

    /// Side to move.
    fn turn_to_move(&self) -> Color;

    /// Side to move is checkmated.
    fn is_checkmate(&self) -> bool;

    /// Side to move has no legal moves and is not in check.
    fn is_stalemate(&self) -> bool;

    /// Any draw condition holds.
    fn is_draw(&self) -> bool;

    /// The current position occurred at least three times.
    fn is_threefold_repetition(&self) -> bool;

    /// Neither side can possibly mate.
    fn is_insufficient_material(&self) -> bool;

    /// Castling availability for `color`.
    fn castling_rights(&self, color: Color) -> CastlingRights;

    /// SAN of every move played since the last reset.
    fn move_history(&self) -> Vec<String>;

    /// Returns to the standard starting position with empty history.
    fn reset(&mut self);
}

/// Error reported by a rules provider.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
#[display("Rules error: {} at {}:{}", message, file, line)]
pub struct RulesError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl RulesError {
    /// Creates a new rules error with caller location tracking.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        let message = message.into();
        debug!(error_message = %message, "Rules error created");
        Self {
            message,
            line: loc.line(),
            file: loc.file(),
        }
    }
}
