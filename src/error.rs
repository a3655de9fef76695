//! Errors surfaced by the move workflow.

use strictly_chess_rules::{Color, CoordinateError, GameResult, Position, RulesError};

/// Why a move was refused. The session state is unchanged in every case.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum IllegalMove {
    /// The game already has a result.
    #[display("Game is already over ({})", _0)]
    GameOver(GameResult),

    /// The mover does not own the side to move.
    #[display("It is {}'s turn", to_move)]
    WrongTurn {
        /// Side that is actually to move.
        to_move: Color,
    },

    /// The origin holds no piece of the side to move, or that piece is stuck.
    #[display("No legal moves from {}", _0)]
    NoMovesFrom(Position),

    /// The destination is not among the legal destinations of the origin.
    #[display("{} cannot move to {}", from, to)]
    DestinationNotLegal {
        /// Origin square.
        from: Position,
        /// Requested destination.
        to: Position,
    },
}

/// Error returned by [`ChessSession::submit_move`](crate::ChessSession::submit_move).
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::From)]
pub enum MoveError {
    /// The move is not allowed; recoverable.
    #[display("Illegal move: {}", _0)]
    Illegal(IllegalMove),

    /// A coordinate could not be mapped; a caller bug.
    #[display("{}", _0)]
    Coordinate(CoordinateError),

    /// The rules provider failed while applying or describing the move.
    #[display("Rules provider unavailable: {}", _0)]
    ProviderUnavailable(RulesError),
}

impl MoveError {
    /// True for refusals the player caused, as opposed to provider faults.
    pub fn is_illegal(&self) -> bool {
        matches!(self, MoveError::Illegal(_))
    }
}

impl std::error::Error for IllegalMove {}

impl std::error::Error for MoveError {}
