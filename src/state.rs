//! The authoritative game snapshot and how it is derived.

use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use strictly_chess_rules::{
    Board, CastlingRightsByColor, Color, Fen, GameResult, Position, RulesError, RulesProvider,
};
use tracing::instrument;

use crate::status;

/// Complete, self-consistent view of the game handed to presentation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    /// Pieces, with `has_moved` taken from tracked provenance.
    board: Board,
    /// Side to move.
    turn: Color,
    /// Castling availability mirrored from the rules provider.
    castling_rights: CastlingRightsByColor,
    /// Square a pawn may capture onto en passant.
    en_passant_target: Option<Position>,
    /// SAN of every move since the last reset.
    move_history: Vec<String>,
    /// Derived result.
    game_result: GameResult,
}

impl GameState {
    /// Builds a full snapshot from the rules provider and its parsed `fen`.
    #[instrument(level = "debug", skip_all)]
    pub(crate) fn derive(rules: &dyn RulesProvider, fen: &Fen, provenance: &Provenance) -> Self {
        let board = provenance.stamp(fen.board());

        Self {
            board,
            turn: rules.turn_to_move(),
            castling_rights: CastlingRightsByColor::new(
                rules.castling_rights(Color::White),
                rules.castling_rights(Color::Black),
            ),
            en_passant_target: fen.en_passant(),
            move_history: rules.move_history(),
            game_result: status::classify(rules),
        }
    }

    /// Parses the provider's position and builds a snapshot from it.
    pub(crate) fn read(
        rules: &dyn RulesProvider,
        provenance: &Provenance,
    ) -> Result<Self, RulesError> {
        let fen = Fen::parse(&rules.current_position())?;
        Ok(Self::derive(rules, &fen, provenance))
    }
}

/// Tracks which pieces have moved since the game started.
///
/// Each committed move is applied as a board diff: a square whose occupant
/// changed now holds a piece that arrived by moving, an emptied square
/// forgets its flag, and untouched squares keep theirs. This follows the
/// piece itself rather than whichever move last started on its square.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Provenance {
    moved: [[bool; 8]; 8],
}

impl Provenance {
    /// Updates flags for a committed move from `before` to `after`.
    pub(crate) fn record(&mut self, before: &Board, after: &Board, destination: Position) {
        for pos in Position::all() {
            let (row, col) = (pos.row() as usize, pos.col() as usize);
            self.moved[row][col] = match (before.get(pos), after.get(pos)) {
                (_, None) => false,
                (Some(old), Some(new)) if old.same_identity(&new) => {
                    self.moved[row][col] || pos == destination
                }
                (_, Some(_)) => true,
            };
        }
    }

    /// Copies `board` with each piece's `has_moved` set from the flags.
    pub(crate) fn stamp(&self, board: &Board) -> Board {
        let mut stamped = board.clone();
        for (pos, mut piece) in board.pieces() {
            piece.has_moved = self.moved[pos.row() as usize][pos.col() as usize];
            stamped.set(pos, Some(piece));
        }
        stamped
    }
}
