//! Reading the fields of a FEN position encoding that the session mirrors.

use crate::position::Position;
use crate::provider::RulesError;
use crate::types::{Board, Color, Piece, PieceKind};
use tracing::instrument;

/// FEN of the standard starting position.
pub const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// The parts of a FEN string the session needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fen {
    board: Board,
    side_to_move: Color,
    en_passant: Option<Position>,
}

impl Fen {
    /// Parses piece placement, side to move, and en passant target.
    ///
    /// Castling and move counters are not read; rights come from the
    /// rules provider directly.
    #[instrument(level = "debug")]
    pub fn parse(fen: &str) -> Result<Self, RulesError> {
        let mut fields = fen.split_whitespace();
        let placement = fields
            .next()
            .ok_or_else(|| RulesError::new(format!("Empty FEN: {:?}", fen)))?;
        let side = fields.next().unwrap_or("w");
        let _castling = fields.next();
        let en_passant = fields.next().unwrap_or("-");

        let board = parse_placement(placement)?;
        let side_to_move = match side {
            "w" => Color::White,
            "b" => Color::Black,
            other => {
                return Err(RulesError::new(format!(
                    "Invalid side to move {:?} in FEN",
                    other
                )));
            }
        };
        let en_passant = match en_passant {
            "-" => None,
            square => Some(Position::from_algebraic(square).map_err(|e| {
                RulesError::new(format!("Invalid en passant square in FEN: {}", e))
            })?),
        };

        Ok(Self {
            board,
            side_to_move,
            en_passant,
        })
    }

    /// Piece placement with `has_moved` cleared.
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Side to move according to the encoding.
    pub fn side_to_move(&self) -> Color {
        self.side_to_move
    }

    /// En passant target square, if any.
    pub fn en_passant(&self) -> Option<Position> {
        self.en_passant
    }
}

fn parse_placement(placement: &str) -> Result<Board, RulesError> {
    let ranks: Vec<&str> = placement.split('/').collect();
    if ranks.len() != 8 {
        return Err(RulesError::new(format!(
            "FEN placement must have 8 ranks, found {}",
            ranks.len()
        )));
    }

    let mut board = Board::empty();
    for (row, rank) in ranks.iter().enumerate() {
        let mut col: u8 = 0;
        for c in rank.chars() {
            if let Some(skip) = c.to_digit(10) {
                col = col.saturating_add(skip as u8);
                continue;
            }
            let kind = PieceKind::from_fen_char(c)
                .ok_or_else(|| RulesError::new(format!("Invalid piece {:?} in FEN", c)))?;
            let color = if c.is_ascii_uppercase() {
                Color::White
            } else {
                Color::Black
            };
            if col >= 8 {
                return Err(RulesError::new(format!("FEN rank {} overflows", 8 - row)));
            }
            board.set(Position::new(row as u8, col), Some(Piece::new(kind, color)));
            col += 1;
        }
        if col != 8 {
            return Err(RulesError::new(format!(
                "FEN rank {} has {} files",
                8 - row,
                col
            )));
        }
    }
    Ok(board)
}
