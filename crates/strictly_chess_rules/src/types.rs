//! Core domain types for chess.

use derive_getters::Getters;
use derive_new::new;
use serde::{Deserialize, Serialize};

use crate::position::Position;

/// Side in the game.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::EnumIter, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Color {
    /// White (moves first).
    White,
    /// Black.
    Black,
}

impl Color {
    /// Returns the opposing side.
    pub fn opponent(self) -> Self {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }

    /// FEN side-to-move character.
    pub fn fen_char(self) -> char {
        match self {
            Color::White => 'w',
            Color::Black => 'b',
        }
    }
}

/// Kind of chess piece.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::EnumIter, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PieceKind {
    /// Pawn.
    Pawn,
    /// Knight.
    Knight,
    /// Bishop.
    Bishop,
    /// Rook.
    Rook,
    /// Queen.
    Queen,
    /// King.
    King,
}

impl PieceKind {
    /// Lowercase FEN letter for this kind.
    pub fn fen_char(self) -> char {
        match self {
            PieceKind::Pawn => 'p',
            PieceKind::Knight => 'n',
            PieceKind::Bishop => 'b',
            PieceKind::Rook => 'r',
            PieceKind::Queen => 'q',
            PieceKind::King => 'k',
        }
    }

    /// Parses a FEN letter, ignoring case.
    pub fn from_fen_char(c: char) -> Option<Self> {
        match c.to_ascii_lowercase() {
            'p' => Some(PieceKind::Pawn),
            'n' => Some(PieceKind::Knight),
            'b' => Some(PieceKind::Bishop),
            'r' => Some(PieceKind::Rook),
            'q' => Some(PieceKind::Queen),
            'k' => Some(PieceKind::King),
            _ => None,
        }
    }
}

/// A piece standing on the board.
///
/// `has_moved` is never set by callers directly; the session derives it
/// from the provenance it tracks across committed moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, new)]
pub struct Piece {
    /// What the piece is.
    pub kind: PieceKind,
    /// Who owns it.
    pub color: Color,
    /// Whether this piece has moved since the game started.
    #[new(default)]
    pub has_moved: bool,
}

impl Piece {
    /// FEN letter: uppercase for White, lowercase for Black.
    pub fn fen_char(&self) -> char {
        let c = self.kind.fen_char();
        match self.color {
            Color::White => c.to_ascii_uppercase(),
            Color::Black => c,
        }
    }

    /// True when both pieces are the same kind and color, ignoring `has_moved`.
    pub fn same_identity(&self, other: &Piece) -> bool {
        self.kind == other.kind && self.color == other.color
    }
}

/// 8x8 chess board, row 0 = rank 8, col 0 = file a.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    squares: [[Option<Piece>; 8]; 8],
}

impl Board {
    /// Creates an empty board.
    pub fn empty() -> Self {
        Self {
            squares: [[None; 8]; 8],
        }
    }

    /// Returns the piece at `pos`, if any. Off-board positions are empty.
    pub fn get(&self, pos: Position) -> Option<Piece> {
        if !pos.is_valid() {
            return None;
        }
        self.squares[pos.row() as usize][pos.col() as usize]
    }

    /// Places or clears a square. Off-board positions are ignored.
    pub fn set(&mut self, pos: Position, piece: Option<Piece>) {
        if pos.is_valid() {
            self.squares[pos.row() as usize][pos.col() as usize] = piece;
        }
    }

    /// Rows in display order (rank 8 first).
    pub fn rows(&self) -> &[[Option<Piece>; 8]; 8] {
        &self.squares
    }

    /// Iterates every occupied square.
    pub fn pieces(&self) -> impl Iterator<Item = (Position, Piece)> + '_ {
        Position::all().filter_map(move |pos| self.get(pos).map(|piece| (pos, piece)))
    }

    /// Formats the board as a human-readable grid with rank and file labels.
    pub fn display(&self) -> String {
        let mut result = String::new();
        for (row, squares) in self.squares.iter().enumerate() {
            result.push_str(&format!("{} ", 8 - row));
            for square in squares {
                let symbol = square.map(|p| p.fen_char()).unwrap_or('.');
                result.push(' ');
                result.push(symbol);
            }
            result.push('\n');
        }
        result.push_str("   a b c d e f g h");
        result
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::empty()
    }
}

/// Castling availability for one side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, new)]
#[serde(rename_all = "camelCase")]
pub struct CastlingRights {
    /// Short castling still available.
    pub king_side: bool,
    /// Long castling still available.
    pub queen_side: bool,
}

/// Castling availability for both sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Getters, new)]
pub struct CastlingRightsByColor {
    /// White's rights.
    white: CastlingRights,
    /// Black's rights.
    black: CastlingRights,
}

impl CastlingRightsByColor {
    /// Rights for the given color.
    pub fn for_color(&self, color: Color) -> CastlingRights {
        match color {
            Color::White => self.white,
            Color::Black => self.black,
        }
    }
}

/// Result of the game as seen by presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum GameResult {
    /// Game is still being played.
    Ongoing,
    /// White delivered checkmate.
    WhiteWins,
    /// Black delivered checkmate.
    BlackWins,
    /// Drawn by any rule.
    Draw,
}

impl GameResult {
    /// Result for a win by `color`.
    pub fn win_for(color: Color) -> Self {
        match color {
            Color::White => GameResult::WhiteWins,
            Color::Black => GameResult::BlackWins,
        }
    }

    /// True while moves may still be played.
    pub fn is_ongoing(self) -> bool {
        self == GameResult::Ongoing
    }
}
