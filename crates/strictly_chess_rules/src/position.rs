//! Board coordinates and their algebraic names.
//!
//! Row 0 is rank 8 (Black's back rank) and column 0 is file `a`, so
//! `Position::new(6, 4)` is `e2`.

use serde::{Deserialize, Serialize};
use tracing::instrument;

/// Errors from converting between board coordinates and square names.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum CoordinateError {
    /// Row or column outside `0..=7`.
    #[display("Position out of range: row {}, col {}", row, col)]
    OutOfRange {
        /// Offending row.
        row: u8,
        /// Offending column.
        col: u8,
    },

    /// Square name is not a file `a`-`h` followed by a rank `1`-`8`.
    #[display("Invalid square notation: {:?}", _0)]
    InvalidNotation(String),
}

impl std::error::Error for CoordinateError {}

/// A zero-indexed square on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    row: u8,
    col: u8,
}

impl Position {
    /// Creates a position without range checking.
    ///
    /// Out-of-range values are representable so callers get an
    /// [`CoordinateError::OutOfRange`] from [`Position::to_algebraic`]
    /// instead of a panic.
    pub const fn new(row: u8, col: u8) -> Self {
        Self { row, col }
    }

    /// Creates a position, rejecting rows or columns outside `0..=7`.
    pub fn try_new(row: u8, col: u8) -> Result<Self, CoordinateError> {
        let pos = Self::new(row, col);
        if pos.is_valid() {
            Ok(pos)
        } else {
            Err(CoordinateError::OutOfRange { row, col })
        }
    }

    /// Row index, 0 = rank 8.
    pub fn row(&self) -> u8 {
        self.row
    }

    /// Column index, 0 = file a.
    pub fn col(&self) -> u8 {
        self.col
    }

    /// True when both coordinates are on the board.
    pub fn is_valid(&self) -> bool {
        self.row < 8 && self.col < 8
    }

    /// Converts to a square name such as `"e4"`.
    #[instrument(level = "trace")]
    pub fn to_algebraic(&self) -> Result<String, CoordinateError> {
        if !self.is_valid() {
            return Err(CoordinateError::OutOfRange {
                row: self.row,
                col: self.col,
            });
        }
        let file = char::from(b'a' + self.col);
        let rank = 8 - self.row;
        Ok(format!("{}{}", file, rank))
    }

    /// Parses a square name such as `"e4"`.
    #[instrument(level = "trace")]
    pub fn from_algebraic(square: &str) -> Result<Self, CoordinateError> {
        let invalid = || CoordinateError::InvalidNotation(square.to_string());

        let &[file, rank] = square.as_bytes() else {
            return Err(invalid());
        };
        if !(b'a'..=b'h').contains(&file) || !(b'1'..=b'8').contains(&rank) {
            return Err(invalid());
        }

        Ok(Self {
            row: 8 - (rank - b'0'),
            col: file - b'a',
        })
    }

    /// All 64 squares, a8 first, row by row.
    pub fn all() -> impl Iterator<Item = Position> {
        (0..8u8).flat_map(|row| (0..8u8).map(move |col| Position::new(row, col)))
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.to_algebraic() {
            Ok(square) => write!(f, "{}", square),
            Err(_) => write!(f, "({}, {})", self.row, self.col),
        }
    }
}

impl std::str::FromStr for Position {
    type Err = CoordinateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_algebraic(s)
    }
}
