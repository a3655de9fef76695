//! Chess domain types and the rules provider seam for strictly_chess.
//!
//! - [`Position`]: board coordinates and their algebraic square names
//! - [`RulesProvider`]: the capabilities the session asks of a rules engine
//! - [`ShakmatyRules`]: a standard-chess provider over `shakmaty`
//! - [`Fen`]: reading the position encoding providers hand back

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod fen;
mod position;
mod provider;
mod shakmaty_rules;
mod types;

pub use fen::{Fen, START_FEN};
pub use position::{CoordinateError, Position};
pub use provider::{RulesError, RulesProvider};
pub use shakmaty_rules::ShakmatyRules;
pub use types::{
    Board, CastlingRights, CastlingRightsByColor, Color, GameResult, Piece, PieceKind,
};
