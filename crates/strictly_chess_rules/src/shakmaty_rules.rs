//! [`RulesProvider`] backed by the `shakmaty` move generator.

use std::collections::HashMap;

use shakmaty::fen::Fen as ShakmatyFen;
use shakmaty::san::San;
use shakmaty::{
    CastlingMode, CastlingSide, Chess, Color as SColor, EnPassantMode, File, Move, Position as _,
    Rank, Role, Square,
};
use tracing::{debug, info, instrument, trace};

use crate::provider::{RulesError, RulesProvider};
use crate::types::{CastlingRights, Color, Piece, PieceKind};

/// Half-moves without capture or pawn move that make the game drawn.
const FIFTY_MOVE_HALFMOVES: u32 = 100;

/// Standard chess rules with SAN history and repetition tracking.
#[derive(Debug, Clone)]
pub struct ShakmatyRules {
    position: Chess,
    history: Vec<String>,
    repetitions: HashMap<String, u32>,
}

impl ShakmatyRules {
    /// Rules positioned at the standard start.
    #[instrument]
    pub fn new() -> Self {
        Self::from_position(Chess::default())
    }

    /// Rules positioned at an arbitrary standard-chess FEN.
    ///
    /// The history starts empty; repetition counting starts from this
    /// position.
    #[instrument]
    pub fn from_fen(fen: &str) -> Result<Self, RulesError> {
        let setup: ShakmatyFen = fen
            .parse()
            .map_err(|_| RulesError::new(format!("Unparsable FEN {:?}", fen)))?;
        let position: Chess = setup
            .into_position(CastlingMode::Standard)
            .map_err(|_| RulesError::new(format!("Illegal position in FEN {:?}", fen)))?;
        Ok(Self::from_position(position))
    }

    fn from_position(position: Chess) -> Self {
        let mut rules = Self {
            position,
            history: Vec::new(),
            repetitions: HashMap::new(),
        };
        rules.record_repetition();
        rules
    }

    fn parse_square(square: &str) -> Result<Square, RulesError> {
        square
            .parse::<Square>()
            .map_err(|_| RulesError::new(format!("Invalid square {:?}", square)))
    }

    fn placement(&self) -> String {
        let board = self.position.board();
        let mut placement = String::new();
        for rank in (0..8u32).rev() {
            let mut empty = 0;
            for file in 0..8u32 {
                let sq = Square::from_coords(File::new(file), Rank::new(rank));
                match board.piece_at(sq) {
                    Some(piece) => {
                        if empty > 0 {
                            placement.push_str(&empty.to_string());
                            empty = 0;
                        }
                        placement.push(to_piece(piece).fen_char());
                    }
                    None => empty += 1,
                }
            }
            if empty > 0 {
                placement.push_str(&empty.to_string());
            }
            if rank > 0 {
                placement.push('/');
            }
        }
        placement
    }

    fn castling_field(&self) -> String {
        let white = self.castling_rights(Color::White);
        let black = self.castling_rights(Color::Black);
        let field: String = [
            (white.king_side, 'K'),
            (white.queen_side, 'Q'),
            (black.king_side, 'k'),
            (black.queen_side, 'q'),
        ]
        .iter()
        .filter(|(available, _)| *available)
        .map(|(_, c)| *c)
        .collect();
        if field.is_empty() {
            "-".to_string()
        } else {
            field
        }
    }

    fn en_passant_field(&self) -> String {
        self.position
            .ep_square(EnPassantMode::Legal)
            .map(|sq| sq.to_string())
            .unwrap_or_else(|| "-".to_string())
    }

    /// Position identity for repetition: placement, side, rights, en passant.
    fn repetition_key(&self) -> String {
        format!(
            "{} {} {} {}",
            self.placement(),
            self.turn_to_move().fen_char(),
            self.castling_field(),
            self.en_passant_field()
        )
    }

    fn record_repetition(&mut self) {
        let key = self.repetition_key();
        let count = self.repetitions.entry(key).or_insert(0);
        *count += 1;
        trace!(occurrences = *count, "Recorded position occurrence");
    }
}

impl Default for ShakmatyRules {
    fn default() -> Self {
        Self::new()
    }
}

/// Origin and destination of a move, with castling addressed by the king's
/// destination square.
fn endpoints(m: &Move) -> Option<(Square, Square)> {
    match m {
        Move::Normal { from, to, .. } => Some((*from, *to)),
        Move::EnPassant { from, to, .. } => Some((*from, *to)),
        Move::Castle { king, rook, .. } => {
            let file = if rook.file() == File::H {
                File::G
            } else {
                File::C
            };
            Some((*king, Square::from_coords(file, king.rank())))
        }
        Move::Put { .. } => None,
    }
}

fn to_color(color: SColor) -> Color {
    match color {
        SColor::White => Color::White,
        SColor::Black => Color::Black,
    }
}

fn from_color(color: Color) -> SColor {
    match color {
        Color::White => SColor::White,
        Color::Black => SColor::Black,
    }
}

fn to_kind(role: Role) -> PieceKind {
    match role {
        Role::Pawn => PieceKind::Pawn,
        Role::Knight => PieceKind::Knight,
        Role::Bishop => PieceKind::Bishop,
        Role::Rook => PieceKind::Rook,
        Role::Queen => PieceKind::Queen,
        Role::King => PieceKind::King,
    }
}

fn to_role(kind: PieceKind) -> Role {
    match kind {
        PieceKind::Pawn => Role::Pawn,
        PieceKind::Knight => Role::Knight,
        PieceKind::Bishop => Role::Bishop,
        PieceKind::Rook => Role::Rook,
        PieceKind::Queen => Role::Queen,
        PieceKind::King => Role::King,
    }
}

fn to_piece(piece: shakmaty::Piece) -> Piece {
    Piece::new(to_kind(piece.role), to_color(piece.color))
}

impl RulesProvider for ShakmatyRules {
    fn current_position(&self) -> String {
        format!(
            "{} {} {} {} {} {}",
            self.placement(),
            self.turn_to_move().fen_char(),
            self.castling_field(),
            self.en_passant_field(),
            self.position.halfmoves(),
            self.position.fullmoves()
        )
    }

    #[instrument(level = "trace", skip(self))]
    fn legal_moves_from(&self, square: &str) -> Vec<String> {
        let Ok(origin) = Self::parse_square(square) else {
            return Vec::new();
        };

        let mut destinations: Vec<String> = Vec::new();
        for m in &self.position.legal_moves() {
            if let Some((from, to)) = endpoints(m)
                && from == origin
            {
                let name = to.to_string();
                if !destinations.contains(&name) {
                    destinations.push(name);
                }
            }
        }
        trace!(count = destinations.len(), "Computed legal destinations");
        destinations
    }

    #[instrument(skip(self))]
    fn apply_move(
        &mut self,
        from: &str,
        to: &str,
        promotion: Option<PieceKind>,
    ) -> Result<String, RulesError> {
        let from_sq = Self::parse_square(from)?;
        let to_sq = Self::parse_square(to)?;
        let promote_to = to_role(promotion.unwrap_or(PieceKind::Queen));

        let legal = self.position.legal_moves();
        let chosen = legal
            .iter()
            .find(|m| {
                endpoints(m) == Some((from_sq, to_sq))
                    && m.promotion().is_none_or(|role| role == promote_to)
            })
            .cloned()
            .ok_or_else(|| RulesError::new(format!("Illegal move {}-{}", from, to)))?;

        let san = San::from_move(&self.position, chosen.clone()).to_string();
        let next = self
            .position
            .clone()
            .play(chosen)
            .map_err(|_| RulesError::new(format!("Move {} rejected by position", san)))?;

        let suffix = if next.is_checkmate() {
            "#"
        } else if next.is_check() {
            "+"
        } else {
            ""
        };
        let notation = format!("{}{}", san, suffix);

        self.position = next;
        self.history.push(notation.clone());
        self.record_repetition();

        debug!(notation = %notation, "Applied move");
        Ok(notation)
    }

    #[instrument(skip(self))]
    fn resolve_notation(&self, san: &str) -> Result<(String, String), RulesError> {
        let cleaned = san.trim().trim_end_matches(['+', '#']);
        let parsed: San = cleaned
            .parse()
            .map_err(|_| RulesError::new(format!("Unparsable SAN {:?}", san)))?;
        let m = parsed
            .to_move(&self.position)
            .map_err(|_| RulesError::new(format!("SAN {:?} is not legal here", san)))?;
        let (from, to) = endpoints(&m)
            .ok_or_else(|| RulesError::new(format!("SAN {:?} has no origin square", san)))?;
        Ok((from.to_string(), to.to_string()))
    }

    fn turn_to_move(&self) -> Color {
        to_color(self.position.turn())
    }

    fn is_checkmate(&self) -> bool {
        self.position.is_checkmate()
    }

    fn is_stalemate(&self) -> bool {
        self.position.is_stalemate()
    }

    fn is_draw(&self) -> bool {
        self.position.halfmoves() >= FIFTY_MOVE_HALFMOVES
            || self.is_stalemate()
            || self.is_insufficient_material()
            || self.is_threefold_repetition()
    }

    fn is_threefold_repetition(&self) -> bool {
        self.repetitions
            .get(&self.repetition_key())
            .is_some_and(|count| *count >= 3)
    }

    fn is_insufficient_material(&self) -> bool {
        self.position.is_insufficient_material()
    }

    fn castling_rights(&self, color: Color) -> CastlingRights {
        let castles = self.position.castles();
        let color = from_color(color);
        CastlingRights::new(
            castles.has(color, CastlingSide::KingSide),
            castles.has(color, CastlingSide::QueenSide),
        )
    }

    fn move_history(&self) -> Vec<String> {
        self.history.clone()
    }

    #[instrument(skip(self))]
    fn reset(&mut self) {
        info!("Resetting rules to the start position");
        *self = Self::new();
    }
}
