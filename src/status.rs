//! Deriving the game result from rules provider queries.

use strictly_chess_rules::{GameResult, RulesProvider};
use tracing::{debug, instrument};

/// Classifies the current position.
///
/// Checkmate is tested first: some providers also raise draw-like flags on a
/// mated position, and mate must win.
#[instrument(level = "debug", skip(rules))]
pub fn classify(rules: &dyn RulesProvider) -> GameResult {
    let result = if rules.is_checkmate() {
        GameResult::win_for(rules.turn_to_move().opponent())
    } else if rules.is_stalemate()
        || rules.is_draw()
        || rules.is_threefold_repetition()
        || rules.is_insufficient_material()
    {
        GameResult::Draw
    } else {
        GameResult::Ongoing
    };
    debug!(%result, "Classified position");
    result
}
