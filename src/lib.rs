//! Strictly Chess library - a chess session orchestrator
//!
//! One [`ChessSession`] owns one game. It validates every move against a
//! [`RulesProvider`], keeps a single authoritative [`GameState`] snapshot,
//! and drives the AI's turn through an untrusted
//! [`MoveSuggestionProvider`].
//!
//! # Architecture
//!
//! - **Rules**: legality, notation, and end conditions (`strictly_chess_rules`)
//! - **Session**: move workflow, selection, reset, and events
//! - **AI turn**: single-flight suggestion requests with timeout and retry
//! - **LLM**: suggestion and coaching backends (OpenAI, Anthropic, Gemini)
//!
//! # Example
//!
//! ```no_run
//! use strictly_chess::{ChessSession, Position, SessionOptions, ShakmatyRules};
//!
//! # fn example() -> anyhow::Result<()> {
//! let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
//! let session = ChessSession::new(ShakmatyRules::new(), SessionOptions::default(), tx)?;
//! let state = session.submit_move(
//!     Position::from_algebraic("e2")?,
//!     Position::from_algebraic("e4")?,
//! )?;
//! assert_eq!(state.move_history(), &["e4"]);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod ai_turn;
mod coach;
mod config;
mod error;
mod llm_client;
mod session;
mod state;
mod status;
mod store;
mod suggestion;

// Crate-level exports - Rules
pub use strictly_chess_rules::{
    Board, CastlingRights, CastlingRightsByColor, Color, CoordinateError, Fen, GameResult, Piece,
    PieceKind, Position, RulesError, RulesProvider, START_FEN, ShakmatyRules,
};

// Crate-level exports - Session
pub use ai_turn::{AiPhase, AiTurnError, AiTurnOutcome};
pub use error::{IllegalMove, MoveError};
pub use session::{ChessSession, GameMode, Mover, Selection, SessionEvent, SessionOptions};
pub use state::GameState;
pub use status::classify;
pub use store::GameStateStore;

// Crate-level exports - Configuration
pub use config::{ChessConfig, ConfigError, PlayMode, default_model};

// Crate-level exports - LLM
pub use coach::{Coach, EXPLANATION_FALLBACK, TIP_FALLBACK};
pub use llm_client::{LlmClient, LlmConfig, LlmError, LlmProvider};
pub use suggestion::{LlmSuggester, MoveSuggestionProvider, SuggestionError, parse_suggestion};
