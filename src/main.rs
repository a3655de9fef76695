//! Strictly Chess - terminal front end

#![warn(missing_docs)]

mod cli;
mod console;

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Command};
use strictly_chess::{
    ChessConfig, ChessSession, Coach, LlmClient, LlmSuggester, PlayMode, ShakmatyRules,
};
use tokio::sync::mpsc;
use tracing::{info, instrument, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Logs go to stderr; stdout belongs to the board.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Play {
            config,
            pvp,
            ai_color,
        } => {
            let mut config = match config {
                Some(path) => ChessConfig::from_file(path)?,
                None => ChessConfig::default(),
            };
            if pvp {
                config = config.with_mode(PlayMode::Pvp);
            }
            if let Some(side) = ai_color {
                config = config.with_ai_color(side.into());
            }
            run_play(config).await
        }
        Command::Fen => print_start(),
    }
}

/// Play a game in the terminal
#[instrument(skip(config))]
async fn run_play(mut config: ChessConfig) -> Result<()> {
    let client = match config.create_llm_config() {
        Ok(llm) => Some(LlmClient::new(llm)),
        Err(e) => {
            warn!(error = %e, "No LLM available; AI moves and coaching disabled");
            config = config.without_ai();
            None
        }
    };

    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let mut session = ChessSession::new(ShakmatyRules::new(), config.session_options(), event_tx)?;

    if let Some(client) = &client {
        let suggester = LlmSuggester::new(config.model(), client.clone());
        session = session.with_suggester(Arc::new(suggester));
    }

    info!(mode = ?config.game_mode(), "Starting game");
    console::run(session, event_rx, client.map(Coach::new)).await
}

/// Print the starting snapshot as JSON
fn print_start() -> Result<()> {
    let (event_tx, _event_rx) = mpsc::unbounded_channel();
    let session = ChessSession::new(ShakmatyRules::new(), Default::default(), event_tx)?;
    println!("{}", serde_json::to_string_pretty(&*session.snapshot())?);
    Ok(())
}
