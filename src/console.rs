//! Line-based terminal play.

use std::sync::Arc;

use anyhow::Result;
use strictly_chess::{ChessSession, Coach, GameState, Position, SessionEvent};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, instrument, warn};

const DEFAULT_FOCUS: &str = "key threats and opportunities";

const HELP: &str = "\
Commands:
  e2 e4          move from e2 to e4
  select e2      list legal destinations of e2
  ai             ask the AI to move
  explain [..]   explain the position, optionally naming a focus
  tip <san>      teaching tip for a move in this position
  board          print the board
  json           print the snapshot as JSON
  reset          start over
  quit           leave";

/// One parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    /// Play a move.
    Move(Position, Position),
    /// Show legal destinations.
    Select(Position),
    /// Start the AI's turn.
    Ai,
    /// Explain the position.
    Explain(Option<String>),
    /// Teaching tip for a SAN move.
    Tip(String),
    /// Print the board.
    Board,
    /// Print JSON.
    Json,
    /// New game.
    Reset,
    /// Show commands.
    Help,
    /// Leave.
    Quit,
}

impl ConsoleCommand {
    /// Parses a line; `Err` carries the message to show.
    pub fn parse(line: &str) -> Result<Self, String> {
        let words: Vec<&str> = line.split_whitespace().collect();
        let square = |s: &&str| Position::from_algebraic(s).map_err(|e| e.to_string());

        match words.as_slice() {
            ["ai"] => Ok(Self::Ai),
            ["board"] => Ok(Self::Board),
            ["json"] => Ok(Self::Json),
            ["reset"] => Ok(Self::Reset),
            ["help"] | ["?"] => Ok(Self::Help),
            ["quit"] | ["exit"] => Ok(Self::Quit),
            ["explain"] => Ok(Self::Explain(None)),
            ["explain", focus @ ..] => Ok(Self::Explain(Some(focus.join(" ")))),
            ["tip", san] => Ok(Self::Tip((*san).to_string())),
            ["select", at] => Ok(Self::Select(square(at)?)),
            [from, to] => Ok(Self::Move(square(from)?, square(to)?)),
            [] => Err("Type a command, or 'help'".to_string()),
            _ => Err(format!("Unknown command: {}", line.trim())),
        }
    }
}

/// Runs the console until `quit` or end of input.
#[instrument(skip_all)]
pub async fn run(
    session: ChessSession,
    events: mpsc::UnboundedReceiver<SessionEvent>,
    coach: Option<Coach>,
) -> Result<()> {
    let printer = tokio::spawn(print_events(events));

    print_state(&session.snapshot());
    println!("{}", HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let command = match ConsoleCommand::parse(&line) {
            Ok(command) => command,
            Err(message) => {
                println!("{}", message);
                continue;
            }
        };
        debug!(?command, "Console command");

        match command {
            ConsoleCommand::Move(from, to) => match session.submit_move(from, to) {
                Ok(_) => {}
                Err(e) if e.is_illegal() => println!("{}", e),
                Err(e) => {
                    warn!(error = %e, "Move failed");
                    println!("Move failed: {}", e);
                }
            },
            ConsoleCommand::Select(square) => {
                let targets: Vec<String> = session
                    .select_square(square)
                    .iter()
                    .map(ToString::to_string)
                    .collect();
                if targets.is_empty() {
                    println!("No moves from {}", square);
                } else {
                    println!("{} -> {}", square, targets.join(" "));
                }
            }
            ConsoleCommand::Ai => {
                if session.request_ai_move().is_none() {
                    println!("The AI cannot move now");
                }
            }
            ConsoleCommand::Explain(focus) => match &coach {
                Some(coach) => {
                    let focus = focus.as_deref().unwrap_or(DEFAULT_FOCUS);
                    let text = coach
                        .explain_position(&session.position_encoding(), focus)
                        .await;
                    println!("{}", text);
                }
                None => println!("Coaching needs an LLM API key"),
            },
            ConsoleCommand::Tip(san) => match &coach {
                Some(coach) => {
                    let text = coach.teaching_tip(&session.position_encoding(), &san).await;
                    println!("{}", text);
                }
                None => println!("Coaching needs an LLM API key"),
            },
            ConsoleCommand::Board => print_state(&session.snapshot()),
            ConsoleCommand::Json => println!("{}", serde_json::to_string_pretty(&*session.snapshot())?),
            ConsoleCommand::Reset => {
                session.reset()?;
            }
            ConsoleCommand::Help => println!("{}", HELP),
            ConsoleCommand::Quit => break,
        }
    }

    printer.abort();
    Ok(())
}

async fn print_events(mut events: mpsc::UnboundedReceiver<SessionEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            SessionEvent::MoveMade {
                mover,
                notation,
                state,
            } => {
                println!("{:?} played {}", mover, notation);
                print_state(&state);
            }
            SessionEvent::AiThinking(true) => println!("AI is thinking..."),
            SessionEvent::AiThinking(false) => {}
            SessionEvent::AiUnavailable(e) => println!("AI unavailable ({}); your move", e),
            SessionEvent::GameOver(result) => println!("Game over: {}", result),
            SessionEvent::Reset { .. } => println!("New game"),
        }
    }
}

fn print_state(state: &Arc<GameState>) {
    println!("{}", state.board().display());
    println!("{} to move", state.turn());
}
