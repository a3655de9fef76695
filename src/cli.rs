//! Command-line interface for strictly_chess.

use clap::{Parser, Subcommand, ValueEnum};
use strictly_chess::Color;

/// Strictly Chess - chess against humans or an LLM
#[derive(Parser, Debug)]
#[command(name = "strictly_chess")]
#[command(about = "Chess session with an LLM opponent and coach", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Play in the terminal
    Play {
        /// Path to a TOML session config; defaults apply when absent
        #[arg(short, long)]
        config: Option<std::path::PathBuf>,

        /// Two humans, no AI
        #[arg(long)]
        pvp: bool,

        /// Side the AI plays
        #[arg(long, value_enum)]
        ai_color: Option<Side>,
    },

    /// Print the starting snapshot as JSON
    Fen,
}

/// Side argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Side {
    /// White pieces
    White,
    /// Black pieces
    Black,
}

impl From<Side> for Color {
    fn from(side: Side) -> Self {
        match side {
            Side::White => Color::White,
            Side::Black => Color::Black,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_play_flags_parse() {
        let cli = Cli::parse_from(["strictly_chess", "play", "--pvp", "--ai-color", "white"]);
        match cli.command {
            Command::Play {
                config,
                pvp,
                ai_color,
            } => {
                assert!(config.is_none());
                assert!(pvp);
                assert_eq!(ai_color, Some(Side::White));
            }
            Command::Fen => panic!("expected play"),
        }
    }
}
