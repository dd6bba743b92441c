use crate::game::GameMode;
use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "twentyq")]
#[command(author, version, about = "20 Questions against an LLM, in either direction", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP game server
    Serve {
        /// Bind address, overrides server.bind_addr
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Play a game in the terminal
    Play {
        /// Category (random when omitted)
        #[arg(short, long)]
        category: Option<String>,

        /// Who holds the secret
        #[arg(short, long, value_enum, default_value = "guess")]
        mode: PlayMode,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum PlayMode {
    /// You ask, the AI answers
    Guess,
    /// The AI asks, you answer
    AiGuessing,
}

impl From<PlayMode> for GameMode {
    fn from(mode: PlayMode) -> Self {
        match mode {
            PlayMode::Guess => GameMode::Guess,
            PlayMode::AiGuessing => GameMode::AiGuessing,
        }
    }
}
