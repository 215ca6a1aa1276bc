//! CLI definitions for the `colloquy` binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Colloquy CLI
#[derive(Parser, Debug)]
#[command(name = "colloquy", version, about = "Multi-agent chats over assistant threads")]
pub struct Cli {
    /// TOML config file; environment variables are used when absent
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a round-robin group chat between existing assistants
    Chat(ChatArgs),
}

/// Arguments for the `chat` subcommand.
#[derive(Parser, Debug)]
pub struct ChatArgs {
    /// Assistant id to take part (repeat for more agents, in turn order)
    #[arg(short, long = "assistant", required = true)]
    pub assistants: Vec<String>,

    /// Maximum number of turns
    #[arg(long, default_value_t = 6)]
    pub max_turns: usize,

    /// Stop once a message matches this regex
    #[arg(long)]
    pub stop: Option<String>,

    /// Opening user message
    pub prompt: String,
}
