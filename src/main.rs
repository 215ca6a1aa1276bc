//! Colloquy CLI binary entry point.

use std::sync::Arc;

use clap::Parser;
use colloquy::agent::{AgentBuilder, AgentDefinition};
use colloquy::chat::{GroupChat, GroupChatSettings};
use colloquy::cli::{ChatArgs, Cli, Commands};
use colloquy::config::ColloquyConfig;
use colloquy::error::ColloquyError;
use colloquy::service::{OpenAiAssistantsService, RunService};
use colloquy::strategy::{RegexTermination, SequentialSelection};
use colloquy::types::ChatMessage;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => ColloquyConfig::load(path),
        None => Ok(ColloquyConfig::from_env()),
    };

    let result = match config {
        Ok(config) => match cli.command {
            Commands::Chat(args) => handle_chat(config, args).await,
        },
        Err(e) => Err(e.into()),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn handle_chat(
    config: ColloquyConfig,
    args: ChatArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let service: Arc<dyn RunService> = Arc::new(OpenAiAssistantsService::new(&config)?);

    let mut agents = Vec::with_capacity(args.assistants.len());
    for id in &args.assistants {
        let agent = AgentBuilder::new(Arc::clone(&service), AgentDefinition::default())
            .with_polling(config.polling)
            .retrieve(id)
            .await?;
        agents.push(agent);
    }

    let mut settings = GroupChatSettings::default()
        .with_selection(SequentialSelection::new())
        .with_max_turns(args.max_turns);
    if let Some(pattern) = &args.stop {
        settings = settings.with_termination(RegexTermination::new([pattern])?);
    }

    let chat = Arc::new(GroupChat::new(agents, settings));
    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    let mut messages = chat.invoke(Some(ChatMessage::user(args.prompt)), cancel);
    while let Some(message) = messages.next().await {
        let message = match message {
            Ok(message) => message,
            Err(ColloquyError::TurnLimitExceeded(turns)) => {
                eprintln!("Stopped after {turns} turns without reaching the stop pattern");
                break;
            }
            Err(e) => return Err(e.into()),
        };
        let author = message.author_name.as_deref().unwrap_or("assistant");
        let text = message.text();
        if !text.is_empty() {
            println!("[{author}] {text}\n");
        }
        for file_id in message.file_ids() {
            println!("[{author}] file: {file_id}\n");
        }
    }

    Ok(())
}
