//! Colloquy: multi-agent conversations over run-based assistant threads.
//!
//! Each agent is a remote assistant. A turn starts a run on a conversation
//! thread, polls it to completion, executes the tool calls it asks for and
//! streams the messages it creates. A [`chat::GroupChat`] picks the next
//! speaker and decides when to stop.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use colloquy::prelude::*;
//! use futures::StreamExt;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> colloquy::error::Result<()> {
//! let config = ColloquyConfig::from_env();
//! let service: Arc<dyn RunService> = Arc::new(OpenAiAssistantsService::new(&config)?);
//!
//! let writer = AgentBuilder::new(
//!     Arc::clone(&service),
//!     AgentDefinition::builder()
//!         .model("gpt-4o")
//!         .name("Writer")
//!         .instructions("Write a short product blurb.")
//!         .build(),
//! )
//! .create()
//! .await?;
//!
//! let chat = Arc::new(GroupChat::new(vec![writer], GroupChatSettings::default().with_max_turns(1)));
//! let mut messages = chat.invoke(Some(ChatMessage::user("A solar lantern")), CancellationToken::new());
//! while let Some(message) = messages.next().await {
//!     println!("{}", message?.text());
//! }
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod channel;
pub mod chat;
pub mod config;
pub mod error;
pub mod prelude;
pub mod service;
pub mod strategy;
pub mod tools;
pub mod types;
pub mod util;

#[cfg(feature = "cli")]
pub mod cli;
