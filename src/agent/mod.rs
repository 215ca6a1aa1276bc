//! Agents: remote assistants and the tools they may call.

pub mod agent;
pub mod definition;

pub use agent::{Agent, AgentBuilder};
pub use definition::{AgentDefinition, HostedTool};
