//! Group chat: agents taking turns over shared history.

pub mod group_chat;

pub use group_chat::{GroupChat, GroupChatSettings};
