//! Conversation message types shared by channels and the group chat.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A message in a conversation.
///
/// Messages are append-only once they reach shared history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: Vec<ContentItem>,
    /// Display name of the participant that authored the message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,
    /// Remote message id, when the message came from a thread.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl ChatMessage {
    /// Create a message with the given role and content.
    pub fn new(role: Role, content: Vec<ContentItem>) -> Self {
        Self {
            role,
            content,
            author_name: None,
            id: None,
            timestamp: Some(Utc::now()),
        }
    }

    /// Create a system message.
    pub fn system(text: impl Into<String>) -> Self {
        Self::new(Role::System, vec![ContentItem::text(text)])
    }

    /// Create a user message.
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, vec![ContentItem::text(text)])
    }

    /// Create an assistant message.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, vec![ContentItem::text(text)])
    }

    /// Set the author name.
    pub fn with_author(mut self, name: impl Into<String>) -> Self {
        self.author_name = Some(name.into());
        self
    }

    /// Set the remote message id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Concatenate all text items.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|item| match item {
                ContentItem::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("")
    }

    /// Whether any item carries content worth sending to a thread.
    pub fn has_content(&self) -> bool {
        self.content.iter().any(|item| match item {
            ContentItem::Text { text } => !text.trim().is_empty(),
            ContentItem::FileReference { .. } => true,
            ContentItem::Annotation(_) => false,
        })
    }

    /// File ids referenced by this message.
    pub fn file_ids(&self) -> Vec<&str> {
        self.content
            .iter()
            .filter_map(|item| match item {
                ContentItem::FileReference { file_id } => Some(file_id.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Annotations attached to text items.
    pub fn annotations(&self) -> Vec<&Annotation> {
        self.content
            .iter()
            .filter_map(|item| match item {
                ContentItem::Annotation(annotation) => Some(annotation),
                _ => None,
            })
            .collect()
    }
}

/// Conversation role.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single item of message content.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentItem {
    Text { text: String },
    FileReference { file_id: String },
    Annotation(Annotation),
}

impl ContentItem {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn file(file_id: impl Into<String>) -> Self {
        Self::FileReference {
            file_id: file_id.into(),
        }
    }
}

/// Citation metadata attached to generated text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Annotation {
    pub kind: AnnotationKind,
    /// The span of generated text the annotation replaces.
    pub quote: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_index: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_index: Option<u32>,
}

/// What an annotation points at.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationKind {
    /// A quote from a searchable file.
    Citation,
    /// A file generated during the run (e.g. by the code interpreter).
    FilePath,
}
