//! Conversions between thread records and conversation messages.

use crate::service::{FileRef, MessageContent, NewMessage, NewMessageContent, TextAnnotation, ThreadMessage};
use crate::types::{Annotation, AnnotationKind, ChatMessage, ContentItem, Role};

/// One [`ChatMessage`] per content item of a thread message.
///
/// Text becomes a text item followed by its annotations; an image file becomes
/// a file reference. Content kinds this client does not know are skipped.
pub(crate) fn to_chat_messages(message: &ThreadMessage, author: Option<&str>) -> Vec<ChatMessage> {
    message
        .content
        .iter()
        .filter_map(|content| {
            let items = match content {
                MessageContent::Text { text } => {
                    let mut items = vec![ContentItem::text(text.value.clone())];
                    items.extend(
                        text.annotations
                            .iter()
                            .filter_map(to_annotation)
                            .map(ContentItem::Annotation),
                    );
                    items
                }
                MessageContent::ImageFile { image_file } => {
                    vec![ContentItem::file(image_file.file_id.clone())]
                }
                MessageContent::Other => return None,
            };

            let mut chat = ChatMessage::new(message.role, items).with_id(message.id.clone());
            if let Some(author) = author {
                chat = chat.with_author(author);
            }
            if message.created_at.is_some() {
                chat.timestamp = message.created_at;
            }
            Some(chat)
        })
        .collect()
}

fn to_annotation(annotation: &TextAnnotation) -> Option<Annotation> {
    let (kind, quote, start_index, end_index, file) = match annotation {
        TextAnnotation::FileCitation {
            text,
            start_index,
            end_index,
            file_citation,
        } => (AnnotationKind::Citation, text, start_index, end_index, file_citation),
        TextAnnotation::FilePath {
            text,
            start_index,
            end_index,
            file_path,
        } => (AnnotationKind::FilePath, text, start_index, end_index, file_path),
        TextAnnotation::Other => return None,
    };
    Some(Annotation {
        kind,
        quote: quote.clone(),
        file_id: Some(file.file_id.clone()),
        start_index: *start_index,
        end_index: *end_index,
    })
}

/// The thread message for a history entry, or `None` when it has nothing to send.
///
/// Anything not authored by the user is appended with the assistant role.
pub(crate) fn to_new_message(message: &ChatMessage) -> Option<NewMessage> {
    let content: Vec<NewMessageContent> = message
        .content
        .iter()
        .filter_map(|item| match item {
            ContentItem::Text { text } if !text.trim().is_empty() => {
                Some(NewMessageContent::Text { text: text.clone() })
            }
            ContentItem::FileReference { file_id } => Some(NewMessageContent::ImageFile {
                image_file: FileRef {
                    file_id: file_id.clone(),
                },
            }),
            ContentItem::Text { .. } | ContentItem::Annotation(_) => None,
        })
        .collect();

    if content.is_empty() {
        return None;
    }
    let role = match message.role {
        Role::User => Role::User,
        Role::System | Role::Assistant => Role::Assistant,
    };
    Some(NewMessage { role, content })
}
