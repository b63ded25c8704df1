use serde::{Deserialize, Serialize};

use super::IndexEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

/// Ordered list of turns handed to a completion model.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatPrompt {
    messages: Vec<ChatMessage>,
}

impl ChatPrompt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn system(self, content: impl Into<String>) -> Self {
        self.push(ChatMessage::system(content))
    }

    pub fn user(self, content: impl Into<String>) -> Self {
        self.push(ChatMessage::user(content))
    }

    pub fn push(mut self, message: ChatMessage) -> Self {
        self.messages.push(message);
        self
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// One retrieved description and the image it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextItem {
    pub description: String,
    pub url: String,
}

/// Retrieved entries in ranked order, alive for a single question.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnswerContext {
    items: Vec<ContextItem>,
}

impl AnswerContext {
    pub fn from_entries(entries: impl IntoIterator<Item = IndexEntry>) -> Self {
        let items = entries
            .into_iter()
            .map(|entry| ContextItem {
                url: entry.url().unwrap_or_default().to_string(),
                description: entry.description,
            })
            .collect();
        Self { items }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn urls(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(|item| item.url.as_str())
    }

    /// Render every item as a `Description:` / `Image URL:` block, joined by `delimiter`.
    pub fn render(&self, delimiter: &str) -> String {
        self.items
            .iter()
            .map(|item| format!("Description: {}\nImage URL: {}", item.description, item.url))
            .collect::<Vec<_>>()
            .join(delimiter)
    }
}
