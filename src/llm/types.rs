//! Shared types for chat backends

use super::LlmError;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Role in a conversation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

/// A message in a conversation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub text: String,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            text: text.into(),
        }
    }
}

/// A file attached to the conversation context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub path: PathBuf,
    pub content: String,
}

impl Attachment {
    /// Read a text file into an attachment
    pub fn read(path: &Path) -> Result<Self, LlmError> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read attachment {}", path.display()))?;
        Ok(Self {
            path: path.to_path_buf(),
            content,
        })
    }

    /// Render the attachment as a context block for the model
    pub fn as_context(&self) -> String {
        format!(
            "File: {}\n```\n{}\n```",
            self.path.display(),
            self.content.trim_end()
        )
    }
}

/// Conversation state kept by a backend between turns
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    history: Vec<Message>,
    attachments: Vec<Attachment>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn history(&self) -> &[Message] {
        &self.history
    }

    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    pub fn push(&mut self, message: Message) {
        self.history.push(message);
    }

    /// Attach a file; attaching the same path again refreshes its content
    pub fn attach(&mut self, attachment: Attachment) {
        match self
            .attachments
            .iter_mut()
            .find(|a| a.path == attachment.path)
        {
            Some(existing) => *existing = attachment,
            None => self.attachments.push(attachment),
        }
    }

    /// Context block describing all attached files, if any
    pub fn attachment_context(&self) -> Option<String> {
        if self.attachments.is_empty() {
            return None;
        }
        let blocks: Vec<String> = self.attachments.iter().map(Attachment::as_context).collect();
        Some(format!(
            "The user attached the following files:\n\n{}",
            blocks.join("\n\n")
        ))
    }

    pub fn clear(&mut self) {
        self.history.clear();
        self.attachments.clear();
    }
}
