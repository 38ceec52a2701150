//! Echo backend - offline provider for tests and demos
//!
//! Replies with the user's turn, prefixed with the number of attached files.
//! No network access; any non-empty credential is accepted.

use super::{Attachment, ChatBackend, Conversation, LlmError, Message, SessionResetError};
use async_trait::async_trait;
use std::path::Path;

pub struct EchoBackend {
    conversation: Conversation,
    fail_reset: bool,
}

impl EchoBackend {
    pub fn new(credential: &str) -> Result<Self, LlmError> {
        if credential.trim().is_empty() {
            return Err(LlmError::InvalidCredential(
                "Echo credential is empty".to_string(),
            ));
        }
        Ok(Self {
            conversation: Conversation::new(),
            fail_reset: false,
        })
    }

    /// Make every `reset` fail, to exercise the rebuild path
    pub fn with_failing_reset(mut self) -> Self {
        self.fail_reset = true;
        self
    }
}

#[async_trait]
impl ChatBackend for EchoBackend {
    fn name(&self) -> &str {
        "echo"
    }

    fn reset(&mut self) -> Result<(), SessionResetError> {
        if self.fail_reset {
            return Err(SessionResetError("echo backend refuses to reset".to_string()));
        }
        self.conversation.clear();
        Ok(())
    }

    fn attach_file(&mut self, path: &Path) -> Result<(), LlmError> {
        self.conversation.attach(Attachment::read(path)?);
        Ok(())
    }

    async fn send(&mut self, turn: &str) -> Result<String, LlmError> {
        let reply = match self.conversation.attachments().len() {
            0 => turn.to_string(),
            n => format!("[{} attached] {}", n, turn),
        };
        self.conversation.push(Message::user(turn));
        self.conversation.push(Message::model(reply.clone()));
        Ok(reply)
    }

    fn history(&self) -> &[Message] {
        self.conversation.history()
    }
}
