//! Multi-turn chat session with the bilingual assistant persona.
//!
//! The session keeps the whole conversation and replays it on every turn;
//! nothing is summarized or evicted.

use crate::ai::ChatService;
use crate::error::ValidationError;
use crate::{prompts, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Model used for chat sessions.
pub const CHAT_MODEL: &str = "gemini-2.5-flash";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Model,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub text: String,
}

impl ChatTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Model,
            text: text.into(),
        }
    }
}

pub struct ChatSession {
    service: Arc<dyn ChatService>,
    system_instruction: String,
    history: Vec<ChatTurn>,
}

impl ChatSession {
    pub fn new(service: Arc<dyn ChatService>) -> Self {
        Self {
            service,
            system_instruction: prompts::CHAT_SYSTEM.to_string(),
            history: Vec::new(),
        }
    }

    pub fn system_instruction(&self) -> &str {
        &self.system_instruction
    }

    pub fn history(&self) -> &[ChatTurn] {
        &self.history
    }

    /// Send one user message and return the assistant's reply.
    ///
    /// If the call fails the user turn is dropped again so the history
    /// only ever holds completed exchanges.
    pub async fn send_message(&mut self, text: &str) -> Result<String> {
        if text.trim().is_empty() {
            return Err(ValidationError::EmptyMessage.into());
        }

        self.history.push(ChatTurn::user(text));

        match self
            .service
            .send_chat(&self.system_instruction, &self.history)
            .await
        {
            Ok(reply) => {
                self.history.push(ChatTurn::model(reply.clone()));
                Ok(reply)
            }
            Err(e) => {
                self.history.pop();
                tracing::warn!("Chat turn failed: {}", e);
                Err(e)
            }
        }
    }
}
