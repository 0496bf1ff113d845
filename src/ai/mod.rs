//! Generative model services for image compositing and chat
//!
//! The pipeline talks to the model through two traits so the Gemini REST
//! clients can be swapped for in-memory mocks.

pub mod gemini;
pub mod mock;

pub use gemini::{GeminiChatClient, GeminiImageClient, GenerateContentResponse};
pub use mock::{MockChatClient, MockImageGenerationClient};

use crate::request::GenerationRequest;
use crate::session::ChatTurn;
use crate::Result;
use async_trait::async_trait;

#[async_trait]
pub trait ImageGenerationService: Send + Sync {
    /// Send one assembled request and return the raw reply.
    async fn generate_content(&self, request: &GenerationRequest) -> Result<GenerateContentResponse>;

    /// Whether an API credential is available. Checked before any work.
    fn has_credential(&self) -> bool {
        true
    }
}

#[async_trait]
pub trait ChatService: Send + Sync {
    /// Reply to the last user turn given the full conversation.
    async fn send_chat(&self, system_instruction: &str, history: &[ChatTurn]) -> Result<String>;

    fn has_credential(&self) -> bool {
        true
    }
}
