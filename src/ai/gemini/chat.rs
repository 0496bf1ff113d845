use super::client::GeminiHttpClient;
use super::types::{Content, GenerateContentResponse, Part};
use crate::ai::ChatService;
use crate::session::{ChatRole, ChatTurn};
use crate::{Error, Result};
use async_trait::async_trait;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct ChatRequest {
    system_instruction: Option<Content>,
    contents: Vec<Content>,
}

pub struct GeminiChatClient {
    http: GeminiHttpClient,
}

impl GeminiChatClient {
    pub fn new(api_key: String, model: String) -> Self {
        Self::new_with_client(api_key, model, reqwest::Client::new())
    }

    pub fn new_with_client(api_key: String, model: String, client: reqwest::Client) -> Self {
        Self {
            http: GeminiHttpClient::new_with_client(api_key, model, client),
        }
    }

    fn extract_text(response: &GenerateContentResponse) -> Option<String> {
        response.candidates.first().and_then(|c| {
            c.content.parts.iter().find_map(|p| match p {
                Part::Text { text } => Some(text.clone()),
                _ => None,
            })
        })
    }
}

super::impl_gemini_builders!(GeminiChatClient);

fn turn_to_content(turn: &ChatTurn) -> Content {
    let role = match turn.role {
        ChatRole::User => "user",
        ChatRole::Model => "model",
    };
    Content {
        role: Some(role.to_string()),
        parts: vec![Part::Text {
            text: turn.text.clone(),
        }],
    }
}

#[async_trait]
impl ChatService for GeminiChatClient {
    async fn send_chat(&self, system_instruction: &str, history: &[ChatTurn]) -> Result<String> {
        let request = ChatRequest {
            system_instruction: Some(Content {
                role: None,
                parts: vec![Part::Text {
                    text: system_instruction.to_string(),
                }],
            }),
            contents: history.iter().map(turn_to_content).collect(),
        };

        tracing::debug!(
            "Sending chat with {} turn(s) to {}",
            history.len(),
            self.http.model()
        );

        let response: GenerateContentResponse = self.http.generate_content(&request).await?;

        Self::extract_text(&response)
            .ok_or_else(|| Error::Transport("No text in Gemini chat response".to_string()))
    }

    fn has_credential(&self) -> bool {
        self.http.has_credential()
    }
}
