use super::gemini::types::{Candidate, Content, GenerateContentResponse, InlineData, Part};
use super::{ChatService, ImageGenerationService};
use crate::request::GenerationRequest;
use crate::session::ChatTurn;
use crate::{Error, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// A tiny valid 1x1 PNG, returned when no response is configured.
pub const TINY_PNG: [u8; 69] = [
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, // PNG signature
    0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52, // IHDR chunk
    0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, // 1x1 pixel
    0x08, 0x02, 0x00, 0x00, 0x00, 0x90, 0x77, 0x53, 0xDE, 0x00, 0x00, 0x00, 0x0C, 0x49,
    0x44, 0x41, // IDAT chunk
    0x54, 0x08, 0x99, 0x63, 0xF8, 0xCF, 0xC0, 0x00, 0x00, 0x00, 0x01, 0x00, 0x01, 0xE2,
    0x25, 0x00, 0xBC, 0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4E, // IEND chunk
    0x44, 0xAE, 0x42, 0x60, 0x82,
];

#[derive(Clone)]
enum MockReply {
    Response(GenerateContentResponse),
    Failure(String),
}

/// Build a reply whose single candidate holds the given parts.
pub fn response_with_parts(parts: Vec<Part>) -> GenerateContentResponse {
    GenerateContentResponse {
        candidates: vec![Candidate {
            content: Content {
                role: Some("model".to_string()),
                parts,
            },
            finish_reason: Some("STOP".to_string()),
        }],
        prompt_feedback: None,
    }
}

pub fn image_part(mime_type: &str, bytes: &[u8]) -> Part {
    use base64::Engine as _;
    Part::InlineData {
        inline_data: InlineData {
            mime_type: mime_type.to_string(),
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
        },
    }
}

#[derive(Clone)]
pub struct MockImageGenerationClient {
    replies: Arc<Mutex<Vec<MockReply>>>,
    requests: Arc<Mutex<Vec<GenerationRequest>>>,
    call_count: Arc<Mutex<usize>>,
    gate: Option<Arc<Notify>>,
    has_credential: bool,
}

impl MockImageGenerationClient {
    pub fn new() -> Self {
        Self {
            replies: Arc::new(Mutex::new(Vec::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
            call_count: Arc::new(Mutex::new(0)),
            gate: None,
            has_credential: true,
        }
    }

    /// Hold every request until `gate` is notified.
    pub fn with_gate(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn with_response(self, response: GenerateContentResponse) -> Self {
        self.replies
            .lock()
            .unwrap()
            .push(MockReply::Response(response));
        self
    }

    pub fn with_image_response(self, mime_type: &str, bytes: Vec<u8>) -> Self {
        self.with_response(response_with_parts(vec![image_part(mime_type, &bytes)]))
    }

    pub fn with_text_response(self, text: &str) -> Self {
        self.with_response(response_with_parts(vec![Part::Text {
            text: text.to_string(),
        }]))
    }

    pub fn with_failure(self, message: &str) -> Self {
        self.replies
            .lock()
            .unwrap()
            .push(MockReply::Failure(message.to_string()));
        self
    }

    pub fn without_credential(mut self) -> Self {
        self.has_credential = false;
        self
    }

    pub fn get_call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }

    pub fn last_request(&self) -> Option<GenerationRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

impl Default for MockImageGenerationClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImageGenerationService for MockImageGenerationClient {
    async fn generate_content(&self, request: &GenerationRequest) -> Result<GenerateContentResponse> {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        let mut count = self.call_count.lock().unwrap();
        *count += 1;
        self.requests.lock().unwrap().push(request.clone());

        let replies = self.replies.lock().unwrap();
        if replies.is_empty() {
            return Ok(response_with_parts(vec![image_part("image/png", &TINY_PNG)]));
        }

        let index = (*count - 1) % replies.len();
        match &replies[index] {
            MockReply::Response(response) => Ok(response.clone()),
            MockReply::Failure(message) => Err(Error::Transport(message.clone())),
        }
    }

    fn has_credential(&self) -> bool {
        self.has_credential
    }
}

#[derive(Clone)]
pub struct MockChatClient {
    replies: Arc<Mutex<Vec<String>>>,
    calls: Arc<Mutex<Vec<(String, Vec<ChatTurn>)>>>,
    fail: bool,
    has_credential: bool,
}

impl MockChatClient {
    pub fn new() -> Self {
        Self {
            replies: Arc::new(Mutex::new(Vec::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
            fail: false,
            has_credential: true,
        }
    }

    pub fn with_reply(self, reply: String) -> Self {
        self.replies.lock().unwrap().push(reply);
        self
    }

    pub fn with_failure(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn without_credential(mut self) -> Self {
        self.has_credential = false;
        self
    }

    pub fn get_call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// System instruction and history passed on the most recent call.
    pub fn last_call(&self) -> Option<(String, Vec<ChatTurn>)> {
        self.calls.lock().unwrap().last().cloned()
    }
}

impl Default for MockChatClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatService for MockChatClient {
    async fn send_chat(&self, system_instruction: &str, history: &[ChatTurn]) -> Result<String> {
        let mut calls = self.calls.lock().unwrap();
        calls.push((system_instruction.to_string(), history.to_vec()));

        if self.fail {
            return Err(Error::Transport("mock chat failure".to_string()));
        }

        let replies = self.replies.lock().unwrap();
        if replies.is_empty() {
            let last = history.last().map(|t| t.text.as_str()).unwrap_or_default();
            Ok(format!("echo: {}", last))
        } else {
            let index = (calls.len() - 1) % replies.len();
            Ok(replies[index].clone())
        }
    }

    fn has_credential(&self) -> bool {
        self.has_credential
    }
}
