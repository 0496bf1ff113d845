//! Assembly of the single outbound generation request.

use crate::error::ValidationError;
use crate::models::EncodedImagePart;
use crate::prompts::compose_prompt;
use crate::Result;
use serde::{Deserialize, Serialize};

/// Image model used for compositing.
pub const IMAGE_MODEL: &str = "gemini-2.5-flash-image-preview";

/// Output modalities requested from the model.
pub const RESPONSE_MODALITIES: [Modality; 2] = [Modality::Image, Modality::Text];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Modality {
    Image,
    Text,
}

impl Modality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Modality::Image => "IMAGE",
            Modality::Text => "TEXT",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestPart {
    Image(EncodedImagePart),
    Text(String),
}

/// Photos in upload order followed by exactly one text instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub model: String,
    pub parts: Vec<RequestPart>,
    pub response_modalities: Vec<Modality>,
}

impl GenerationRequest {
    pub fn image_count(&self) -> usize {
        self.parts
            .iter()
            .filter(|p| matches!(p, RequestPart::Image(_)))
            .count()
    }

    /// The composed instruction (always the final part).
    pub fn prompt(&self) -> Option<&str> {
        match self.parts.last() {
            Some(RequestPart::Text(text)) => Some(text),
            _ => None,
        }
    }
}

/// Build the request for `images` and the user's scenario text.
///
/// Rejects an empty image list or blank scenario before anything is built.
pub fn assemble_request(images: Vec<EncodedImagePart>, scenario: &str) -> Result<GenerationRequest> {
    if images.is_empty() {
        return Err(ValidationError::NoImages.into());
    }
    if scenario.trim().is_empty() {
        return Err(ValidationError::EmptyScenario.into());
    }

    let prompt = compose_prompt(images.len(), scenario);

    let mut parts: Vec<RequestPart> = images.into_iter().map(RequestPart::Image).collect();
    parts.push(RequestPart::Text(prompt));

    Ok(GenerationRequest {
        model: IMAGE_MODEL.to_string(),
        parts,
        response_modalities: RESPONSE_MODALITIES.to_vec(),
    })
}
