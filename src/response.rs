//! Extraction of the generated image from a `generateContent` reply.

use crate::ai::gemini::types::{GenerateContentResponse, Part};
use crate::models::GeneratedImage;
use crate::{Error, Result};

/// Return the first inline image of the first candidate.
///
/// Later parts and other candidates are never inspected. A reply without
/// an image is [`Error::NoImageProduced`], not a transport failure.
pub fn extract_image(response: &GenerateContentResponse) -> Result<GeneratedImage> {
    let candidate = response.candidates.first().ok_or_else(|| {
        let reason = response
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.as_deref())
            .map(|r| format!("response contained no candidates (blocked: {})", r))
            .unwrap_or_else(|| "response contained no candidates".to_string());
        Error::NoImageProduced(reason)
    })?;

    for part in &candidate.content.parts {
        match part {
            Part::InlineData { inline_data } => {
                tracing::debug!(
                    "Model returned image with mime_type: {} ({} base64 chars)",
                    inline_data.mime_type,
                    inline_data.data.len()
                );
                return Ok(GeneratedImage {
                    mime_type: inline_data.mime_type.clone(),
                    data: inline_data.data.clone(),
                });
            }
            Part::Text { text } => tracing::debug!("Response text: {}", text),
            Part::Other(_) => {}
        }
    }

    let reason = match candidate.finish_reason.as_deref() {
        Some(finish) => format!("first candidate had no inline image data (finish reason: {})", finish),
        None => "first candidate had no inline image data".to_string(),
    };
    Err(Error::NoImageProduced(reason))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(value: serde_json::Value) -> GenerateContentResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_returns_first_image_and_skips_later_ones() {
        let reply = response(serde_json::json!({
            "candidates": [
                {
                    "content": {
                        "parts": [
                            { "text": "Here is your selfie" },
                            { "inlineData": { "mimeType": "image/png", "data": "Zmlyc3Q=" } },
                            { "inlineData": { "mimeType": "image/jpeg", "data": "c2Vjb25k" } }
                        ]
                    }
                },
                {
                    "content": {
                        "parts": [
                            { "inlineData": { "mimeType": "image/webp", "data": "b3RoZXI=" } }
                        ]
                    }
                }
            ]
        }));

        let image = extract_image(&reply).unwrap();
        assert_eq!(image.mime_type, "image/png");
        assert_eq!(image.data, "Zmlyc3Q=");
        assert_eq!(image.data_uri(), "data:image/png;base64,Zmlyc3Q=");
    }

    #[test]
    fn test_ignores_images_in_later_candidates() {
        let reply = response(serde_json::json!({
            "candidates": [
                { "content": { "parts": [{ "text": "sorry" }] } },
                { "content": { "parts": [{ "inlineData": { "mimeType": "image/png", "data": "AA==" } }] } }
            ]
        }));

        let err = extract_image(&reply).unwrap_err();
        assert!(matches!(err, Error::NoImageProduced(_)));
    }

    #[test]
    fn test_text_only_reply_is_no_image_produced() {
        let reply = response(serde_json::json!({
            "candidates": [{
                "content": { "parts": [{ "text": "I can't do that" }] },
                "finishReason": "STOP"
            }]
        }));

        let err = extract_image(&reply).unwrap_err();
        assert!(matches!(err, Error::NoImageProduced(ref m) if m.contains("STOP")));
        assert!(!err.is_transport());
    }

    #[test]
    fn test_no_candidates() {
        let err = extract_image(&GenerateContentResponse::default()).unwrap_err();
        assert!(matches!(err, Error::NoImageProduced(ref m) if m.contains("no candidates")));
    }

    #[test]
    fn test_blocked_prompt_reason_is_reported() {
        let reply = response(serde_json::json!({
            "promptFeedback": { "blockReason": "PROHIBITED_CONTENT" }
        }));

        let err = extract_image(&reply).unwrap_err();
        assert!(matches!(err, Error::NoImageProduced(ref m) if m.contains("PROHIBITED_CONTENT")));
    }

    #[test]
    fn test_candidate_without_content() {
        let reply = response(serde_json::json!({
            "candidates": [{ "finishReason": "SAFETY" }]
        }));

        let err = extract_image(&reply).unwrap_err();
        assert!(matches!(err, Error::NoImageProduced(_)));
    }
}
