use super::client::GeminiHttpClient;
use super::types::{Content, GenerateContentResponse, InlineData, Part};
use crate::ai::ImageGenerationService;
use crate::request::{GenerationRequest, RequestPart};
use crate::Result;
use async_trait::async_trait;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct ImageRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: ImageGenerationConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageGenerationConfig {
    response_modalities: Vec<String>,
}

impl From<&GenerationRequest> for ImageRequest {
    fn from(request: &GenerationRequest) -> Self {
        let parts = request
            .parts
            .iter()
            .map(|part| match part {
                RequestPart::Image(image) => Part::InlineData {
                    inline_data: InlineData {
                        mime_type: image.mime_type.clone(),
                        data: image.data.clone(),
                    },
                },
                RequestPart::Text(text) => Part::Text { text: text.clone() },
            })
            .collect();

        Self {
            contents: vec![Content { role: None, parts }],
            generation_config: ImageGenerationConfig {
                response_modalities: request
                    .response_modalities
                    .iter()
                    .map(|m| m.as_str().to_string())
                    .collect(),
            },
        }
    }
}

/// Gemini implementation of [`ImageGenerationService`].
///
/// The model comes from each [`GenerationRequest`].
pub struct GeminiImageClient {
    http: GeminiHttpClient,
}

impl GeminiImageClient {
    pub fn new(api_key: String) -> Self {
        Self::new_with_client(api_key, reqwest::Client::new())
    }

    pub fn new_with_client(api_key: String, client: reqwest::Client) -> Self {
        Self {
            http: GeminiHttpClient::new_with_client(
                api_key,
                crate::request::IMAGE_MODEL.to_string(),
                client,
            ),
        }
    }
}

super::impl_gemini_builders!(GeminiImageClient);

#[async_trait]
impl ImageGenerationService for GeminiImageClient {
    async fn generate_content(&self, request: &GenerationRequest) -> Result<GenerateContentResponse> {
        let body = ImageRequest::from(request);

        tracing::info!(
            "Requesting image from {} with {} photo(s)",
            request.model,
            request.image_count()
        );

        self.http
            .generate_content_with_model(&request.model, &body)
            .await
    }

    fn has_credential(&self) -> bool {
        self.http.has_credential()
    }
}
