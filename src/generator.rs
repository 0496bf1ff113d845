//! The generation pipeline exposed to the UI layer.
//!
//! One attempt runs validate → encode → assemble → request → extract and
//! either yields an image or a single error. Nothing is retried.

use crate::ai::{ChatService, GeminiChatClient, GeminiImageClient, ImageGenerationService};
use crate::encoder;
use crate::error::ValidationError;
use crate::models::{Config, GeneratedImage, UploadedImage};
use crate::request::assemble_request;
use crate::response::extract_image;
use crate::session::{ChatSession, CHAT_MODEL};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

/// Where an attempt currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Validating,
    Encoding,
    Requesting,
    Extracting,
    Succeeded,
    Failed,
}

/// Injectable service bundle used to construct [`Generator`] in tests.
pub struct GeneratorServices {
    pub image_gen: Arc<dyn ImageGenerationService>,
    pub chat: Arc<dyn ChatService>,
}

#[derive(Clone)]
pub struct Generator {
    image_gen: Arc<dyn ImageGenerationService>,
    chat: Arc<dyn ChatService>,
}

impl Generator {
    pub fn with_services(services: GeneratorServices) -> Self {
        Self {
            image_gen: services.image_gen,
            chat: services.chat,
        }
    }

    /// Build Gemini-backed services from configuration.
    ///
    /// A missing key still produces a generator; every attempt is then
    /// rejected with [`ValidationError::MissingCredential`].
    pub fn from_config(config: &Config) -> Self {
        // Reuse one HTTP connection pool across both clients.
        let http_client = reqwest::Client::new();
        let api_key = config.api_key.clone().unwrap_or_default();

        let image_gen = GeminiImageClient::new_with_client(api_key.clone(), http_client.clone())
            .with_base_url(config.base_url.clone())
            .with_timeout(config.request_timeout);
        let chat = GeminiChatClient::new_with_client(api_key, CHAT_MODEL.to_string(), http_client)
            .with_base_url(config.base_url.clone())
            .with_timeout(config.request_timeout);

        Self::with_services(GeneratorServices {
            image_gen: Arc::new(image_gen),
            chat: Arc::new(chat),
        })
    }

    /// Composite `files` into the scene described by `scenario`.
    pub async fn submit_generation(
        &self,
        files: &[UploadedImage],
        scenario: &str,
    ) -> Result<GeneratedImage> {
        self.run(files, scenario, None).await
    }

    /// Like [`Generator::submit_generation`], reading the photos from disk.
    ///
    /// Input is validated before any file is opened.
    pub async fn submit_generation_from_paths(
        &self,
        paths: &[PathBuf],
        scenario: &str,
    ) -> Result<GeneratedImage> {
        self.validate(paths.len(), scenario)?;
        let files = encoder::load_all(paths).await?;
        self.submit_generation(&files, scenario).await
    }

    /// Run one attempt, publishing phase changes to `progress` if given.
    pub async fn run(
        &self,
        files: &[UploadedImage],
        scenario: &str,
        progress: Option<&watch::Sender<Phase>>,
    ) -> Result<GeneratedImage> {
        let report = |phase: Phase| {
            if let Some(tx) = progress {
                tx.send_replace(phase);
            }
        };

        let outcome = self.attempt(files, scenario, &report).await;

        match &outcome {
            Ok(image) => {
                info!("Generated {} image", image.mime_type);
                report(Phase::Succeeded);
            }
            Err(e) => {
                warn!("Generation failed: {}", e);
                report(Phase::Failed);
            }
        }
        report(Phase::Idle);

        outcome
    }

    async fn attempt(
        &self,
        files: &[UploadedImage],
        scenario: &str,
        report: &(dyn Fn(Phase) + Send + Sync),
    ) -> Result<GeneratedImage> {
        report(Phase::Validating);
        self.validate(files.len(), scenario)?;

        report(Phase::Encoding);
        let parts = encoder::encode_all(files);
        let request = assemble_request(parts, scenario)?;
        info!(
            "Assembled request: {} photo(s), prompt {} chars",
            request.image_count(),
            request.prompt().map(str::len).unwrap_or(0)
        );

        report(Phase::Requesting);
        let response = self.image_gen.generate_content(&request).await?;

        report(Phase::Extracting);
        extract_image(&response)
    }

    /// Open a chat session with the bilingual assistant persona.
    pub fn begin_chat_session(&self) -> Result<ChatSession> {
        if !self.chat.has_credential() {
            return Err(ValidationError::MissingCredential.into());
        }
        Ok(ChatSession::new(Arc::clone(&self.chat)))
    }

    fn validate(&self, file_count: usize, scenario: &str) -> Result<()> {
        if file_count == 0 {
            return Err(ValidationError::NoImages.into());
        }
        if scenario.trim().is_empty() {
            return Err(ValidationError::EmptyScenario.into());
        }
        if !self.image_gen.has_credential() {
            return Err(ValidationError::MissingCredential.into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{MockChatClient, MockImageGenerationClient};
    use crate::Error;

    fn generator(image_gen: MockImageGenerationClient) -> Generator {
        Generator::with_services(GeneratorServices {
            image_gen: Arc::new(image_gen),
            chat: Arc::new(MockChatClient::new()),
        })
    }

    fn jpeg(name: &str) -> UploadedImage {
        UploadedImage::new(name, vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00])
    }

    #[tokio::test]
    async fn test_success_returns_first_image() {
        let image_gen =
            MockImageGenerationClient::new().with_image_response("image/jpeg", vec![9, 9]);
        let recorder = image_gen.clone();

        let image = generator(image_gen)
            .submit_generation(&[jpeg("me.jpg")], "sunset beach")
            .await
            .unwrap();

        assert_eq!(image.mime_type, "image/jpeg");
        assert_eq!(image.decode().unwrap(), vec![9, 9]);
        assert_eq!(recorder.get_call_count(), 1);
    }

    #[tokio::test]
    async fn test_validation_order_and_no_api_contact() {
        let image_gen = MockImageGenerationClient::new().without_credential();
        let recorder = image_gen.clone();
        let generator = generator(image_gen);

        let err = generator.submit_generation(&[], "").await.unwrap_err();
        assert!(matches!(err, Error::Validation(ValidationError::NoImages)));

        let err = generator
            .submit_generation(&[jpeg("a.jpg")], " ")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(ValidationError::EmptyScenario)));

        let err = generator
            .submit_generation(&[jpeg("a.jpg")], "beach")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(ValidationError::MissingCredential)));

        assert_eq!(recorder.get_call_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_credential_checked_before_reading_files() {
        let generator = generator(MockImageGenerationClient::new().without_credential());

        let err = generator
            .submit_generation_from_paths(&[PathBuf::from("/does/not/exist.jpg")], "beach")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(ValidationError::MissingCredential)));
    }

    #[tokio::test]
    async fn test_unreadable_file_aborts_before_request() {
        let image_gen = MockImageGenerationClient::new();
        let recorder = image_gen.clone();

        let err = generator(image_gen)
            .submit_generation_from_paths(&[PathBuf::from("/does/not/exist.jpg")], "beach")
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Encoding { .. }));
        assert_eq!(recorder.get_call_count(), 0);
    }

    #[tokio::test]
    async fn test_transport_failure_is_not_retried() {
        let image_gen = MockImageGenerationClient::new().with_failure("503");
        let recorder = image_gen.clone();

        let err = generator(image_gen)
            .submit_generation(&[jpeg("a.jpg")], "beach")
            .await
            .unwrap_err();

        assert!(err.is_transport());
        assert_eq!(recorder.get_call_count(), 1);
    }

    #[tokio::test]
    async fn test_progress_ends_idle() {
        let (tx, rx) = watch::channel(Phase::Idle);
        let generator = generator(MockImageGenerationClient::new().with_text_response("nope"));

        let err = generator
            .run(&[jpeg("a.jpg")], "beach", Some(&tx))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::NoImageProduced(_)));
        assert_eq!(*rx.borrow(), Phase::Idle);
    }

    #[test]
    fn test_chat_session_requires_credential() {
        let generator = Generator::with_services(GeneratorServices {
            image_gen: Arc::new(MockImageGenerationClient::new()),
            chat: Arc::new(MockChatClient::new().without_credential()),
        });
        assert!(matches!(
            generator.begin_chat_session().err(),
            Some(Error::Validation(ValidationError::MissingCredential))
        ));
    }

    #[test]
    fn test_from_config_without_key_has_no_credential() {
        let generator = Generator::from_config(&Config::default());
        assert!(generator.begin_chat_session().is_err());
    }
}
