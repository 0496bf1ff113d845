//! Error handling and custom error types
//!
//! Provides unified error handling across the pipeline using thiserror.

use std::path::PathBuf;
use thiserror::Error;

/// Caller-facing input problems, reported before any API contact.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("no photos selected; add at least one photo of the people to composite")]
    NoImages,

    #[error("scenario text is empty; describe the background and situation")]
    EmptyScenario,

    #[error("API key is not configured; set GEMINI_API_KEY (or API_KEY)")]
    MissingCredential,

    #[error("chat message is empty")]
    EmptyMessage,

    #[error("no example scenario at index {0}")]
    InvalidExample(usize),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("A generation request is already in progress")]
    Busy,

    #[error("Failed to read image {}: {source}", .path.display())]
    Encoding {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Generation API error: {0}")]
    Transport(String),

    #[error("Model did not produce an image: {0}")]
    NoImageProduced(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invariant violation: {0}")]
    Invariant(String),
}

impl Error {
    /// Network or API-level failure. The user can act on it by checking
    /// their connection or credentials.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Http(_) | Error::Transport(_))
    }

    /// Single human-readable line shown to the user when an attempt fails.
    pub fn user_message(&self) -> String {
        match self {
            Error::Validation(e) => e.to_string(),
            Error::Busy => "Still generating, please wait for the current image.".to_string(),
            Error::Encoding { path, .. } => {
                format!("Could not read {}; nothing was sent.", path.display())
            }
            Error::NoImageProduced(_) => {
                "The AI did not generate an image. Try rephrasing the prompt or using different photos."
                    .to_string()
            }
            e if e.is_transport() => {
                "Image generation failed. Check your connection and API key, then try again."
                    .to_string()
            }
            other => format!("Something went wrong while generating the image: {}", other),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
