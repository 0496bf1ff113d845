//! AI selfie generator - composites uploaded portraits into a described scene
//!
//! Encodes the user's photos, wraps their scenario text in an identity
//! preserving prompt, sends both to Gemini's image model and hands back
//! the first image the model returns.

pub mod ai;
pub mod app;
pub mod encoder;
pub mod error;
pub mod generator;
pub mod models;
pub mod prompts;
pub mod request;
pub mod response;
pub mod session;

pub use error::{Error, Result, ValidationError};
pub use generator::{Generator, GeneratorServices, Phase};
