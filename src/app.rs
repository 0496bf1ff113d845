//! Controller owning the session state for the photo compositing flow.
//!
//! All state lives in one serializable [`AppState`]; the UI layer calls
//! the transition methods and renders whatever the state says.

use crate::error::ValidationError;
use crate::generator::{Generator, Phase};
use crate::models::{Config, GeneratedImage, UploadedImage};
use crate::prompts::EXAMPLE_SCENARIOS;
use crate::session::ChatSession;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::{oneshot, watch};
use tracing::{error, info};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppState {
    pub files: Vec<UploadedImage>,
    pub scenario_text: String,
    pub phase: Phase,
    pub busy: bool,
    pub result: Option<GeneratedImage>,
    pub error: Option<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            files: Vec::new(),
            scenario_text: String::new(),
            phase: Phase::Idle,
            busy: false,
            result: None,
            error: None,
        }
    }
}

/// The attempt currently running on the tokio runtime.
///
/// The outcome arrives once on `outcome`; `progress` follows the
/// pipeline phases while it runs.
struct InFlight {
    outcome: oneshot::Receiver<Result<GeneratedImage>>,
    progress: watch::Receiver<Phase>,
}

pub struct App {
    state: AppState,
    generator: Generator,
    in_flight: Option<InFlight>,
}

impl App {
    pub fn with_generator(generator: Generator) -> Self {
        Self {
            state: AppState::default(),
            generator,
            in_flight: None,
        }
    }

    /// Construct an app from environment configuration (`Config::from_env`).
    pub fn new() -> Result<Self> {
        let config = Config::from_env()?;
        if config.api_key.is_none() {
            info!("No API key configured; generation requests will be rejected");
        }
        Ok(Self::with_generator(Generator::from_config(&config)))
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn generator(&self) -> &Generator {
        &self.generator
    }

    /// Phase updates of the running attempt, if there is one.
    pub fn progress(&self) -> Option<watch::Receiver<Phase>> {
        self.in_flight.as_ref().map(|f| f.progress.clone())
    }

    pub fn select_files(&mut self, files: Vec<UploadedImage>) -> Result<()> {
        self.ensure_idle()?;
        info!("Selected {} photo(s)", files.len());
        self.state.files = files;
        Ok(())
    }

    pub fn set_scenario_text(&mut self, text: impl Into<String>) -> Result<()> {
        self.ensure_idle()?;
        self.state.scenario_text = text.into();
        Ok(())
    }

    /// Fill the scenario with one of [`EXAMPLE_SCENARIOS`].
    pub fn use_example(&mut self, index: usize) -> Result<()> {
        let example = EXAMPLE_SCENARIOS
            .get(index)
            .ok_or(ValidationError::InvalidExample(index))?;
        self.set_scenario_text(*example)
    }

    /// Begin an attempt with the current files and scenario.
    ///
    /// Fails with [`Error::Busy`] while another attempt is in flight. The
    /// outcome is recorded by [`App::poll_finished`] or
    /// [`App::await_current`], or by the next transition once the task
    /// has ended.
    pub fn start_generation(&mut self) -> Result<()> {
        self.ensure_idle()?;

        self.state.busy = true;
        self.state.phase = Phase::Validating;
        self.state.result = None;
        self.state.error = None;

        let generator = self.generator.clone();
        let files = self.state.files.clone();
        let scenario = self.state.scenario_text.clone();
        let (progress_tx, progress_rx) = watch::channel(Phase::Validating);
        let (outcome_tx, outcome_rx) = oneshot::channel();

        tokio::spawn(async move {
            let outcome = generator.run(&files, &scenario, Some(&progress_tx)).await;
            // Receiver dropped means the app itself is gone.
            let _ = outcome_tx.send(outcome);
            drop(progress_tx);
        });

        self.in_flight = Some(InFlight {
            outcome: outcome_rx,
            progress: progress_rx,
        });
        Ok(())
    }

    /// Copy the running attempt's phase into the state and record its
    /// outcome if it has ended. Returns `true` once nothing is in flight.
    pub fn poll_finished(&mut self) -> bool {
        let Some(in_flight) = self.in_flight.as_mut() else {
            return true;
        };

        let phase = *in_flight.progress.borrow();
        // The pipeline reports Idle just before handing over its outcome.
        if phase != Phase::Idle {
            self.state.phase = phase;
        }

        let outcome = match in_flight.outcome.try_recv() {
            Ok(outcome) => outcome,
            Err(oneshot::error::TryRecvError::Empty) => return false,
            Err(oneshot::error::TryRecvError::Closed) => Err(lost_task()),
        };
        self.finish_generation(outcome);
        true
    }

    /// Wait for the running attempt, if any, and record its outcome.
    pub async fn await_current(&mut self) -> &AppState {
        if let Some(in_flight) = self.in_flight.take() {
            let outcome = in_flight.outcome.await.unwrap_or_else(|_| Err(lost_task()));
            self.finish_generation(outcome);
        }
        &self.state
    }

    /// Start an attempt, wait for it and record the outcome.
    pub async fn generate(&mut self) -> &AppState {
        if let Err(e) = self.start_generation() {
            self.state.error = Some(e.user_message());
            return &self.state;
        }
        self.await_current().await
    }

    pub fn begin_chat_session(&self) -> Result<ChatSession> {
        self.generator.begin_chat_session()
    }

    /// Record the outcome of an attempt. The terminal phase stays visible
    /// until the next transition returns the app to `Idle`.
    fn finish_generation(&mut self, outcome: Result<GeneratedImage>) {
        self.in_flight = None;
        match outcome {
            Ok(image) => {
                self.state.phase = Phase::Succeeded;
                self.state.result = Some(image);
                self.state.error = None;
            }
            Err(e) => {
                error!("Generation attempt failed: {}", e);
                self.state.phase = Phase::Failed;
                self.state.result = None;
                self.state.error = Some(e.user_message());
            }
        }
        self.state.busy = false;
    }

    fn ensure_idle(&mut self) -> Result<()> {
        if !self.poll_finished() {
            return Err(Error::Busy);
        }
        self.state.phase = Phase::Idle;
        Ok(())
    }
}

fn lost_task() -> Error {
    Error::Invariant("generation task ended without reporting a result".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{MockChatClient, MockImageGenerationClient};
    use crate::generator::GeneratorServices;
    use std::sync::Arc;
    use tokio::sync::Notify;

    fn build_app(image_gen: MockImageGenerationClient) -> App {
        App::with_generator(Generator::with_services(GeneratorServices {
            image_gen: Arc::new(image_gen),
            chat: Arc::new(MockChatClient::new()),
        }))
    }

    fn png(name: &str) -> UploadedImage {
        UploadedImage::new(name, vec![0x89, 0x50, 0x4E, 0x47])
    }

    #[tokio::test]
    async fn test_generate_success_updates_state() {
        let mut app = build_app(MockImageGenerationClient::new());
        app.select_files(vec![png("a.png")]).unwrap();
        app.set_scenario_text("sunset beach").unwrap();

        let state = app.generate().await;

        assert!(state.result.is_some());
        assert!(state.error.is_none());
        assert!(!state.busy);
        assert_eq!(state.phase, Phase::Succeeded);

        app.set_scenario_text("park").unwrap();
        assert_eq!(app.state().phase, Phase::Idle);
    }

    #[tokio::test]
    async fn test_second_start_while_busy_is_rejected() {
        let gate = Arc::new(Notify::new());
        let mut app = build_app(MockImageGenerationClient::new().with_gate(gate.clone()));
        app.select_files(vec![png("a.png")]).unwrap();
        app.set_scenario_text("beach").unwrap();

        app.start_generation().unwrap();
        assert!(app.state().busy);
        assert!(matches!(app.start_generation(), Err(Error::Busy)));
        assert!(matches!(app.set_scenario_text("other"), Err(Error::Busy)));

        gate.notify_one();
        let state = app.await_current().await;
        assert!(!state.busy);
        assert_eq!(state.scenario_text, "beach");
    }

    #[tokio::test]
    async fn test_phases_visible_through_state() {
        let gate = Arc::new(Notify::new());
        let image_gen = MockImageGenerationClient::new()
            .with_text_response("I can't")
            .with_gate(gate.clone());
        let mut app = build_app(image_gen);
        app.select_files(vec![png("a.png")]).unwrap();
        app.set_scenario_text("beach").unwrap();
        assert_eq!(app.state().phase, Phase::Idle);

        app.start_generation().unwrap();
        assert_eq!(app.state().phase, Phase::Validating);

        let mut progress = app.progress().unwrap();
        progress
            .wait_for(|phase| *phase == Phase::Requesting)
            .await
            .unwrap();
        assert!(!app.poll_finished());
        assert_eq!(app.state().phase, Phase::Requesting);
        assert!(app.state().busy);

        gate.notify_one();
        let state = app.await_current().await;
        assert_eq!(state.phase, Phase::Failed);
        assert!(state.error.as_deref().unwrap().contains("rephrasing"));
        assert!(!state.busy);

        app.select_files(vec![png("b.png")]).unwrap();
        assert_eq!(app.state().phase, Phase::Idle);
    }

    #[tokio::test]
    async fn test_finished_task_frees_app_without_explicit_wait() {
        let mut app = build_app(MockImageGenerationClient::new());
        app.select_files(vec![png("a.png")]).unwrap();
        app.set_scenario_text("beach").unwrap();

        app.start_generation().unwrap();
        let mut progress = app.progress().unwrap();
        // Ends once the task has sent its outcome and dropped the sender.
        while progress.changed().await.is_ok() {}

        app.set_scenario_text("mountains").unwrap();
        assert!(!app.state().busy);
        assert!(app.state().result.is_some());
        assert_eq!(app.state().phase, Phase::Idle);
        assert!(app.start_generation().is_ok());
    }

    #[tokio::test]
    async fn test_validation_failure_sets_error_and_skips_api() {
        let image_gen = MockImageGenerationClient::new();
        let recorder = image_gen.clone();
        let mut app = build_app(image_gen);
        app.set_scenario_text("beach").unwrap();

        let state = app.generate().await;

        assert!(state.result.is_none());
        assert!(state.error.as_deref().unwrap().contains("no photos"));
        assert!(!state.busy);
        assert_eq!(state.phase, Phase::Failed);
        assert_eq!(recorder.get_call_count(), 0);
    }

    #[tokio::test]
    async fn test_no_image_then_success_clears_error() {
        let image_gen = MockImageGenerationClient::new()
            .with_text_response("I can't")
            .with_image_response("image/png", vec![1]);
        let mut app = build_app(image_gen);
        app.select_files(vec![png("a.png"), png("b.png")]).unwrap();
        app.set_scenario_text("group trip").unwrap();

        let state = app.generate().await;
        assert!(state.error.as_deref().unwrap().contains("rephrasing"));

        let state = app.generate().await;
        assert!(state.error.is_none());
        assert_eq!(state.result.as_ref().unwrap().mime_type, "image/png");
    }

    #[test]
    fn test_poll_without_attempt_is_finished() {
        let mut app = build_app(MockImageGenerationClient::new());
        assert!(app.poll_finished());
        assert!(app.progress().is_none());
    }

    #[test]
    fn test_use_example() {
        let mut app = build_app(MockImageGenerationClient::new());
        app.use_example(1).unwrap();
        assert_eq!(app.state().scenario_text, EXAMPLE_SCENARIOS[1]);

        let err = app.use_example(99).unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::InvalidExample(99))
        ));
    }

    #[test]
    fn test_state_round_trips_through_json() {
        let mut app = build_app(MockImageGenerationClient::new());
        app.select_files(vec![png("a.png")]).unwrap();
        app.set_scenario_text("park").unwrap();

        let json = serde_json::to_string(app.state()).unwrap();
        assert!(json.contains("\"phase\":\"idle\""));
        let restored: AppState = serde_json::from_str(&json).unwrap();
        assert_eq!(&restored, app.state());
    }
}
