use std::path::PathBuf;
use std::sync::Arc;

use reqwest::Url;

use crate::api_config::{BackendEndpoints, resolve_api_config};
use crate::backend::{BuildBackend, BuildRequest, MODEL_API};
use crate::errors::BuildError;
use crate::images::encode_images;
use crate::progress::{AnimatorHandle, ProgressAnimator, ProgressLog};
use crate::validate::validate_submission;

use super::state::{BuildObserver, NoopObserver, UiState};

/// What the user filled in for one build.
#[derive(Debug, Clone, Default)]
pub struct BuildInput {
    pub app_name: String,
    pub description: String,
    /// Reference image files, encoded only after the input validates.
    pub images: Vec<PathBuf>,
    pub model_id: String,
}

/// Drives one build flow: validation, the request, the progress chain and
/// the resulting [`UiState`].
///
/// The orchestrator is the only writer of its state. `submit_build` takes
/// `&mut self`, so a second submission cannot start while one is in flight.
/// At most one [`AnimatorHandle`] is held at a time, and it is canceled
/// before a new one is acquired, when the response arrives, on reset and on
/// drop.
pub struct BuildOrchestrator<B> {
    backend: B,
    endpoints: BackendEndpoints,
    page_url: Url,
    referrer: Option<String>,
    model_api: String,
    animator: ProgressAnimator,
    progress: ProgressLog,
    pending: Option<AnimatorHandle>,
    state: UiState,
    observer: Arc<dyn BuildObserver>,
}

impl<B: BuildBackend> BuildOrchestrator<B> {
    pub fn new(backend: B, endpoints: BackendEndpoints, page_url: Url) -> Self {
        let animator = ProgressAnimator::default();
        let progress = ProgressLog::for_steps(animator.steps());
        Self {
            backend,
            endpoints,
            page_url,
            referrer: None,
            model_api: MODEL_API.to_string(),
            animator,
            progress,
            pending: None,
            state: UiState::Idle,
            observer: Arc::new(NoopObserver),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn BuildObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_animator(mut self, animator: ProgressAnimator) -> Self {
        self.progress = ProgressLog::for_steps(animator.steps());
        self.animator = animator;
        self
    }

    pub fn with_model_api(mut self, model_api: impl Into<String>) -> Self {
        self.model_api = model_api.into();
        self
    }

    /// Set the embedding page's referrer. Read afresh on every attempt.
    pub fn set_referrer(&mut self, referrer: Option<String>) {
        self.referrer = referrer;
    }

    pub fn state(&self) -> &UiState {
        &self.state
    }

    /// Labels completed in the current (or last) attempt.
    pub fn progress(&self) -> Vec<String> {
        self.progress.snapshot()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Run one build attempt to completion and return the final state.
    ///
    /// Invalid input ends in `UiState::Error` without any I/O. An unreadable
    /// image ends there too, before any request. Otherwise exactly one
    /// request is sent.
    pub async fn submit_build(&mut self, input: BuildInput) -> &UiState {
        if let Err(err) = validate_submission(&input.app_name, &input.description) {
            self.fail(err);
            return &self.state;
        }

        let images = match encode_images(&input.images).await {
            Ok(images) => images,
            Err(err) => {
                self.fail(err);
                return &self.state;
            }
        };

        self.cancel_animator();
        self.progress.clear();
        self.transition(UiState::Building {
            progress: self.progress.clone(),
        });

        let api = resolve_api_config(self.referrer.as_deref(), &self.page_url, &self.endpoints);
        tracing::info!(app = %input.app_name, base_url = %api.base_url, "starting build");

        let request = BuildRequest {
            app_name: input.app_name,
            description: input.description,
            images,
            model_id: input.model_id,
            model_api: self.model_api.clone(),
        };

        self.pending = Some(
            self.animator
                .start(self.progress.clone(), Arc::clone(&self.observer)),
        );

        let outcome = self.backend.setup_and_initiate_loop(&api, &request).await;
        self.cancel_animator();

        match outcome {
            Ok(resp) => {
                for (index, label) in self.progress.fill_from(self.animator.steps()) {
                    self.observer.on_step(index, label);
                }
                tracing::info!(link = %resp.link, "build complete");
                self.transition(UiState::Complete { link: resp.link });
            }
            Err(err) => self.fail(err),
        }
        &self.state
    }

    /// Cancel any pending progress timer and return to `Idle`. Safe from any
    /// state.
    pub fn reset_build(&mut self) {
        self.cancel_animator();
        self.progress.clear();
        self.transition(UiState::Idle);
    }

    fn cancel_animator(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.cancel();
        }
    }

    fn fail(&mut self, err: BuildError) {
        self.cancel_animator();
        tracing::warn!(error = %err, "build failed");
        self.transition(UiState::Error {
            message: err.user_message(),
        });
    }

    fn transition(&mut self, next: UiState) {
        tracing::debug!(from = self.state.name(), to = next.name(), "state transition");
        self.state = next;
        self.observer.on_state(&self.state);
    }
}

impl<B> Drop for BuildOrchestrator<B> {
    fn drop(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.cancel();
        }
    }
}
