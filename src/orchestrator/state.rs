use std::fmt;

use crate::progress::ProgressLog;

/// The single observable state of the build flow.
#[derive(Debug, Clone, Default)]
pub enum UiState {
    #[default]
    Idle,
    Building {
        progress: ProgressLog,
    },
    Complete {
        link: String,
    },
    Error {
        message: String,
    },
}

impl UiState {
    pub fn name(&self) -> &'static str {
        match self {
            UiState::Idle => "idle",
            UiState::Building { .. } => "building",
            UiState::Complete { .. } => "complete",
            UiState::Error { .. } => "error",
        }
    }

    pub fn is_building(&self) -> bool {
        matches!(self, UiState::Building { .. })
    }

    /// Whether the inputs may be edited and a build triggered.
    pub fn is_editable(&self) -> bool {
        !self.is_building()
    }

    pub fn link(&self) -> Option<&str> {
        match self {
            UiState::Complete { link } => Some(link),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            UiState::Error { message } => Some(message),
            _ => None,
        }
    }
}

impl fmt::Display for UiState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UiState::Idle => write!(f, "idle"),
            UiState::Building { progress } => {
                write!(f, "building ({}/{})", progress.len(), progress.capacity())
            }
            UiState::Complete { link } => write!(f, "complete: {}", link),
            UiState::Error { message } => write!(f, "error: {}", message),
        }
    }
}

/// Receives build state changes and progress steps as they happen.
///
/// `on_step` may be called from the animator's task, so implementations must
/// be thread-safe. Both methods default to no-ops.
pub trait BuildObserver: Send + Sync {
    fn on_state(&self, _state: &UiState) {}

    fn on_step(&self, _index: usize, _label: &str) {}
}

/// Observer that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl BuildObserver for NoopObserver {}
