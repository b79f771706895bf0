pub mod runner;
pub mod state;

pub use runner::{BuildInput, BuildOrchestrator};
pub use state::{BuildObserver, NoopObserver, UiState};
