pub mod api_config;
pub mod backend;
pub mod config;
pub mod errors;
pub mod images;
pub mod orchestrator;
pub mod probe;
pub mod progress;
pub mod ui;
pub mod validate;
