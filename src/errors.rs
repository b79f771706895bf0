//! Typed error hierarchy for appforge.
//!
//! Two top-level enums cover the two subsystems:
//! - `BuildError`: everything that can end a build attempt
//! - `ProbeError`: Firebase probe failures

use thiserror::Error;

/// Message shown when the backend rejects a build without saying why.
pub const GENERIC_BUILD_FAILURE: &str = "Failed to build app";

/// Errors that terminate a build attempt.
///
/// None of these are retried; the orchestrator folds every variant into a
/// single human-readable string via [`BuildError::user_message`].
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("{0}")]
    Validation(String),

    #[error("Backend rejected build ({status}): {message}")]
    BackendRejection { status: u16, message: String },

    #[error("Build request failed: {0}")]
    Transport(String),

    #[error("Failed to read image {path}: {source}")]
    ImageRead {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl BuildError {
    /// The string surfaced in `UiState::Error`.
    ///
    /// Rejections show the server's message verbatim; everything else uses
    /// its `Display` form.
    pub fn user_message(&self) -> String {
        match self {
            BuildError::BackendRejection { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, BuildError::Validation(_))
    }
}

impl From<reqwest::Error> for BuildError {
    fn from(err: reqwest::Error) -> Self {
        BuildError::Transport(err.to_string())
    }
}

/// Errors from a single Firebase probe.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("{service} endpoint is not configured for production")]
    NotConfigured { service: &'static str },

    #[error("{0}")]
    Http(#[from] reqwest::Error),

    #[error("{service} returned {status}: {message}")]
    Rejected {
        service: &'static str,
        status: u16,
        message: String,
    },

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_user_message_is_server_text_only() {
        let err = BuildError::BackendRejection {
            status: 500,
            message: "quota exceeded".to_string(),
        };
        assert_eq!(err.user_message(), "quota exceeded");
        assert!(err.to_string().contains("500"));
    }

    #[test]
    fn transport_user_message_embeds_cause() {
        let err = BuildError::Transport("connection refused".to_string());
        assert_eq!(
            err.user_message(),
            "Build request failed: connection refused"
        );
    }

    #[test]
    fn validation_is_matchable() {
        let err = BuildError::Validation("App name is invalid".into());
        assert!(err.is_validation());
        assert_eq!(err.user_message(), "App name is invalid");
        assert!(!BuildError::Transport("x".into()).is_validation());
    }

    #[test]
    fn image_read_carries_path() {
        use std::path::PathBuf;
        let path = PathBuf::from("/photos/logo.png");
        let err = BuildError::ImageRead {
            path: path.clone(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        match &err {
            BuildError::ImageRead { path: p, source } => {
                assert_eq!(p, &path);
                assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
            }
            _ => panic!("Expected ImageRead"),
        }
        assert!(err.user_message().contains("logo.png"));
    }

    #[test]
    fn probe_not_configured_names_service() {
        let err = ProbeError::NotConfigured { service: "Storage" };
        assert!(err.to_string().starts_with("Storage"));
    }

    #[test]
    fn all_error_types_implement_std_error_trait() {
        fn assert_std_error<E: std::error::Error>(_: &E) {}
        assert_std_error(&BuildError::Validation("x".into()));
        assert_std_error(&ProbeError::UnexpectedResponse("x".into()));
    }
}
