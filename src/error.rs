//! Error taxonomy for the prediction serving pipeline

use thiserror::Error;

/// Result alias used throughout the serving pipeline.
pub type ServingResult<T> = std::result::Result<T, ServingError>;

/// Errors produced by the serving pipeline and its HTTP front door.
///
/// Startup errors (`ArtifactLoad`, `ArtifactInconsistent`) are fatal: no
/// serving is possible without a complete, consistent bundle. Everything
/// else is per-request and surfaced as a structured error response.
#[derive(Debug, Error)]
pub enum ServingError {
    /// A model artifact was missing or unreadable at startup.
    #[error("artifact load failed: {0}")]
    ArtifactLoad(String),

    /// Loaded artifacts disagree on the expected feature width.
    #[error("inconsistent artifacts: {0}")]
    ArtifactInconsistent(String),

    /// The request payload is unusable: wrong shape or non-numeric content.
    #[error("invalid input: {0}")]
    InputFormat(String),

    /// Scoring failed: bundle not ready or a classifier fault.
    #[error("scoring failed: {0}")]
    Scoring(String),

    /// No live backend endpoint could be resolved.
    #[error("no endpoint available: {0}")]
    Resolution(String),

    /// The call to the resolved backend failed.
    #[error("backend call failed: {0}")]
    Transport(String),
}

impl ServingError {
    /// HTTP status code this error maps to at the dispatcher boundary.
    pub fn status_code(&self) -> u16 {
        match self {
            ServingError::InputFormat(_) => 400,
            ServingError::Resolution(_) => 503,
            ServingError::ArtifactLoad(_)
            | ServingError::ArtifactInconsistent(_)
            | ServingError::Scoring(_)
            | ServingError::Transport(_) => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_code_mapping() {
        assert_eq!(
            ServingError::InputFormat("bad".into()).status_code(),
            400
        );
        assert_eq!(
            ServingError::Resolution("none".into()).status_code(),
            503
        );
        assert_eq!(ServingError::Scoring("fault".into()).status_code(), 500);
        assert_eq!(ServingError::Transport("down".into()).status_code(), 500);
    }

    #[test]
    fn test_error_display() {
        let err = ServingError::InputFormat("field 'data' missing".into());
        assert_eq!(err.to_string(), "invalid input: field 'data' missing");
    }
}
