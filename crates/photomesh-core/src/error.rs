//! Error types for photomesh.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// The main error type for photomesh operations.
#[derive(Error, Debug)]
pub enum PhotomeshError {
    /// A mesh document or configuration file is malformed.
    #[error("format error in field '{field}': {reason}")]
    Format { field: String, reason: String },

    /// An expected file does not exist.
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// An external backend, executable or module is missing.
    #[error("required dependency not found: {0}")]
    Dependency(String),

    /// The external engine ran but reported a failure.
    #[error("engine call '{function}' failed: {message}")]
    EngineExecution { function: String, message: String },

    /// The external engine did not finish within the configured timeout.
    #[error("engine call '{function}' timed out after {timeout:?}")]
    TimedOut { function: String, timeout: Duration },

    /// Data is structurally valid but violates an invariant (index range, arity).
    #[error("validation error: {0}")]
    Validation(String),

    /// A pipeline stage failed.
    #[error("stage '{stage}' failed: {source}")]
    Stage {
        stage: &'static str,
        #[source]
        source: Box<PhotomeshError>,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PhotomeshError {
    /// Builds a [`PhotomeshError::Format`] naming the offending field.
    pub fn format(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Format {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Builds a [`PhotomeshError::Validation`].
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Wraps this error with the name of the pipeline stage it happened in.
    pub fn in_stage(self, stage: &'static str) -> Self {
        Self::Stage {
            stage,
            source: Box::new(self),
        }
    }

    /// Returns the innermost error, looking through stage wrappers.
    pub fn root_cause(&self) -> &PhotomeshError {
        match self {
            Self::Stage { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// Returns the failing stage name, if this error was raised inside a stage.
    pub fn stage(&self) -> Option<&'static str> {
        match self {
            Self::Stage { stage, .. } => Some(stage),
            _ => None,
        }
    }
}

/// A specialized Result type for photomesh operations.
pub type Result<T> = std::result::Result<T, PhotomeshError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_message_names_stage_and_cause() {
        let err = PhotomeshError::format("MeshVertex3", "missing").in_stage("Export");
        let msg = err.to_string();
        assert!(msg.contains("Export"));
        assert!(msg.contains("MeshVertex3"));
        assert_eq!(err.stage(), Some("Export"));
        assert!(matches!(err.root_cause(), PhotomeshError::Format { .. }));
    }

    #[test]
    fn test_not_found_displays_path() {
        let err = PhotomeshError::NotFound(PathBuf::from("/tmp/none.jmsh"));
        assert!(err.to_string().contains("none.jmsh"));
    }
}
