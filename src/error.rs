//! Error types for the upgrade simulator

use std::io;
use thiserror::Error;

use crate::pipeline::Stage;

/// Result type alias for simulator operations
pub type Result<T> = std::result::Result<T, SimError>;

/// Main error type for the upgrade simulator
#[derive(Error, Debug)]
pub enum SimError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Null or invalid configuration / plan, raised before any stage runs
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A required component slot is still empty after normalization
    #[error("Missing required component: {0}")]
    MissingComponent(String),

    /// A component carries an unusable specification (negative draw, NaN score, ...)
    #[error("Malformed component '{part}': {reason}")]
    MalformedComponent { part: String, reason: String },

    /// A pipeline stage failed
    #[error("Stage '{stage}' failed: {message}")]
    Stage { stage: Stage, message: String },

    /// A run for this plan is already in flight
    #[error("Simulation already running for plan '{0}'")]
    AlreadyRunning(String),

    /// Request is well-formed but cannot be served (e.g. nothing to export yet)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Settings could not be loaded or are inconsistent
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Serializing results failed
    #[error("Export error: {0}")]
    Export(String),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SimError {
    /// Wrap any error as a failure of `stage`
    pub fn stage(stage: Stage, message: impl Into<String>) -> Self {
        SimError::Stage {
            stage,
            message: message.into(),
        }
    }

    pub fn malformed(part: impl Into<String>, reason: impl Into<String>) -> Self {
        SimError::MalformedComponent {
            part: part.into(),
            reason: reason.into(),
        }
    }

    /// True for errors that are detected before the pipeline starts
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            SimError::InvalidInput(_) | SimError::MissingComponent(_)
        )
    }
}

impl From<csv::Error> for SimError {
    fn from(err: csv::Error) -> Self {
        SimError::Export(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_input_display() {
        let err = SimError::InvalidInput("plan id is empty".to_string());
        assert_eq!(err.to_string(), "Invalid input: plan id is empty");
        assert!(err.is_input_error());
    }

    #[test]
    fn test_malformed_component_display() {
        let err = SimError::malformed("RTX 4090", "negative load draw");
        assert_eq!(
            err.to_string(),
            "Malformed component 'RTX 4090': negative load draw"
        );
        assert!(!err.is_input_error());
    }

    #[test]
    fn test_stage_error_display() {
        let err = SimError::stage(Stage::Power, "boom");
        assert_eq!(err.to_string(), "Stage 'power' failed: boom");
    }

    #[test]
    fn test_already_running_display() {
        let err = SimError::AlreadyRunning("plan-7".to_string());
        assert!(err.to_string().contains("plan-7"));
    }

    #[test]
    fn test_from_io() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file missing");
        let err: SimError = io_err.into();
        assert!(err.to_string().contains("file missing"));
    }

    #[test]
    fn test_from_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{ invalid").unwrap_err();
        let err: SimError = json_err.into();
        assert!(err.to_string().contains("JSON error"));
    }
}
