//! Error types for Synheart Proctor

use thiserror::Error;

/// Errors that can occur while configuring or driving the engine
#[derive(Debug, Error)]
pub enum ProctorError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Failed to parse input: {0}")]
    ParseError(String),

    /// Permission denied or capability missing; the affected collector disables itself
    #[error("Signal source unavailable: {0}")]
    Unavailable(String),

    /// Detector-local fault; logged and isolated to a single tick
    #[error("Sampling failed: {0}")]
    SampleFailed(String),

    #[error("Invalid video frame: {0}")]
    InvalidFrame(String),

    #[error("Monitoring has stopped")]
    Stopped,
}
