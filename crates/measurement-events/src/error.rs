use std::io;

use thiserror::Error;

/// Why a single input line did not produce a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LineError {
    /// The time field is missing or not an integer. Header lines land here.
    #[error("time field is not an integer")]
    Ignored,

    /// The level field is not an integer or lies outside `[-2, 2]`.
    #[error("value must be an integer in [-2,2]")]
    InvalidLevel,
}

impl LineError {
    /// Whether the line should be reported on the diagnostic sink.
    ///
    /// Ignored lines are dropped silently.
    pub fn is_reported(&self) -> bool {
        matches!(self, LineError::InvalidLevel)
    }
}

/// Errors that abort the whole pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to read measurements: {0}")]
    Input(#[source] io::Error),

    #[error("failed to write events: {0}")]
    Output(#[source] io::Error),

    #[error("pipeline task failed: {0}")]
    Task(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl From<config::ConfigError> for PipelineError {
    fn from(e: config::ConfigError) -> Self {
        PipelineError::Config(e.to_string())
    }
}

impl From<tokio::task::JoinError> for PipelineError {
    fn from(e: tokio::task::JoinError) -> Self {
        PipelineError::Task(e.to_string())
    }
}

/// Convenience type alias for pipeline results.
pub type PipelineResult<T> = Result<T, PipelineError>;
