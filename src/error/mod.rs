/// Centralized error handling for Beltline
pub mod config;
pub mod pipeline;

pub use config::ConfigError;
pub use pipeline::{PipelineError, PipelineResult};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BeltlineError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Watch error: {0}")]
    Watch(#[from] notify::Error),

    /// Stops the whole run, not only the current task
    #[error("Run terminated: {0}")]
    Terminate(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias using BeltlineError
pub type Result<T> = std::result::Result<T, BeltlineError>;

impl BeltlineError {
    /// Create a terminate-run error
    pub fn terminate(msg: impl Into<String>) -> Self {
        Self::Terminate(msg.into())
    }

    /// Create a generic error
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Whether this error must abort the remaining task queue
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Terminate(_) => true,
            Self::Config(e) => e.is_fatal(),
            Self::Pipeline(e) => e.is_fatal(),
            _ => false,
        }
    }

    /// Short name of the error kind, used in task failure reports
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Io(_) => "IoError",
            Self::Pipeline(PipelineError::Stage { .. }) => "StageError",
            Self::Pipeline(PipelineError::InvalidPattern { .. }) => "PatternError",
            Self::Pipeline(_) => "PipelineError",
            Self::Config(_) => "ConfigError",
            Self::Watch(_) => "WatchError",
            Self::Terminate(_) => "Terminate",
            Self::Other(_) => "Error",
        }
    }

    /// The error followed by every source in its chain
    pub fn trace(&self) -> Vec<String> {
        let mut lines = vec![self.to_string()];
        let mut source = std::error::Error::source(self);
        while let Some(err) = source {
            lines.push(format!("caused by: {err}"));
            source = err.source();
        }
        lines
    }
}

impl From<String> for BeltlineError {
    fn from(msg: String) -> Self {
        Self::Other(msg)
    }
}

impl From<&str> for BeltlineError {
    fn from(msg: &str) -> Self {
        Self::Other(msg.to_string())
    }
}
