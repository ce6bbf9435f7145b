/// Pipeline error types
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Duplicated recover id `{0}`")]
    DuplicateRecoverId(String),

    #[error("Cannot create folder, because path `{}` is a file", .0.display())]
    DestinationOccupied(PathBuf),

    #[error("Cannot create folder `{}`: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot save artifact to `{}`: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Stage '{stage}' failed: {message}")]
    Stage { stage: String, message: String },
}

impl PipelineError {
    /// Create a new Stage error
    pub fn stage(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Stage {
            stage: stage.into(),
            message: message.into(),
        }
    }

    /// Errors about the pipeline's own invariants or the persist target's state
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::DuplicateRecoverId(_)
                | Self::DestinationOccupied(_)
                | Self::CreateDir { .. }
                | Self::Write { .. }
        )
    }
}

/// Result type alias for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;
