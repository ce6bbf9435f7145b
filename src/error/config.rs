/// Configuration error types
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read config file `{}`: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot parse config file `{}`: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Task `{0}` doesn't exist")]
    UnknownTask(String),

    /// A step needs the output of a task that has not run in this session
    #[error("Task `{0}` has not run yet")]
    TaskNotRun(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl ConfigError {
    /// Create a new Invalid error
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::Invalid(msg.into())
    }

    /// Whether the run must stop. A missing task output only fails its task.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::TaskNotRun(_))
    }
}
