//! Beltline, a streaming file process tool
//!
//! Files matched by glob patterns are loaded into a [`Pipeline`] as in-memory
//! [`Artifact`]s, transformed, filtered and merged, then persisted to a
//! destination tree. Named tasks building pipelines are run by a [`TaskRunner`].

pub mod cli;
pub mod config;
pub mod error;
pub mod glob;
pub mod logging;
pub mod pipeline;
pub mod task;
pub mod util;
pub mod watch;

pub use error::{BeltlineError, ConfigError, PipelineError, Result};
pub use glob::{Pattern, PatternMatcher, Resolved};
pub use pipeline::{Artifact, Pipeline, SharedArtifact, Stage};
pub use task::{TaskContext, TaskRegistry, TaskRunner};
