pub mod artifact;
pub mod core;
pub mod nodes;

pub use artifact::{Artifact, SharedArtifact};
pub use core::{Pipeline, Stage};
pub use nodes::basic::{ReplaceStage, TemplateStage};
