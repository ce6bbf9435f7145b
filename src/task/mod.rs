pub mod registry;
pub mod runner;

pub use registry::{TaskContext, TaskFn, TaskRegistry};
pub use runner::{RunSummary, TaskOutcome, TaskReport, TaskRunner};
