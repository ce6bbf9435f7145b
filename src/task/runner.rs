use crate::error::{BeltlineError, ConfigError, Result};
use crate::task::registry::{TaskContext, TaskRegistry};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};
use tracing::{error, info};

/// How a single task ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Succeeded,
    Failed { kind: String, message: String },
    Panicked(String),
}

#[derive(Debug, Clone)]
pub struct TaskReport {
    pub name: String,
    pub elapsed: Duration,
    pub outcome: TaskOutcome,
}

/// Per-task reports of one run, in execution order
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub reports: Vec<TaskReport>,
}

impl RunSummary {
    pub fn all_succeeded(&self) -> bool {
        self.reports
            .iter()
            .all(|r| r.outcome == TaskOutcome::Succeeded)
    }

    pub fn failed(&self) -> Vec<&str> {
        self.reports
            .iter()
            .filter(|r| r.outcome != TaskOutcome::Succeeded)
            .map(|r| r.name.as_str())
            .collect()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Runs registered tasks one at a time
pub struct TaskRunner<'a> {
    registry: &'a TaskRegistry,
    context: TaskContext,
}

impl<'a> TaskRunner<'a> {
    pub fn new(registry: &'a TaskRegistry) -> Self {
        Self {
            registry,
            context: TaskContext::new(),
        }
    }

    pub fn context(&self) -> &TaskContext {
        &self.context
    }

    /// Run `tasks` in order.
    ///
    /// A failing task is reported and the queue continues. Unknown task names and
    /// fatal errors stop the run and are returned.
    pub fn run<S: AsRef<str>>(&mut self, tasks: &[S]) -> Result<RunSummary> {
        let mut summary = RunSummary::default();

        for task in tasks {
            let name = task.as_ref();
            let Some(task_fn) = self.registry.get(name) else {
                error!("task `{}` doesn't exist.", name);
                return Err(ConfigError::UnknownTask(name.to_string()).into());
            };

            info!("task `{}` starts rolling.", name);
            let start_time = Instant::now();

            let context = &mut self.context;
            let result = panic::catch_unwind(AssertUnwindSafe(|| task_fn(context)));
            let elapsed = start_time.elapsed();

            let outcome = match result {
                Ok(Ok(pipeline)) => {
                    self.context.insert(name, pipeline);
                    TaskOutcome::Succeeded
                }
                Ok(Err(e)) => {
                    report_error(&e);
                    if e.is_fatal() {
                        info!(
                            "task `{}` ends up rolling, time elapsed: {:.3}s",
                            name,
                            elapsed.as_secs_f64()
                        );
                        return Err(e);
                    }
                    TaskOutcome::Failed {
                        kind: e.kind().to_string(),
                        message: e.to_string(),
                    }
                }
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    error!("Unhandled panic: {}", message);
                    TaskOutcome::Panicked(message)
                }
            };

            info!(
                "task `{}` ends up rolling, time elapsed: {:.3}s",
                name,
                elapsed.as_secs_f64()
            );
            summary.reports.push(TaskReport {
                name: name.to_string(),
                elapsed,
                outcome,
            });
        }

        Ok(summary)
    }
}

fn report_error(e: &BeltlineError) {
    error!("Unhandled error: {}", e.kind());
    for line in e.trace() {
        error!("{}", line);
    }
}
