// Task registry for named units of work
use crate::error::Result;
use crate::pipeline::Pipeline;
use indexmap::IndexMap;
use std::collections::HashSet;
use std::path::PathBuf;

/// Pipelines produced by the tasks already run in this session
#[derive(Default)]
pub struct TaskContext {
    outputs: IndexMap<String, Pipeline>,
}

impl TaskContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pipeline built by the last successful run of `task`
    pub fn pipeline(&self, task: &str) -> Option<&Pipeline> {
        self.outputs.get(task)
    }

    pub fn insert(&mut self, task: impl Into<String>, pipeline: Pipeline) {
        self.outputs.insert(task.into(), pipeline);
    }

    pub fn tasks(&self) -> Vec<String> {
        self.outputs.keys().cloned().collect()
    }

    /// Every file the stored pipelines have persisted
    pub fn written_paths(&self) -> HashSet<PathBuf> {
        self.outputs
            .values()
            .flat_map(|pipeline| pipeline.all_artifacts())
            .filter_map(|artifact| artifact.borrow().last_destination().map(PathBuf::from))
            .collect()
    }
}

/// Task function type: builds a pipeline, may read earlier outputs
pub type TaskFn = Box<dyn Fn(&mut TaskContext) -> Result<Pipeline>>;

/// Registry for tasks, kept in registration order
pub struct TaskRegistry {
    tasks: IndexMap<String, TaskFn>,
}

impl TaskRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            tasks: IndexMap::new(),
        }
    }

    /// Register a task under `name`, replacing any previous one
    pub fn register<F>(&mut self, name: impl Into<String>, task: F)
    where
        F: Fn(&mut TaskContext) -> Result<Pipeline> + 'static,
    {
        self.tasks.insert(name.into(), Box::new(task));
    }

    pub fn get(&self, name: &str) -> Option<&TaskFn> {
        self.tasks.get(name)
    }

    /// Check if a task is registered
    pub fn contains(&self, name: &str) -> bool {
        self.tasks.contains_key(name)
    }

    /// List all registered task names
    pub fn names(&self) -> Vec<String> {
        self.tasks.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

impl Default for TaskRegistry {
    fn default() -> Self {
        Self::new()
    }
}
