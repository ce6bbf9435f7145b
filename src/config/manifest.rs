//! JSON manifest declaring tasks, their steps and watch rules
//!
//! ```json
//! {
//!   "cwd": "site",
//!   "tasks": {
//!     "css": [
//!       { "src": ["styles/**/*.css"] },
//!       { "ignore": { "pattern": "**/_*.css", "recover_id": "partials" } },
//!       { "concat": "bundle.css" },
//!       { "dest": "dist" }
//!     ],
//!     "default": [{ "merge": ["css"] }, "debug"]
//!   },
//!   "watch": [{ "pattern": "styles/**/*.css", "tasks": ["css"] }]
//! }
//! ```

use crate::config::constants;
use crate::error::{ConfigError, Result};
use crate::glob::Pattern;
use crate::pipeline::{Pipeline, ReplaceStage, TemplateStage};
use crate::task::{TaskContext, TaskRegistry};
use indexmap::IndexMap;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// One pipeline operation inside a task
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Src(Vec<String>),
    Ignore {
        pattern: String,
        #[serde(default)]
        recover_id: Option<String>,
    },
    Recover {
        #[serde(default)]
        recover_id: Option<String>,
        #[serde(default)]
        all: bool,
    },
    Concat(String),
    Delete(Option<String>),
    /// Merge the pipelines built by earlier tasks of this run
    Merge(Vec<String>),
    Replace {
        extension: String,
        pattern: String,
        replacement: String,
    },
    Template {
        extension: String,
        #[serde(default)]
        vars: IndexMap<String, String>,
    },
    Rename {
        pattern: String,
        name: String,
    },
    ChangeExt {
        pattern: String,
        extension: String,
    },
    Debug,
    Dest(String),
}

impl Step {
    pub fn apply(&self, pipeline: &mut Pipeline, context: &TaskContext) -> Result<()> {
        match self {
            Step::Src(patterns) => {
                pipeline.load(patterns.as_slice());
            }
            Step::Ignore {
                pattern,
                recover_id,
            } => {
                pipeline.ignore(pattern, recover_id.as_deref())?;
            }
            Step::Recover { recover_id, all } => {
                pipeline.recover(recover_id.as_deref(), *all);
            }
            Step::Concat(path) => {
                pipeline.concat(path);
            }
            Step::Delete(pattern) => {
                pipeline.delete(pattern.as_deref())?;
            }
            Step::Merge(tasks) => {
                let mut sources = Vec::with_capacity(tasks.len());
                for task in tasks {
                    let source = context
                        .pipeline(task)
                        .ok_or_else(|| ConfigError::TaskNotRun(task.clone()))?;
                    sources.push(source);
                }
                pipeline.merge(&sources);
            }
            Step::Replace {
                extension,
                pattern,
                replacement,
            } => {
                pipeline.roll(&ReplaceStage::new(extension.as_str(), pattern, replacement.as_str())?)?;
            }
            Step::Template { extension, vars } => {
                pipeline.roll(&TemplateStage::new(extension.as_str(), vars.clone()))?;
            }
            Step::Rename { pattern, name } => {
                let pattern = Pattern::new(pattern)?;
                for artifact in pipeline.artifacts() {
                    let mut artifact = artifact.borrow_mut();
                    if artifact.matches(&pattern) {
                        artifact.rename(name);
                    }
                }
            }
            Step::ChangeExt { pattern, extension } => {
                let pattern = Pattern::new(pattern)?;
                for artifact in pipeline.artifacts() {
                    let mut artifact = artifact.borrow_mut();
                    if artifact.matches(&pattern) {
                        artifact.change_extension(extension);
                    }
                }
            }
            Step::Debug => {
                pipeline.debug();
            }
            Step::Dest(destination) => {
                pipeline.persist(destination)?;
            }
        }
        Ok(())
    }
}

/// Run `steps` on a fresh pipeline rooted at `root`
pub fn run_steps(root: &Path, steps: &[Step], context: &mut TaskContext) -> Result<Pipeline> {
    let mut pipeline = Pipeline::in_dir(root);
    for step in steps {
        debug!("Applying step {:?}", step);
        step.apply(&mut pipeline, context)?;
    }
    debug!(
        "Pipeline finished with {} artifact(s) in {:.3}s",
        pipeline.len(),
        pipeline.time_elapsed().as_secs_f64()
    );
    Ok(pipeline)
}

/// Files to watch and the tasks their changes trigger
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WatchRule {
    pub pattern: String,
    pub tasks: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Manifest {
    /// Pipeline root, relative to the manifest's directory
    pub cwd: Option<PathBuf>,
    pub log_file: Option<PathBuf>,
    pub debounce_ms: u64,
    pub tasks: IndexMap<String, Vec<Step>>,
    pub watch: Vec<WatchRule>,
}

impl Default for Manifest {
    fn default() -> Self {
        Self {
            cwd: None,
            log_file: None,
            debounce_ms: constants::DEFAULT_DEBOUNCE_MS,
            tasks: IndexMap::new(),
            watch: Vec::new(),
        }
    }
}

impl Manifest {
    pub fn load(path: &Path) -> std::result::Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn parse(content: &str) -> serde_json::Result<Self> {
        serde_json::from_str(content)
    }

    /// Check that every watch rule names a declared task
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        for rule in &self.watch {
            for task in &rule.tasks {
                if !self.tasks.contains_key(task) {
                    return Err(ConfigError::invalid(format!(
                        "watch rule `{}` names unknown task `{}`",
                        rule.pattern, task
                    )));
                }
            }
        }
        Ok(())
    }

    /// Directory the pipelines of this manifest resolve from
    pub fn root(&self, manifest_dir: &Path) -> PathBuf {
        match &self.cwd {
            Some(cwd) => manifest_dir.join(cwd),
            None => manifest_dir.to_path_buf(),
        }
    }

    /// Register one task per manifest entry
    pub fn register_tasks(&self, root: &Path, registry: &mut TaskRegistry) {
        for (name, steps) in &self.tasks {
            let steps = steps.clone();
            let root = root.to_path_buf();
            registry.register(name.clone(), move |context: &mut TaskContext| {
                run_steps(&root, &steps, context)
            });
        }
    }
}
