use crate::error::{PipelineError, PipelineResult};
use crate::glob::{Pattern, PatternMatcher};
use crate::pipeline::artifact::{Artifact, SharedArtifact};
use crate::util::file::normalize_path;
use indexmap::IndexMap;
use std::cell::Ref;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// A transform over a pipeline's artifacts
pub trait Stage {
    fn name(&self) -> String;

    fn process(&self, pipeline: &mut Pipeline) -> PipelineResult<()>;
}

/// Ordered, deduplicated collection of artifacts
pub struct Pipeline {
    artifacts: Vec<SharedArtifact>,
    sources: HashSet<PathBuf>,
    ignore_sets: IndexMap<String, Vec<SharedArtifact>>,
    root: PathBuf,
    created_at: Instant,
}

impl Pipeline {
    /// Empty pipeline rooted at the process working directory
    pub fn new() -> Self {
        let root = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self::in_dir(root)
    }

    /// Empty pipeline resolving relative patterns and destinations from `root`
    pub fn in_dir(root: impl AsRef<Path>) -> Self {
        Self {
            artifacts: Vec::new(),
            sources: HashSet::new(),
            ignore_sets: IndexMap::new(),
            root: normalize_path(root.as_ref()),
            created_at: Instant::now(),
        }
    }

    /// New pipeline holding the live artifacts of `pipelines`, first claim wins
    ///
    /// The new pipeline takes the root of the first source.
    pub fn from_pipelines(pipelines: &[&Pipeline]) -> Self {
        let mut pipeline = match pipelines.first() {
            Some(first) => Self::in_dir(&first.root),
            None => Self::new(),
        };
        pipeline.merge(pipelines);
        pipeline
    }

    /// Change the directory relative patterns and destinations resolve from
    pub fn configure(&mut self, cwd: impl AsRef<Path>) -> &mut Self {
        let cwd = cwd.as_ref();
        self.root = if cwd.is_absolute() {
            normalize_path(cwd)
        } else {
            normalize_path(&self.root.join(cwd))
        };
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn time_elapsed(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// Live (non-ignored) artifacts in pipeline order
    pub fn artifacts(&self) -> impl Iterator<Item = &SharedArtifact> {
        self.artifacts.iter().filter(|a| !a.borrow().is_ignored())
    }

    /// Every owned artifact, ignored ones included
    pub fn all_artifacts(&self) -> &[SharedArtifact] {
        &self.artifacts
    }

    /// Borrow the live artifact at `relative_path`
    pub fn get(&self, relative_path: &str) -> Option<Ref<'_, Artifact>> {
        self.artifacts()
            .map(|a| a.borrow())
            .find(|a| a.relative_path() == relative_path)
    }

    /// Relative paths of the live artifacts
    pub fn paths(&self) -> Vec<String> {
        self.artifacts()
            .map(|a| a.borrow().relative_path().to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.artifacts().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains_source(&self, path: &Path) -> bool {
        self.sources.contains(path)
    }

    pub fn source_keys(&self) -> &HashSet<PathBuf> {
        &self.sources
    }

    pub fn has_recover_id(&self, recover_id: &str) -> bool {
        self.ignore_sets.contains_key(recover_id)
    }

    /// Load every file the patterns resolve to.
    ///
    /// Unreadable files, walk errors and absolute patterns are logged and skipped.
    pub fn load<S: AsRef<str>>(&mut self, patterns: &[S]) -> &mut Self {
        let matcher = PatternMatcher::new(&self.root);

        for pattern in patterns {
            let pattern = pattern.as_ref();
            if let Err(e) = self.load_pattern(&matcher, pattern) {
                error!("cannot resolve `{}`: {}", pattern, e);
            }
        }

        self
    }

    fn load_pattern(&mut self, matcher: &PatternMatcher, pattern: &str) -> PipelineResult<()> {
        let requested = pattern.trim_start_matches(crate::glob::NEGATION_MARKER);
        if Path::new(requested).is_absolute() {
            warn!("absolute filepath will be ignored: {}", pattern);
            return Ok(());
        }

        let mut loaded = 0usize;
        for resolved in matcher.resolve(pattern)? {
            let resolved = match resolved {
                Ok(resolved) => resolved,
                Err(e) => {
                    warn!("cannot read directory while resolving `{}`: {}", pattern, e);
                    continue;
                }
            };

            if self.sources.contains(&resolved.absolute) {
                debug!("Already loaded: {:?}", resolved.absolute);
                continue;
            }

            if !resolved.absolute.is_file() {
                debug!("Not a regular file: {:?}", resolved.absolute);
                continue;
            }

            match Artifact::load(&resolved.absolute, resolved.relative) {
                Ok(artifact) => {
                    debug!("Loaded: {:?}", resolved.absolute);
                    self.sources.insert(resolved.absolute);
                    self.artifacts.push(artifact.into_shared());
                    loaded += 1;
                }
                Err(e) => {
                    error!("cannot load: {} ({})", resolved.absolute.display(), e);
                }
            }
        }

        debug!("Pattern `{}` loaded {} artifact(s)", pattern, loaded);
        Ok(())
    }

    /// Append an in-memory artifact. Returns false when its source path is
    /// already loaded.
    pub fn push(&mut self, artifact: Artifact) -> bool {
        if let Some(source) = artifact.source_path() {
            if !self.sources.insert(source.to_path_buf()) {
                return false;
            }
        }
        self.artifacts.push(artifact.into_shared());
        true
    }

    /// Soft-delete live artifacts matching `pattern` under `recover_id`.
    ///
    /// Without a recover id the matches are deleted permanently.
    pub fn ignore(&mut self, pattern: &str, recover_id: Option<&str>) -> PipelineResult<&mut Self> {
        let Some(recover_id) = recover_id else {
            return self.delete(Some(pattern));
        };

        if self.ignore_sets.contains_key(recover_id) {
            return Err(PipelineError::DuplicateRecoverId(recover_id.to_string()));
        }

        let pattern = Pattern::new(pattern)?;
        let mut recover_list = Vec::new();

        for artifact in &self.artifacts {
            let mut inner = artifact.borrow_mut();
            if inner.is_ignored() || !inner.matches(&pattern) {
                continue;
            }
            inner.set_ignored(true);
            recover_list.push(Rc::clone(artifact));
        }

        debug!(
            "Ignored {} artifact(s) matching `{}` under `{}`",
            recover_list.len(),
            pattern.as_str(),
            recover_id
        );
        self.ignore_sets.insert(recover_id.to_string(), recover_list);

        Ok(self)
    }

    /// Bring back the artifacts ignored under `recover_id`, or every artifact
    /// when `recover_all` is set
    pub fn recover(&mut self, recover_id: Option<&str>, recover_all: bool) -> &mut Self {
        if recover_all {
            for artifact in &self.artifacts {
                artifact.borrow_mut().set_ignored(false);
            }
            self.ignore_sets.clear();
        } else if let Some(recover_list) =
            recover_id.and_then(|id| self.ignore_sets.shift_remove(id))
        {
            for artifact in recover_list {
                artifact.borrow_mut().set_ignored(false);
            }
        }

        self
    }

    /// Replace every live artifact with one artifact holding their bytes in order
    pub fn concat(&mut self, new_relative_path: &str) -> &mut Self {
        let (consumed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.artifacts)
            .into_iter()
            .partition(|a| !a.borrow().is_ignored());

        self.artifacts = kept;
        if consumed.is_empty() {
            return self;
        }

        let mut data = Vec::new();
        for artifact in &consumed {
            let artifact = artifact.borrow();
            data.extend_from_slice(artifact.data());
            if let Some(source) = artifact.source_path() {
                self.sources.remove(source);
            }
        }

        debug!(
            "Concatenated {} artifact(s) into `{}`",
            consumed.len(),
            new_relative_path
        );
        self.artifacts.insert(
            0,
            Artifact::synthesized(new_relative_path, data).into_shared(),
        );

        self
    }

    /// Remove live artifacts matching `pattern`, or reset the whole pipeline
    /// when no pattern is given
    pub fn delete(&mut self, pattern: Option<&str>) -> PipelineResult<&mut Self> {
        let Some(pattern) = pattern else {
            return Ok(self.clear());
        };

        let pattern = Pattern::new(pattern)?;
        let mut kept = Vec::with_capacity(self.artifacts.len());

        for artifact in std::mem::take(&mut self.artifacts) {
            let removed = {
                let inner = artifact.borrow();
                let removed = !inner.is_ignored() && pattern.matches(inner.relative_path());
                if removed && let Some(source) = inner.source_path() {
                    self.sources.remove(source);
                }
                removed
            };
            if !removed {
                kept.push(artifact);
            }
        }

        self.artifacts = kept;
        Ok(self)
    }

    /// Drop all artifacts, dedup keys and ignore sets
    pub fn clear(&mut self) -> &mut Self {
        self.artifacts.clear();
        self.sources.clear();
        self.ignore_sets.clear();
        self
    }

    /// Append the live artifacts of `pipelines`, sharing them
    pub fn merge(&mut self, pipelines: &[&Pipeline]) -> &mut Self {
        for pipeline in pipelines {
            for artifact in pipeline.artifacts() {
                let source = artifact.borrow().source_path().map(Path::to_path_buf);
                if let Some(source) = source {
                    if !self.sources.insert(source) {
                        continue;
                    }
                }
                self.artifacts.push(Rc::clone(artifact));
            }
        }

        self
    }

    /// Write every live artifact under `destination`
    pub fn persist(&mut self, destination: impl AsRef<Path>) -> PipelineResult<&mut Self> {
        let destination = normalize_path(destination.as_ref());

        for artifact in self.artifacts.iter().filter(|a| !a.borrow().is_ignored()) {
            artifact.borrow_mut().save(&self.root, &destination)?;
        }

        Ok(self)
    }

    /// Run a transform stage over this pipeline
    pub fn roll(&mut self, stage: &dyn Stage) -> PipelineResult<&mut Self> {
        debug!("Rolling stage '{}'", stage.name());
        stage.process(self)?;
        debug!("Stage '{}' processed successfully", stage.name());
        Ok(self)
    }

    /// Log the live artifact list
    pub fn debug(&self) -> &Self {
        info!("Artifact list:");
        let mut count = 0usize;
        for artifact in self.artifacts() {
            info!("-> {}", artifact.borrow().relative_path());
            count += 1;
        }
        info!("{} artifact(s)", count);
        self
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}
