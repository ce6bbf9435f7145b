use crate::error::{PipelineError, PipelineResult};
use crate::glob::Pattern;
use crate::util::file::{absolutize, path_to_string};
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::debug;

/// Artifact handle shared between pipelines after a merge
pub type SharedArtifact = Rc<RefCell<Artifact>>;

/// In-memory representation of one file
#[derive(Debug, Clone, Default)]
pub struct Artifact {
    relative_path: String,
    extension: String,
    data: Vec<u8>,
    source_path: Option<PathBuf>,
    ignore: bool,
    changed: bool,
    last_destination: Option<PathBuf>,
}

fn extension_of(relative_path: &str) -> String {
    Path::new(relative_path)
        .extension()
        .map(|ext| ext.to_string_lossy().into_owned())
        .unwrap_or_default()
}

impl Artifact {
    pub fn new(relative_path: impl Into<String>, data: Vec<u8>) -> Self {
        let mut artifact = Self {
            data,
            ..Self::default()
        };
        artifact.set_relative_path(relative_path);
        artifact
    }

    /// Artifact synthesized by the pipeline rather than loaded from disk
    pub fn synthesized(relative_path: impl Into<String>, data: Vec<u8>) -> Self {
        let mut artifact = Self::new(relative_path, data);
        artifact.changed = true;
        artifact
    }

    /// Read the whole file at `absolute` into a new artifact
    pub fn load(absolute: &Path, relative_path: impl Into<String>) -> std::io::Result<Self> {
        let data = std::fs::read(absolute)?;
        let mut artifact = Self::new(relative_path, data);
        artifact.source_path = Some(absolute.to_path_buf());
        Ok(artifact)
    }

    pub fn into_shared(self) -> SharedArtifact {
        Rc::new(RefCell::new(self))
    }

    pub fn relative_path(&self) -> &str {
        &self.relative_path
    }

    /// Set the relative path and re-derive the extension
    pub fn set_relative_path(&mut self, relative_path: impl Into<String>) {
        self.relative_path = relative_path.into();
        self.extension = extension_of(&self.relative_path);
    }

    /// Extension without the leading dot, empty when there is none
    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut Vec<u8> {
        &mut self.data
    }

    pub fn set_data(&mut self, data: Vec<u8>) {
        self.data = data;
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn source_path(&self) -> Option<&Path> {
        self.source_path.as_deref()
    }

    pub fn is_ignored(&self) -> bool {
        self.ignore
    }

    pub(crate) fn set_ignored(&mut self, ignore: bool) {
        self.ignore = ignore;
    }

    pub fn is_changed(&self) -> bool {
        self.changed
    }

    /// Where the last persist wrote this artifact
    pub fn last_destination(&self) -> Option<&Path> {
        self.last_destination.as_deref()
    }

    /// Replace the file name, keeping the directories
    pub fn rename(&mut self, new_file_name: &str) {
        let renamed = Path::new(&self.relative_path).with_file_name(new_file_name);
        self.set_relative_path(path_to_string(&renamed));
    }

    /// Swap the extension and return the new relative path.
    ///
    /// A leading dot on `new_extension` is accepted, an empty one strips the extension.
    pub fn change_extension(&mut self, new_extension: &str) -> &str {
        let changed =
            Path::new(&self.relative_path).with_extension(new_extension.trim_start_matches('.'));
        self.set_relative_path(path_to_string(&changed));
        &self.relative_path
    }

    /// Globstar-aware match of the relative path
    pub fn matches(&self, pattern: &Pattern) -> bool {
        pattern.matches_globstar(&self.relative_path)
    }

    /// Write the artifact under `destination`.
    ///
    /// Writing a file onto itself is skipped. Relative destinations are taken
    /// from `root`.
    pub fn save(&mut self, root: &Path, destination: &Path) -> PipelineResult<()> {
        let target = absolutize(root, &destination.join(&self.relative_path));

        if self.source_path.as_deref() == Some(target.as_path()) {
            debug!("Skipping self-overwrite of {:?}", target);
            return Ok(());
        }

        if let Some(parent) = target.parent() {
            if parent.exists() {
                if !parent.is_dir() {
                    return Err(PipelineError::DestinationOccupied(parent.to_path_buf()));
                }
            } else {
                std::fs::create_dir_all(parent).map_err(|source| PipelineError::CreateDir {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        std::fs::write(&target, &self.data).map_err(|source| PipelineError::Write {
            path: target.clone(),
            source,
        })?;

        debug!("Saved {} bytes to {:?}", self.data.len(), target);
        self.last_destination = Some(target);
        Ok(())
    }
}
