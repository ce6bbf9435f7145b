// Shared fixtures for integration tests
#![allow(dead_code)]

use std::fs;
use std::path::{MAIN_SEPARATOR, Path};
use tempfile::TempDir;

/// Write `body` to `root/relative`, creating parent directories
pub fn write(root: &Path, relative: &str, body: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, body).unwrap();
}

/// Temp directory holding the given files
pub fn tree(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for (relative, body) in files {
        write(dir.path(), relative, body);
    }
    dir
}

/// Relative path with `/` separators
pub fn slash(path: &str) -> String {
    path.replace(MAIN_SEPARATOR, "/")
}
