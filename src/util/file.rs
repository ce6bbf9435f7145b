use std::path::{Component, Path, PathBuf};

/// Lexically normalize a path: drop `.` components, fold `name/..` pairs and
/// collapse repeated separators. Leading `..` components of a relative path are
/// kept. Symlinks are never consulted.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    let mut depth = 0usize;

    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => {
                normalized.push(component.as_os_str());
            }
            Component::CurDir => {}
            Component::ParentDir => {
                if depth > 0 {
                    normalized.pop();
                    depth -= 1;
                } else if !normalized.has_root() {
                    normalized.push("..");
                }
            }
            Component::Normal(name) => {
                normalized.push(name);
                depth += 1;
            }
        }
    }

    if normalized.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        normalized
    }
}

/// Join `path` onto `root` when it is relative, then normalize lexically
pub fn absolutize(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        normalize_path(path)
    } else {
        normalize_path(&root.join(path))
    }
}

/// Render a relative path with the platform separator
pub fn path_to_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
