use std::path::{Component, Path, PathBuf};

/// Lexically cleans up `path`: `.` segments are dropped and `..` pops the previous segment.
/// The filesystem is never consulted, so the result may point at something that does not exist.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut new_path = PathBuf::new();

    for component in path.components() {
        match component {
            // Skip the current-dir marker "."
            Component::CurDir => {}

            // For "..", pop the last component if possible
            Component::ParentDir => {
                new_path.pop();
            }

            // For normal components, push them
            other => new_path.push(other.as_os_str()),
        }
    }

    new_path
}

/// Joins `path` onto `base` unless it is already absolute, then normalizes the result.
pub fn resolve_against(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        normalize_path(path)
    } else {
        normalize_path(&base.join(path))
    }
}
