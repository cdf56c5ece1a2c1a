//! Watch path normalization and nesting checks

use crate::error::ValidationError;
use std::path::{Component, Path, PathBuf};

/// Normalize a directory for use as a watch key
///
/// - Rejects relative paths and `..` components
/// - Drops `.` components and trailing separators
/// - Rejects `/` itself
pub fn normalize_watch_dir(path: &Path) -> Result<PathBuf, ValidationError> {
    if !path.is_absolute() {
        return Err(ValidationError::RelativePath(path.to_path_buf()));
    }

    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                return Err(ValidationError::ParentComponent(path.to_path_buf()))
            }
            Component::CurDir => {}
            other => normalized.push(other.as_os_str()),
        }
    }

    if normalized.parent().is_none() {
        return Err(ValidationError::FilesystemRoot);
    }
    Ok(normalized)
}

/// Label used when a watch is requested without one: the dir's base name
pub fn default_label(dir: &Path) -> String {
    dir.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "/".to_string())
}

/// Find an existing watch dir that `dir` would nest with
///
/// Two dirs nest if either is a path prefix of the other (component-wise, so
/// `/a/foo` and `/a/foobar` do not nest). Equal dirs nest.
pub fn find_overlap<'a, I>(dir: &Path, existing: I) -> Option<&'a Path>
where
    I: IntoIterator<Item = &'a Path>,
{
    existing
        .into_iter()
        .find(|other| dir.starts_with(other) || other.starts_with(dir))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_dots_and_trailing_slash() {
        assert_eq!(
            normalize_watch_dir(Path::new("/home/me/./src/")).unwrap(),
            PathBuf::from("/home/me/src")
        );
    }

    #[test]
    fn test_normalize_rejects_bad_paths() {
        assert_eq!(
            normalize_watch_dir(Path::new("src/main")),
            Err(ValidationError::RelativePath(PathBuf::from("src/main")))
        );
        assert!(matches!(
            normalize_watch_dir(Path::new("/home/../etc")),
            Err(ValidationError::ParentComponent(_))
        ));
        assert_eq!(
            normalize_watch_dir(Path::new("/")),
            Err(ValidationError::FilesystemRoot)
        );
    }

    #[test]
    fn test_default_label() {
        assert_eq!(default_label(Path::new("/home/me/project")), "project");
        assert_eq!(default_label(Path::new("/")), "/");
    }

    #[test]
    fn test_find_overlap() {
        let existing = [PathBuf::from("/a/foo"), PathBuf::from("/b")];
        let existing = || existing.iter().map(PathBuf::as_path);

        // child of an existing watch
        assert_eq!(
            find_overlap(Path::new("/a/foo/bar"), existing()),
            Some(Path::new("/a/foo"))
        );
        // parent of an existing watch
        assert_eq!(find_overlap(Path::new("/a"), existing()), Some(Path::new("/a/foo")));
        // same dir
        assert_eq!(find_overlap(Path::new("/b"), existing()), Some(Path::new("/b")));
        // string prefix only
        assert_eq!(find_overlap(Path::new("/a/foobar"), existing()), None);
        assert_eq!(find_overlap(Path::new("/c"), existing()), None);
    }
}
