//! Conversion between local filesystem paths and remote object names.
//!
//! Object names are `/`-delimited regardless of the host OS; a nested local
//! file `docs\install.html` under its root becomes the object name
//! `docs/install.html`.

use std::path::{Component, Path, PathBuf};

use crate::error::PathError;

/// Convert a path to a POSIX-style string (forward slashes).
///
/// # Arguments
/// * `path` - Path to convert
///
/// # Returns
/// String with forward slashes as separators.
pub fn to_posix_path(path: &Path) -> String {
    path.components()
        .map(|c: Component| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Derive the remote object name for a local file relative to a sync root.
///
/// # Arguments
/// * `path` - Local file path (must be under `root`)
/// * `root` - The local root being synchronized
///
/// # Returns
/// A `/`-delimited object name.
///
/// # Errors
/// Returns error if `path` is not under `root`.
pub fn remote_object_name(path: &Path, root: &Path) -> Result<String, PathError> {
    let relative: &Path = path
        .strip_prefix(root)
        .map_err(|_| PathError::PathOutsideRoot {
            path: path.display().to_string(),
            root: root.display().to_string(),
        })?;
    if relative.as_os_str().is_empty() {
        return Err(PathError::InvalidPath {
            path: path.display().to_string(),
        });
    }
    Ok(to_posix_path(relative))
}

/// Convert a `/`-delimited object name to a local path under a root.
///
/// # Arguments
/// * `object_name` - POSIX-style object name
/// * `destination_root` - Local destination root directory
///
/// # Returns
/// PathBuf with OS-native separators.
pub fn from_posix_path(object_name: &str, destination_root: &Path) -> PathBuf {
    let mut result: PathBuf = destination_root.to_path_buf();
    for component in object_name.split('/') {
        if !component.is_empty() {
            result.push(component);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_posix_path() {
        assert_eq!(to_posix_path(Path::new("a/b/c")), "a/b/c");
    }

    #[test]
    fn test_remote_object_name_nested() {
        let name: String =
            remote_object_name(Path::new("/sync/docs/install.html"), Path::new("/sync")).unwrap();
        assert_eq!(name, "docs/install.html");
    }

    #[test]
    fn test_remote_object_name_outside_root() {
        let result: Result<String, PathError> =
            remote_object_name(Path::new("/etc/passwd"), Path::new("/sync"));
        assert!(matches!(result, Err(PathError::PathOutsideRoot { .. })));
    }

    #[test]
    fn test_remote_object_name_root_itself() {
        let result: Result<String, PathError> =
            remote_object_name(Path::new("/sync"), Path::new("/sync"));
        assert!(matches!(result, Err(PathError::InvalidPath { .. })));
    }

    #[test]
    fn test_from_posix_path() {
        assert_eq!(
            from_posix_path("a/b/c", Path::new("/root")),
            PathBuf::from("/root/a/b/c")
        );
    }

    #[test]
    fn test_from_posix_path_empty_components() {
        assert_eq!(
            from_posix_path("a//b", Path::new("/root")),
            PathBuf::from("/root/a/b")
        );
    }
}
