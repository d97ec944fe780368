//! Path containment for everything the editor touches.
//!
//! All user-supplied paths are relative to the content root. [`ContentRoot::resolve`]
//! joins, canonicalizes (following symlinks and `..`), and only then checks that
//! the result is the root itself or lies beneath it. A path that does not exist
//! cannot be canonicalized and is rejected the same way as one that escapes:
//! callers map both to a 404.
//!
//! The root is canonicalized on every call rather than once at startup, so the
//! editor can be started before the content directory exists.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SandboxError {
    #[error("Content root not found: {0}")]
    RootMissing(PathBuf),
    #[error("Path not found: {0}")]
    NotFound(String),
    #[error("Path escapes the content root: {0}")]
    Escapes(String),
}

/// The fixed base directory every request path is validated against.
#[derive(Debug, Clone)]
pub struct ContentRoot {
    root: PathBuf,
}

impl ContentRoot {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The configured (not canonicalized) root path.
    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Canonical form of the root. Fails when the root is missing.
    pub fn canonical(&self) -> Result<PathBuf, SandboxError> {
        fs::canonicalize(&self.root).map_err(|_| SandboxError::RootMissing(self.root.clone()))
    }

    /// Resolve a root-relative path to an existing location inside the root.
    ///
    /// Leading slashes are ignored so that `"/etc"` means `<root>/etc`, never
    /// the absolute path.
    pub fn resolve(&self, relative: &str) -> Result<PathBuf, SandboxError> {
        let root = self.canonical()?;
        let trimmed = relative.trim_start_matches(['/', '\\']);
        let candidate = self.root.join(trimmed);
        let resolved = fs::canonicalize(&candidate)
            .map_err(|_| SandboxError::NotFound(relative.to_string()))?;
        if resolved.starts_with(&root) {
            Ok(resolved)
        } else {
            Err(SandboxError::Escapes(relative.to_string()))
        }
    }

    /// Resolve a path that must be an existing directory.
    pub fn resolve_dir(&self, relative: &str) -> Result<PathBuf, SandboxError> {
        let resolved = self.resolve(relative)?;
        if resolved.is_dir() {
            Ok(resolved)
        } else {
            Err(SandboxError::NotFound(relative.to_string()))
        }
    }

    /// Resolve a path that must be an existing regular file.
    pub fn resolve_file(&self, relative: &str) -> Result<PathBuf, SandboxError> {
        let resolved = self.resolve(relative)?;
        if resolved.is_file() {
            Ok(resolved)
        } else {
            Err(SandboxError::NotFound(relative.to_string()))
        }
    }

    /// Check a write target that may not exist yet.
    ///
    /// A missing target is accepted as long as its parent is inside the root.
    /// An existing target (possibly a symlink) must canonicalize inside the root.
    pub fn contains(&self, path: &Path) -> Result<bool, SandboxError> {
        let root = self.canonical()?;
        let checked = match fs::symlink_metadata(path) {
            Ok(_) => fs::canonicalize(path),
            Err(e) if e.kind() == io::ErrorKind::NotFound => match path.parent() {
                Some(parent) => fs::canonicalize(parent),
                None => return Ok(false),
            },
            Err(e) => Err(e),
        };
        Ok(checked.map(|p| p.starts_with(&root)).unwrap_or(false))
    }

    /// Express a resolved path relative to the canonical root, using `/`
    /// separators for URLs. The root itself is the empty string.
    pub fn relative(&self, resolved: &Path) -> Result<String, SandboxError> {
        let root = self.canonical()?;
        let rel = resolved
            .strip_prefix(&root)
            .map_err(|_| SandboxError::Escapes(resolved.display().to_string()))?;
        Ok(rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (TempDir, ContentRoot) {
        let tmp = TempDir::new().unwrap();
        let content = tmp.path().join("content");
        fs::create_dir_all(content.join("posts/trip")).unwrap();
        fs::write(content.join("posts/trip/a.jpg"), b"x").unwrap();
        fs::write(tmp.path().join("secret.txt"), b"outside").unwrap();
        let root = ContentRoot::new(&content);
        (tmp, root)
    }

    #[test]
    fn resolves_nested_directory() {
        let (_tmp, root) = setup();
        let resolved = root.resolve("posts/trip").unwrap();
        assert!(resolved.ends_with("posts/trip"));
        assert!(resolved.is_absolute());
    }

    #[test]
    fn empty_path_is_root() {
        let (_tmp, root) = setup();
        assert_eq!(root.resolve("").unwrap(), root.canonical().unwrap());
    }

    #[test]
    fn dot_dot_inside_root_is_allowed() {
        let (_tmp, root) = setup();
        let resolved = root.resolve("posts/trip/../trip/a.jpg").unwrap();
        assert!(resolved.ends_with("posts/trip/a.jpg"));
    }

    #[test]
    fn escaping_path_rejected_even_when_target_exists() {
        let (tmp, root) = setup();
        assert!(tmp.path().join("secret.txt").exists());
        let result = root.resolve("../secret.txt");
        assert!(matches!(result, Err(SandboxError::Escapes(_))));
        let result = root.resolve("posts/../../secret.txt");
        assert!(matches!(result, Err(SandboxError::Escapes(_))));
    }

    #[test]
    fn leading_slash_does_not_escape() {
        let (_tmp, root) = setup();
        assert!(root.resolve("/posts").unwrap().ends_with("posts"));
        assert!(matches!(
            root.resolve("/etc/passwd"),
            Err(SandboxError::NotFound(_))
        ));
    }

    #[test]
    fn missing_path_is_not_found() {
        let (_tmp, root) = setup();
        assert!(matches!(
            root.resolve("posts/nope"),
            Err(SandboxError::NotFound(_))
        ));
    }

    #[test]
    fn missing_root_is_reported() {
        let tmp = TempDir::new().unwrap();
        let root = ContentRoot::new(tmp.path().join("absent"));
        assert!(matches!(root.resolve(""), Err(SandboxError::RootMissing(_))));
    }

    #[test]
    fn resolve_dir_rejects_files() {
        let (_tmp, root) = setup();
        assert!(root.resolve_dir("posts/trip/a.jpg").is_err());
        assert!(root.resolve_file("posts/trip").is_err());
        assert!(root.resolve_file("posts/trip/a.jpg").is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn symlink_out_of_root_rejected() {
        let (tmp, root) = setup();
        std::os::unix::fs::symlink(tmp.path(), root.path().join("escape")).unwrap();
        assert!(matches!(
            root.resolve("escape/secret.txt"),
            Err(SandboxError::Escapes(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn contains_rejects_symlinked_write_target() {
        let (tmp, root) = setup();
        let folder = root.resolve_dir("posts").unwrap();
        std::os::unix::fs::symlink(tmp.path().join("secret.txt"), folder.join("_index.md"))
            .unwrap();
        assert!(!root.contains(&folder.join("_index.md")).unwrap());
        assert!(root.contains(&folder.join("index.md")).unwrap());
    }

    #[test]
    fn relative_uses_forward_slashes() {
        let (_tmp, root) = setup();
        let resolved = root.resolve("posts/trip/a.jpg").unwrap();
        assert_eq!(root.relative(&resolved).unwrap(), "posts/trip/a.jpg");
        let top = root.resolve("").unwrap();
        assert_eq!(root.relative(&top).unwrap(), "");
    }
}
