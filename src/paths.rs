//! Location of the persisted override file.
//!
//! With a home directory the file lives at
//! `<home>/data/generated/confstack.properties`, and the containing directory
//! is created on resolution. Without one it falls back to the system temp
//! directory, which always exists.

use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Well-known name of the persisted override file.
pub const PERSISTED_FILE_NAME: &str = "confstack.properties";

/// Computes where the persisted override file lives.
#[derive(Debug, Clone)]
pub struct PathResolver {
    temp_dir: PathBuf,
    file_name: String,
}

impl Default for PathResolver {
    fn default() -> Self {
        Self {
            temp_dir: std::env::temp_dir(),
            file_name: PERSISTED_FILE_NAME.to_string(),
        }
    }
}

impl PathResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different fallback directory for when no home is set.
    pub fn with_temp_dir(mut self, temp_dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = temp_dir.into();
        self
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Directory holding generated files under `home`.
    pub fn generated_dir(home: &Path) -> PathBuf {
        home.join("data").join("generated")
    }

    /// Resolve the persisted file path for `home_dir`.
    ///
    /// Directory creation is best effort: on failure the path is still
    /// returned and the failure surfaces when the file is first opened.
    pub fn resolve(&self, home_dir: Option<&Path>) -> PathBuf {
        let Some(home) = home_dir.filter(|dir| !dir.as_os_str().is_empty()) else {
            return self.temp_dir.join(&self.file_name);
        };

        let generated = Self::generated_dir(home);
        match std::fs::create_dir_all(&generated) {
            Ok(()) => debug!(dir = %generated.display(), "Persisted configuration directory ready"),
            Err(e) => warn!(
                dir = %generated.display(),
                error = %e,
                "Could not create persisted configuration directory"
            ),
        }

        generated.join(&self.file_name)
    }
}

/// Resolve the persisted file path with the default resolver.
pub fn resolve_persisted_config_path(home_dir: Option<&Path>) -> PathBuf {
    PathResolver::default().resolve(home_dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_no_home_falls_back_to_temp_dir() {
        let path = resolve_persisted_config_path(None);
        assert_eq!(path, std::env::temp_dir().join(PERSISTED_FILE_NAME));
    }

    #[test]
    fn test_empty_home_counts_as_absent() {
        let resolver = PathResolver::new().with_temp_dir("/scratch");
        let path = resolver.resolve(Some(Path::new("")));
        assert_eq!(path, PathBuf::from("/scratch").join(PERSISTED_FILE_NAME));
    }

    #[test]
    fn test_home_creates_generated_dir() {
        let temp = TempDir::new().unwrap();
        let home = temp.path().join("app-home");

        let path = resolve_persisted_config_path(Some(&home));

        assert_eq!(
            path,
            home.join("data").join("generated").join(PERSISTED_FILE_NAME)
        );
        assert!(home.join("data").join("generated").is_dir());
        assert!(!path.exists());
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let first = resolve_persisted_config_path(Some(temp.path()));
        let second = resolve_persisted_config_path(Some(temp.path()));
        assert_eq!(first, second);
    }

    #[test]
    fn test_creation_failure_still_returns_path() {
        let temp = TempDir::new().unwrap();
        // A regular file where the home directory should be.
        let blocker = temp.path().join("home-is-a-file");
        std::fs::write(&blocker, "x").unwrap();

        let path = resolve_persisted_config_path(Some(&blocker));

        assert_eq!(
            path,
            blocker.join("data").join("generated").join(PERSISTED_FILE_NAME)
        );
        assert!(!path.parent().unwrap().exists());
    }
}
