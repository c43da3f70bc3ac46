//! Persisted override file source.
//!
//! The only writable source. Nothing is cached: every lookup reads the file,
//! so edits made through [`PersistedFileSource::set`] or by another process
//! are visible immediately.

use super::{ConfigSource, SourceKind};
use crate::config::properties::{self, PropertyMap};
use crate::error::{ConfigError, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

/// `key=value` file that survives restarts.
#[derive(Debug)]
pub struct PersistedFileSource {
    path: PathBuf,
    /// Serializes read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

impl PersistedFileSource {
    /// Bind to `path` and validate what is there.
    ///
    /// A missing file is fine. A missing parent directory or a malformed file
    /// is an error.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let source = Self::bind(path);
        let entries = source.load()?;
        debug!(
            path = %source.path.display(),
            entries = entries.len(),
            "Opened persisted configuration"
        );
        Ok(source)
    }

    /// Bind to `path` without touching the filesystem. Writes create the
    /// parent directory, so this suits writers that run before any read.
    pub fn bind(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and parse the whole file.
    pub fn load(&self) -> Result<PropertyMap> {
        match std::fs::read_to_string(&self.path) {
            Ok(text) => properties::parse(&text).map_err(|e| ConfigError::MalformedPersistedFile {
                path: self.path.clone(),
                line: e.line,
                reason: e.reason,
            }),
            Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                Err(ConfigError::MalformedPersistedFile {
                    path: self.path.clone(),
                    line: 1,
                    reason: "invalid UTF-8".to_string(),
                })
            }
            Err(e) => {
                if let Some(dir) = self.path.parent()
                    && !dir.as_os_str().is_empty()
                    && !dir.is_dir()
                {
                    return Err(ConfigError::DirectoryCreation {
                        dir: dir.to_path_buf(),
                        source: None,
                    });
                }
                if e.kind() == std::io::ErrorKind::NotFound {
                    Ok(PropertyMap::new())
                } else {
                    Err(ConfigError::io(&self.path, e))
                }
            }
        }
    }

    /// Set one override.
    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        self.modify(|entries| {
            entries.insert(key.to_string(), value.to_string());
        })
    }

    /// Remove one override. Returns the previous value.
    pub fn remove(&self, key: &str) -> Result<Option<String>> {
        let mut previous = None;
        self.modify(|entries| previous = entries.remove(key))?;
        Ok(previous)
    }

    /// Replace every override with `entries`.
    pub fn replace_all(&self, entries: PropertyMap) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        self.ensure_parent()?;
        self.write(&entries)
    }

    fn modify(&self, change: impl FnOnce(&mut PropertyMap)) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        self.ensure_parent()?;
        let mut entries = self.load()?;
        change(&mut entries);
        self.write(&entries)
    }

    fn ensure_parent(&self) -> Result<()> {
        match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => {
                std::fs::create_dir_all(dir).map_err(|e| ConfigError::DirectoryCreation {
                    dir: dir.to_path_buf(),
                    source: Some(e),
                })
            }
            _ => Ok(()),
        }
    }

    /// Write via a temp file in the same directory, then rename over the
    /// target, so readers never see a half-written file.
    fn write(&self, entries: &PropertyMap) -> Result<()> {
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let header = vec![
            "Persisted configuration overrides".to_string(),
            format!("Last modified: {}", chrono::Utc::now().to_rfc3339()),
        ];
        let text = properties::render(entries, &header);

        let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(|e| ConfigError::io(&dir, e))?;
        tmp.write_all(text.as_bytes())
            .map_err(|e| ConfigError::io(tmp.path(), e))?;
        tmp.persist(&self.path)
            .map_err(|e| ConfigError::io(&self.path, e.error))?;

        debug!(path = %self.path.display(), entries = entries.len(), "Wrote persisted configuration");
        Ok(())
    }
}

impl ConfigSource for PersistedFileSource {
    fn lookup(&self, key: &str) -> Option<String> {
        match self.load() {
            Ok(entries) => entries.get(key).cloned(),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Ignoring unreadable persisted configuration");
                None
            }
        }
    }

    fn ordinal(&self) -> i32 {
        SourceKind::Persisted.ordinal()
    }

    fn name(&self) -> String {
        format!("persisted file {}", self.path.display())
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Persisted
    }

    fn property_names(&self) -> Vec<String> {
        self.load()
            .map(|entries| entries.into_keys().collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_empty_source() {
        let temp = TempDir::new().unwrap();
        let source = PersistedFileSource::open(temp.path().join("confstack.properties")).unwrap();

        assert!(source.lookup("db.url").is_none());
        assert!(source.lookup("anything.else").is_none());
        assert!(source.property_names().is_empty());
    }

    #[test]
    fn test_missing_parent_dir_is_reported() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("absent").join("confstack.properties");

        let err = PersistedFileSource::open(&path).unwrap_err();
        assert_eq!(err.code(), ErrorCode::DirectoryCreationFailure);
    }

    #[test]
    fn test_malformed_file_is_fatal() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("confstack.properties");
        std::fs::write(&path, "db.url=ok\ngarbage line\n").unwrap();

        let err = PersistedFileSource::open(&path).unwrap_err();
        match err {
            ConfigError::MalformedPersistedFile { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_writes_are_visible_immediately() {
        let temp = TempDir::new().unwrap();
        let source = PersistedFileSource::open(temp.path().join("confstack.properties")).unwrap();

        source.set("db.url", "jdbc:persisted").unwrap();
        assert_eq!(source.lookup("db.url").as_deref(), Some("jdbc:persisted"));

        source.set("http.port", "8443").unwrap();
        assert_eq!(source.property_names(), vec!["db.url", "http.port"]);

        assert_eq!(source.remove("db.url").unwrap().as_deref(), Some("jdbc:persisted"));
        assert!(source.lookup("db.url").is_none());
        assert_eq!(source.remove("db.url").unwrap(), None);
    }

    #[test]
    fn test_external_edits_are_visible() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("confstack.properties");
        let source = PersistedFileSource::open(&path).unwrap();

        std::fs::write(&path, "# edited by hand\nfeature.x=on\n").unwrap();
        assert_eq!(source.lookup("feature.x").as_deref(), Some("on"));
    }

    #[test]
    fn test_write_recreates_removed_parent() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("data").join("generated");
        std::fs::create_dir_all(&dir).unwrap();
        let source = PersistedFileSource::open(dir.join("confstack.properties")).unwrap();

        std::fs::remove_dir_all(temp.path().join("data")).unwrap();
        source.set("a", "1").unwrap();
        assert_eq!(source.lookup("a").as_deref(), Some("1"));
    }

    #[test]
    fn test_writer_before_first_read_creates_directories() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("home/data/generated/confstack.properties");
        let writer = PersistedFileSource::bind(&path);

        writer.set("db.url", "jdbc:early").unwrap();

        let reader = PersistedFileSource::open(&path).unwrap();
        assert_eq!(reader.lookup("db.url").as_deref(), Some("jdbc:early"));
    }

    #[test]
    fn test_non_utf8_file_is_malformed() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("confstack.properties");
        std::fs::write(&path, b"db.url=\xff\xfe\n").unwrap();

        let err = PersistedFileSource::open(&path).unwrap_err();
        assert_eq!(err.code(), ErrorCode::MalformedPersistedFile);
        match err {
            ConfigError::MalformedPersistedFile { line, reason, .. } => {
                assert_eq!(line, 1);
                assert_eq!(reason, "invalid UTF-8");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_written_keys_and_values_read_back_unchanged() {
        let temp = TempDir::new().unwrap();
        let source = PersistedFileSource::open(temp.path().join("confstack.properties")).unwrap();

        source.set("#channel", "ops").unwrap();
        source.set("!alert", "on").unwrap();
        source.set("banner", "  padded  ").unwrap();
        source.set("motd", "# not a comment").unwrap();

        assert_eq!(source.lookup("#channel").as_deref(), Some("ops"));
        assert_eq!(source.lookup("!alert").as_deref(), Some("on"));
        assert_eq!(source.lookup("banner").as_deref(), Some("  padded  "));
        assert_eq!(source.lookup("motd").as_deref(), Some("# not a comment"));
        assert_eq!(
            source.property_names(),
            vec!["!alert", "#channel", "banner", "motd"]
        );
    }

    #[test]
    fn test_replace_all_overwrites_everything() {
        let temp = TempDir::new().unwrap();
        let source = PersistedFileSource::open(temp.path().join("confstack.properties")).unwrap();
        source.set("old", "1").unwrap();

        let mut entries = PropertyMap::new();
        entries.insert("new".to_string(), "2".to_string());
        source.replace_all(entries).unwrap();

        assert!(source.lookup("old").is_none());
        assert_eq!(source.lookup("new").as_deref(), Some("2"));
        let text = std::fs::read_to_string(source.path()).unwrap();
        assert!(text.starts_with("# Persisted configuration overrides\n"));
    }
}
