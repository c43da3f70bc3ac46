//! Bundled properties files.
//!
//! Two discoverers produce one source per file: [`FilesystemProperties`]
//! scans directories on disk, [`PackagedProperties`] walks resources compiled
//! into the binary. Both ignore anything that is not `*.conf` or
//! `*.properties` and return sources in a stable order.

use super::{ConfigSource, SourceKind};
use crate::config::environment::{Environment, PROPAGATED_PROFILE_PROPERTY, PackagedResource, SystemProperties};
use crate::config::properties::{self, PropertyMap};
use crate::error::ConfigError;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const PROPERTIES_EXTENSIONS: &[&str] = &["conf", "properties"];

/// Where a bundled source was loaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyOrigin {
    File(PathBuf),
    Packaged(String),
}

impl fmt::Display for PropertyOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyOrigin::File(path) => write!(f, "{}", path.display()),
            PropertyOrigin::Packaged(name) => write!(f, "packaged:{}", name),
        }
    }
}

/// One discovered properties file.
#[derive(Debug, Clone)]
pub struct BundledPropertiesSource {
    origin: PropertyOrigin,
    kind: SourceKind,
    values: PropertyMap,
    /// Profile observed when the source was built.
    profile: Option<String>,
}

impl BundledPropertiesSource {
    pub fn new(
        origin: PropertyOrigin,
        kind: SourceKind,
        values: PropertyMap,
        profile: Option<String>,
    ) -> Self {
        Self {
            origin,
            kind,
            values,
            profile,
        }
    }

    pub fn origin(&self) -> &PropertyOrigin {
        &self.origin
    }

    pub fn profile(&self) -> Option<&str> {
        self.profile.as_deref()
    }
}

impl ConfigSource for BundledPropertiesSource {
    fn lookup(&self, key: &str) -> Option<String> {
        properties::get_for_profile(&self.values, key, self.profile.as_deref()).cloned()
    }

    fn ordinal(&self) -> i32 {
        self.kind.ordinal()
    }

    fn name(&self) -> String {
        format!("properties {}", self.origin)
    }

    fn kind(&self) -> SourceKind {
        self.kind
    }

    fn property_names(&self) -> Vec<String> {
        properties::names_for_profile(&self.values, self.profile.as_deref())
    }
}

fn has_properties_extension(name: &Path) -> bool {
    name.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| PROPERTIES_EXTENSIONS.contains(&ext))
}

fn propagated_profile(system_properties: &SystemProperties) -> Option<String> {
    system_properties
        .get(PROPAGATED_PROFILE_PROPERTY)
        .filter(|p| !p.trim().is_empty())
}

/// Discovers properties files in directories on disk.
#[derive(Debug, Clone, Default)]
pub struct FilesystemProperties {
    dirs: Vec<PathBuf>,
}

impl FilesystemProperties {
    pub fn new(dirs: Vec<PathBuf>) -> Self {
        Self { dirs }
    }

    /// Directories to scan, highest precedence first: the explicit config
    /// dir, else `<home>/conf`, else `<working dir>/conf`; then the per-user
    /// config dir.
    pub fn from_environment(env: &dyn Environment) -> Self {
        let primary = env
            .config_dir()
            .or_else(|| env.home_dir().map(|home| home.join("conf")))
            .unwrap_or_else(|| env.working_dir().join("conf"));

        let mut dirs = vec![primary];
        if let Some(user_dir) = env.user_config_dir()
            && !dirs.contains(&user_dir)
        {
            dirs.push(user_dir);
        }
        Self { dirs }
    }

    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    /// Build one source per file found. Unreadable directories and
    /// malformed files are skipped with a warning.
    pub fn discover(&self, system_properties: &SystemProperties) -> Vec<BundledPropertiesSource> {
        let profile = propagated_profile(system_properties);
        let mut sources = Vec::new();

        for dir in &self.dirs {
            let files = match scan_dir(dir) {
                Ok(files) => files,
                Err(e) => {
                    warn!(error = %e, "Skipping properties directory");
                    continue;
                }
            };

            for file in files {
                let text = match std::fs::read_to_string(&file) {
                    Ok(text) => text,
                    Err(e) => {
                        warn!(path = %file.display(), error = %e, "Skipping unreadable properties file");
                        continue;
                    }
                };
                match properties::parse(&text) {
                    Ok(values) => {
                        debug!(path = %file.display(), entries = values.len(), "Discovered properties file");
                        sources.push(BundledPropertiesSource::new(
                            PropertyOrigin::File(file),
                            SourceKind::FsProps,
                            values,
                            profile.clone(),
                        ));
                    }
                    Err(e) => {
                        let err = ConfigError::MalformedProperties {
                            origin: file.display().to_string(),
                            line: e.line,
                            reason: e.reason,
                        };
                        warn!(error = %err, "Skipping malformed properties file");
                    }
                }
            }
        }

        sources
    }
}

/// Properties files directly inside `dir`, sorted by file name. A missing
/// directory has no files.
fn scan_dir(dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(dir = %dir.display(), "No properties directory");
            return Ok(Vec::new());
        }
        Err(e) => {
            return Err(ConfigError::SourceDiscovery {
                location: dir.display().to_string(),
                source: e,
            });
        }
    };

    let mut files: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && has_properties_extension(path))
        .collect();
    files.sort();
    Ok(files)
}

/// Discovers properties resources compiled into the application.
#[derive(Debug, Clone, Default)]
pub struct PackagedProperties {
    resources: Vec<PackagedResource>,
}

impl PackagedProperties {
    pub fn new(resources: Vec<PackagedResource>) -> Self {
        Self { resources }
    }

    /// One source per resource, in declaration order.
    pub fn discover(&self, system_properties: &SystemProperties) -> Vec<BundledPropertiesSource> {
        let profile = propagated_profile(system_properties);

        self.resources
            .iter()
            .filter(|resource| has_properties_extension(Path::new(&resource.name)))
            .filter_map(|resource| match properties::parse(&resource.content) {
                Ok(values) => {
                    debug!(resource = %resource.name, entries = values.len(), "Discovered packaged properties");
                    Some(BundledPropertiesSource::new(
                        PropertyOrigin::Packaged(resource.name.clone()),
                        SourceKind::ClasspathProps,
                        values,
                        profile.clone(),
                    ))
                }
                Err(e) => {
                    warn!(resource = %resource.name, error = %e, "Skipping malformed packaged properties");
                    None
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::environment::StaticEnvironment;
    use tempfile::TempDir;

    #[test]
    fn test_filesystem_discovery_is_sorted_and_filtered() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("b.properties"), "k=b\n").unwrap();
        std::fs::write(temp.path().join("a.conf"), "k=a\n").unwrap();
        std::fs::write(temp.path().join("notes.txt"), "k=txt\n").unwrap();
        std::fs::create_dir(temp.path().join("nested.conf")).unwrap();

        let discovery = FilesystemProperties::new(vec![temp.path().to_path_buf()]);
        let sources = discovery.discover(&SystemProperties::new());

        let origins: Vec<_> = sources.iter().map(|s| s.origin().clone()).collect();
        assert_eq!(
            origins,
            vec![
                PropertyOrigin::File(temp.path().join("a.conf")),
                PropertyOrigin::File(temp.path().join("b.properties")),
            ]
        );
        assert!(sources.iter().all(|s| s.ordinal() == 500));

        // Unchanged directory, same result.
        let again: Vec<_> = discovery
            .discover(&SystemProperties::new())
            .iter()
            .map(|s| s.origin().clone())
            .collect();
        assert_eq!(origins, again);
    }

    #[test]
    fn test_missing_directory_yields_no_sources() {
        let temp = TempDir::new().unwrap();
        let discovery = FilesystemProperties::new(vec![temp.path().join("missing")]);
        assert!(discovery.discover(&SystemProperties::new()).is_empty());
    }

    #[test]
    fn test_unreadable_location_degrades_to_nothing() {
        let temp = TempDir::new().unwrap();
        let not_a_dir = temp.path().join("file.conf");
        std::fs::write(&not_a_dir, "k=v\n").unwrap();

        let discovery = FilesystemProperties::new(vec![not_a_dir]);
        assert!(discovery.discover(&SystemProperties::new()).is_empty());
    }

    #[test]
    fn test_malformed_file_is_skipped() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("bad.conf"), "not a property\n").unwrap();
        std::fs::write(temp.path().join("good.conf"), "k=v\n").unwrap();

        let sources = FilesystemProperties::new(vec![temp.path().to_path_buf()])
            .discover(&SystemProperties::new());
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].lookup("k").as_deref(), Some("v"));
    }

    #[test]
    fn test_locations_prefer_explicit_config_dir() {
        let env = StaticEnvironment::new()
            .with_home_dir("/opt/app")
            .with_working_dir("/work")
            .with_property("confstack.config.dir", "/etc/app");
        let discovery = FilesystemProperties::from_environment(&env);
        assert_eq!(discovery.dirs(), &[PathBuf::from("/etc/app")]);
    }

    #[test]
    fn test_locations_fall_back_to_home_then_working_dir() {
        let env = StaticEnvironment::new()
            .with_home_dir("/opt/app")
            .with_user_config_dir("/home/u/.config/confstack");
        assert_eq!(
            FilesystemProperties::from_environment(&env).dirs(),
            &[
                PathBuf::from("/opt/app/conf"),
                PathBuf::from("/home/u/.config/confstack")
            ]
        );

        let env = StaticEnvironment::new().with_working_dir("/work");
        assert_eq!(
            FilesystemProperties::from_environment(&env).dirs(),
            &[PathBuf::from("/work/conf")]
        );
    }

    #[test]
    fn test_packaged_discovery_keeps_declaration_order() {
        let discovery = PackagedProperties::new(vec![
            PackagedResource::new("z.conf", "k=z\n"),
            PackagedResource::new("readme.md", "k=md\n"),
            PackagedResource::new("a.properties", "k=a\n"),
        ]);
        let sources = discovery.discover(&SystemProperties::new());

        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].lookup("k").as_deref(), Some("z"));
        assert_eq!(sources[1].lookup("k").as_deref(), Some("a"));
        assert!(sources.iter().all(|s| s.kind() == SourceKind::ClasspathProps));
    }

    #[test]
    fn test_sources_observe_propagated_profile() {
        let props = SystemProperties::new();
        props.set(PROPAGATED_PROFILE_PROPERTY, "dev");

        let discovery =
            PackagedProperties::new(vec![PackagedResource::new("app.conf", "level=info\n%dev.level=debug\n")]);
        let sources = discovery.discover(&props);

        assert_eq!(sources[0].profile(), Some("dev"));
        assert_eq!(sources[0].lookup("level").as_deref(), Some("debug"));
        assert_eq!(sources[0].property_names(), vec!["level"]);
    }
}
