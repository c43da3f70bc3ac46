//! Process-wide source registry.
//!
//! Builds the ordered source list once, on first use, and hands out
//! precedence-resolved lookups. The built list is published through an
//! `ArcSwapOption`, so readers never block each other and never see a
//! partially built list. Building runs under a mutex, so racing first callers
//! trigger exactly one build.

use super::environment::{Environment, PROPAGATED_PROFILE_PROPERTY, ProcessEnvironment};
use crate::error::Result;
use crate::paths::PathResolver;
use crate::sources::{
    CommandLineArgsSource, ConfigSource, FilesystemProperties, PackagedProperties,
    PersistedFileSource, ProcessEnvSource, SourceKind, SystemPropertySource,
};
use arc_swap::ArcSwapOption;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// A value together with the source that supplied it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedValue {
    pub key: String,
    pub value: String,
    pub source: String,
    pub kind: SourceKind,
    pub ordinal: i32,
}

/// Summary of one registered source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceInfo {
    pub name: String,
    pub kind: SourceKind,
    pub ordinal: i32,
}

/// An initialized, immutable source list.
#[derive(Debug)]
pub struct SourceSet {
    sources: Vec<Arc<dyn ConfigSource>>,
    persisted: Arc<PersistedFileSource>,
    profile: Option<String>,
}

impl SourceSet {
    /// Sources in precedence order.
    pub fn sources(&self) -> &[Arc<dyn ConfigSource>] {
        &self.sources
    }

    pub fn persisted(&self) -> &Arc<PersistedFileSource> {
        &self.persisted
    }

    /// Profile active when this set was built.
    pub fn profile(&self) -> Option<&str> {
        self.profile.as_deref()
    }

    pub fn lookup(&self, key: &str) -> Option<String> {
        self.sources.iter().find_map(|source| source.lookup(key))
    }

    pub fn lookup_resolved(&self, key: &str) -> Option<ResolvedValue> {
        self.sources.iter().find_map(|source| {
            source.lookup(key).map(|value| ResolvedValue {
                key: key.to_string(),
                value,
                source: source.name(),
                kind: source.kind(),
                ordinal: source.ordinal(),
            })
        })
    }

    /// Union of keys defined by any source, sorted.
    pub fn property_names(&self) -> Vec<String> {
        let names: BTreeSet<String> = self
            .sources
            .iter()
            .flat_map(|source| source.property_names())
            .collect();
        names.into_iter().collect()
    }

    pub fn describe(&self) -> Vec<SourceInfo> {
        self.sources
            .iter()
            .map(|source| SourceInfo {
                name: source.name(),
                kind: source.kind(),
                ordinal: source.ordinal(),
            })
            .collect()
    }
}

#[derive(Debug, Default)]
struct InitState {
    /// Profile this registry last wrote into the system properties.
    propagated_profile: Option<String>,
}

/// Owns the source list and its one-time initialization.
pub struct SourceRegistry {
    environment: Arc<dyn Environment>,
    resolver: PathResolver,
    state: ArcSwapOption<SourceSet>,
    init: Mutex<InitState>,
}

impl std::fmt::Debug for SourceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceRegistry")
            .field("resolver", &self.resolver)
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

impl SourceRegistry {
    pub fn new(environment: Arc<dyn Environment>) -> Self {
        Self::with_resolver(environment, PathResolver::default())
    }

    pub fn with_resolver(environment: Arc<dyn Environment>, resolver: PathResolver) -> Self {
        Self {
            environment,
            resolver,
            state: ArcSwapOption::empty(),
            init: Mutex::new(InitState::default()),
        }
    }

    /// Registry over the running process.
    pub fn from_process() -> Self {
        Self::new(Arc::new(ProcessEnvironment::from_process()))
    }

    pub fn environment(&self) -> &Arc<dyn Environment> {
        &self.environment
    }

    pub fn is_initialized(&self) -> bool {
        self.state.load().is_some()
    }

    /// Build the source list if this is the first call.
    ///
    /// On failure nothing is published and the next call retries.
    pub fn ensure_initialized(&self) -> Result<Arc<SourceSet>> {
        if let Some(set) = self.state.load_full() {
            return Ok(set);
        }

        let mut init = self.init.lock().unwrap_or_else(|e| e.into_inner());
        // Another caller may have finished while we waited.
        if let Some(set) = self.state.load_full() {
            return Ok(set);
        }

        let set = Arc::new(self.build(&mut init)?);
        self.state.store(Some(Arc::clone(&set)));
        info!(sources = set.sources.len(), "Configuration sources initialized");
        Ok(set)
    }

    /// Drop the current list and build a fresh one from the environment.
    ///
    /// Meant for tests that need a clean slate. Lookups racing a reload see
    /// either the old list or the new one; a failed reload leaves the
    /// registry uninitialized.
    pub fn reload(&self) -> Result<Arc<SourceSet>> {
        let mut init = self.init.lock().unwrap_or_else(|e| e.into_inner());
        self.state.store(None);

        let set = Arc::new(self.build(&mut init)?);
        self.state.store(Some(Arc::clone(&set)));
        info!(sources = set.sources.len(), "Configuration sources reloaded");
        Ok(set)
    }

    /// Value for `key` from the highest-precedence source defining it.
    pub fn lookup(&self, key: &str) -> Result<Option<String>> {
        Ok(self.ensure_initialized()?.lookup(key))
    }

    pub fn lookup_resolved(&self, key: &str) -> Result<Option<ResolvedValue>> {
        Ok(self.ensure_initialized()?.lookup_resolved(key))
    }

    /// The writable persisted source.
    pub fn persisted_source(&self) -> Result<Arc<PersistedFileSource>> {
        Ok(Arc::clone(self.ensure_initialized()?.persisted()))
    }

    pub fn persisted_path(&self) -> Result<std::path::PathBuf> {
        Ok(self.ensure_initialized()?.persisted().path().to_path_buf())
    }

    /// Ordered sources for a configuration consumer.
    pub fn sources(&self) -> Result<Vec<Arc<dyn ConfigSource>>> {
        Ok(self.ensure_initialized()?.sources().to_vec())
    }

    pub fn property_names(&self) -> Result<Vec<String>> {
        Ok(self.ensure_initialized()?.property_names())
    }

    fn build(&self, init: &mut InitState) -> Result<SourceSet> {
        let env = self.environment.as_ref();
        let system_properties = env.system_properties();

        // The profile goes in before any source exists so profile-aware
        // sources pick it up.
        let profile = env.profile();
        match &profile {
            Some(profile) => {
                system_properties.set(PROPAGATED_PROFILE_PROPERTY, profile.clone());
                init.propagated_profile = Some(profile.clone());
            }
            None => {
                if let Some(previous) = init.propagated_profile.take()
                    && system_properties.get(PROPAGATED_PROFILE_PROPERTY).as_deref() == Some(previous.as_str())
                {
                    system_properties.remove(PROPAGATED_PROFILE_PROPERTY);
                }
            }
        }
        debug!(profile = ?profile, "Building configuration sources");

        let mut sources: Vec<Arc<dyn ConfigSource>> = vec![
            Arc::new(CommandLineArgsSource::from_args(env.args())),
            Arc::new(SystemPropertySource::new(system_properties.clone())),
            Arc::new(ProcessEnvSource::from_vars(env.vars())),
        ];

        let home_dir = env.home_dir();
        let path = self.resolver.resolve(home_dir.as_deref());
        let persisted = Arc::new(PersistedFileSource::open(&path).inspect_err(|e| {
            warn!(path = %path.display(), error = %e, "Cannot open persisted configuration");
        })?);
        sources.push(Arc::clone(&persisted) as Arc<dyn ConfigSource>);

        let filesystem = FilesystemProperties::from_environment(env).discover(&system_properties);
        sources.extend(filesystem.into_iter().map(|s| Arc::new(s) as Arc<dyn ConfigSource>));

        let packaged = PackagedProperties::new(env.packaged_resources()).discover(&system_properties);
        sources.extend(packaged.into_iter().map(|s| Arc::new(s) as Arc<dyn ConfigSource>));

        // Stable: equal ordinals keep registration order.
        sources.sort_by_key(|source| source.ordinal());

        for source in &sources {
            debug!(name = %source.name(), ordinal = source.ordinal(), "Registered configuration source");
        }

        Ok(SourceSet {
            sources,
            persisted,
            profile,
        })
    }
}
