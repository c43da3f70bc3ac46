//! Bootstrap settings consulted while building the source list.
//!
//! The registry asks its [`Environment`] for arguments, variables, system
//! properties, the home directory and the active profile every time it
//! initializes, so a reload sees whatever changed in between.

use crate::error::{ConfigError, Result};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

/// Prefix for environment variables mapped into configuration keys.
pub const ENV_PREFIX: &str = "CONFSTACK_";

/// Home directory setting (system property, then environment variable).
pub const HOME_DIR_PROPERTY: &str = "confstack.home.dir";
pub const HOME_DIR_ENV: &str = "CONFSTACK_HOME";

/// Active profile setting (system property, then environment variable).
pub const PROFILE_PROPERTY: &str = "confstack.profile";
pub const PROFILE_ENV: &str = "CONFSTACK_PROFILE";

/// Explicit directory scanned for filesystem properties files.
pub const CONFIG_DIR_PROPERTY: &str = "confstack.config.dir";
pub const CONFIG_DIR_ENV: &str = "CONFSTACK_CONFIG_DIR";

/// System property the active profile is propagated into before sources are
/// built. Profile-aware sources read it from here.
pub const PROPAGATED_PROFILE_PROPERTY: &str = "config.profile";

/// Process-level mutable properties, the `-Dkey=value` store.
///
/// Cloning yields another handle onto the same store.
#[derive(Debug, Clone, Default)]
pub struct SystemProperties {
    inner: Arc<RwLock<BTreeMap<String, String>>>,
}

impl SystemProperties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `key=value` definitions, as given to `-D`.
    pub fn from_definitions<I, S>(definitions: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let props = Self::new();
        for def in definitions {
            let def = def.as_ref();
            let (key, value) = def.split_once('=').ok_or_else(|| {
                ConfigError::invalid_argument(def, "expected KEY=VALUE")
            })?;
            if key.trim().is_empty() {
                return Err(ConfigError::invalid_argument(def, "empty key"));
            }
            props.set(key.trim(), value);
        }
        Ok(props)
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.read().get(key).cloned()
    }

    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        self.write().insert(key.into(), value.into());
    }

    pub fn remove(&self, key: &str) -> Option<String> {
        self.write().remove(key)
    }

    /// Point-in-time copy of every property.
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.read().clone()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, BTreeMap<String, String>> {
        // A poisoned lock only means a writer panicked mid-insert; the map is
        // still structurally valid.
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, BTreeMap<String, String>> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }
}

/// A properties resource compiled into the binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackagedResource {
    pub name: String,
    pub content: String,
}

impl PackagedResource {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    /// Resources shipped with this crate.
    pub fn builtin() -> Vec<Self> {
        vec![Self::new("confstack.conf", embedded::DEFAULTS)]
    }
}

/// Embedded default properties.
pub mod embedded {
    pub const DEFAULTS: &str = include_str!("../../resources/confstack.conf");
}

/// Settings the registry needs while building its sources.
pub trait Environment: Send + Sync {
    /// Argument vector for the command-line source.
    fn args(&self) -> Vec<String>;

    /// Snapshot of the environment variables.
    fn vars(&self) -> Vec<(String, String)>;

    /// Shared system property store.
    fn system_properties(&self) -> SystemProperties;

    /// Current working directory.
    fn working_dir(&self) -> PathBuf;

    /// Per-user configuration directory, if the platform has one.
    fn user_config_dir(&self) -> Option<PathBuf>;

    /// Properties resources bundled with the application.
    fn packaged_resources(&self) -> Vec<PackagedResource>;

    /// Look up a setting: system property first, then environment variable.
    /// Empty values count as unset.
    fn setting(&self, property: &str, env: &str) -> Option<String> {
        self.system_properties()
            .get(property)
            .or_else(|| {
                self.vars()
                    .into_iter()
                    .find(|(name, _)| name == env)
                    .map(|(_, value)| value)
            })
            .filter(|value| !value.trim().is_empty())
    }

    fn home_dir(&self) -> Option<PathBuf> {
        self.setting(HOME_DIR_PROPERTY, HOME_DIR_ENV).map(PathBuf::from)
    }

    fn profile(&self) -> Option<String> {
        self.setting(PROFILE_PROPERTY, PROFILE_ENV)
    }

    fn config_dir(&self) -> Option<PathBuf> {
        self.setting(CONFIG_DIR_PROPERTY, CONFIG_DIR_ENV).map(PathBuf::from)
    }
}

/// The running process: real environment variables and working directory.
#[derive(Debug, Clone)]
pub struct ProcessEnvironment {
    args: Vec<String>,
    system_properties: SystemProperties,
}

impl ProcessEnvironment {
    /// Use `args` as the command-line source and `system_properties` as the
    /// `-D` store.
    pub fn new(args: Vec<String>, system_properties: SystemProperties) -> Self {
        Self {
            args,
            system_properties,
        }
    }

    /// Take the argument vector from the process itself.
    pub fn from_process() -> Self {
        Self::new(std::env::args().skip(1).collect(), SystemProperties::new())
    }
}

impl Environment for ProcessEnvironment {
    fn args(&self) -> Vec<String> {
        self.args.clone()
    }

    fn vars(&self) -> Vec<(String, String)> {
        std::env::vars().collect()
    }

    fn system_properties(&self) -> SystemProperties {
        self.system_properties.clone()
    }

    fn working_dir(&self) -> PathBuf {
        std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
    }

    fn user_config_dir(&self) -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("confstack"))
    }

    fn packaged_resources(&self) -> Vec<PackagedResource> {
        PackagedResource::builtin()
    }
}

#[derive(Debug, Default)]
struct StaticState {
    args: Vec<String>,
    vars: BTreeMap<String, String>,
    working_dir: Option<PathBuf>,
    user_config_dir: Option<PathBuf>,
    resources: Vec<PackagedResource>,
}

/// Explicitly configured environment, mutable between initializations.
///
/// Nothing is inherited from the real process, which keeps registries built
/// on it isolated from each other and from the host.
#[derive(Debug, Clone, Default)]
pub struct StaticEnvironment {
    state: Arc<RwLock<StaticState>>,
    system_properties: SystemProperties,
}

impl StaticEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_args<I, S>(self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.state_mut().args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_var(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_var(name, value);
        self
    }

    pub fn with_property(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.system_properties.set(key, value);
        self
    }

    pub fn with_home_dir(self, dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        self.with_property(HOME_DIR_PROPERTY, dir.to_string_lossy().into_owned())
    }

    pub fn with_working_dir(self, dir: impl Into<PathBuf>) -> Self {
        self.state_mut().working_dir = Some(dir.into());
        self
    }

    pub fn with_user_config_dir(self, dir: impl Into<PathBuf>) -> Self {
        self.state_mut().user_config_dir = Some(dir.into());
        self
    }

    pub fn with_resource(self, resource: PackagedResource) -> Self {
        self.state_mut().resources.push(resource);
        self
    }

    pub fn set_var(&self, name: impl Into<String>, value: impl Into<String>) {
        self.state_mut().vars.insert(name.into(), value.into());
    }

    pub fn remove_var(&self, name: &str) {
        self.state_mut().vars.remove(name);
    }

    pub fn set_args<I, S>(&self, args: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.state_mut().args = args.into_iter().map(Into::into).collect();
    }

    fn state(&self) -> std::sync::RwLockReadGuard<'_, StaticState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn state_mut(&self) -> std::sync::RwLockWriteGuard<'_, StaticState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl Environment for StaticEnvironment {
    fn args(&self) -> Vec<String> {
        self.state().args.clone()
    }

    fn vars(&self) -> Vec<(String, String)> {
        self.state()
            .vars
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    fn system_properties(&self) -> SystemProperties {
        self.system_properties.clone()
    }

    fn working_dir(&self) -> PathBuf {
        self.state()
            .working_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."))
    }

    fn user_config_dir(&self) -> Option<PathBuf> {
        self.state().user_config_dir.clone()
    }

    fn packaged_resources(&self) -> Vec<PackagedResource> {
        self.state().resources.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_properties_from_definitions() {
        let props = SystemProperties::from_definitions(["a=1", "b.c = two=2"]).unwrap();
        assert_eq!(props.get("a").as_deref(), Some("1"));
        assert_eq!(props.get("b.c").as_deref(), Some(" two=2"));
    }

    #[test]
    fn test_system_properties_rejects_missing_separator() {
        let err = SystemProperties::from_definitions(["novalue"]).unwrap_err();
        assert!(err.to_string().contains("expected KEY=VALUE"));
    }

    #[test]
    fn test_system_properties_handles_share_state() {
        let props = SystemProperties::new();
        let other = props.clone();
        other.set("shared", "yes");
        assert_eq!(props.get("shared").as_deref(), Some("yes"));
        assert_eq!(props.remove("shared").as_deref(), Some("yes"));
        assert!(other.get("shared").is_none());
    }

    #[test]
    fn test_setting_prefers_system_property_over_env() {
        let env = StaticEnvironment::new()
            .with_var(HOME_DIR_ENV, "/from/env")
            .with_property(HOME_DIR_PROPERTY, "/from/prop");
        assert_eq!(env.home_dir(), Some(PathBuf::from("/from/prop")));

        env.system_properties().remove(HOME_DIR_PROPERTY);
        assert_eq!(env.home_dir(), Some(PathBuf::from("/from/env")));
    }

    #[test]
    fn test_empty_setting_counts_as_unset() {
        let env = StaticEnvironment::new().with_var(PROFILE_ENV, "  ");
        assert_eq!(env.profile(), None);
    }

    #[test]
    fn test_builtin_resources_are_named_conf() {
        let resources = PackagedResource::builtin();
        assert_eq!(resources.len(), 1);
        assert_eq!(resources[0].name, "confstack.conf");
    }
}
