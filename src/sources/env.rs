//! Process environment source.
//!
//! Variables named `CONFSTACK_<NAME>` map onto dotted keys: the prefix is
//! stripped, the rest lower-cased, `__` becomes `-` and `_` becomes `.`.
//! `CONFSTACK_HTTP_MAX__THREADS` is `http.max-threads`.
//!
//! The bootstrap settings `CONFSTACK_HOME`, `CONFSTACK_PROFILE` and
//! `CONFSTACK_CONFIG_DIR` steer source discovery and are not keys.

use super::{ConfigSource, SourceKind};
use crate::config::environment::{CONFIG_DIR_ENV, ENV_PREFIX, HOME_DIR_ENV, PROFILE_ENV};
use crate::config::properties::PropertyMap;
use heck::ToShoutySnakeCase;

/// Entries taken from environment variables, already mapped to keys.
#[derive(Debug, Clone)]
pub struct ProcessEnvSource {
    values: PropertyMap,
}

impl ProcessEnvSource {
    /// Wrap a mapping whose keys are already in configuration form.
    pub fn new(values: PropertyMap) -> Self {
        Self { values }
    }

    /// Map raw variables with [`env_var_to_key`], dropping those without the
    /// `CONFSTACK_` prefix.
    pub fn from_vars<I>(vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let values = vars
            .into_iter()
            .filter_map(|(name, value)| env_var_to_key(&name).map(|key| (key, value)))
            .collect();
        Self { values }
    }
}

/// Variables read as bootstrap settings rather than configuration keys.
const SETTING_VARS: &[&str] = &[HOME_DIR_ENV, PROFILE_ENV, CONFIG_DIR_ENV];

/// Configuration key for an environment variable name.
pub fn env_var_to_key(name: &str) -> Option<String> {
    if SETTING_VARS.contains(&name) {
        return None;
    }
    let rest = name.strip_prefix(ENV_PREFIX)?;
    if rest.is_empty() {
        return None;
    }
    Some(rest.to_lowercase().replace("__", "-").replace('_', "."))
}

/// Environment variable name for a configuration key.
pub fn env_var_name(key: &str) -> String {
    let body = key
        .split('-')
        .map(|segment| segment.to_shouty_snake_case())
        .collect::<Vec<_>>()
        .join("__");
    format!("{ENV_PREFIX}{body}")
}

impl ConfigSource for ProcessEnvSource {
    fn lookup(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn ordinal(&self) -> i32 {
        SourceKind::Env.ordinal()
    }

    fn name(&self) -> String {
        "environment variables".to_string()
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Env
    }

    fn property_names(&self) -> Vec<String> {
        self.values.keys().cloned().collect()
    }
}
