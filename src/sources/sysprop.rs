//! System property source.

use super::{ConfigSource, SourceKind};
use crate::config::environment::SystemProperties;

/// Live view over the process-level [`SystemProperties`] store; changes made
/// through any handle are visible on the next lookup.
#[derive(Debug, Clone)]
pub struct SystemPropertySource {
    properties: SystemProperties,
}

impl SystemPropertySource {
    pub fn new(properties: SystemProperties) -> Self {
        Self { properties }
    }
}

impl ConfigSource for SystemPropertySource {
    fn lookup(&self, key: &str) -> Option<String> {
        self.properties.get(key)
    }

    fn ordinal(&self) -> i32 {
        SourceKind::SysProp.ordinal()
    }

    fn name(&self) -> String {
        "system properties".to_string()
    }

    fn kind(&self) -> SourceKind {
        SourceKind::SysProp
    }

    fn property_names(&self) -> Vec<String> {
        self.properties.snapshot().into_keys().collect()
    }
}
