//! Configuration sources.
//!
//! Every source answers key lookups and carries a fixed ordinal. Lower
//! ordinals win; the registry breaks ties by registration order.
//!
//! | Kind            | Ordinal |
//! |-----------------|---------|
//! | command line    | 100     |
//! | system property | 200     |
//! | environment     | 300     |
//! | persisted file  | 400     |
//! | filesystem file | 500     |
//! | packaged file   | 600     |

mod args;
mod bundled;
mod env;
mod persisted;
mod sysprop;

pub use args::{CommandLineArgsSource, parse_args};
pub use bundled::{BundledPropertiesSource, FilesystemProperties, PackagedProperties, PropertyOrigin};
pub use env::{ProcessEnvSource, env_var_name, env_var_to_key};
pub use persisted::PersistedFileSource;
pub use sysprop::SystemPropertySource;

use serde::Serialize;
use std::fmt;

/// The closed set of source kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    CmdArgs,
    SysProp,
    Env,
    Persisted,
    FsProps,
    ClasspathProps,
}

impl SourceKind {
    /// Ordinal assigned to sources of this kind.
    pub fn ordinal(self) -> i32 {
        match self {
            SourceKind::CmdArgs => 100,
            SourceKind::SysProp => 200,
            SourceKind::Env => 300,
            SourceKind::Persisted => 400,
            SourceKind::FsProps => 500,
            SourceKind::ClasspathProps => 600,
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::CmdArgs => write!(f, "command-line"),
            SourceKind::SysProp => write!(f, "system-property"),
            SourceKind::Env => write!(f, "environment"),
            SourceKind::Persisted => write!(f, "persisted"),
            SourceKind::FsProps => write!(f, "filesystem"),
            SourceKind::ClasspathProps => write!(f, "packaged"),
        }
    }
}

/// A provider of configuration key/value entries.
pub trait ConfigSource: Send + Sync + fmt::Debug {
    /// Value for `key`, if this source defines it.
    fn lookup(&self, key: &str) -> Option<String>;

    /// Precedence rank; lower wins. Fixed for the lifetime of the source.
    fn ordinal(&self) -> i32;

    /// Diagnostic name.
    fn name(&self) -> String;

    fn kind(&self) -> SourceKind;

    /// Every key this source currently defines, sorted.
    fn property_names(&self) -> Vec<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_ordinals_follow_precedence() {
        let kinds = [
            SourceKind::CmdArgs,
            SourceKind::SysProp,
            SourceKind::Env,
            SourceKind::Persisted,
            SourceKind::FsProps,
            SourceKind::ClasspathProps,
        ];
        for pair in kinds.windows(2) {
            assert!(pair[0].ordinal() < pair[1].ordinal(), "{} before {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_kind_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&SourceKind::ClasspathProps).unwrap(),
            "\"classpath_props\""
        );
    }
}
