//! Layered configuration resolution.
//!
//! Sources, highest precedence first:
//! 1. **Command line** - `--key=value` / `--key value`
//! 2. **System properties** - `-Dkey=value`
//! 3. **Environment** - `CONFSTACK_*` variables
//! 4. **Persisted overrides** - `<home>/data/generated/confstack.properties`
//!    (or the system temp dir when no home is set); the only writable source
//! 5. **Filesystem properties** - `*.conf` / `*.properties` in the config dir
//! 6. **Packaged properties** - defaults compiled into the binary
//!
//! ## Settings
//! - `CONFSTACK_HOME` / `-Dconfstack.home.dir` - Home directory
//! - `CONFSTACK_PROFILE` / `-Dconfstack.profile` - Active profile
//! - `CONFSTACK_CONFIG_DIR` / `-Dconfstack.config.dir` - Properties directory
//!   (default: `<home>/conf`, else `./conf`)

pub mod environment;
pub mod properties;
mod registry;

pub use environment::{
    Environment, PackagedResource, ProcessEnvironment, StaticEnvironment, SystemProperties,
};
pub use properties::PropertyMap;
pub use registry::{ResolvedValue, SourceInfo, SourceRegistry, SourceSet};
