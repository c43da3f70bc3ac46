//! confstack library
//!
//! Resolves configuration values from competing sources with a fixed
//! precedence, plus a persisted override file that survives restarts.

pub mod cli;
pub mod config;
pub mod error;
pub mod format;
pub mod logging;
pub mod paths;
pub mod sources;
