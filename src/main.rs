//! confstack command-line tool
//!
//! Resolves configuration keys across every source and edits the persisted
//! override file.

use anyhow::{Context, Result};
use clap::Parser;
use confstack::cli::{Cli, Command};
use confstack::config::{ProcessEnvironment, SourceRegistry, SystemProperties};
use confstack::error::ConfigError;
use confstack::format::{OutputFormat, format_listing, format_resolved, format_sources};
use confstack::logging::{LogTarget, init_logging};
use confstack::sources::env_var_name;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, info};

fn main() -> ExitCode {
    let cli = Cli::parse();
    let format = cli.format;

    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            match (format, err.downcast_ref::<ConfigError>()) {
                (OutputFormat::Json, Some(config_err)) => {
                    let report = serde_json::to_string_pretty(&config_err.to_report())
                        .unwrap_or_else(|_| config_err.to_string());
                    eprintln!("{report}");
                }
                _ => eprintln!("Error: {err:#}"),
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    init_logging(&LogTarget::parse(&cli.log), cli.verbose)?;

    let properties = SystemProperties::from_definitions(&cli.properties)?;
    let environment = ProcessEnvironment::new(cli.command.config_args(), properties);
    let registry = SourceRegistry::new(Arc::new(environment));
    let format = cli.format;

    match cli.command {
        Command::Get { key, .. } => match registry.lookup_resolved(&key)? {
            Some(resolved) => {
                println!("{}", format_resolved(&resolved, format));
                Ok(ExitCode::SUCCESS)
            }
            None => {
                debug!(key = %key, "Key not defined by any source");
                Ok(ExitCode::FAILURE)
            }
        },
        Command::List { .. } => {
            let set = registry.ensure_initialized()?;
            let values: Vec<_> = set
                .property_names()
                .iter()
                .filter_map(|key| set.lookup_resolved(key))
                .collect();
            print!("{}", format_listing(&values, format));
            Ok(ExitCode::SUCCESS)
        }
        Command::Sources { .. } => {
            let set = registry.ensure_initialized()?;
            print!("{}", format_sources(&set.describe(), format));
            Ok(ExitCode::SUCCESS)
        }
        Command::Set { key, value } => {
            let persisted = registry.persisted_source()?;
            persisted
                .set(&key, &value)
                .with_context(|| format!("failed to store override for '{key}'"))?;
            info!(key = %key, path = %persisted.path().display(), "Stored override");
            Ok(ExitCode::SUCCESS)
        }
        Command::Unset { key } => {
            let persisted = registry.persisted_source()?;
            match persisted.remove(&key)? {
                Some(_) => {
                    info!(key = %key, path = %persisted.path().display(), "Removed override");
                    Ok(ExitCode::SUCCESS)
                }
                None => {
                    eprintln!("No persisted override for '{key}'");
                    Ok(ExitCode::FAILURE)
                }
            }
        }
        Command::Path => {
            println!("{}", registry.persisted_path()?.display());
            Ok(ExitCode::SUCCESS)
        }
        Command::EnvName { key } => {
            println!("{}", env_var_name(&key));
            Ok(ExitCode::SUCCESS)
        }
    }
}
