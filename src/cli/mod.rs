//! CLI command definitions for confstack
//!
//! The main entry point is the `Cli` struct which contains subcommands.
//! Arguments after `--` form the command-line configuration source, so
//! `confstack get db.url -- --db.url=jdbc:h2:mem` resolves to the argument.

use crate::format::OutputFormat;
use clap::{Args, Parser, Subcommand};

/// Resolve layered configuration and manage persisted overrides
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Set a system property (repeatable)
    #[arg(short = 'D', value_name = "KEY=VALUE", global = true)]
    pub properties: Vec<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    pub format: OutputFormat,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    #[command(subcommand)]
    pub command: Command,
}

/// Trailing arguments used as the command-line configuration source.
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// Configuration arguments (`--key=value` or `--key value`)
    #[arg(last = true, value_name = "ARGS")]
    pub args: Vec<String>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the resolved value of a key
    Get {
        key: String,
        #[command(flatten)]
        config: ConfigArgs,
    },

    /// Print every resolved key with its supplying source
    List {
        #[command(flatten)]
        config: ConfigArgs,
    },

    /// Print the configuration sources in precedence order
    Sources {
        #[command(flatten)]
        config: ConfigArgs,
    },

    /// Store an override in the persisted configuration file
    Set { key: String, value: String },

    /// Remove an override from the persisted configuration file
    Unset { key: String },

    /// Print the location of the persisted configuration file
    Path,

    /// Print the environment variable name for a key
    EnvName { key: String },
}

impl Command {
    /// Arguments forming the command-line source for this command.
    pub fn config_args(&self) -> Vec<String> {
        match self {
            Command::Get { config, .. } | Command::List { config } | Command::Sources { config } => {
                config.args.clone()
            }
            _ => Vec::new(),
        }
    }
}
