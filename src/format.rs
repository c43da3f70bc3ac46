//! Output formatting for resolved values and source listings.

use crate::config::{ResolvedValue, SourceInfo};
use clap::ValueEnum;
use serde_json::{Value, json};

/// Output format for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Format a single resolved value.
pub fn format_resolved(value: &ResolvedValue, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => value.value.clone(),
        OutputFormat::Json => to_json_string(&json!(value)),
    }
}

/// Format every resolved value as `key = value  (source)` lines.
pub fn format_listing(values: &[ResolvedValue], format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => {
            let width = values.iter().map(|v| v.key.len()).max().unwrap_or(0);
            let mut out = String::new();
            for v in values {
                out.push_str(&format!(
                    "{:width$} = {}  ({})\n",
                    v.key,
                    v.value,
                    v.source,
                    width = width
                ));
            }
            out
        }
        OutputFormat::Json => to_json_string(&json!(values)),
    }
}

/// Format the ordered source list.
pub fn format_sources(sources: &[SourceInfo], format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => {
            let mut out = String::new();
            for (idx, source) in sources.iter().enumerate() {
                out.push_str(&format!(
                    "{:>2}. [{:>3}] {:<16} {}\n",
                    idx + 1,
                    source.ordinal,
                    source.kind.to_string(),
                    source.name
                ));
            }
            out
        }
        OutputFormat::Json => to_json_string(&json!(sources)),
    }
}

fn to_json_string(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}
