//! Command-line argument source.

use super::{ConfigSource, SourceKind};
use crate::config::properties::PropertyMap;

/// Value given to a bare `--flag` with no value.
const FLAG_VALUE: &str = "true";

/// Entries parsed from `--key=value` and `--key value` arguments.
#[derive(Debug, Clone)]
pub struct CommandLineArgsSource {
    values: PropertyMap,
}

impl CommandLineArgsSource {
    pub fn from_args<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            values: parse_args(args),
        }
    }
}

/// Parse `--key=value` and `--key value` pairs.
///
/// Arguments that do not start with `--` are skipped unless consumed as a
/// value. A `--key` followed by another option or by nothing becomes
/// `key=true`. A later occurrence of a key overrides an earlier one.
pub fn parse_args<I, S>(args: I) -> PropertyMap
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let args: Vec<String> = args.into_iter().map(|a| a.as_ref().to_string()).collect();
    let mut values = PropertyMap::new();
    let mut iter = args.iter().peekable();

    while let Some(arg) = iter.next() {
        let Some(option) = arg.strip_prefix("--") else {
            continue;
        };
        if option.is_empty() {
            continue;
        }

        if let Some((key, value)) = option.split_once('=') {
            if !key.is_empty() {
                values.insert(key.to_string(), value.to_string());
            }
            continue;
        }

        let value = match iter.peek() {
            Some(next) if !next.starts_with("--") => iter.next().cloned(),
            _ => None,
        };
        values.insert(
            option.to_string(),
            value.unwrap_or_else(|| FLAG_VALUE.to_string()),
        );
    }

    values
}

impl ConfigSource for CommandLineArgsSource {
    fn lookup(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn ordinal(&self) -> i32 {
        SourceKind::CmdArgs.ordinal()
    }

    fn name(&self) -> String {
        "command-line arguments".to_string()
    }

    fn kind(&self) -> SourceKind {
        SourceKind::CmdArgs
    }

    fn property_names(&self) -> Vec<String> {
        self.values.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equals_and_space_forms() {
        let values = parse_args(["--db.url=jdbc:h2:mem", "--http.port", "9090"]);
        assert_eq!(values["db.url"], "jdbc:h2:mem");
        assert_eq!(values["http.port"], "9090");
    }

    #[test]
    fn test_value_may_contain_equals() {
        let values = parse_args(["--query=a=b"]);
        assert_eq!(values["query"], "a=b");
    }

    #[test]
    fn test_bare_flag_becomes_true() {
        let values = parse_args(["--metrics.enabled", "--db.url", "x"]);
        assert_eq!(values["metrics.enabled"], "true");
        assert_eq!(values["db.url"], "x");

        let trailing = parse_args(["--verbose"]);
        assert_eq!(trailing["verbose"], "true");
    }

    #[test]
    fn test_positionals_and_short_options_skipped() {
        let values = parse_args(["start", "-v", "--", "--=x", "--mode=dev"]);
        assert_eq!(values.len(), 1);
        assert_eq!(values["mode"], "dev");
    }

    #[test]
    fn test_last_occurrence_wins() {
        let source = CommandLineArgsSource::from_args(["--a=1", "--a=2"]);
        assert_eq!(source.lookup("a").as_deref(), Some("2"));
        assert_eq!(source.ordinal(), 100);
        assert_eq!(source.property_names(), vec!["a"]);
    }
}
