//! `key=value` properties text.
//!
//! Shared by the persisted override file and bundled properties files.
//! Lines starting with `#` or `!` are comments, `=` or `:` separates key and
//! value, and a trailing unescaped `\` joins the next line.

use std::collections::BTreeMap;

/// Parsed properties, ordered by key.
pub type PropertyMap = BTreeMap<String, String>;

/// Prefix marking a profile-scoped entry, e.g. `%dev.db.url=...`.
pub const PROFILE_MARKER: char = '%';

/// A malformed logical line.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("line {line}: {reason}")]
pub struct ParseError {
    /// 1-based line where the logical entry starts.
    pub line: usize,
    pub reason: String,
}

/// Parse properties text into a map. Later duplicates overwrite earlier ones.
pub fn parse(text: &str) -> Result<PropertyMap, ParseError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut map = PropertyMap::new();
    let mut logical = String::new();
    let mut continuing = false;
    let mut start_line = 0;

    for (idx, raw) in text.lines().enumerate() {
        let piece = trim_unescaped_end(raw.trim_start());

        if !continuing {
            start_line = idx + 1;
            if piece.is_empty() || piece.starts_with('#') || piece.starts_with('!') {
                continue;
            }
        }

        if has_continuation(piece) {
            logical.push_str(&piece[..piece.len() - 1]);
            continuing = true;
            continue;
        }

        logical.push_str(piece);
        continuing = false;
        parse_entry(&logical, start_line, &mut map)?;
        logical.clear();
    }

    if continuing {
        parse_entry(&logical, start_line, &mut map)?;
    }

    Ok(map)
}

/// Render a map as properties text, prefixed by `#` header lines.
pub fn render(map: &PropertyMap, header: &[String]) -> String {
    let mut out = String::new();
    for line in header {
        out.push_str("# ");
        out.push_str(line);
        out.push('\n');
    }
    for (key, value) in map {
        out.push_str(&escape(key, true));
        out.push('=');
        out.push_str(&escape(value, false));
        out.push('\n');
    }
    out
}

/// Look up `key`, letting `%<profile>.<key>` shadow the plain entry when a
/// profile is active.
pub fn get_for_profile<'a>(
    map: &'a PropertyMap,
    key: &str,
    profile: Option<&str>,
) -> Option<&'a String> {
    if let Some(profile) = profile {
        let scoped = format!("{PROFILE_MARKER}{profile}.{key}");
        if let Some(value) = map.get(&scoped) {
            return Some(value);
        }
    }
    if key.starts_with(PROFILE_MARKER) {
        return None;
    }
    map.get(key)
}

/// Keys visible under `profile`: plain keys plus the active profile's scoped
/// keys with their marker stripped.
pub fn names_for_profile(map: &PropertyMap, profile: Option<&str>) -> Vec<String> {
    let scoped_prefix = profile.map(|p| format!("{PROFILE_MARKER}{p}."));
    let mut names: Vec<String> = map
        .keys()
        .filter_map(|key| {
            if !key.starts_with(PROFILE_MARKER) {
                return Some(key.clone());
            }
            scoped_prefix
                .as_deref()
                .and_then(|prefix| key.strip_prefix(prefix))
                .map(str::to_string)
        })
        .collect();
    names.sort();
    names.dedup();
    names
}

/// Trim trailing whitespace, keeping a whitespace character escaped by a
/// preceding backslash.
fn trim_unescaped_end(raw: &str) -> &str {
    let trimmed = raw.trim_end();
    if trimmed.len() < raw.len() && has_continuation(trimmed) {
        let kept = raw[trimmed.len()..].chars().next().map_or(0, char::len_utf8);
        return &raw[..trimmed.len() + kept];
    }
    trimmed
}

fn has_continuation(piece: &str) -> bool {
    let trailing = piece.chars().rev().take_while(|c| *c == '\\').count();
    trailing % 2 == 1
}

fn parse_entry(logical: &str, line: usize, map: &mut PropertyMap) -> Result<(), ParseError> {
    let (raw_key, raw_value) = split_entry(logical).ok_or_else(|| ParseError {
        line,
        reason: format!("missing '=' separator in '{}'", logical),
    })?;

    let key = unescape(trim_unescaped_end(raw_key.trim_start()));
    if key.is_empty() {
        return Err(ParseError {
            line,
            reason: "empty key".to_string(),
        });
    }

    map.insert(key, unescape(raw_value.trim_start()));
    Ok(())
}

fn split_entry(line: &str) -> Option<(&str, &str)> {
    let mut escaped = false;
    for (idx, ch) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' => escaped = true,
            '=' | ':' => return Some((&line[..idx], &line[idx + ch.len_utf8()..])),
            _ => {}
        }
    }
    None
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

/// Escape `raw` so that parsing the rendered line yields it unchanged.
/// Keys escape every space and a leading comment marker; values escape a
/// space at either end, which line trimming would otherwise drop.
fn escape(raw: &str, is_key: bool) -> String {
    let mut out = String::with_capacity(raw.len());
    let last = raw.chars().count().saturating_sub(1);
    for (idx, ch) in raw.chars().enumerate() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '=' | ':' | ' ' if is_key => {
                out.push('\\');
                out.push(ch);
            }
            '#' | '!' if is_key && idx == 0 => {
                out.push('\\');
                out.push(ch);
            }
            ' ' if idx == 0 || idx == last => out.push_str("\\ "),
            _ => out.push(ch),
        }
    }
    out
}
