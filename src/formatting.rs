use indexmap::IndexMap;
use metrics::Key;

use crate::config::Config;

// <NAMESPACE><METRIC_NAME>:<VALUE>|<TYPE>|@<SAMPLE_RATE>|#<TAG_KEY_1>:<TAG_VALUE_1>,<TAG_2>:<TAG_VALUE_2>
pub fn key_to_parts(key: &Key, config: &Config) -> (String, Vec<String>) {
    let name = format!("{}{}", config.namespace.value(), key.name());
    if !*config.enable_tags.value() {
        return (name, Vec::new());
    }

    // later labels with the same key win, but keep the position of the first
    let mut values = IndexMap::new();
    key.labels().for_each(|label| {
        values.insert(label.key(), label.value());
    });
    let tags = values
        .iter()
        .filter(|(k, v)| !v.is_empty() && !config.is_tag_blocked(k))
        .map(|(k, v)| format!("{}:{}", sanitize_tag_name(k), sanitize_tag_value(v)))
        .collect();

    (name, tags)
}

/// Sanitizes a tag name for the StatsD wire format.
///
/// Spaces become `_` and slashes become `-`; anything else outside of
/// `[a-zA-Z0-9_-]` is dropped.
pub fn sanitize_tag_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        match c {
            ' ' => out.push('_'),
            '/' => out.push('-'),
            c if valid_tag_name_character(c) => out.push(c),
            _ => (),
        }
    }
    out
}

/// Sanitizes a tag value for the StatsD wire format.
///
/// Every character outside of `[a-zA-Z0-9_]`, separators such as `,` and `:`
/// included, is replaced by `_`. Runs of invalid characters are not collapsed.
pub fn sanitize_tag_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if valid_tag_value_character(c) {
            out.push(c);
        } else {
            out.push('_');
        }
    }
    out
}

pub fn write_metric_line<T>(
    buffer: &mut String,
    name: &str,
    value: T,
    mtype: &str,
    tags: &[String],
    sample_rate: Option<&str>,
) where
    T: std::fmt::Display,
{
    buffer.push_str(name);
    buffer.push(':');
    buffer.push_str(value.to_string().as_str());
    buffer.push('|');
    buffer.push_str(mtype);

    if let Some(rate) = sample_rate {
        buffer.push_str("|@");
        buffer.push_str(rate);
    }

    if !tags.is_empty() {
        buffer.push_str("|#");
        buffer.push_str(&tags.join(","));
    }
    buffer.push('\n');
}

#[inline]
fn valid_tag_name_character(c: char) -> bool {
    // Essentially, needs to match the regex pattern of [a-zA-Z0-9_-].
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

#[inline]
fn valid_tag_value_character(c: char) -> bool {
    // Essentially, needs to match the regex pattern of [a-zA-Z0-9_].
    c.is_ascii_alphanumeric() || c == '_'
}
