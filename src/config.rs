//! Resolution of the StatsD output configuration.
//!
//! Settings come from, in increasing order of precedence:
//!
//! - the compiled-in defaults
//! - the JSON configuration document
//! - `K6_STATSD_*` environment variables
//! - the legacy output argument, which can only carry the collector address
//!
//! Each source is turned into an overlay [`Config`] whose fields are only
//! flagged as set when the source provided them, and the overlays are applied
//! in order with [`Config::apply`].
use std::collections::HashMap;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, trace};

use crate::common::ConfigError;
use crate::duration::{format_duration, parse_duration, DurationLiteral};
use crate::nullable::Nullable;
use crate::tags::{nullable_map, SystemTagSet, TagMap};

pub const DEFAULT_ADDR: &str = "localhost:8125";
pub const DEFAULT_BUFFER_SIZE: i64 = 20;
pub const DEFAULT_NAMESPACE: &str = "k6.";
pub const DEFAULT_PUSH_INTERVAL: Duration = Duration::from_secs(1);

pub const ENV_ADDR: &str = "K6_STATSD_ADDR";
pub const ENV_BUFFER_SIZE: &str = "K6_STATSD_BUFFER_SIZE";
pub const ENV_NAMESPACE: &str = "K6_STATSD_NAMESPACE";
pub const ENV_PUSH_INTERVAL: &str = "K6_STATSD_PUSH_INTERVAL";
pub const ENV_TAG_BLOCKLIST: &str = "K6_STATSD_TAG_BLOCKLIST";
pub const ENV_ENABLE_TAGS: &str = "K6_STATSD_ENABLE_TAGS";

/// Resolved settings of the StatsD output.
///
/// Every field records whether some source set it; see [`Nullable`].
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Address of the StatsD collector.
    pub addr: Nullable<String>,
    /// Number of samples buffered before a flush.
    pub buffer_size: Nullable<i64>,
    /// Prefix of every metric name.
    pub namespace: Nullable<String>,
    /// How often buffered samples are flushed.
    #[serde(with = "nullable_duration")]
    pub push_interval: Nullable<Duration>,
    /// Names of the tags which are never emitted.
    #[serde(with = "nullable_map")]
    pub tag_blocklist: Nullable<TagMap>,
    /// Whether tags are emitted at all.
    pub enable_tags: Nullable<bool>,
}

impl Config {
    /// Creates a [`Config`] holding the documented defaults, none of them set.
    pub fn new() -> Self {
        Self {
            addr: Nullable::unset(DEFAULT_ADDR.to_string()),
            buffer_size: Nullable::unset(DEFAULT_BUFFER_SIZE),
            namespace: Nullable::unset(DEFAULT_NAMESPACE.to_string()),
            push_interval: Nullable::unset(DEFAULT_PUSH_INTERVAL),
            tag_blocklist: Nullable::unset(SystemTagSet::default_blocklist().to_map()),
            enable_tags: Nullable::unset(false),
        }
    }

    /// An overlay that sets nothing.
    fn empty() -> Self {
        Self {
            addr: Nullable::default(),
            buffer_size: Nullable::default(),
            namespace: Nullable::default(),
            push_interval: Nullable::default(),
            tag_blocklist: Nullable::default(),
            enable_tags: Nullable::default(),
        }
    }

    /// Applies `overlay` on top of `self`: every field the overlay set replaces
    /// the corresponding field of `self`, everything else is left alone.
    #[must_use]
    pub fn apply(mut self, overlay: Config) -> Self {
        self.addr.overlay(overlay.addr);
        self.buffer_size.overlay(overlay.buffer_size);
        self.namespace.overlay(overlay.namespace);
        self.push_interval.overlay(overlay.push_interval);
        self.tag_blocklist.overlay(overlay.tag_blocklist);
        self.enable_tags.overlay(overlay.enable_tags);
        self
    }

    /// Parses a JSON configuration document into an overlay.
    ///
    /// Keys that are missing or `null` are left unset.
    ///
    /// ## Errors
    ///
    /// Returns [`ConfigError::InvalidJson`] if the document is not a JSON object,
    /// and [`ConfigError::InvalidJsonField`] naming the key whose value has the
    /// wrong type, an unknown tag name or a bad duration literal.
    pub fn from_json(raw: &[u8]) -> Result<Self, ConfigError> {
        let document: Map<String, Value> = serde_json::from_slice(raw)?;

        Ok(Config {
            addr: json_field(&document, "addr", Nullable::deserialize)?,
            buffer_size: json_field(&document, "bufferSize", Nullable::deserialize)?,
            namespace: json_field(&document, "namespace", Nullable::deserialize)?,
            push_interval: json_field(&document, "pushInterval", nullable_duration::deserialize)?,
            tag_blocklist: json_field(&document, "tagBlocklist", nullable_map::deserialize)?,
            enable_tags: json_field(&document, "enableTags", Nullable::deserialize)?,
        })
    }

    /// Reads the `K6_STATSD_*` variables of `env` into an overlay.
    ///
    /// Empty variables are treated as absent, except for the tag blocklist
    /// where an empty list explicitly blocks nothing.
    ///
    /// ## Errors
    ///
    /// Returns [`ConfigError::InvalidEnvVar`] naming the first variable whose
    /// value cannot be coerced into its field's type.
    pub fn from_env(env: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let mut overlay = Config::empty();

        if let Some(addr) = non_empty(env, ENV_ADDR) {
            overlay.addr = Nullable::set(addr.clone());
        }
        if let Some(size) = lookup(ENV_BUFFER_SIZE, non_empty(env, ENV_BUFFER_SIZE), |v| {
            v.parse::<i64>()
        })? {
            overlay.buffer_size = Nullable::set(size);
        }
        if let Some(namespace) = non_empty(env, ENV_NAMESPACE) {
            overlay.namespace = Nullable::set(namespace.clone());
        }
        if let Some(interval) = lookup(
            ENV_PUSH_INTERVAL,
            non_empty(env, ENV_PUSH_INTERVAL),
            parse_duration,
        )? {
            overlay.push_interval = Nullable::set(interval);
        }
        if let Some(set) = lookup(
            ENV_TAG_BLOCKLIST,
            env.get(ENV_TAG_BLOCKLIST),
            SystemTagSet::from_str,
        )? {
            overlay.tag_blocklist = Nullable::set(set.to_map());
        }
        if let Some(enabled) = lookup(ENV_ENABLE_TAGS, non_empty(env, ENV_ENABLE_TAGS), parse_bool)? {
            overlay.enable_tags = Nullable::set(enabled);
        }

        Ok(overlay)
    }

    /// Returns `true` if tags named `name` must not be emitted.
    pub fn is_tag_blocked(&self, name: &str) -> bool {
        self.tag_blocklist
            .value()
            .get(name)
            .copied()
            .unwrap_or(false)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::new()
    }
}

/// Resolves the output configuration out of its three sources.
///
/// `json_raw` and `legacy_arg` may be empty, in which case they are skipped.
/// A non-empty `legacy_arg` is taken as the collector address and wins over
/// every other source.
///
/// ## Errors
///
/// Fails, without producing a partial configuration, if the JSON document is
/// malformed or an environment variable cannot be parsed.
pub fn resolve(
    json_raw: &[u8],
    env: &HashMap<String, String>,
    legacy_arg: &str,
) -> Result<Config, ConfigError> {
    let mut config = Config::new();

    if !json_raw.is_empty() {
        config = config.apply(Config::from_json(json_raw)?);
        debug!("applied JSON configuration");
    }

    config = config.apply(Config::from_env(env)?);

    let legacy_arg = legacy_arg.trim();
    if !legacy_arg.is_empty() {
        let mut overlay = Config::empty();
        overlay.addr = Nullable::set(legacy_arg.to_string());
        config = config.apply(overlay);
        debug!(addr = legacy_arg, "applied legacy address argument");
    }

    debug!(
        addr = %config.addr,
        buffer_size = %config.buffer_size,
        namespace = %config.namespace,
        enable_tags = %config.enable_tags,
        "resolved statsd output configuration"
    );
    Ok(config)
}

/// Snapshot of the process environment, for callers without a mapping of their own.
///
/// Variables whose name or value is not valid unicode are skipped.
pub fn process_env() -> HashMap<String, String> {
    std::env::vars_os()
        .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
        .collect()
}

fn json_field<'a, T, F>(
    document: &'a Map<String, Value>,
    key: &'static str,
    parse: F,
) -> Result<Nullable<T>, ConfigError>
where
    T: Default,
    F: FnOnce(&'a Value) -> Result<Nullable<T>, serde_json::Error>,
{
    let value = match document.get(key) {
        Some(value) => value,
        None => return Ok(Nullable::default()),
    };
    parse(value).map_err(|e| ConfigError::InvalidJsonField {
        field: key,
        value: value.to_string(),
        reason: e.to_string(),
    })
}

fn non_empty<'a>(env: &'a HashMap<String, String>, var: &str) -> Option<&'a String> {
    env.get(var).filter(|value| !value.is_empty())
}

fn lookup<T, E, F>(
    var: &'static str,
    value: Option<&String>,
    parse: F,
) -> Result<Option<T>, ConfigError>
where
    F: FnOnce(&str) -> Result<T, E>,
    E: Display,
{
    let value = match value {
        Some(value) => value,
        None => return Ok(None),
    };
    trace!(var, value = value.as_str(), "found environment override");
    parse(value)
        .map(Some)
        .map_err(|e| ConfigError::InvalidEnvVar {
            var,
            value: value.clone(),
            reason: e.to_string(),
        })
}

/// Accepts the same literals as Go's `strconv.ParseBool`, which is what users
/// of k6 configuration variables are used to.
fn parse_bool(value: &str) -> Result<bool, String> {
    match value {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Ok(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Ok(false),
        _ => Err("expected a boolean".to_string()),
    }
}

mod nullable_duration {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub(super) fn serialize<S>(value: &Nullable<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if value.is_set() {
            serializer.serialize_some(&format_duration(*value.value()))
        } else {
            serializer.serialize_none()
        }
    }

    pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<Nullable<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Option::<DurationLiteral>::deserialize(deserializer)? {
            Some(DurationLiteral(duration)) => Nullable::set(duration),
            None => Nullable::default(),
        })
    }
}
