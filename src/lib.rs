//! Configuration resolution and tag sanitization for the k6 StatsD output.
//!
//! ## Basics
//!
//! The StatsD output pushes k6 metric samples to a StatsD agent. This crate holds the part of it
//! that decides *how*: where the agent lives, how many samples are buffered, which namespace and
//! push interval are used and which tags are emitted, plus the functions turning free-form tag
//! names and values into strings StatsD collectors accept.
//!
//! ## Configuration sources
//!
//! Settings are merged from, lowest precedence first:
//!
//! - compiled-in defaults
//! - the JSON configuration document (`addr`, `bufferSize`, `namespace`, `pushInterval`,
//!   `tagBlocklist`, `enableTags`)
//! - the `K6_STATSD_ADDR`, `K6_STATSD_BUFFER_SIZE`, `K6_STATSD_NAMESPACE`,
//!   `K6_STATSD_PUSH_INTERVAL`, `K6_STATSD_TAG_BLOCKLIST` and `K6_STATSD_ENABLE_TAGS`
//!   environment variables
//! - the legacy output argument, which only carries the agent address
//!
//! Each field of the resolved [`Config`] remembers whether any of those sources set it.
//!
//! ## Usage
//!
//! ```ignore
//! use statsd_output_config::{process_env, resolve};
//!
//! let config = resolve(br#"{"bufferSize": 100}"#, &process_env(), "")?;
//! assert_eq!(*config.buffer_size.value(), 100);
//!
//! let (name, tags) = formatting::key_to_parts(&key, &config);
//! let mut buffer = String::new();
//! formatting::write_metric_line(&mut buffer, &name, 1, "c", &tags, None);
//! ```
//!
mod common;
pub use self::common::ConfigError;

mod config;
pub use self::config::{
    process_env, resolve, Config, DEFAULT_ADDR, DEFAULT_BUFFER_SIZE, DEFAULT_NAMESPACE,
    DEFAULT_PUSH_INTERVAL, ENV_ADDR, ENV_BUFFER_SIZE, ENV_ENABLE_TAGS, ENV_NAMESPACE,
    ENV_PUSH_INTERVAL, ENV_TAG_BLOCKLIST,
};

pub mod duration;
pub mod formatting;

mod nullable;
pub use self::nullable::Nullable;

mod tags;
pub use self::tags::{SystemTag, SystemTagSet, TagMap, UnknownSystemTag};
