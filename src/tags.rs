//! The closed set of system tags k6 attaches to metric samples.
//!
//! Tag blocklists name system tags, so they are parsed against this
//! enumeration into a [`SystemTagSet`] bitset and then materialized as a
//! [`TagMap`] for lookups by tag name.
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::de::{self, Deserialize, Deserializer, SeqAccess, Visitor};
use serde::ser::{SerializeSeq, Serializer};
use thiserror::Error;

use crate::nullable::Nullable;

/// Tag names mapped to their membership, as consulted on the tag emission path.
pub type TagMap = HashMap<String, bool>;

/// Returned when a tag name is not one of the [`SystemTag`] names.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown system tag \"{0}\"")]
pub struct UnknownSystemTag(pub String);

macro_rules! system_tags {
    ($($variant:ident => $name:literal,)+) => {
        /// A tag k6 can attach to every metric sample it emits.
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[repr(u8)]
        pub enum SystemTag {
            $($variant,)+
        }

        impl SystemTag {
            /// Every system tag, in bit order.
            pub const ALL: &'static [SystemTag] = &[$(SystemTag::$variant,)+];

            /// The name used for this tag in configuration and on the wire.
            pub fn as_str(self) -> &'static str {
                match self {
                    $(SystemTag::$variant => $name,)+
                }
            }
        }

        impl FromStr for SystemTag {
            type Err = UnknownSystemTag;

            /// Names are case sensitive.
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($name => Ok(SystemTag::$variant),)+
                    _ => Err(UnknownSystemTag(s.to_string())),
                }
            }
        }
    };
}

system_tags! {
    Proto => "proto",
    Subproto => "subproto",
    Status => "status",
    Method => "method",
    Url => "url",
    Name => "name",
    Group => "group",
    Check => "check",
    Error => "error",
    ErrorCode => "error_code",
    TlsVersion => "tls_version",
    Scenario => "scenario",
    Service => "service",
    ExpectedResponse => "expected_response",
    Ip => "ip",
    Vu => "vu",
    Iter => "iter",
    OcspStatus => "ocsp_status",
}

impl SystemTag {
    const fn bit(self) -> u32 {
        1 << self as u8
    }
}

impl fmt::Display for SystemTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A bitset of [`SystemTag`]s.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct SystemTagSet(u32);

impl SystemTagSet {
    /// The set with no tags.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Builds a set out of the given tags.
    pub fn of(tags: &[SystemTag]) -> Self {
        tags.iter().copied().collect()
    }

    /// Tags blocked by default: per-VU and per-iteration ids plus full URLs,
    /// which would blow up the cardinality on the collector side.
    pub fn default_blocklist() -> Self {
        Self::of(&[SystemTag::Vu, SystemTag::Iter, SystemTag::Url])
    }

    pub fn insert(&mut self, tag: SystemTag) {
        self.0 |= tag.bit();
    }

    pub fn contains(&self, tag: SystemTag) -> bool {
        self.0 & tag.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Iterates over the tags in the set, in bit order.
    pub fn iter(&self) -> impl Iterator<Item = SystemTag> + '_ {
        SystemTag::ALL.iter().copied().filter(move |tag| self.contains(*tag))
    }

    /// Materializes the set as a name lookup map.
    pub fn to_map(&self) -> TagMap {
        self.iter()
            .map(|tag| (tag.as_str().to_string(), true))
            .collect()
    }
}

impl FromIterator<SystemTag> for SystemTagSet {
    fn from_iter<I: IntoIterator<Item = SystemTag>>(iter: I) -> Self {
        let mut set = SystemTagSet::empty();
        for tag in iter {
            set.insert(tag);
        }
        set
    }
}

impl FromStr for SystemTagSet {
    type Err = UnknownSystemTag;

    /// Parses a comma separated list of tag names, e.g. `method,group`.
    ///
    /// Whitespace around names is ignored, as are empty items.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(SystemTag::from_str)
            .collect()
    }
}

impl<'de> Deserialize<'de> for SystemTagSet {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct SetVisitor;

        impl<'de> Visitor<'de> for SetVisitor {
            type Value = SystemTagSet;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a list of system tag names or a comma separated string")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                v.parse().map_err(E::custom)
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let mut set = SystemTagSet::empty();
                while let Some(name) = seq.next_element::<String>()? {
                    set.insert(name.parse().map_err(<A::Error as de::Error>::custom)?);
                }
                Ok(set)
            }
        }

        deserializer.deserialize_any(SetVisitor)
    }
}

/// Serde glue for a `Nullable<TagMap>` field: reads a tag set, writes a sorted
/// list of the blocked names.
pub(crate) mod nullable_map {
    use super::*;

    pub(crate) fn serialize<S>(value: &Nullable<TagMap>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if !value.is_set() {
            return serializer.serialize_none();
        }
        let mut names: Vec<&str> = value
            .value()
            .iter()
            .filter(|(_, blocked)| **blocked)
            .map(|(name, _)| name.as_str())
            .collect();
        names.sort_unstable();

        let mut seq = serializer.serialize_seq(Some(names.len()))?;
        for name in names {
            seq.serialize_element(name)?;
        }
        seq.end()
    }

    pub(crate) fn deserialize<'de, D>(deserializer: D) -> Result<Nullable<TagMap>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Option::<SystemTagSet>::deserialize(deserializer)? {
            Some(set) => Nullable::set(set.to_map()),
            None => Nullable::default(),
        })
    }
}
