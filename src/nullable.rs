//! A value paired with a flag recording whether any configuration source set it.
//!
//! Later merging stages need to tell "the user chose the default" apart from
//! "the user said nothing", so every [`Config`](crate::Config) field is wrapped
//! in a [`Nullable`] instead of relying on sentinel values.
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A configuration value together with its "explicitly set" flag.
///
/// An unset value still carries a meaningful payload (usually the compiled-in
/// default), which is what [`Nullable::value`] returns.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Nullable<T> {
    value: T,
    set: bool,
}

impl<T> Nullable<T> {
    /// Creates a new value with an explicit "set" flag.
    pub const fn new(value: T, set: bool) -> Self {
        Self { value, set }
    }

    /// Creates a value that was provided by a configuration source.
    pub const fn set(value: T) -> Self {
        Self::new(value, true)
    }

    /// Creates a value that no source provided.
    pub const fn unset(value: T) -> Self {
        Self::new(value, false)
    }

    /// Returns the held value, whether or not it was set.
    pub fn value(&self) -> &T {
        &self.value
    }

    /// Consumes the wrapper and returns the held value.
    pub fn into_value(self) -> T {
        self.value
    }

    /// Returns `true` if a configuration source provided this value.
    pub fn is_set(&self) -> bool {
        self.set
    }

    /// Replaces `self` with `overlay` if, and only if, the overlay was set.
    pub fn overlay(&mut self, overlay: Nullable<T>) {
        if overlay.set {
            *self = overlay;
        }
    }
}

impl<T: fmt::Display> fmt::Display for Nullable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.set {
            self.value.fmt(f)
        } else {
            write!(f, "{} (default)", self.value)
        }
    }
}

// Unset values serialize as `null`, matching how the JSON document omits them.
impl<T: Serialize> Serialize for Nullable<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if self.set {
            serializer.serialize_some(&self.value)
        } else {
            serializer.serialize_none()
        }
    }
}

impl<'de, T> Deserialize<'de> for Nullable<T>
where
    T: Deserialize<'de> + Default,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Option::<T>::deserialize(deserializer)? {
            Some(value) => Nullable::set(value),
            None => Nullable::default(),
        })
    }
}
