//! Parser options.
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;

use crate::body::ReadOptions;

/// String keyed parser options.
///
/// Root options given to the engine are merged with each parser's own
/// options, the parser's keys winning.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Options(Map<String, Value>);

impl Options {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an option, builder style.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    /// Set an option unless it is already present.
    pub fn insert_default(&mut self, key: &str, value: impl Into<Value>) {
        if !self.0.contains_key(key) {
            self.0.insert(key.to_owned(), value.into());
        }
    }

    #[inline]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.0.get(key)?.as_u64()
    }

    pub fn get_usize(&self, key: &str) -> Option<usize> {
        self.get_u64(key).and_then(|v| usize::try_from(v).ok())
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.0.get(key)?.as_bool()
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key)?.as_str()
    }

    /// Read an integer option as milliseconds.
    pub fn get_millis(&self, key: &str) -> Option<Duration> {
        self.get_u64(key).map(Duration::from_millis)
    }

    /// Returns a copy of `self` overlaid with `other`.
    pub fn merge(&self, other: &Options) -> Options {
        let mut merged = self.0.clone();
        merged.extend(other.0.iter().map(|(k, v)| (k.clone(), v.clone())));
        Options(merged)
    }

    /// Body read limits from the `length` and `read_timeout` options.
    ///
    /// A `read_timeout` of `0` disables the timeout.
    pub fn read_options(&self) -> ReadOptions {
        let default = ReadOptions::default();
        ReadOptions {
            length: self.get_usize("length").unwrap_or(default.length),
            read_timeout: match self.get_millis("read_timeout") {
                Some(Duration::ZERO) => None,
                Some(timeout) => Some(timeout),
                None => default.read_timeout,
            },
        }
    }
}

impl From<Map<String, Value>> for Options {
    fn from(v: Map<String, Value>) -> Self {
        Self(v)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Options {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}
