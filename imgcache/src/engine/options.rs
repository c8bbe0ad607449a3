//! Opaque option bag handed to `CacheEngine::init`.

use std::collections::BTreeMap;
use std::str::FromStr;

/// String key/value options passed through unmodified to the engine.
///
/// The orchestration layer never interprets these; each engine documents the
/// keys it understands and ignores the rest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineOptions {
    values: BTreeMap<String, String>,
}

impl EngineOptions {
    /// Create an empty option bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a single option, replacing any previous value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    /// Builder-style variant of [`set`](Self::set).
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    /// Merge several options at once. Later values win.
    pub fn extend<I, K, V>(&mut self, options: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (name, value) in options {
            self.set(name, value);
        }
    }

    /// Get a raw option value.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Get an option parsed into `T`.
    ///
    /// Returns `None` if absent, `Some(Err)` if present but unparsable.
    pub fn parse<T: FromStr>(&self, name: &str) -> Option<Result<T, T::Err>> {
        self.get(name).map(|v| v.trim().parse())
    }

    /// Number of options set.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no options are set.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over all options in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
