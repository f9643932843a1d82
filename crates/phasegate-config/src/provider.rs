//! Configuration providers
//!
//! Every configuration read in the workspace goes through [`ConfigProvider`].
//! Providers are constructed explicitly and injected; nothing here is global.

use crate::error::ConfigError;
use std::collections::BTreeMap;
use std::fmt::{Debug, Display};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

/// Source of string configuration values keyed by variable name.
pub trait ConfigProvider: Send + Sync + Debug {
    /// Raw value for `key`, if set.
    fn get(&self, key: &str) -> Option<String>;

    /// Value for `key`, or `default` when unset.
    fn get_or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    /// Version stamp; changes whenever cached values may have gone stale.
    fn version(&self) -> u64 {
        0
    }
}

impl<T: ConfigProvider + ?Sized> ConfigProvider for Arc<T> {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn version(&self) -> u64 {
        (**self).version()
    }
}

impl<T: ConfigProvider + ?Sized> ConfigProvider for &T {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn version(&self) -> u64 {
        (**self).version()
    }
}

/// Typed accessors available on every provider
pub trait ConfigProviderExt: ConfigProvider {
    /// Value with surrounding whitespace removed; blank counts as unset.
    fn get_trimmed(&self, key: &str) -> Option<String> {
        self.get(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    /// First set, non-blank value among `keys`.
    fn get_first(&self, keys: &[&str]) -> Option<String> {
        keys.iter().find_map(|k| self.get_trimmed(k))
    }

    /// Value that must be present.
    fn require(&self, key: &str) -> Result<String, ConfigError> {
        self.get_trimmed(key)
            .ok_or_else(|| ConfigError::Missing(key.to_string()))
    }

    /// Parsed value; `Ok(None)` when unset.
    fn get_parsed<T>(&self, key: &str) -> Result<Option<T>, ConfigError>
    where
        T: FromStr,
        T::Err: Display,
    {
        match self.get_trimmed(key) {
            None => Ok(None),
            Some(raw) => raw
                .parse::<T>()
                .map(Some)
                .map_err(|e| ConfigError::parse(key, raw, e)),
        }
    }

    /// Boolean flag accepting `true/false`, `1/0`, `yes/no`, `on/off`.
    fn get_bool(&self, key: &str) -> Result<Option<bool>, ConfigError> {
        match self.get_trimmed(key) {
            None => Ok(None),
            Some(raw) => match raw.to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Ok(Some(true)),
                "false" | "0" | "no" | "off" => Ok(Some(false)),
                _ => Err(ConfigError::parse(key, raw, "expected a boolean")),
            },
        }
    }

    /// Comma separated list with blank entries removed.
    fn get_list(&self, key: &str) -> Vec<String> {
        self.get(key)
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl<T: ConfigProvider + ?Sized> ConfigProviderExt for T {}

/// Reads the process environment.
///
/// This is the only place in the workspace that touches `std::env`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnvProvider;

impl ProcessEnvProvider {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl ConfigProvider for ProcessEnvProvider {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// In-memory provider, used for tests and file-backed configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MapProvider {
    values: BTreeMap<String, String>,
}

impl MapProvider {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from key/value pairs
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Builder-style insert
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    /// Builder-style removal
    #[must_use]
    pub fn without(mut self, key: &str) -> Self {
        self.values.remove(key);
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.values.remove(key)
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Parse a flat TOML table of `KEY = value` entries.
    ///
    /// Scalars are stored in their display form; arrays are joined with
    /// commas. Nested tables are rejected.
    pub fn from_toml_str(source: &str, origin: &Path) -> Result<Self, ConfigError> {
        let table: toml::Table = source.parse().map_err(|e: toml::de::Error| ConfigError::Toml {
            path: origin.to_path_buf(),
            message: e.message().to_string(),
        })?;

        let mut values = BTreeMap::new();
        for (key, value) in table {
            let rendered = render_scalar(&value).ok_or_else(|| ConfigError::Toml {
                path: origin.to_path_buf(),
                message: format!("'{key}' must be a scalar or an array of scalars"),
            })?;
            values.insert(key, rendered);
        }

        Ok(Self { values })
    }

    /// Load a flat TOML file
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source, path)
    }
}

fn render_scalar(value: &toml::Value) -> Option<String> {
    match value {
        toml::Value::String(s) => Some(s.clone()),
        toml::Value::Integer(i) => Some(i.to_string()),
        toml::Value::Float(f) => Some(f.to_string()),
        toml::Value::Boolean(b) => Some(b.to_string()),
        toml::Value::Datetime(d) => Some(d.to_string()),
        toml::Value::Array(items) => items
            .iter()
            .map(|item| match item {
                toml::Value::Array(_) | toml::Value::Table(_) => None,
                scalar => render_scalar(scalar),
            })
            .collect::<Option<Vec<_>>>()
            .map(|parts| parts.join(",")),
        toml::Value::Table(_) => None,
    }
}

impl ConfigProvider for MapProvider {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

/// Ordered stack of providers; the first layer holding a key wins.
#[derive(Debug, Clone, Default)]
pub struct LayeredProvider {
    layers: Vec<Arc<dyn ConfigProvider>>,
}

impl LayeredProvider {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a layer below the existing ones
    #[must_use]
    pub fn with_layer(mut self, layer: Arc<dyn ConfigProvider>) -> Self {
        self.layers.push(layer);
        self
    }

    #[inline]
    #[must_use]
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }
}

impl ConfigProvider for LayeredProvider {
    fn get(&self, key: &str) -> Option<String> {
        self.layers.iter().find_map(|layer| layer.get(key))
    }

    fn version(&self) -> u64 {
        self.layers
            .iter()
            .fold(0u64, |acc, layer| acc.wrapping_add(layer.version()))
    }
}
