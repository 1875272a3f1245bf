//! Flat string-keyed property map.
//!
//! Every configuration source (TOML file, environment, code) is reduced to
//! dotted keys such as `processor.batchSize` before typed views read it.

use crate::domain::errors::{FactorEngineError, FactorResult};
use std::collections::BTreeMap;
use std::fmt::Display;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

/// Environment variables that override file-based properties
const ENV_OVERRIDES: &[(&str, &str)] = &[
    ("PROCESSOR_TYPE", "processor.type"),
    ("PROCESSOR_THREADS", "processor.threads"),
    ("PROCESSOR_BATCH_SIZE", "processor.batchSize"),
    ("PROCESSOR_THRESHOLD", "processor.threshold"),
    ("MODEL_FEATURE_COUNT", "model.feature.count"),
    ("MODEL_SEED", "model.seed"),
    ("MODEL_DEEP_HIDDEN_SIZE", "model.deep.hiddenSize"),
    ("MODEL_DEEP_LEARNING_RATE", "model.deep.learningRate"),
    ("MODEL_DEEP_BATCH_SIZE", "model.deep.batchSize"),
    ("MODEL_ENSEMBLE_LINEAR_WEIGHT", "model.ensemble.linearWeight"),
    ("MODEL_ENSEMBLE_DEEP_WEIGHT", "model.ensemble.deepWeight"),
    ("MODEL_ENSEMBLE_METRIC", "model.ensemble.metric"),
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties {
    values: BTreeMap<String, String>,
}

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.values.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Parses `key`, falling back to `default` when absent.
    /// A present but malformed value is a configuration error.
    pub fn get_parsed<T>(&self, key: &str, default: T) -> FactorResult<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        match self.get(key) {
            None => Ok(default),
            Some(raw) => raw.trim().parse::<T>().map_err(|e| {
                FactorEngineError::configuration(key, format!("cannot parse '{}': {}", raw, e))
            }),
        }
    }

    /// Like [`Properties::get_parsed`] but also rejects zero
    pub fn get_positive(&self, key: &str, default: usize) -> FactorResult<usize> {
        let value = self.get_parsed::<usize>(key, default)?;
        if value == 0 {
            return Err(FactorEngineError::configuration(
                key,
                "must be a positive integer",
            ));
        }
        Ok(value)
    }

    /// Flattens a TOML document into dotted keys
    pub fn from_toml_str(source: &str) -> FactorResult<Self> {
        let table: toml::Table = toml::from_str(source)
            .map_err(|e| FactorEngineError::configuration("<toml>", e.to_string()))?;

        let mut properties = Self::new();
        flatten_table("", &table, &mut properties);
        Ok(properties)
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> FactorResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| {
            FactorEngineError::configuration(
                path.display().to_string(),
                format!("cannot read config file: {}", e),
            )
        })?;
        Self::from_toml_str(&source)
    }

    /// Applies overrides from the process environment
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|name| std::env::var(name).ok())
    }

    /// Applies overrides using an arbitrary variable lookup
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        for (var, key) in ENV_OVERRIDES {
            if let Some(value) = lookup(var) {
                debug!("Config override from {}: {} = {}", var, key, value);
                self.set(*key, value);
            }
        }
        self
    }
}

fn flatten_table(prefix: &str, table: &toml::Table, out: &mut Properties) {
    for (key, value) in table {
        let full_key = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };

        match value {
            toml::Value::Table(inner) => flatten_table(&full_key, inner, out),
            other => {
                out.set(full_key, scalar_to_string(other));
            }
        }
    }
}

fn scalar_to_string(value: &toml::Value) -> String {
    match value {
        toml::Value::String(s) => s.clone(),
        toml::Value::Integer(i) => i.to_string(),
        toml::Value::Float(f) => f.to_string(),
        toml::Value::Boolean(b) => b.to_string(),
        toml::Value::Datetime(dt) => dt.to_string(),
        toml::Value::Array(items) => items
            .iter()
            .map(scalar_to_string)
            .collect::<Vec<_>>()
            .join(","),
        toml::Value::Table(_) => String::new(),
    }
}

impl<K, V> FromIterator<(K, V)> for Properties
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut properties = Self::new();
        for (k, v) in iter {
            properties.set(k, v);
        }
        properties
    }
}
