use std::fmt;

use indexmap::IndexMap;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::error::EvalResult;
use crate::storage::DenseMatrixRecord;

pub type RunId = String;

/// Name of the MAP objective in artifacts and traces.
pub const OBJECTIVE_KEY: &str = "logP";

/// A scalar configuration value as recorded by the run bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl ConfigValue {
    /// Integers stay integers, other numbers become floats, anything else text.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        match raw.parse::<f64>() {
            Ok(value) if value.is_finite() && value.fract() == 0.0 && value.abs() < 9.0e15 => {
                ConfigValue::Int(value as i64)
            }
            Ok(value) => ConfigValue::Float(value),
            Err(_) => ConfigValue::Text(raw.to_string()),
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ConfigValue::Int(value) => Some(*value),
            ConfigValue::Float(value) if value.fract() == 0.0 => Some(*value as i64),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ConfigValue::Int(value) => Some(*value as f64),
            ConfigValue::Float(value) => Some(*value),
            ConfigValue::Text(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::Text(value) => Some(value),
            _ => None,
        }
    }

    /// Numeric values compare by value, so `Int(5)` matches `Float(5.0)`.
    pub fn matches(&self, other: &ConfigValue) -> bool {
        match (self.as_f64(), other.as_f64()) {
            (Some(left), Some(right)) => left == right,
            _ => self == other,
        }
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::Int(value) => write!(f, "{value}"),
            ConfigValue::Float(value) => write!(f, "{value}"),
            ConfigValue::Text(value) => f.write_str(value),
        }
    }
}

/// Flat key/value configuration of one run, in recorded order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigRecord {
    values: IndexMap<String, ConfigValue>,
}

impl ConfigRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: ConfigValue) {
        self.values.insert(key.into(), value);
    }

    pub fn with(mut self, key: impl Into<String>, value: ConfigValue) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.values.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<ConfigValue> {
        self.values.shift_remove(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ConfigValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Best-iteration snapshot of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapSnapshot {
    /// N×K assignment; rows may be soft.
    pub partition: DenseMatrixRecord,
    #[serde(rename = "logP")]
    pub log_p: f64,
    /// Any further scalars recorded at the MAP iteration.
    #[serde(default)]
    pub scalars: IndexMap<String, f64>,
}

impl MapSnapshot {
    pub fn value(&self, name: &str) -> Option<f64> {
        if name == OBJECTIVE_KEY {
            Some(self.log_p)
        } else {
            self.scalars.get(name).copied()
        }
    }

    pub fn partition_matrix(&self) -> EvalResult<DMatrix<f64>> {
        self.partition.to_matrix()
    }
}

/// The result artifact a run writes once it reaches an iteration count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunArtifact {
    /// Parameter name to its value at every iteration.
    #[serde(default)]
    pub traces: IndexMap<String, Vec<f64>>,
    #[serde(rename = "MAP")]
    pub map: MapSnapshot,
}

impl RunArtifact {
    pub fn trace(&self, name: &str) -> Option<&[f64]> {
        self.traces.get(name).map(Vec::as_slice)
    }
}

/// A complete run: its artifact was found for the required iteration count.
#[derive(Debug, Clone, PartialEq)]
pub struct ExperimentRun {
    pub id: RunId,
    pub iterations: usize,
    pub artifact: RunArtifact,
}

/// Runs sharing a configuration apart from their randomisation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentGroup {
    pub config: ConfigRecord,
    pub runs: Vec<RunId>,
}

impl ExperimentGroup {
    pub fn new(config: ConfigRecord, runs: Vec<RunId>) -> Self {
        Self { config, runs }
    }

    /// True when every `(key, value)` filter matches this group's configuration.
    pub fn matches(&self, filters: &[(&str, ConfigValue)]) -> bool {
        filters.iter().all(|(key, expected)| {
            self.config
                .get(key)
                .map(|value| value.matches(expected))
                .unwrap_or(false)
        })
    }

    pub fn describe(&self) -> String {
        self.config
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join(", ")
    }
}
