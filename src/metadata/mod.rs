//! Key/value annotations attached to a table
//!
//! Two keys are reserved for the engine: `initialized` and `version`. They
//! are always present in the stored map and come back from `get_all` like
//! any other entry, but user writes targeting them are rejected. Callers
//! comparing "their" metadata strip the reserved keys first; the store does
//! not hide them from enumeration.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{TableError, TableResult};

/// Engine-maintained key recording whether the table has a schema
pub const KEY_INITIALIZED: &str = "initialized";
/// Engine-maintained key recording the structural version
pub const KEY_VERSION: &str = "version";

/// Scalar value of a metadata entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaValue {
    Bool(bool),
    Long(i64),
    Double(f64),
    Text(String),
}

impl fmt::Display for MetaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetaValue::Bool(v) => write!(f, "{}", v),
            MetaValue::Long(v) => write!(f, "{}", v),
            MetaValue::Double(v) => write!(f, "{}", v),
            MetaValue::Text(v) => write!(f, "{}", v),
        }
    }
}

impl From<&str> for MetaValue {
    fn from(v: &str) -> Self {
        MetaValue::Text(v.to_string())
    }
}

impl From<i64> for MetaValue {
    fn from(v: i64) -> Self {
        MetaValue::Long(v)
    }
}

impl From<f64> for MetaValue {
    fn from(v: f64) -> Self {
        MetaValue::Double(v)
    }
}

/// The annotation map of one table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataStore {
    entries: BTreeMap<String, MetaValue>,
}

impl MetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn is_reserved(key: &str) -> bool {
        key == KEY_INITIALIZED || key == KEY_VERSION
    }

    /// Sets one user entry.
    ///
    /// # Errors
    ///
    /// Usage error when `key` is one of the reserved engine keys.
    pub fn set(&mut self, key: &str, value: MetaValue) -> TableResult<()> {
        if Self::is_reserved(key) {
            return Err(TableError::usage(format!(
                "metadata key '{}' is reserved for the engine",
                key
            )));
        }
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    /// Reads one entry, reserved keys included.
    ///
    /// # Errors
    ///
    /// Usage error when the key is absent.
    pub fn get(&self, key: &str) -> TableResult<MetaValue> {
        self.entries
            .get(key)
            .cloned()
            .ok_or_else(|| TableError::usage(format!("no metadata entry for key '{}'", key)))
    }

    /// Replaces every user entry with `entries`, leaving reserved keys
    /// untouched.
    ///
    /// # Errors
    ///
    /// Usage error when `entries` names a reserved key; nothing is changed.
    pub fn set_all(&mut self, entries: &BTreeMap<String, MetaValue>) -> TableResult<()> {
        for key in entries.keys() {
            if Self::is_reserved(key) {
                return Err(TableError::usage(format!(
                    "metadata key '{}' is reserved for the engine",
                    key
                )));
            }
        }
        self.entries.retain(|k, _| Self::is_reserved(k));
        for (k, v) in entries {
            self.entries.insert(k.clone(), v.clone());
        }
        Ok(())
    }

    /// Every entry, reserved keys included
    pub fn all(&self) -> BTreeMap<String, MetaValue> {
        self.entries.clone()
    }

    /// Engine-only write path for the reserved keys
    pub(crate) fn set_reserved(&mut self, key: &str, value: MetaValue) {
        debug_assert!(Self::is_reserved(key));
        self.entries.insert(key.to_string(), value);
    }
}
