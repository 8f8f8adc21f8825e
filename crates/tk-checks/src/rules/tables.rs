//! Data-driven lookup tables for rule content.
//!
//! Rule content (skill-to-ability mappings, DC tables, condition effects)
//! lives in [`LookupTable`] values rather than code, so it can be replaced
//! or extended from JSON without touching the lookup algorithm.

use std::collections::BTreeMap;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{CheckEngineResult, CheckError};

/// A named key-to-value rule table.
///
/// Keys are lowercased on insert and lookup so table content is
/// case-insensitive.
#[derive(Debug, Clone, Serialize)]
pub struct LookupTable<V> {
    /// Name of the table, used in error and provenance messages.
    pub name: String,
    entries: BTreeMap<String, V>,
}

impl<V> LookupTable<V> {
    /// Create an empty table.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: BTreeMap::new(),
        }
    }

    /// Create a table from an iterator of entries.
    pub fn from_entries(
        name: impl Into<String>,
        entries: impl IntoIterator<Item = (&'static str, V)>,
    ) -> Self {
        let mut table = Self::new(name);
        for (key, value) in entries {
            table.insert(key, value);
        }
        table
    }

    /// Insert or replace an entry.
    pub fn insert(&mut self, key: impl AsRef<str>, value: V) {
        self.entries.insert(key.as_ref().to_lowercase(), value);
    }

    /// Look up an entry by key.
    pub fn lookup(&self, key: &str) -> Option<&V> {
        self.entries.get(&key.to_lowercase())
    }

    /// Whether the table has an entry for the key.
    pub fn contains(&self, key: &str) -> bool {
        self.lookup(key).is_some()
    }

    /// Iterate entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &V)> {
        self.entries.iter()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V: DeserializeOwned> LookupTable<V> {
    /// Load a table from a JSON object of `key: value` entries.
    ///
    /// Entries whose values fail to deserialize are rejected, naming the
    /// offending key.
    pub fn from_json(name: impl Into<String>, value: Value) -> CheckEngineResult<Self> {
        let name = name.into();
        let Value::Object(map) = value else {
            return Err(CheckError::InvalidRequest(format!(
                "table '{name}' must be a JSON object"
            )));
        };

        let mut table = Self::new(name);
        for (key, raw) in map {
            let parsed: V = serde_json::from_value(raw).map_err(|e| {
                CheckError::InvalidRequest(format!(
                    "table '{}' entry '{key}': {e}",
                    table.name
                ))
            })?;
            table.insert(&key, parsed);
        }
        Ok(table)
    }
}
