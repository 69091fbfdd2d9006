//! Record model
//!
//! A row as seen by the archival layer: column name to JSON value. Source and
//! archive tables only need compatible columns, so rows stay untyped.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single table row
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(BTreeMap<String, Value>);

impl Record {
    /// Create an empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(column, value);
        self
    }

    /// Get a column value
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.0.get(column)
    }

    /// Get a column value, treating a missing column as null
    pub fn value(&self, column: &str) -> Value {
        self.0.get(column).cloned().unwrap_or(Value::Null)
    }

    /// Set a column value
    pub fn set(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(column.into(), value.into());
    }

    /// Remove a column, returning its value
    pub fn remove(&mut self, column: &str) -> Option<Value> {
        self.0.remove(column)
    }

    /// Check if the record carries a column
    pub fn contains(&self, column: &str) -> bool {
        self.0.contains_key(column)
    }

    /// Iterate over column names in order
    pub fn columns(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    /// Iterate over (column, value) pairs in column order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Number of columns
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the record has no columns
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when every criteria column is present here with an equal value
    pub fn matches(&self, criteria: &Record) -> bool {
        criteria
            .iter()
            .all(|(column, expected)| self.0.get(column) == Some(expected))
    }

    /// Copy of this record restricted to the given columns
    pub fn project<'a, I>(&self, columns: I) -> Record
    where
        I: IntoIterator<Item = &'a String>,
    {
        columns
            .into_iter()
            .filter_map(|column| self.0.get(column).map(|v| (column.clone(), v.clone())))
            .collect()
    }
}

impl FromIterator<(String, Value)> for Record {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl From<serde_json::Map<String, Value>> for Record {
    fn from(map: serde_json::Map<String, Value>) -> Self {
        map.into_iter().collect()
    }
}

/// Render a key value for messages: strings unquoted, everything else as JSON
pub fn display_key(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
