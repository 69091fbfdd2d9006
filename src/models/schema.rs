//! Table and model descriptions
//!
//! A `TableSchema` is the physical side (created by migrations, outside the
//! archival layer). A `ModelType` maps a named model onto a table and is what
//! bindings and the model catalog work with.

use serde::{Deserialize, Serialize};

use super::ids::BindingId;

fn default_primary_key() -> String {
    "id".to_string()
}

/// Physical table definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    /// Table name (e.g., "widgets")
    pub name: String,

    /// Primary-key column
    #[serde(default = "default_primary_key")]
    pub primary_key: String,

    /// All columns, primary key included
    pub columns: Vec<String>,

    /// Columns that must be present and non-null on insert
    #[serde(default)]
    pub not_null: Vec<String>,
}

impl TableSchema {
    /// Create a table definition; the primary key is added to the columns if missing
    pub fn new<I, S>(name: impl Into<String>, primary_key: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let primary_key = primary_key.into();
        let mut columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        if !columns.contains(&primary_key) {
            columns.insert(0, primary_key.clone());
        }

        Self {
            name: name.into(),
            primary_key,
            columns,
            not_null: Vec::new(),
        }
    }

    /// Mark columns as NOT NULL
    pub fn with_not_null<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.not_null.extend(columns.into_iter().map(Into::into));
        self
    }

    /// Check if the table has a column
    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }
}

/// A named model mapped onto a table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelType {
    /// Model name (e.g., "Widget")
    pub name: String,

    /// Backing table; abstract models have none
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_name: Option<String>,

    /// Base model this one derives from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,

    /// Abstract models have no table and cannot hold rows
    #[serde(default, rename = "abstract")]
    pub is_abstract: bool,

    /// Primary-key column override, inherited by models deriving from this one.
    /// Falls back to the table's primary key when unset along the base chain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_key: Option<String>,

    /// Back-reference to the binding that synthesized this archive model
    #[serde(skip)]
    pub archive_of: Option<BindingId>,
}

impl ModelType {
    /// Create a concrete model backed by a table
    pub fn new(name: impl Into<String>, table_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table_name: Some(table_name.into()),
            base: None,
            is_abstract: false,
            primary_key: None,
            archive_of: None,
        }
    }

    /// Create an abstract base model
    pub fn abstract_model(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table_name: None,
            base: None,
            is_abstract: true,
            primary_key: None,
            archive_of: None,
        }
    }

    /// Set the base model
    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.base = Some(base.into());
        self
    }

    /// Set the primary-key override
    pub fn with_primary_key(mut self, column: impl Into<String>) -> Self {
        self.primary_key = Some(column.into());
        self
    }

    /// True for archive models synthesized by a binding
    pub fn is_archive(&self) -> bool {
        self.archive_of.is_some()
    }
}
