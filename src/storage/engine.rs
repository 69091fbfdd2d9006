//! Persistence engine contract
//!
//! Everything the archival layer needs from the underlying store: a model
//! catalog, primary-key and column lookup, row CRUD, and a hook point that
//! runs before a row is deleted and can veto the delete.

use std::sync::Arc;

use serde_json::Value;

use crate::error::UndestroyResult;
use crate::models::{ModelType, Record};

/// Callback run before a row of a model is deleted.
///
/// An `Err` aborts the destroy and is returned to its caller.
pub type BeforeDestroy = Arc<dyn Fn(&dyn Persistence, &Record) -> UndestroyResult<()> + Send + Sync>;

/// Operations a persistence engine must provide
pub trait Persistence: Send + Sync {
    /// The "is a model" predicate
    fn is_model(&self, name: &str) -> bool;

    /// Look up a model by name
    fn model(&self, name: &str) -> UndestroyResult<ModelType>;

    /// Register or replace a model in the catalog
    fn define_model(&self, model: ModelType) -> UndestroyResult<()>;

    /// Primary-key column: the nearest override along the base chain, else the table's
    fn primary_key(&self, model: &str) -> UndestroyResult<String>;

    /// Columns of the model's table
    fn columns(&self, model: &str) -> UndestroyResult<Vec<String>>;

    /// Rows whose columns equal every criteria value
    fn select(&self, model: &str, criteria: &Record) -> UndestroyResult<Vec<Record>>;

    /// Row by primary-key value; `NotFound` when absent
    fn find(&self, model: &str, key: &Value) -> UndestroyResult<Record>;

    /// Insert a new row; fails on duplicate key or constraint violation
    fn insert(&self, model: &str, record: Record) -> UndestroyResult<Record>;

    /// Replace an existing row
    fn update(&self, model: &str, record: Record) -> UndestroyResult<Record>;

    /// Delete by primary-key value without running hooks
    fn delete(&self, model: &str, key: &Value) -> UndestroyResult<bool>;

    /// Register a before-destroy hook for a model
    fn add_before_destroy(&self, model: &str, hook: BeforeDestroy) -> UndestroyResult<()>;

    /// Run the model's before-destroy hooks in order, then delete the row
    fn destroy(&self, model: &str, record: &Record) -> UndestroyResult<bool>;

    /// First row where `column` equals `value`
    fn find_by(&self, model: &str, column: &str, value: &Value) -> UndestroyResult<Option<Record>> {
        let criteria = Record::new().with(column, value.clone());
        Ok(self.select(model, &criteria)?.into_iter().next())
    }

    /// All rows of a model
    fn all(&self, model: &str) -> UndestroyResult<Vec<Record>> {
        self.select(model, &Record::new())
    }
}
