//! Table repository for JSON storage
//!
//! Holds one table's rows in memory, keyed by primary key, and loads/saves
//! them from `data/<table>.json` when backed by a file.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::RwLock;

use serde_json::Value;

use crate::error::{UndestroyError, UndestroyResult};
use crate::models::{display_key, Record, TableSchema};

use super::file_io::{read_json, write_json_atomic};

/// Serializable table data structure
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
struct TableData {
    rows: Vec<Record>,
}

/// Map a primary-key value onto the string used to index rows.
///
/// JSON encoding keeps `5` and `"5"` distinct.
pub fn index_key(value: &Value) -> UndestroyResult<String> {
    match value {
        Value::Number(_) | Value::String(_) | Value::Bool(_) => Ok(value.to_string()),
        Value::Null => Err(UndestroyError::Validation(
            "primary key cannot be null".into(),
        )),
        other => Err(UndestroyError::Validation(format!(
            "primary key must be a scalar, got {}",
            other
        ))),
    }
}

fn compare_keys(a: &Value, b: &Value) -> Ordering {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        _ => a.to_string().cmp(&b.to_string()),
    }
}

/// Repository for one table's rows
pub struct Table {
    schema: TableSchema,
    path: Option<PathBuf>,
    rows: RwLock<BTreeMap<String, Record>>,
}

impl Table {
    /// Create a new table repository; `path` is `None` for in-memory tables
    pub fn new(schema: TableSchema, path: Option<PathBuf>) -> Self {
        Self {
            schema,
            path,
            rows: RwLock::new(BTreeMap::new()),
        }
    }

    /// The table definition
    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    /// Load rows from disk
    pub fn load(&self) -> UndestroyResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let file_data: TableData = read_json(path)?;

        let mut rows = self.rows.write().map_err(|e| {
            UndestroyError::Storage(format!("Failed to acquire write lock: {}", e))
        })?;

        rows.clear();
        for record in file_data.rows {
            let key = index_key(&record.value(&self.schema.primary_key))?;
            rows.insert(key, record);
        }

        Ok(())
    }

    /// Save rows to disk
    pub fn save(&self) -> UndestroyResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let file_data = TableData {
            rows: self.get_all()?,
        };

        write_json_atomic(path, &file_data)
    }

    /// Get a row by primary-key value
    pub fn get(&self, key: &Value) -> UndestroyResult<Option<Record>> {
        let key = index_key(key)?;
        let rows = self.rows.read().map_err(|e| {
            UndestroyError::Storage(format!("Failed to acquire read lock: {}", e))
        })?;

        Ok(rows.get(&key).cloned())
    }

    /// Get all rows ordered by primary key
    pub fn get_all(&self) -> UndestroyResult<Vec<Record>> {
        let rows = self.rows.read().map_err(|e| {
            UndestroyError::Storage(format!("Failed to acquire read lock: {}", e))
        })?;

        let pk = &self.schema.primary_key;
        let mut all: Vec<_> = rows.values().cloned().collect();
        all.sort_by(|a, b| compare_keys(&a.value(pk), &b.value(pk)));
        Ok(all)
    }

    /// Get all rows matching every criteria column
    pub fn select(&self, criteria: &Record) -> UndestroyResult<Vec<Record>> {
        Ok(self
            .get_all()?
            .into_iter()
            .filter(|record| record.matches(criteria))
            .collect())
    }

    /// Insert a new row; fails if the key is already taken
    pub fn insert(&self, record: Record) -> UndestroyResult<Record> {
        let key = self.validate(&record)?;
        let mut rows = self.rows.write().map_err(|e| {
            UndestroyError::Storage(format!("Failed to acquire write lock: {}", e))
        })?;

        if rows.contains_key(&key) {
            return Err(UndestroyError::duplicate(
                self.schema.name.clone(),
                display_key(&record.value(&self.schema.primary_key)),
            ));
        }

        rows.insert(key, record.clone());
        Ok(record)
    }

    /// Replace an existing row
    pub fn update(&self, record: Record) -> UndestroyResult<Record> {
        let key = self.validate(&record)?;
        let mut rows = self.rows.write().map_err(|e| {
            UndestroyError::Storage(format!("Failed to acquire write lock: {}", e))
        })?;

        match rows.get_mut(&key) {
            Some(existing) => {
                *existing = record.clone();
                Ok(record)
            }
            None => Err(UndestroyError::not_found(
                self.schema.name.clone(),
                display_key(&record.value(&self.schema.primary_key)),
            )),
        }
    }

    /// Delete a row by primary-key value
    pub fn delete(&self, key: &Value) -> UndestroyResult<bool> {
        let key = index_key(key)?;
        let mut rows = self.rows.write().map_err(|e| {
            UndestroyError::Storage(format!("Failed to acquire write lock: {}", e))
        })?;

        Ok(rows.remove(&key).is_some())
    }

    /// Check the row against the table definition, returning its index key
    fn validate(&self, record: &Record) -> UndestroyResult<String> {
        if let Some(unknown) = record.columns().find(|c| !self.schema.has_column(c)) {
            return Err(UndestroyError::Validation(format!(
                "unknown column '{}' for table '{}'",
                unknown, self.schema.name
            )));
        }

        for column in &self.schema.not_null {
            if record.value(column).is_null() {
                return Err(UndestroyError::Validation(format!(
                    "column '{}' of table '{}' cannot be null",
                    column, self.schema.name
                )));
            }
        }

        index_key(&record.value(&self.schema.primary_key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn widgets_schema() -> TableSchema {
        TableSchema::new("widgets", "id", ["id", "name"]).with_not_null(["name"])
    }

    fn create_test_table() -> (TempDir, Table) {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("widgets.json");
        let table = Table::new(widgets_schema(), Some(path));
        (temp_dir, table)
    }

    fn widget(id: i64, name: &str) -> Record {
        Record::new().with("id", id).with("name", name)
    }

    #[test]
    fn test_empty_load() {
        let (_temp_dir, table) = create_test_table();
        table.load().unwrap();
        assert_eq!(table.get_all().unwrap().len(), 0);
    }

    #[test]
    fn test_insert_and_get() {
        let (_temp_dir, table) = create_test_table();
        table.insert(widget(5, "sprocket")).unwrap();

        let found = table.get(&json!(5)).unwrap().unwrap();
        assert_eq!(found.value("name"), json!("sprocket"));
        assert!(table.get(&json!("5")).unwrap().is_none());
    }

    #[test]
    fn test_insert_duplicate_key_fails() {
        let (_temp_dir, table) = create_test_table();
        table.insert(widget(5, "sprocket")).unwrap();

        let err = table.insert(widget(5, "cog")).unwrap_err();
        assert!(matches!(err, UndestroyError::Duplicate { .. }));
        assert_eq!(
            table.get(&json!(5)).unwrap().unwrap().value("name"),
            json!("sprocket")
        );
    }

    #[test]
    fn test_insert_rejects_unknown_and_null_columns() {
        let (_temp_dir, table) = create_test_table();

        let err = table.insert(widget(1, "a").with("color", "red")).unwrap_err();
        assert!(err.is_validation());

        let err = table.insert(Record::new().with("id", 2)).unwrap_err();
        assert!(err.is_validation());

        let err = table.insert(Record::new().with("name", "no key")).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_update_requires_existing_row() {
        let (_temp_dir, table) = create_test_table();

        let err = table.update(widget(9, "ghost")).unwrap_err();
        assert!(err.is_not_found());

        table.insert(widget(9, "ghost")).unwrap();
        table.update(widget(9, "spirit")).unwrap();
        assert_eq!(
            table.get(&json!(9)).unwrap().unwrap().value("name"),
            json!("spirit")
        );
    }

    #[test]
    fn test_get_all_orders_numeric_keys() {
        let (_temp_dir, table) = create_test_table();
        table.insert(widget(10, "ten")).unwrap();
        table.insert(widget(5, "five")).unwrap();
        table.insert(widget(7, "seven")).unwrap();

        let ids: Vec<_> = table
            .get_all()
            .unwrap()
            .iter()
            .map(|r| r.value("id"))
            .collect();
        assert_eq!(ids, vec![json!(5), json!(7), json!(10)]);
    }

    #[test]
    fn test_select_and_delete() {
        let (_temp_dir, table) = create_test_table();
        table.insert(widget(1, "a")).unwrap();
        table.insert(widget(2, "b")).unwrap();

        let found = table.select(&Record::new().with("name", "b")).unwrap();
        assert_eq!(found.len(), 1);

        assert!(table.delete(&json!(2)).unwrap());
        assert!(!table.delete(&json!(2)).unwrap());
        assert_eq!(table.get_all().unwrap().len(), 1);
    }

    #[test]
    fn test_save_and_reload() {
        let (temp_dir, table) = create_test_table();
        table.insert(widget(5, "sprocket")).unwrap();
        table.save().unwrap();

        let reloaded = Table::new(widgets_schema(), Some(temp_dir.path().join("widgets.json")));
        reloaded.load().unwrap();
        assert_eq!(reloaded.get_all().unwrap(), vec![widget(5, "sprocket")]);
    }

    #[test]
    fn test_in_memory_table_skips_disk() {
        let table = Table::new(widgets_schema(), None);
        table.insert(widget(1, "a")).unwrap();
        table.save().unwrap();
        table.load().unwrap();
        assert_eq!(table.get_all().unwrap().len(), 1);
    }

    #[test]
    fn test_index_key_rejects_non_scalars() {
        assert!(index_key(&json!(null)).is_err());
        assert!(index_key(&json!([1])).is_err());
        assert_ne!(index_key(&json!(5)).unwrap(), index_key(&json!("5")).unwrap());
    }
}
