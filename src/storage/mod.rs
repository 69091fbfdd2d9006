//! Storage layer for undestroy
//!
//! A small table store implementing [`Persistence`]: a table catalog, a model
//! catalog, before-destroy hooks, and one [`Table`] per physical table. When
//! opened on a directory every write goes through to `data/<table>.json`.

pub mod engine;
pub mod file_io;
pub mod table;

pub use engine::{BeforeDestroy, Persistence};
pub use file_io::{read_json, write_json_atomic};
pub use table::Table;

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::config::paths::UndestroyPaths;
use crate::error::{UndestroyError, UndestroyResult};
use crate::models::{display_key, ModelType, Record, TableSchema};

/// On-disk layout of `schema.json`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaFile {
    #[serde(default)]
    pub tables: Vec<TableSchema>,
    #[serde(default)]
    pub models: Vec<ModelType>,
}

/// Main storage coordinator that owns every table and the model catalog
pub struct Storage {
    paths: Option<UndestroyPaths>,
    tables: RwLock<BTreeMap<String, Arc<Table>>>,
    models: RwLock<BTreeMap<String, ModelType>>,
    hooks: RwLock<HashMap<String, Vec<BeforeDestroy>>>,
}

impl Storage {
    /// Create a storage that never touches disk
    pub fn in_memory() -> Self {
        Self {
            paths: None,
            tables: RwLock::new(BTreeMap::new()),
            models: RwLock::new(BTreeMap::new()),
            hooks: RwLock::new(HashMap::new()),
        }
    }

    /// Open a file-backed storage, loading the schema and every table
    pub fn open(paths: UndestroyPaths) -> UndestroyResult<Self> {
        paths.ensure_directories()?;
        let schema: SchemaFile = read_json(paths.schema_file())?;

        let storage = Self {
            paths: Some(paths),
            ..Self::in_memory()
        };

        for table_schema in schema.tables {
            storage.attach_table(table_schema)?;
        }
        {
            let mut models = storage.write_models()?;
            for model in schema.models {
                models.insert(model.name.clone(), model);
            }
        }

        Ok(storage)
    }

    /// Get the paths configuration, if file-backed
    pub fn paths(&self) -> Option<&UndestroyPaths> {
        self.paths.as_ref()
    }

    /// Create a physical table
    pub fn create_table(&self, schema: TableSchema) -> UndestroyResult<()> {
        if self.read_tables()?.contains_key(&schema.name) {
            return Err(UndestroyError::duplicate("Table", schema.name));
        }

        debug!(table = %schema.name, columns = schema.columns.len(), "creating table");
        self.attach_table(schema)?;
        self.save_schema()
    }

    /// Look up a table by name
    pub fn table(&self, name: &str) -> UndestroyResult<Arc<Table>> {
        self.read_tables()?
            .get(name)
            .cloned()
            .ok_or_else(|| UndestroyError::table_not_found(name))
    }

    /// Names of all tables
    pub fn table_names(&self) -> UndestroyResult<Vec<String>> {
        Ok(self.read_tables()?.keys().cloned().collect())
    }

    /// All registered models
    pub fn models(&self) -> UndestroyResult<Vec<ModelType>> {
        Ok(self.read_models()?.values().cloned().collect())
    }

    fn attach_table(&self, schema: TableSchema) -> UndestroyResult<()> {
        let path = self.paths.as_ref().map(|p| p.table_file(&schema.name));
        let table = Table::new(schema, path);
        table.load()?;

        let mut tables = self.tables.write().map_err(|e| {
            UndestroyError::Storage(format!("Failed to acquire write lock: {}", e))
        })?;
        tables.insert(table.schema().name.clone(), Arc::new(table));
        Ok(())
    }

    fn table_for(&self, model: &str) -> UndestroyResult<Arc<Table>> {
        let model = self.model(model)?;
        match &model.table_name {
            Some(table) => self.table(table),
            None => Err(UndestroyError::Storage(format!(
                "Model '{}' is abstract and has no table",
                model.name
            ))),
        }
    }

    /// Primary-key override set on `model` or the nearest base that has one
    fn inherited_primary_key(&self, model: &ModelType) -> UndestroyResult<Option<String>> {
        let mut seen = HashSet::from([model.name.clone()]);
        let mut current = model.clone();
        loop {
            if let Some(pk) = &current.primary_key {
                return Ok(Some(pk.clone()));
            }
            match current.base.take() {
                Some(base) if seen.insert(base.clone()) => current = self.model(&base)?,
                _ => return Ok(None),
            }
        }
    }

    /// Row of `model` whose resolved primary key equals `key`
    fn lookup(&self, model: &str, table: &Table, key: &Value) -> UndestroyResult<Option<Record>> {
        let pk = self.primary_key(model)?;
        if pk == table.schema().primary_key {
            return table.get(key);
        }
        let criteria = Record::new().with(pk, key.clone());
        Ok(table.select(&criteria)?.into_iter().next())
    }

    fn save_schema(&self) -> UndestroyResult<()> {
        let Some(paths) = &self.paths else {
            return Ok(());
        };

        let schema = SchemaFile {
            tables: self
                .read_tables()?
                .values()
                .map(|t| t.schema().clone())
                .collect(),
            // Archive models are synthesized at runtime and never persisted
            models: self
                .read_models()?
                .values()
                .filter(|m| !m.is_archive())
                .cloned()
                .collect(),
        };

        write_json_atomic(paths.schema_file(), &schema)
    }

    fn read_tables(
        &self,
    ) -> UndestroyResult<std::sync::RwLockReadGuard<'_, BTreeMap<String, Arc<Table>>>> {
        self.tables
            .read()
            .map_err(|e| UndestroyError::Storage(format!("Failed to acquire read lock: {}", e)))
    }

    fn read_models(
        &self,
    ) -> UndestroyResult<std::sync::RwLockReadGuard<'_, BTreeMap<String, ModelType>>> {
        self.models
            .read()
            .map_err(|e| UndestroyError::Storage(format!("Failed to acquire read lock: {}", e)))
    }

    fn write_models(
        &self,
    ) -> UndestroyResult<std::sync::RwLockWriteGuard<'_, BTreeMap<String, ModelType>>> {
        self.models
            .write()
            .map_err(|e| UndestroyError::Storage(format!("Failed to acquire write lock: {}", e)))
    }
}

impl Persistence for Storage {
    fn is_model(&self, name: &str) -> bool {
        self.read_models()
            .map(|models| models.contains_key(name))
            .unwrap_or(false)
    }

    fn model(&self, name: &str) -> UndestroyResult<ModelType> {
        self.read_models()?
            .get(name)
            .cloned()
            .ok_or_else(|| UndestroyError::model_not_found(name))
    }

    fn define_model(&self, model: ModelType) -> UndestroyResult<()> {
        if let Some(base) = &model.base {
            if !self.is_model(base) {
                return Err(UndestroyError::Validation(format!(
                    "base '{}' of model '{}' is not a model",
                    base, model.name
                )));
            }
        }

        let persist = !model.is_archive();
        debug!(model = %model.name, table = ?model.table_name, "defining model");
        self.write_models()?.insert(model.name.clone(), model);

        if persist {
            self.save_schema()?;
        }
        Ok(())
    }

    fn primary_key(&self, model: &str) -> UndestroyResult<String> {
        if let Some(pk) = self.inherited_primary_key(&self.model(model)?)? {
            return Ok(pk);
        }
        Ok(self.table_for(model)?.schema().primary_key.clone())
    }

    fn columns(&self, model: &str) -> UndestroyResult<Vec<String>> {
        Ok(self.table_for(model)?.schema().columns.clone())
    }

    fn select(&self, model: &str, criteria: &Record) -> UndestroyResult<Vec<Record>> {
        self.table_for(model)?.select(criteria)
    }

    fn find(&self, model: &str, key: &Value) -> UndestroyResult<Record> {
        let table = self.table_for(model)?;
        self.lookup(model, &table, key)?
            .ok_or_else(|| UndestroyError::not_found(model, display_key(key)))
    }

    fn insert(&self, model: &str, record: Record) -> UndestroyResult<Record> {
        let table = self.table_for(model)?;
        let record = table.insert(record)?;
        table.save()?;
        Ok(record)
    }

    fn update(&self, model: &str, record: Record) -> UndestroyResult<Record> {
        let table = self.table_for(model)?;
        let record = table.update(record)?;
        table.save()?;
        Ok(record)
    }

    fn delete(&self, model: &str, key: &Value) -> UndestroyResult<bool> {
        let table = self.table_for(model)?;
        let Some(row) = self.lookup(model, &table, key)? else {
            return Ok(false);
        };
        let deleted = table.delete(&row.value(&table.schema().primary_key))?;
        if deleted {
            table.save()?;
        }
        Ok(deleted)
    }

    fn add_before_destroy(&self, model: &str, hook: BeforeDestroy) -> UndestroyResult<()> {
        if !self.is_model(model) {
            return Err(UndestroyError::model_not_found(model));
        }

        let mut hooks = self.hooks.write().map_err(|e| {
            UndestroyError::Storage(format!("Failed to acquire write lock: {}", e))
        })?;
        hooks.entry(model.to_string()).or_default().push(hook);
        Ok(())
    }

    fn destroy(&self, model: &str, record: &Record) -> UndestroyResult<bool> {
        let key = record.value(&self.primary_key(model)?);

        // Hooks may call back into storage, so run them without holding the lock
        let hooks: Vec<BeforeDestroy> = {
            let hooks = self.hooks.read().map_err(|e| {
                UndestroyError::Storage(format!("Failed to acquire read lock: {}", e))
            })?;
            hooks.get(model).cloned().unwrap_or_default()
        };

        for hook in &hooks {
            hook(self as &dyn Persistence, record)?;
        }

        self.delete(model, &key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    fn widgets_storage() -> Storage {
        let storage = Storage::in_memory();
        storage
            .create_table(TableSchema::new("widgets", "id", ["id", "name"]))
            .unwrap();
        storage
            .define_model(ModelType::new("Widget", "widgets"))
            .unwrap();
        storage
    }

    #[test]
    fn test_storage_creation_on_disk() {
        let temp_dir = TempDir::new().unwrap();
        let paths = UndestroyPaths::with_base_dir(temp_dir.path().to_path_buf());
        let storage = Storage::open(paths).unwrap();

        assert!(temp_dir.path().join("data").exists());
        assert!(storage.table_names().unwrap().is_empty());
    }

    #[test]
    fn test_model_predicate() {
        let storage = widgets_storage();
        assert!(storage.is_model("Widget"));
        assert!(!storage.is_model("Gadget"));
        assert!(storage.model("Gadget").unwrap_err().is_not_found());
    }

    #[test]
    fn test_create_table_twice_fails() {
        let storage = widgets_storage();
        let err = storage
            .create_table(TableSchema::new("widgets", "id", ["id"]))
            .unwrap_err();
        assert!(matches!(err, UndestroyError::Duplicate { .. }));
    }

    #[test]
    fn test_define_model_requires_known_base() {
        let storage = widgets_storage();
        let err = storage
            .define_model(ModelType::new("Gadget", "widgets").with_base("Missing"))
            .unwrap_err();
        assert!(err.is_validation());

        storage
            .define_model(ModelType::abstract_model("ApplicationRecord"))
            .unwrap();
        storage
            .define_model(ModelType::new("Gadget", "widgets").with_base("ApplicationRecord"))
            .unwrap();
    }

    #[test]
    fn test_find_missing_is_not_found() {
        let storage = widgets_storage();
        let err = storage.find("Widget", &json!(5)).unwrap_err();
        assert_eq!(err.to_string(), "Widget not found: 5");
    }

    #[test]
    fn test_abstract_model_has_no_rows() {
        let storage = widgets_storage();
        storage
            .define_model(ModelType::abstract_model("ApplicationRecord"))
            .unwrap();
        assert!(storage.all("ApplicationRecord").is_err());
    }

    #[test]
    fn test_primary_key_override_is_inherited_from_base() {
        let storage = Storage::in_memory();
        storage
            .create_table(TableSchema::new("archived_widgets", "id", ["id", "widget_id", "name"]))
            .unwrap();
        storage
            .define_model(ModelType::abstract_model("ArchiveRecord").with_primary_key("widget_id"))
            .unwrap();
        storage
            .define_model(ModelType::new("ArchivedWidget", "archived_widgets").with_base("ArchiveRecord"))
            .unwrap();
        storage
            .define_model(ModelType::new("RawArchive", "archived_widgets"))
            .unwrap();

        assert_eq!(storage.primary_key("ArchiveRecord").unwrap(), "widget_id");
        assert_eq!(storage.primary_key("ArchivedWidget").unwrap(), "widget_id");
        assert_eq!(storage.primary_key("RawArchive").unwrap(), "id");

        storage
            .insert(
                "ArchivedWidget",
                Record::new().with("id", 1).with("widget_id", 7).with("name", "cog"),
            )
            .unwrap();
        assert_eq!(storage.find("ArchivedWidget", &json!(7)).unwrap().value("id"), json!(1));
        assert!(storage.find("ArchivedWidget", &json!(1)).unwrap_err().is_not_found());
        assert_eq!(storage.find("RawArchive", &json!(1)).unwrap().value("widget_id"), json!(7));

        assert!(!storage.delete("ArchivedWidget", &json!(1)).unwrap());
        assert!(storage.delete("ArchivedWidget", &json!(7)).unwrap());
        assert!(storage.all("RawArchive").unwrap().is_empty());
    }

    #[test]
    fn test_own_primary_key_overrides_base() {
        let storage = widgets_storage();
        storage
            .define_model(ModelType::abstract_model("Keyed").with_primary_key("name"))
            .unwrap();
        storage
            .define_model(
                ModelType::new("Gadget", "widgets")
                    .with_base("Keyed")
                    .with_primary_key("id"),
            )
            .unwrap();
        assert_eq!(storage.primary_key("Gadget").unwrap(), "id");
    }

    #[test]
    fn test_find_by_other_column() {
        let storage = widgets_storage();
        storage
            .insert("Widget", Record::new().with("id", 1).with("name", "cog"))
            .unwrap();

        let found = storage.find_by("Widget", "name", &json!("cog")).unwrap();
        assert_eq!(found.unwrap().value("id"), json!(1));
        assert!(storage
            .find_by("Widget", "name", &json!("nope"))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_destroy_runs_hooks_before_delete() {
        let storage = widgets_storage();
        let widget = Record::new().with("id", 5).with("name", "sprocket");
        storage.insert("Widget", widget.clone()).unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        storage
            .add_before_destroy(
                "Widget",
                Arc::new(move |engine: &dyn Persistence, record: &Record| -> UndestroyResult<()> {
                    // Row must still be there while the hook runs
                    engine.find("Widget", &record.value("id"))?;
                    seen.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }),
            )
            .unwrap();

        assert!(storage.destroy("Widget", &widget).unwrap());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(storage.find("Widget", &json!(5)).unwrap_err().is_not_found());
    }

    #[test]
    fn test_failing_hook_vetoes_destroy() {
        let storage = widgets_storage();
        let widget = Record::new().with("id", 5).with("name", "sprocket");
        storage.insert("Widget", widget.clone()).unwrap();

        storage
            .add_before_destroy(
                "Widget",
                Arc::new(|_: &dyn Persistence, _: &Record| -> UndestroyResult<()> {
                    Err(UndestroyError::Storage("nope".into()))
                }),
            )
            .unwrap();

        assert!(storage.destroy("Widget", &widget).is_err());
        assert!(storage.find("Widget", &json!(5)).is_ok());
    }

    #[test]
    fn test_schema_and_rows_survive_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let paths = UndestroyPaths::with_base_dir(temp_dir.path().to_path_buf());

        {
            let storage = Storage::open(paths.clone()).unwrap();
            storage
                .create_table(TableSchema::new("widgets", "id", ["id", "name"]))
                .unwrap();
            storage
                .define_model(ModelType::new("Widget", "widgets"))
                .unwrap();
            storage
                .insert("Widget", Record::new().with("id", 5).with("name", "sprocket"))
                .unwrap();
        }

        let storage = Storage::open(paths).unwrap();
        assert!(storage.is_model("Widget"));
        assert_eq!(
            storage.find("Widget", &json!(5)).unwrap().value("name"),
            json!("sprocket")
        );
    }

    #[test]
    fn test_archive_models_are_not_persisted() {
        let temp_dir = TempDir::new().unwrap();
        let paths = UndestroyPaths::with_base_dir(temp_dir.path().to_path_buf());

        {
            let storage = Storage::open(paths.clone()).unwrap();
            let mut archive = ModelType::new("ArchivedWidget", "archive_widgets");
            archive.archive_of = Some(crate::models::BindingId::new());
            storage.define_model(archive).unwrap();
            assert!(storage.is_model("ArchivedWidget"));
        }

        let storage = Storage::open(paths).unwrap();
        assert!(!storage.is_model("ArchivedWidget"));
    }
}
