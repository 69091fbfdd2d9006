//! Attaching archival to models
//!
//! [`Undestroy`] is the context an application holds: the engine, the
//! process defaults, and a registry from source model name to its current
//! [`Binding`]. Attaching a model builds a binding and, the first time only,
//! registers a before-destroy hook with the engine. The hook looks the binding
//! up when it fires, so re-attaching swaps configuration without stacking
//! hooks.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde_json::Value;
use tracing::{debug, info};

use crate::binding::Binding;
use crate::config::Config;
use crate::error::{UndestroyError, UndestroyResult};
use crate::models::{display_key, BindingId, ModelType, Record};
use crate::storage::{BeforeDestroy, Persistence};

struct Entry {
    binding: Arc<Binding>,
    hooked: bool,
}

/// Source model name to current binding
#[derive(Default)]
pub struct BindingRegistry {
    entries: RwLock<BTreeMap<String, Entry>>,
}

impl BindingRegistry {
    /// Current binding for a source model
    pub fn get(&self, model: &str) -> UndestroyResult<Option<Arc<Binding>>> {
        Ok(self.read()?.get(model).map(|e| Arc::clone(&e.binding)))
    }

    /// Binding with the given id, if it is still current
    pub fn by_id(&self, id: BindingId) -> UndestroyResult<Option<Arc<Binding>>> {
        Ok(self
            .read()?
            .values()
            .find(|e| e.binding.id() == id)
            .map(|e| Arc::clone(&e.binding)))
    }

    /// Attached source model names
    pub fn models(&self) -> UndestroyResult<Vec<String>> {
        Ok(self.read()?.keys().cloned().collect())
    }

    /// Store `binding` for `model`; true when the model still needs its hook
    fn replace(&self, model: &str, binding: Arc<Binding>) -> UndestroyResult<bool> {
        let mut entries = self.write()?;
        let entry = entries.entry(model.to_string()).or_insert_with(|| Entry {
            binding: Arc::clone(&binding),
            hooked: false,
        });
        entry.binding = binding;
        Ok(!entry.hooked)
    }

    fn mark_hooked(&self, model: &str) -> UndestroyResult<()> {
        if let Some(entry) = self.write()?.get_mut(model) {
            entry.hooked = true;
        }
        Ok(())
    }

    fn read(&self) -> UndestroyResult<RwLockReadGuard<'_, BTreeMap<String, Entry>>> {
        self.entries
            .read()
            .map_err(|e| UndestroyError::Storage(format!("Failed to acquire read lock: {}", e)))
    }

    fn write(&self) -> UndestroyResult<RwLockWriteGuard<'_, BTreeMap<String, Entry>>> {
        self.entries
            .write()
            .map_err(|e| UndestroyError::Storage(format!("Failed to acquire write lock: {}", e)))
    }
}

/// Archival context over one persistence engine
pub struct Undestroy {
    engine: Arc<dyn Persistence>,
    defaults: RwLock<Config>,
    registry: Arc<BindingRegistry>,
}

impl Undestroy {
    /// Context using the built-in defaults
    pub fn new(engine: Arc<dyn Persistence>) -> Self {
        Self::with_defaults(engine, Config::defaults())
    }

    /// Context using the given process defaults
    pub fn with_defaults(engine: Arc<dyn Persistence>, defaults: Config) -> Self {
        Self {
            engine,
            defaults: RwLock::new(defaults),
            registry: Arc::new(BindingRegistry::default()),
        }
    }

    pub fn engine(&self) -> &dyn Persistence {
        self.engine.as_ref()
    }

    pub fn registry(&self) -> &BindingRegistry {
        &self.registry
    }

    /// Snapshot of the process defaults
    pub fn defaults(&self) -> UndestroyResult<Config> {
        self.defaults
            .read()
            .map(|d| d.clone())
            .map_err(|e| UndestroyError::Storage(format!("Failed to acquire read lock: {}", e)))
    }

    /// Edit the process defaults. Existing bindings keep their resolved config.
    pub fn configure<F>(&self, f: F) -> UndestroyResult<()>
    where
        F: FnOnce(&mut Config),
    {
        let mut defaults = self
            .defaults
            .write()
            .map_err(|e| UndestroyError::Storage(format!("Failed to acquire write lock: {}", e)))?;
        f(&mut defaults);
        Ok(())
    }

    /// Enable archival for `model`
    pub fn undestroy(&self, model: &str, options: &Config) -> UndestroyResult<Arc<Binding>> {
        self.undestroy_with(model, options, |_| {})
    }

    /// Enable archival for `model`, adjusting the merged options first
    pub fn undestroy_with<F>(
        &self,
        model: &str,
        options: &Config,
        customize: F,
    ) -> UndestroyResult<Arc<Binding>>
    where
        F: FnOnce(&mut Config),
    {
        let defaults = self.defaults()?;
        let binding = Arc::new(Binding::new(
            self.engine(),
            model,
            &defaults,
            options,
            customize,
        )?);

        if self.registry.replace(model, Arc::clone(&binding))? {
            self.engine.add_before_destroy(model, self.hook_for(model))?;
            self.registry.mark_hooked(model)?;
            debug!(model, "registered before-destroy hook");
        }

        Ok(binding)
    }

    fn hook_for(&self, model: &str) -> BeforeDestroy {
        let registry = Arc::clone(&self.registry);
        let model = model.to_string();
        Arc::new(
            move |engine: &dyn Persistence, record: &Record| -> UndestroyResult<()> {
                match registry.get(&model)? {
                    Some(binding) => binding.before_destroy(engine, record),
                    None => Ok(()),
                }
            },
        )
    }

    /// Current binding for `model`; `InvalidArgument` when not attached
    pub fn binding(&self, model: &str) -> UndestroyResult<Arc<Binding>> {
        self.registry.get(model)?.ok_or_else(|| {
            UndestroyError::InvalidArgument(format!("archival is not enabled for '{}'", model))
        })
    }

    pub fn is_attached(&self, model: &str) -> bool {
        matches!(self.registry.get(model), Ok(Some(_)))
    }

    pub fn attached_models(&self) -> UndestroyResult<Vec<String>> {
        self.registry.models()
    }

    /// The archive model for `model`
    pub fn archived(&self, model: &str) -> UndestroyResult<ModelType> {
        Ok(self.binding(model)?.target_class().clone())
    }

    /// All archive rows for `model`
    pub fn archived_rows(&self, model: &str) -> UndestroyResult<Vec<Record>> {
        let binding = self.binding(model)?;
        let rows = binding.archived_rows(self.engine())?;
        Ok(rows.into_iter().map(|a| a.into_record()).collect())
    }

    /// Destroy through the engine, archiving when the model is attached
    pub fn destroy(&self, model: &str, record: &Record) -> UndestroyResult<bool> {
        self.engine.destroy(model, record)
    }

    /// Destroy without archiving
    pub fn destroy_permanently(&self, model: &str, record: &Record) -> UndestroyResult<bool> {
        let binding = self.binding(model)?;
        let deleted = binding.deactivated(|| self.engine.destroy(model, record))?;

        let key = record.value(&self.engine.primary_key(model)?);
        info!(model, key = %display_key(&key), "permanently destroyed row");
        Ok(deleted)
    }

    /// Restore archive rows of `model` by key
    pub fn restore(&self, model: &str, keys: &[Value]) -> UndestroyResult<Vec<Record>> {
        self.binding(model)?.restore(self.engine(), keys)
    }

    /// Restore archive rows of `model` matching all `criteria`
    pub fn restore_where(&self, model: &str, criteria: &Record) -> UndestroyResult<Vec<Record>> {
        self.binding(model)?.restore_where(self.engine(), criteria)
    }

    /// Restore one row addressed through its archive model
    pub fn restore_archived(&self, target_model: &str, key: &Value) -> UndestroyResult<Record> {
        let target = self.engine.model(target_model)?;
        let id = target.archive_of.ok_or_else(|| {
            UndestroyError::InvalidArgument(format!("'{}' is not an archive model", target_model))
        })?;
        let binding = self.registry.by_id(id)?.ok_or_else(|| {
            UndestroyError::InvalidArgument(format!(
                "'{}' belongs to a binding that is no longer attached",
                target_model
            ))
        })?;

        let archived = binding.archived_find(self.engine(), key)?;
        archived.restore(self.engine())
    }
}
