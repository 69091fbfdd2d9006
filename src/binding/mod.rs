//! Archival binding between a source model and its archive model
//!
//! A [`Binding`] owns the resolved [`Config`] for one source model and an
//! `active` flag. While active, [`Binding::before_destroy`] copies a row into
//! the archive table before the engine deletes it. [`Binding::deactivated`]
//! switches archival off for the duration of a closure, which is how a
//! permanent delete bypasses the archive.
//!
//! The flag is shared by every thread using the binding. A destroy racing a
//! `deactivated` call on another thread may or may not be archived; callers
//! that need both must serialize them.

pub mod archive;
pub mod restorable;
pub mod target;

pub use archive::{ArchiveExecutor, Transfer};
pub use restorable::ArchivedRecord;

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{UndestroyError, UndestroyResult};
use crate::models::{display_key, BindingId, ModelType, Record};
use crate::storage::Persistence;

/// Archival state for one source model
#[derive(Debug)]
pub struct Binding {
    id: BindingId,
    source: ModelType,
    target: ModelType,
    config: Config,
    active: AtomicBool,
}

/// Restores the previous `active` value when dropped
struct Suspended<'a> {
    flag: &'a AtomicBool,
    previous: bool,
}

impl<'a> Suspended<'a> {
    fn new(flag: &'a AtomicBool) -> Self {
        let previous = flag.swap(false, Ordering::SeqCst);
        Self { flag, previous }
    }
}

impl Drop for Suspended<'_> {
    fn drop(&mut self) {
        self.flag.store(self.previous, Ordering::SeqCst);
    }
}

impl Binding {
    /// Resolve configuration for `model` and build its archive model.
    ///
    /// `customize` sees the merged options before table and target defaults
    /// are derived.
    pub fn new<F>(
        engine: &dyn Persistence,
        model: &str,
        defaults: &Config,
        options: &Config,
        customize: F,
    ) -> UndestroyResult<Self>
    where
        F: FnOnce(&mut Config),
    {
        if !engine.is_model(model) {
            return Err(UndestroyError::InvalidArgument(format!(
                "'{}' must be a model",
                model
            )));
        }
        let source = engine.model(model)?;

        let mut config = Config::resolve(defaults, options);
        customize(&mut config);
        config.source_class = Some(source.name.clone());

        let id = BindingId::new();
        let (target, synthesized) = match config.target_class.clone() {
            Some(name) => {
                if !engine.is_model(&name) {
                    return Err(UndestroyError::InvalidConfig(format!(
                        "target_class '{}' must be a model",
                        name
                    )));
                }
                let target = engine.model(&name)?;
                if config.table_name.is_none() {
                    config.table_name = target.table_name.clone();
                }
                (target, false)
            }
            None => {
                if config.table_name.is_none() {
                    if let Some(table) = &source.table_name {
                        config.table_name = Some(config.prefix_table_name(table));
                    }
                }
                let target = target::build(engine, id, &source, &config)?;
                config.target_class = Some(target.name.clone());
                (target, true)
            }
        };

        match config.table_name.as_deref() {
            Some(table) if !table.is_empty() => {}
            _ => {
                return Err(UndestroyError::InvalidConfig(format!(
                    "no archive table name for '{}'",
                    source.name
                )))
            }
        }

        // Nothing reaches the catalog until the config is fully validated
        if synthesized {
            target::register(engine, &target)?;
        }

        debug!(
            binding = %id,
            source = %source.name,
            target = %target.name,
            table = ?config.table_name,
            executor = config.executor().name(),
            "resolved archival binding"
        );

        Ok(Self {
            id,
            source,
            target,
            config,
            active: AtomicBool::new(true),
        })
    }

    /// Identifier carried by the synthesized archive model
    pub fn id(&self) -> BindingId {
        self.id
    }

    /// The model whose rows are archived
    pub fn source(&self) -> &ModelType {
        &self.source
    }

    /// The archive model
    pub fn target_class(&self) -> &ModelType {
        &self.target
    }

    /// The resolved configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Archive table name
    pub fn table_name(&self) -> &str {
        self.config.table_name.as_deref().unwrap_or_default()
    }

    /// Whether destroys are currently archived
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Switch archival on or off
    pub fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::SeqCst);
    }

    /// Archive `record` if active. Runs before the engine deletes the row.
    pub fn before_destroy(&self, engine: &dyn Persistence, record: &Record) -> UndestroyResult<()> {
        if !self.is_active() {
            debug!(model = %self.source.name, "archival deactivated, skipping");
            return Ok(());
        }

        let key = record.value(&engine.primary_key(&self.source.name)?);
        let executor = self.config.executor();

        let archived = self
            .ensure_current(engine)
            .and_then(|_| self.target(engine, record))
            .and_then(|target| executor.run(engine, &self.config, record, target));

        match archived {
            Ok(_) => {
                info!(
                    model = %self.source.name,
                    key = %display_key(&key),
                    table = self.table_name(),
                    "archived row"
                );
                Ok(())
            }
            Err(e) => {
                warn!(
                    model = %self.source.name,
                    key = %display_key(&key),
                    error = %e,
                    "archival failed, aborting destroy"
                );
                Err(UndestroyError::ArchiveExecutionFailed {
                    model: self.source.name.clone(),
                    key: display_key(&key),
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Fail when a later binding has replaced this one's archive model.
    ///
    /// Engine lookups go through the catalog by name, so a superseded handle
    /// would otherwise read and write the newer binding's table.
    fn ensure_current(&self, engine: &dyn Persistence) -> UndestroyResult<()> {
        if self.target.archive_of.is_none() {
            return Ok(());
        }
        let current = engine.model(&self.target.name)?;
        if current.archive_of != self.target.archive_of {
            return Err(UndestroyError::InvalidConfig(format!(
                "binding {} for '{}' was replaced; '{}' now belongs to a newer binding",
                self.id, self.source.name, self.target.name
            )));
        }
        Ok(())
    }

    /// Existing archive row for `record`, matched by primary-key value.
    ///
    /// The source and archive primary-key columns may have different names.
    pub fn target(&self, engine: &dyn Persistence, record: &Record) -> UndestroyResult<Option<Record>> {
        let source_pk = engine.primary_key(&self.source.name)?;
        let target_pk = engine.primary_key(&self.target.name)?;
        engine.find_by(&self.target.name, &target_pk, &record.value(&source_pk))
    }

    /// Run `f` with archival switched off, restoring the previous state on
    /// every exit path, panics included.
    pub fn deactivated<T, F>(&self, f: F) -> T
    where
        F: FnOnce() -> T,
    {
        let _suspended = Suspended::new(&self.active);
        f()
    }
}
