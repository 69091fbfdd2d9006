//! Restoring archived rows
//!
//! An [`ArchivedRecord`] pairs an archive row with the binding that produced
//! it. Restoring copies the row back into the source table and then removes
//! it from the archive.

use serde_json::Value;
use tracing::{info, warn};

use super::Binding;
use crate::error::{UndestroyError, UndestroyResult};
use crate::models::{display_key, Record};
use crate::storage::Persistence;

/// An archive row together with its binding
#[derive(Debug, Clone)]
pub struct ArchivedRecord<'a> {
    binding: &'a Binding,
    record: Record,
}

impl<'a> ArchivedRecord<'a> {
    pub fn new(binding: &'a Binding, record: Record) -> Self {
        Self { binding, record }
    }

    pub fn binding(&self) -> &Binding {
        self.binding
    }

    /// The archive row as stored
    pub fn record(&self) -> &Record {
        &self.record
    }

    pub fn into_record(self) -> Record {
        self.record
    }

    /// Source row this archive row restores to: shared columns only, with
    /// the archive key moved onto the source key column.
    pub fn source_record(&self, engine: &dyn Persistence) -> UndestroyResult<Record> {
        let source = &self.binding.source().name;
        let target = &self.binding.target_class().name;

        let source_pk = engine.primary_key(source)?;
        let target_pk = engine.primary_key(target)?;
        let columns = engine.columns(source)?;

        let mut row = self.record.project(columns.iter());
        if target_pk != source_pk {
            row.remove(&target_pk);
        }
        row.set(source_pk, self.record.value(&target_pk));
        Ok(row)
    }

    /// Insert the source row, then delete the archive row.
    ///
    /// A failed insert leaves the archive untouched.
    pub fn restore(self, engine: &dyn Persistence) -> UndestroyResult<Record> {
        self.binding.ensure_current(engine)?;
        let source = self.binding.source().name.clone();
        let target = self.binding.target_class().name.clone();
        let key = self.record.value(&engine.primary_key(&target)?);

        let inserted = self
            .source_record(engine)
            .and_then(|row| engine.insert(&source, row))
            .map_err(|e| {
                warn!(model = %source, key = %display_key(&key), error = %e, "restore failed");
                UndestroyError::RestoreFailed {
                    model: source.clone(),
                    key: display_key(&key),
                    reason: e.to_string(),
                }
            })?;

        engine.destroy(&target, &self.record)?;

        info!(model = %source, key = %display_key(&key), "restored row");
        Ok(inserted)
    }
}

impl Binding {
    /// Archive row for `key`; `NotFound` when absent
    pub fn archived_find<'a>(
        &'a self,
        engine: &dyn Persistence,
        key: &Value,
    ) -> UndestroyResult<ArchivedRecord<'a>> {
        self.ensure_current(engine)?;
        let record = engine.find(&self.target_class().name, key)?;
        Ok(ArchivedRecord::new(self, record))
    }

    /// Every archive row, ordered by key
    pub fn archived_rows<'a>(&'a self, engine: &dyn Persistence) -> UndestroyResult<Vec<ArchivedRecord<'a>>> {
        self.archived_where(engine, &Record::new())
    }

    /// Archive rows matching all `criteria`
    pub fn archived_where<'a>(
        &'a self,
        engine: &dyn Persistence,
        criteria: &Record,
    ) -> UndestroyResult<Vec<ArchivedRecord<'a>>> {
        self.ensure_current(engine)?;
        Ok(engine
            .select(&self.target_class().name, criteria)?
            .into_iter()
            .map(|record| ArchivedRecord::new(self, record))
            .collect())
    }

    /// Restore archive rows by key.
    ///
    /// Every key is looked up before anything is restored, so an unknown key
    /// restores nothing.
    pub fn restore(&self, engine: &dyn Persistence, keys: &[Value]) -> UndestroyResult<Vec<Record>> {
        let archived = keys
            .iter()
            .map(|key| self.archived_find(engine, key))
            .collect::<UndestroyResult<Vec<_>>>()?;

        archived.into_iter().map(|a| a.restore(engine)).collect()
    }

    /// Restore every archive row matching all `criteria`
    pub fn restore_where(&self, engine: &dyn Persistence, criteria: &Record) -> UndestroyResult<Vec<Record>> {
        self.archived_where(engine, criteria)?
            .into_iter()
            .map(|a| a.restore(engine))
            .collect()
    }

    /// Restore one archive row already loaded by the caller
    pub fn restore_record(&self, engine: &dyn Persistence, record: Record) -> UndestroyResult<Record> {
        ArchivedRecord::new(self, record).restore(engine)
    }
}
