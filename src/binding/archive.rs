//! Archive executors
//!
//! The executor performs the actual copy of a source row into the archive
//! table. [`Transfer`] is the default; anything implementing
//! [`ArchiveExecutor`] can be plugged in through `Config::internals`.

use tracing::debug;

use crate::config::Config;
use crate::error::{UndestroyError, UndestroyResult};
use crate::models::Record;
use crate::storage::Persistence;

/// Copies a source row into the archive table named by a config
pub trait ArchiveExecutor: Send + Sync {
    /// Short name for logs and `Debug` output
    fn name(&self) -> &'static str;

    /// Copy `source` into `target` (or a new row when `None`) and persist it.
    ///
    /// Must return `Err` when nothing was persisted.
    fn run(
        &self,
        engine: &dyn Persistence,
        config: &Config,
        source: &Record,
        target: Option<Record>,
    ) -> UndestroyResult<Record>;
}

/// Default executor: copies shared columns and stamps configured fields.
///
/// An existing archive row for the same key is overwritten in place.
#[derive(Debug, Default, Clone, Copy)]
pub struct Transfer;

impl ArchiveExecutor for Transfer {
    fn name(&self) -> &'static str {
        "transfer"
    }

    fn run(
        &self,
        engine: &dyn Persistence,
        config: &Config,
        source: &Record,
        target: Option<Record>,
    ) -> UndestroyResult<Record> {
        let source_class = config
            .source_class
            .as_deref()
            .ok_or_else(|| UndestroyError::InvalidConfig("source_class is not resolved".into()))?;
        let target_class = config
            .target_class
            .as_deref()
            .ok_or_else(|| UndestroyError::InvalidConfig("target_class is not resolved".into()))?;

        let source_pk = engine.primary_key(source_class)?;
        let target_pk = engine.primary_key(target_class)?;
        let columns = engine.columns(target_class)?;

        let existing = target.is_some();
        let mut row = target.unwrap_or_default();

        for (column, value) in source.iter() {
            if columns.contains(column) {
                row.set(column.clone(), value.clone());
            }
        }
        row.set(target_pk, source.value(&source_pk));

        if let Some(fields) = &config.fields {
            for (column, field) in fields {
                if columns.contains(column) {
                    row.set(column.clone(), field.evaluate());
                }
            }
        }

        debug!(
            source = source_class,
            target = target_class,
            overwrite = existing,
            "transferring row"
        );

        if existing {
            engine.update(target_class, row)
        } else {
            engine.insert(target_class, row)
        }
    }
}
