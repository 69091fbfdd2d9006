//! Archive model synthesis
//!
//! Builds the archive counterpart of a source model from a resolved config.
//! Building has no side effects; registering puts the model in the engine's
//! catalog.

use tracing::debug;

use crate::config::Config;
use crate::error::{UndestroyError, UndestroyResult};
use crate::models::{BindingId, ModelType};
use crate::storage::Persistence;

/// Name given to a synthesized archive model
pub fn target_class_name(source: &str) -> String {
    format!("Archived{}", source)
}

/// Build the archive model for `source` without touching the catalog.
///
/// The table itself is not checked here; a missing archive table surfaces
/// from the engine the first time the model is used.
pub fn build(
    engine: &dyn Persistence,
    binding: BindingId,
    source: &ModelType,
    config: &Config,
) -> UndestroyResult<ModelType> {
    let table_name = match config.table_name.as_deref() {
        Some(table) if !table.is_empty() => table.to_string(),
        _ => {
            return Err(UndestroyError::InvalidConfig(format!(
                "no archive table name for '{}': set table_name",
                source.name
            )))
        }
    };

    if let Some(base) = &config.abstract_class {
        if !engine.is_model(base) {
            return Err(UndestroyError::InvalidConfig(format!(
                "abstract_class '{}' is not a model",
                base
            )));
        }
    }

    let name = target_class_name(&source.name);
    if let Ok(existing) = engine.model(&name) {
        if !existing.is_archive() {
            return Err(UndestroyError::InvalidConfig(format!(
                "cannot synthesize '{}': a model with that name already exists",
                name
            )));
        }
    }

    let mut target = ModelType::new(name, table_name);
    target.base = config.abstract_class.clone();
    target.archive_of = Some(binding);
    Ok(target)
}

/// Register a built archive model, replacing any earlier one of that name
pub fn register(engine: &dyn Persistence, target: &ModelType) -> UndestroyResult<()> {
    debug!(
        model = %target.name,
        table = ?target.table_name,
        base = ?target.base,
        "synthesized archive model"
    );
    engine.define_model(target.clone())
}
