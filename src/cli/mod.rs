//! CLI command handlers
//!
//! This module contains the implementation of CLI commands,
//! bridging the clap argument parsing with the archival context.

pub mod records;

pub use records::{handle_record_command, parse_key, RecordCommands};

use std::sync::Arc;

use tracing::debug;

use crate::config::{Settings, UndestroyPaths};
use crate::error::UndestroyResult;
use crate::registry::Undestroy;
use crate::storage::Storage;

/// Open the store under `paths` and attach every model listed in the settings
pub fn open_context(paths: &UndestroyPaths) -> UndestroyResult<Undestroy> {
    let storage = Storage::open(paths.clone())?;
    let settings = Settings::load_or_create(paths)?;

    let undestroy = Undestroy::with_defaults(Arc::new(storage), settings.process_defaults());
    for (model, options) in &settings.models {
        debug!(model = %model, "attaching from settings");
        undestroy.undestroy(model, options)?;
    }

    Ok(undestroy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::models::{ModelType, Record, TableSchema};
    use crate::storage::Persistence;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_open_context_attaches_configured_models() {
        let temp_dir = TempDir::new().unwrap();
        let paths = UndestroyPaths::with_base_dir(temp_dir.path().to_path_buf());

        {
            let storage = Storage::open(paths.clone()).unwrap();
            storage
                .create_table(TableSchema::new("widgets", "id", ["id", "name"]))
                .unwrap();
            storage
                .create_table(TableSchema::new("archived_widgets", "id", ["id", "name", "deleted_at"]))
                .unwrap();
            storage.define_model(ModelType::new("Widget", "widgets")).unwrap();
            storage
                .insert("Widget", Record::new().with("id", 5).with("name", "sprocket"))
                .unwrap();
        }

        let mut settings = Settings::default();
        settings.defaults.prefix = Some("archived_".into());
        settings.models.insert("Widget".into(), Config::default());
        settings.save(&paths).unwrap();

        let undestroy = open_context(&paths).unwrap();
        assert!(undestroy.is_attached("Widget"));

        let widget = undestroy.engine().find("Widget", &json!(5)).unwrap();
        undestroy.destroy("Widget", &widget).unwrap();

        // Archive survives a reopen
        let reopened = open_context(&paths).unwrap();
        assert_eq!(reopened.archived_rows("Widget").unwrap().len(), 1);
    }
}
