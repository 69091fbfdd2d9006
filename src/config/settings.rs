//! Archival configuration for undestroy
//!
//! `Config` is the per-binding option set (source/target models, archive
//! table naming, stamped fields, the archive executor). `Settings` is what
//! lives in `undestroy.json`: process-wide defaults plus per-model overrides.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::paths::UndestroyPaths;
use crate::binding::archive::{ArchiveExecutor, Transfer};
use crate::error::UndestroyError;

/// Default prefix for derived archive table names
pub const DEFAULT_PREFIX: &str = "archive_";

/// Column stamped with the deletion time by default
pub const DELETED_AT: &str = "deleted_at";

/// Value written into an extra archive column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldValue {
    /// Current UTC time, RFC 3339
    Now,
    /// Fixed JSON value
    Literal(Value),
}

impl FieldValue {
    /// Produce the value to store
    pub fn evaluate(&self) -> Value {
        match self {
            Self::Now => Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
            Self::Literal(value) => value.clone(),
        }
    }
}

/// Runtime-only collaborators; never serialized
#[derive(Clone)]
pub struct Internals {
    /// Executor that copies a source row into the archive table
    pub archive: Arc<dyn ArchiveExecutor>,
}

impl Default for Internals {
    fn default() -> Self {
        Self {
            archive: Arc::new(Transfer),
        }
    }
}

impl fmt::Debug for Internals {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Internals")
            .field("archive", &self.archive.name())
            .finish()
    }
}

/// Archival options for one binding
///
/// Every option is optional so that configs can be layered: merging takes
/// the override's value for each option it sets.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Model whose rows are archived on destroy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_class: Option<String>,

    /// Model holding archived rows; synthesized when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_class: Option<String>,

    /// Archive table; derived from the prefix and source table when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_name: Option<String>,

    /// Prepended to the source table name when deriving `table_name`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,

    /// Base model for synthesized archive models
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abstract_class: Option<String>,

    /// Extra columns stamped onto archive rows
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<BTreeMap<String, FieldValue>>,

    #[serde(skip)]
    pub internals: Option<Internals>,
}

impl Config {
    /// Built-in process defaults
    pub fn defaults() -> Self {
        let mut fields = BTreeMap::new();
        fields.insert(DELETED_AT.to_string(), FieldValue::Now);

        Self {
            prefix: Some(DEFAULT_PREFIX.to_string()),
            fields: Some(fields),
            internals: Some(Internals::default()),
            ..Self::default()
        }
    }

    /// Shallow merge: every option set in `overrides` replaces ours
    pub fn merge(&self, overrides: &Config) -> Config {
        Config {
            source_class: overrides.source_class.clone().or_else(|| self.source_class.clone()),
            target_class: overrides.target_class.clone().or_else(|| self.target_class.clone()),
            table_name: overrides.table_name.clone().or_else(|| self.table_name.clone()),
            prefix: overrides.prefix.clone().or_else(|| self.prefix.clone()),
            abstract_class: overrides
                .abstract_class
                .clone()
                .or_else(|| self.abstract_class.clone()),
            fields: overrides.fields.clone().or_else(|| self.fields.clone()),
            internals: overrides.internals.clone().or_else(|| self.internals.clone()),
        }
    }

    /// Layer `overrides` on top of `defaults`
    pub fn resolve(defaults: &Config, overrides: &Config) -> Config {
        defaults.merge(overrides)
    }

    /// Builder-style prefix setter
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Builder-style table name setter
    pub fn with_table_name(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = Some(table_name.into());
        self
    }

    /// Builder-style target model setter
    pub fn with_target_class(mut self, target_class: impl Into<String>) -> Self {
        self.target_class = Some(target_class.into());
        self
    }

    /// Builder-style base model setter
    pub fn with_abstract_class(mut self, abstract_class: impl Into<String>) -> Self {
        self.abstract_class = Some(abstract_class.into());
        self
    }

    /// Builder-style executor setter
    pub fn with_executor(mut self, archive: Arc<dyn ArchiveExecutor>) -> Self {
        self.internals = Some(Internals { archive });
        self
    }

    /// Builder-style extra column setter
    pub fn with_field(mut self, column: impl Into<String>, value: FieldValue) -> Self {
        self.fields
            .get_or_insert_with(BTreeMap::new)
            .insert(column.into(), value);
        self
    }

    /// Apply the prefix to a table name
    pub fn prefix_table_name(&self, name: &str) -> String {
        format!("{}{}", self.prefix.as_deref().unwrap_or(""), name)
    }

    /// The configured executor, falling back to [`Transfer`]
    pub fn executor(&self) -> Arc<dyn ArchiveExecutor> {
        self.internals
            .as_ref()
            .map(|i| i.archive.clone())
            .unwrap_or_else(|| Arc::new(Transfer))
    }
}

/// Archival settings stored in `undestroy.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Schema version for migration support
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    /// Overrides applied on top of the built-in defaults for every model
    #[serde(default)]
    pub defaults: Config,

    /// Models with archival enabled, and their own overrides
    #[serde(default)]
    pub models: BTreeMap<String, Config>,
}

fn default_schema_version() -> u32 {
    1
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            defaults: Config::default(),
            models: BTreeMap::new(),
        }
    }
}

impl Settings {
    /// Process defaults: built-ins overlaid with the file's `defaults`
    pub fn process_defaults(&self) -> Config {
        Config::defaults().merge(&self.defaults)
    }

    /// Load settings from disk, or fall back to defaults if the file doesn't exist
    pub fn load_or_create(paths: &UndestroyPaths) -> Result<Self, UndestroyError> {
        let settings_path = paths.settings_file();

        if settings_path.exists() {
            let contents = std::fs::read_to_string(&settings_path).map_err(|e| {
                UndestroyError::Io(format!("Failed to read settings file: {}", e))
            })?;

            let settings: Settings = serde_json::from_str(&contents).map_err(|e| {
                UndestroyError::Config(format!("Failed to parse settings file: {}", e))
            })?;

            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to disk
    pub fn save(&self, paths: &UndestroyPaths) -> Result<(), UndestroyError> {
        paths.ensure_directories()?;

        let contents = serde_json::to_string_pretty(self).map_err(|e| {
            UndestroyError::Config(format!("Failed to serialize settings: {}", e))
        })?;

        std::fs::write(paths.settings_file(), contents)
            .map_err(|e| UndestroyError::Io(format!("Failed to write settings file: {}", e)))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_builtin_defaults() {
        let config = Config::defaults();
        assert_eq!(config.prefix.as_deref(), Some("archive_"));
        assert_eq!(
            config.fields.as_ref().unwrap().get(DELETED_AT),
            Some(&FieldValue::Now)
        );
        assert_eq!(config.executor().name(), "transfer");
    }

    #[test]
    fn test_merge_overrides_win() {
        let defaults = Config::defaults();
        let overrides = Config::default()
            .with_prefix("archived_")
            .with_abstract_class("ApplicationRecord");

        let merged = Config::resolve(&defaults, &overrides);
        assert_eq!(merged.prefix.as_deref(), Some("archived_"));
        assert_eq!(merged.abstract_class.as_deref(), Some("ApplicationRecord"));
        // Untouched options fall through
        assert!(merged.fields.is_some());
        assert!(merged.internals.is_some());
    }

    #[test]
    fn test_merge_is_shallow_for_fields() {
        let defaults = Config::defaults();
        let overrides =
            Config::default().with_field("reason", FieldValue::Literal(json!("cleanup")));

        let merged = defaults.merge(&overrides);
        let fields = merged.fields.unwrap();
        assert_eq!(fields.len(), 1);
        assert!(fields.contains_key("reason"));
        assert!(!fields.contains_key(DELETED_AT));
    }

    #[test]
    fn test_prefix_table_name() {
        let config = Config::default().with_prefix("archived_");
        assert_eq!(config.prefix_table_name("widgets"), "archived_widgets");
        assert_eq!(Config::default().prefix_table_name("widgets"), "widgets");
    }

    #[test]
    fn test_field_value_evaluate() {
        assert_eq!(FieldValue::Literal(json!(3)).evaluate(), json!(3));
        let now = FieldValue::Now.evaluate();
        let stamp = now.as_str().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(stamp).is_ok());
    }

    #[test]
    fn test_config_deserialize() {
        let config: Config = serde_json::from_str(
            r#"{"prefix": "old_", "fields": {"deleted_at": "now", "note": {"literal": "x"}}}"#,
        )
        .unwrap();
        assert_eq!(config.prefix.as_deref(), Some("old_"));
        let fields = config.fields.unwrap();
        assert_eq!(fields["note"], FieldValue::Literal(json!("x")));
        assert!(config.internals.is_none());
    }

    #[test]
    fn test_settings_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let paths = UndestroyPaths::with_base_dir(temp_dir.path().to_path_buf());

        let mut settings = Settings::default();
        settings.defaults.prefix = Some("archived_".into());
        settings
            .models
            .insert("Widget".into(), Config::default().with_table_name("widget_graveyard"));
        settings.save(&paths).unwrap();

        let loaded = Settings::load_or_create(&paths).unwrap();
        assert_eq!(loaded.process_defaults().prefix.as_deref(), Some("archived_"));
        assert_eq!(
            loaded.models["Widget"].table_name.as_deref(),
            Some("widget_graveyard")
        );
    }

    #[test]
    fn test_missing_settings_file_gives_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let paths = UndestroyPaths::with_base_dir(temp_dir.path().to_path_buf());

        let settings = Settings::load_or_create(&paths).unwrap();
        assert_eq!(settings.schema_version, 1);
        assert!(settings.models.is_empty());
        assert_eq!(settings.process_defaults().prefix.as_deref(), Some("archive_"));
    }
}
