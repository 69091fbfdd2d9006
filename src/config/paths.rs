//! Path management for undestroy
//!
//! Resolves where the table store keeps its schema, table files and archival
//! settings.
//!
//! ## Path Resolution Order
//!
//! 1. `UNDESTROY_DATA_DIR` environment variable (if set)
//! 2. Unix (Linux/macOS): `$XDG_CONFIG_HOME/undestroy` or `~/.config/undestroy`
//! 3. Windows: `%APPDATA%\undestroy`

use std::path::PathBuf;

use crate::error::UndestroyError;

/// Environment variable overriding the base directory
pub const DATA_DIR_ENV: &str = "UNDESTROY_DATA_DIR";

/// Manages all paths used by undestroy
#[derive(Debug, Clone)]
pub struct UndestroyPaths {
    base_dir: PathBuf,
}

impl UndestroyPaths {
    /// Create a new UndestroyPaths instance
    ///
    /// # Errors
    ///
    /// Returns an error if no base directory can be determined.
    pub fn new() -> Result<Self, UndestroyError> {
        let base_dir = if let Ok(custom) = std::env::var(DATA_DIR_ENV) {
            PathBuf::from(custom)
        } else {
            resolve_default_path()?
        };

        Ok(Self { base_dir })
    }

    /// Create UndestroyPaths with a custom base directory (useful for testing)
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Get the base directory
    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    /// Get the data directory holding one JSON file per table
    pub fn data_dir(&self) -> PathBuf {
        self.base_dir.join("data")
    }

    /// Get the path to the table and model definitions
    pub fn schema_file(&self) -> PathBuf {
        self.base_dir.join("schema.json")
    }

    /// Get the path to the archival settings
    pub fn settings_file(&self) -> PathBuf {
        self.base_dir.join("undestroy.json")
    }

    /// Get the path to a table's rows
    pub fn table_file(&self, table: &str) -> PathBuf {
        self.data_dir().join(format!("{}.json", table))
    }

    /// Ensure the base and data directories exist
    pub fn ensure_directories(&self) -> Result<(), UndestroyError> {
        std::fs::create_dir_all(&self.base_dir)
            .map_err(|e| UndestroyError::Io(format!("Failed to create base directory: {}", e)))?;

        std::fs::create_dir_all(self.data_dir())
            .map_err(|e| UndestroyError::Io(format!("Failed to create data directory: {}", e)))?;

        Ok(())
    }

    /// Check if a schema has been written
    pub fn is_initialized(&self) -> bool {
        self.schema_file().exists()
    }
}

#[cfg(not(windows))]
fn resolve_default_path() -> Result<PathBuf, UndestroyError> {
    let config_base = match std::env::var("XDG_CONFIG_HOME") {
        Ok(xdg) => PathBuf::from(xdg),
        Err(_) => {
            let home = std::env::var("HOME").map_err(|_| {
                UndestroyError::Config("Could not determine HOME directory".into())
            })?;
            PathBuf::from(home).join(".config")
        }
    };
    Ok(config_base.join("undestroy"))
}

#[cfg(windows)]
fn resolve_default_path() -> Result<PathBuf, UndestroyError> {
    let appdata = std::env::var("APPDATA")
        .map_err(|_| UndestroyError::Config("Could not determine APPDATA directory".into()))?;
    Ok(PathBuf::from(appdata).join("undestroy"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_custom_base_dir() {
        let temp_dir = TempDir::new().unwrap();
        let paths = UndestroyPaths::with_base_dir(temp_dir.path().to_path_buf());

        assert_eq!(paths.base_dir(), temp_dir.path());
        assert_eq!(paths.data_dir(), temp_dir.path().join("data"));
        assert_eq!(
            paths.table_file("archived_widgets"),
            temp_dir.path().join("data").join("archived_widgets.json")
        );
    }

    #[test]
    fn test_ensure_directories() {
        let temp_dir = TempDir::new().unwrap();
        let paths = UndestroyPaths::with_base_dir(temp_dir.path().join("nested"));

        paths.ensure_directories().unwrap();

        assert!(paths.data_dir().exists());
        assert!(!paths.is_initialized());
    }

    #[test]
    fn test_file_paths() {
        let temp_dir = TempDir::new().unwrap();
        let paths = UndestroyPaths::with_base_dir(temp_dir.path().to_path_buf());

        assert_eq!(paths.schema_file(), temp_dir.path().join("schema.json"));
        assert_eq!(paths.settings_file(), temp_dir.path().join("undestroy.json"));
    }
}
