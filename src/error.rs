//! Custom error types for undestroy
//!
//! This module defines the error hierarchy for the archival layer and the
//! bundled table store using thiserror for ergonomic error definitions.

use thiserror::Error;

/// The main error type for undestroy operations
#[derive(Error, Debug)]
pub enum UndestroyError {
    /// Archival was enabled on something that is not a model
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Resolved archival configuration is unusable
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The archive executor could not persist the copy
    #[error("Failed to archive {model} {key}: {reason}")]
    ArchiveExecutionFailed {
        model: String,
        key: String,
        reason: String,
    },

    /// Writing the restored record back into the source table failed
    #[error("Failed to restore {model} {key}: {reason}")]
    RestoreFailed {
        model: String,
        key: String,
        reason: String,
    },

    /// Configuration file errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Row failed a table constraint
    #[error("Validation error: {0}")]
    Validation(String),

    /// Entity not found errors
    #[error("{entity_type} not found: {identifier}")]
    NotFound {
        entity_type: String,
        identifier: String,
    },

    /// Duplicate entity errors
    #[error("{entity_type} already exists: {identifier}")]
    Duplicate {
        entity_type: String,
        identifier: String,
    },

    /// Storage errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Rendering rows for output failed
    #[error("Export error: {0}")]
    Export(String),
}

impl UndestroyError {
    /// Create a "not found" error for a row of the given model
    pub fn not_found(entity_type: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: entity_type.into(),
            identifier: identifier.into(),
        }
    }

    /// Create a "not found" error for an unknown model name
    pub fn model_not_found(name: impl Into<String>) -> Self {
        Self::not_found("Model", name)
    }

    /// Create a "not found" error for an unknown table name
    pub fn table_not_found(name: impl Into<String>) -> Self {
        Self::not_found("Table", name)
    }

    /// Create a "duplicate" error for a row key
    pub fn duplicate(entity_type: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self::Duplicate {
            entity_type: entity_type.into(),
            identifier: identifier.into(),
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

/// Result type alias for undestroy operations
pub type UndestroyResult<T> = Result<T, UndestroyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = UndestroyError::InvalidConfig("no table".into());
        assert_eq!(err.to_string(), "Invalid configuration: no table");
    }

    #[test]
    fn test_not_found_error() {
        let err = UndestroyError::not_found("Widget", "5");
        assert_eq!(err.to_string(), "Widget not found: 5");
        assert!(err.is_not_found());
    }

    #[test]
    fn test_archive_failure_display() {
        let err = UndestroyError::ArchiveExecutionFailed {
            model: "Widget".into(),
            key: "5".into(),
            reason: "Table not found: archived_widgets".into(),
        };
        assert_eq!(
            err.to_string(),
            "Failed to archive Widget 5: Table not found: archived_widgets"
        );
    }

    #[test]
    fn test_restore_failure_display() {
        let err = UndestroyError::RestoreFailed {
            model: "Widget".into(),
            key: "5".into(),
            reason: "Widget already exists: 5".into(),
        };
        assert_eq!(
            err.to_string(),
            "Failed to restore Widget 5: Widget already exists: 5"
        );
    }
}
