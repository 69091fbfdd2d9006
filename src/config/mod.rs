//! Configuration module for undestroy
//!
//! This module provides configuration management including:
//! - Data directory resolution
//! - Archival options and their layering
//! - The persisted archival settings file

pub mod paths;
pub mod settings;

pub use paths::UndestroyPaths;
pub use settings::{Config, FieldValue, Internals, Settings};
