//! undestroy - soft delete by archival
//!
//! Before a row of an archived model is deleted, a copy is written into a
//! parallel archive table. Archived rows can later be restored into the
//! source table with their primary key intact.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `config`: Data directory paths and archival options
//! - `error`: Custom error types
//! - `models`: Rows, table and model definitions
//! - `storage`: The persistence engine trait and a JSON file table store
//! - `binding`: Per-model archival binding, archive executors, archive model
//!   synthesis and restore
//! - `registry`: The `Undestroy` context that attaches bindings to models
//! - `display`, `cli`: Terminal front end
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use undestroy::{Config, Persistence, Storage, Undestroy};
//!
//! let storage = Arc::new(Storage::in_memory());
//! let undestroy = Undestroy::new(storage.clone());
//! undestroy.undestroy("Widget", &Config::default().with_prefix("archived_"))?;
//!
//! let widget = storage.find("Widget", &5.into())?;
//! undestroy.destroy("Widget", &widget)?;       // archived, then deleted
//! undestroy.restore("Widget", &[5.into()])?;   // back in `widgets`
//! ```

pub mod binding;
pub mod cli;
pub mod config;
pub mod display;
pub mod error;
pub mod models;
pub mod registry;
pub mod storage;

pub use binding::{ArchiveExecutor, ArchivedRecord, Binding, Transfer};
pub use config::{Config, FieldValue, Settings, UndestroyPaths};
pub use error::{UndestroyError, UndestroyResult};
pub use models::{ModelType, Record, TableSchema};
pub use registry::Undestroy;
pub use storage::{Persistence, Storage};
