//! Core data models for undestroy
//!
//! Rows, table definitions, model descriptions and the IDs that tie
//! archive models back to their bindings.

pub mod ids;
pub mod record;
pub mod schema;

pub use ids::BindingId;
pub use record::{display_key, Record};
pub use schema::{ModelType, TableSchema};
