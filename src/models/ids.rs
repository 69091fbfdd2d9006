//! Binding identifiers
//!
//! A synthesized archive model carries the id of the binding that built it;
//! a re-attached model gets a new one.

use std::fmt;

use uuid::Uuid;

/// Identifies one Binding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindingId(Uuid);

impl BindingId {
    /// Create a new random ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for BindingId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BindingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bnd-{}", &self.0.simple().to_string()[..8])
    }
}
