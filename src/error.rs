// src/error.rs
//! Error model for registry operations.

use crate::entry::TagId;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Empty or reserved name, type-less descriptor, or out-of-range variant.
    /// Nothing was mutated.
    #[error("invalid registration for tag '{name}': {reason}")]
    InvalidRegistration { name: String, reason: String },

    /// Ids were queried before the first solidify.
    #[error("tag ids are not final until the dictionary is solidified")]
    NotFinalized,

    #[error("the dictionary has already been solidified")]
    AlreadySolidified,

    #[error("tag '{0}' does not exist")]
    NotFound(String),

    /// A solidified dictionary still held an unassigned id after a rebake.
    #[error("inconsistent registry state: {0}")]
    InconsistentState(String),

    #[error("tag id {id} is already held by '{holder}'")]
    DuplicateId { id: TagId, holder: String },
}

impl RegistryError {
    pub(crate) fn invalid(name: &str, reason: impl Into<String>) -> Self {
        RegistryError::InvalidRegistration {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}
