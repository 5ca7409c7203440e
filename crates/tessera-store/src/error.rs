//! Error types for the object store.
//!
//! All of these signal a programming error in the caller or corrupted state,
//! never a business-rule failure.
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("{type_name} not found: {key}")] NotFound { type_name: &'static str, key: String },
    #[error("unique index {index} of {type_name} already holds {key}")] UniqueViolation { type_name: &'static str, index: &'static str, key: String },
    #[error("no table registered for {0}")] UnknownTable(&'static str),
    #[error("{type_name} has no index named {index}")] UnknownIndex { type_name: &'static str, index: String },
    #[error("table for {0} registered twice")] DuplicateTable(&'static str),
    #[error("no undo session is open")] NoSession,
    #[error("{0} undo sessions are still open")] SessionsOpen(usize),
    #[error("index {index} of {type_name} is inconsistent with the primary store")] Inconsistent { type_name: &'static str, index: &'static str },
}
