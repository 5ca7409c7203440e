//! # tessera-store — Versioned multi-index object store.
//!
//! One [`Table`] per object type holds the primary `id -> object` map plus
//! any number of ordered secondary indices. Every mutation updates all of
//! them together. [`ObjectDatabase`] groups tables and stacks undo sessions
//! across all of them: rolling back a session restores every table, index
//! and id counter to the exact state it had when the session opened.

pub mod database;
pub mod error;
pub mod key;
pub mod object;
pub mod table;

pub use database::{ObjectDatabase, UndoSession};
pub use error::StoreError;
pub use key::{desc, IndexKey, KeyPart};
pub use object::{IndexSpec, Object, ObjectId};
pub use table::Table;
