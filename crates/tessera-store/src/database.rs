//! [`ObjectDatabase`]: a set of tables sharing one stack of undo sessions.
use std::any::TypeId;
use std::collections::HashMap;
use std::ops::{Deref, DerefMut};

use tracing::{debug, error};

use crate::error::StoreError;
use crate::key::IndexKey;
use crate::object::{Object, ObjectId};
use crate::table::{AnyTable, Table};

/// Every registered table plus the undo stack spanning them.
///
/// Mutations made while no session is open are permanent. Each session
/// pushes one frame on every table; `undo`, `squash` and `commit` act on all
/// tables together so the database never sees a partial rollback.
#[derive(Default)]
pub struct ObjectDatabase {
    tables: Vec<Box<dyn AnyTable>>,
    by_type: HashMap<TypeId, usize>,
    revision: i64,
    depth: usize,
}

impl std::fmt::Debug for ObjectDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectDatabase")
            .field("tables", &self.tables.iter().map(|t| t.type_name()).collect::<Vec<_>>())
            .field("revision", &self.revision)
            .field("undo_depth", &self.depth)
            .finish()
    }
}

impl ObjectDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the table for `T`. Tables must be added before any session opens.
    pub fn add_table<T: Object>(&mut self) -> Result<(), StoreError> {
        let type_id = TypeId::of::<T>();
        if self.by_type.contains_key(&type_id) {
            return Err(StoreError::DuplicateTable(T::TYPE_NAME));
        }
        let mut table = Table::<T>::new();
        for _ in 0..self.depth {
            table.start_undo(self.revision);
        }
        self.by_type.insert(type_id, self.tables.len());
        self.tables.push(Box::new(table));
        Ok(())
    }

    pub fn table<T: Object>(&self) -> Result<&Table<T>, StoreError> {
        self.by_type
            .get(&TypeId::of::<T>())
            .and_then(|i| self.tables.get(*i))
            .and_then(|t| t.as_any().downcast_ref::<Table<T>>())
            .ok_or(StoreError::UnknownTable(T::TYPE_NAME))
    }

    fn table_mut<T: Object>(&mut self) -> Result<&mut Table<T>, StoreError> {
        self.by_type
            .get(&TypeId::of::<T>())
            .and_then(|i| self.tables.get_mut(*i))
            .and_then(|t| t.as_any_mut().downcast_mut::<Table<T>>())
            .ok_or(StoreError::UnknownTable(T::TYPE_NAME))
    }

    // ---- Mutations ----

    pub fn create<T: Object>(&mut self, init: impl FnOnce(&mut T)) -> Result<&T, StoreError> {
        self.table_mut::<T>()?.create(init)
    }

    pub fn modify<T: Object>(&mut self, id: ObjectId, mutate: impl FnOnce(&mut T)) -> Result<&T, StoreError> {
        self.table_mut::<T>()?.modify(id, mutate)
    }

    pub fn remove<T: Object>(&mut self, id: ObjectId) -> Result<T, StoreError> {
        self.table_mut::<T>()?.remove(id)
    }

    // ---- Lookups ----

    pub fn get<T: Object>(&self, id: ObjectId) -> Result<&T, StoreError> {
        self.table::<T>()?.get(id)
    }

    pub fn find<T: Object>(&self, id: ObjectId) -> Result<Option<&T>, StoreError> {
        Ok(self.table::<T>()?.find(id))
    }

    pub fn find_by<T: Object>(&self, index: &str, key: &IndexKey) -> Result<Option<&T>, StoreError> {
        self.table::<T>()?.find_by(index, key)
    }

    pub fn get_by<T: Object>(&self, index: &str, key: &IndexKey) -> Result<&T, StoreError> {
        self.table::<T>()?.get_by(index, key)
    }

    pub fn first_by<T: Object>(&self, index: &str) -> Result<Option<&T>, StoreError> {
        self.table::<T>()?.first_by(index)
    }

    // ---- Undo primitives ----

    /// Revision of the newest session, or of the last commit.
    pub fn revision(&self) -> i64 {
        self.revision
    }

    /// Set the base revision. Only valid with no session open.
    pub fn set_revision(&mut self, revision: i64) -> Result<(), StoreError> {
        if self.depth > 0 {
            return Err(StoreError::SessionsOpen(self.depth));
        }
        self.revision = revision;
        Ok(())
    }

    pub fn undo_depth(&self) -> usize {
        self.depth
    }

    /// Open a session at `revision() + 1` and return the new revision.
    pub fn begin_undo(&mut self) -> i64 {
        self.revision += 1;
        self.depth += 1;
        for table in &mut self.tables {
            table.start_undo(self.revision);
        }
        self.revision
    }

    /// Roll back the newest session.
    pub fn undo(&mut self) -> Result<(), StoreError> {
        if self.depth == 0 {
            return Err(StoreError::NoSession);
        }
        for table in &mut self.tables {
            table.undo()?;
        }
        self.depth -= 1;
        self.revision -= 1;
        Ok(())
    }

    /// Merge the newest session into the one below it.
    pub fn squash(&mut self) -> Result<(), StoreError> {
        if self.depth == 0 {
            return Err(StoreError::NoSession);
        }
        for table in &mut self.tables {
            table.squash()?;
        }
        self.depth -= 1;
        self.revision -= 1;
        Ok(())
    }

    /// Discard undo history for sessions at or below `revision`. Those
    /// changes can no longer be rolled back.
    pub fn commit(&mut self, revision: i64) {
        let oldest = self.revision - self.depth as i64 + 1;
        let dropped = (revision - oldest + 1).clamp(0, self.depth as i64) as usize;
        for table in &mut self.tables {
            table.commit(revision);
        }
        self.depth -= dropped;
        debug!(revision, dropped, remaining = self.depth, "committed undo history");
    }

    /// RAII session: rolled back on drop unless pushed or squashed.
    pub fn start_undo_session(&mut self) -> UndoSession<'_> {
        let revision = self.begin_undo();
        UndoSession { db: self, revision, open: true }
    }
}

/// Guard over one undo session.
///
/// Dereferences to the database so callers mutate through it. Dropping an
/// open guard rolls the session back.
pub struct UndoSession<'a> {
    db: &'a mut ObjectDatabase,
    revision: i64,
    open: bool,
}

impl UndoSession<'_> {
    pub fn revision(&self) -> i64 {
        self.revision
    }

    /// Keep the session on the stack so it can still be undone later.
    pub fn push(mut self) {
        self.open = false;
    }

    /// Fold the session into its parent.
    pub fn squash(mut self) -> Result<(), StoreError> {
        self.open = false;
        self.db.squash()
    }

    pub fn undo(mut self) -> Result<(), StoreError> {
        self.open = false;
        self.db.undo()
    }
}

impl Deref for UndoSession<'_> {
    type Target = ObjectDatabase;

    fn deref(&self) -> &ObjectDatabase {
        self.db
    }
}

impl DerefMut for UndoSession<'_> {
    fn deref_mut(&mut self) -> &mut ObjectDatabase {
        self.db
    }
}

impl Drop for UndoSession<'_> {
    fn drop(&mut self) {
        if !self.open || self.db.revision() != self.revision {
            return;
        }
        if let Err(e) = self.db.undo() {
            error!(error = %e, revision = self.revision, "failed to roll back undo session");
        }
    }
}
