//! A single object type's primary store, secondary indices and undo log.
//!
//! Each mutation captures the pre-mutation payload before it is applied: the
//! new id for a create, a full copy for a modify or remove. Rolling back a
//! frame replays its log in reverse.
use std::any::Any;
use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::ops::Bound;

use crate::error::StoreError;
use crate::key::IndexKey;
use crate::object::{IndexSpec, Object, ObjectId};

#[derive(Clone, Debug, PartialEq)]
enum UndoEntry<T> {
    Created(ObjectId),
    Modified(T),
    Removed(T),
}

#[derive(Clone, Debug)]
struct UndoFrame<T> {
    revision: i64,
    next_id: ObjectId,
    log: Vec<UndoEntry<T>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct SecondaryIndex {
    name: &'static str,
    unique: bool,
    entries: BTreeMap<IndexKey, ObjectId>,
}

#[derive(Clone)]
pub struct Table<T: Object> {
    objects: BTreeMap<ObjectId, T>,
    specs: Vec<IndexSpec<T>>,
    indices: Vec<SecondaryIndex>,
    next_id: ObjectId,
    undo: VecDeque<UndoFrame<T>>,
}

impl<T: Object> fmt::Debug for Table<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Table")
            .field("type", &T::TYPE_NAME)
            .field("len", &self.objects.len())
            .field("next_id", &self.next_id)
            .field("undo_depth", &self.undo.len())
            .finish()
    }
}

/// Two tables are equal when their objects, every index and the id counter
/// match. Undo history is not compared.
impl<T: Object> PartialEq for Table<T> {
    fn eq(&self, other: &Self) -> bool {
        self.next_id == other.next_id && self.objects == other.objects && self.indices == other.indices
    }
}

impl<T: Object> Default for Table<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Object> Table<T> {
    pub fn new() -> Self {
        let specs = T::indices();
        let indices = specs
            .iter()
            .map(|spec| SecondaryIndex { name: spec.name, unique: spec.unique, entries: BTreeMap::new() })
            .collect();
        Self { objects: BTreeMap::new(), specs, indices, next_id: 0, undo: VecDeque::new() }
    }

    fn entry_key(spec: &IndexSpec<T>, obj: &T) -> IndexKey {
        let key = (spec.key)(obj);
        if spec.unique { key } else { key.with(obj.id()) }
    }

    fn not_found(id: ObjectId) -> StoreError {
        StoreError::NotFound { type_name: T::TYPE_NAME, key: format!("id {id}") }
    }

    fn index(&self, name: &str) -> Result<&SecondaryIndex, StoreError> {
        self.indices.iter().find(|index| index.name == name).ok_or_else(|| StoreError::UnknownIndex {
            type_name: T::TYPE_NAME,
            index: name.to_string(),
        })
    }

    fn check_unique(&self, obj: &T, allow: Option<ObjectId>) -> Result<(), StoreError> {
        for (spec, index) in self.specs.iter().zip(&self.indices) {
            if !spec.unique {
                continue;
            }
            let key = Self::entry_key(spec, obj);
            if let Some(existing) = index.entries.get(&key) {
                if Some(*existing) != allow {
                    return Err(StoreError::UniqueViolation {
                        type_name: T::TYPE_NAME,
                        index: spec.name,
                        key: key.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    // ---- Raw mutations (no undo recording) ----

    fn insert_raw(&mut self, obj: T) -> Result<(), StoreError> {
        if self.objects.contains_key(&obj.id()) {
            return Err(StoreError::UniqueViolation {
                type_name: T::TYPE_NAME,
                index: "id",
                key: obj.id().to_string(),
            });
        }
        self.check_unique(&obj, None)?;
        for (spec, index) in self.specs.iter().zip(self.indices.iter_mut()) {
            index.entries.insert(Self::entry_key(spec, &obj), obj.id());
        }
        self.objects.insert(obj.id(), obj);
        Ok(())
    }

    fn remove_raw(&mut self, id: ObjectId) -> Result<T, StoreError> {
        let obj = self.objects.remove(&id).ok_or_else(|| Self::not_found(id))?;
        for (spec, index) in self.specs.iter().zip(self.indices.iter_mut()) {
            index.entries.remove(&Self::entry_key(spec, &obj));
        }
        Ok(obj)
    }

    /// Swap in `updated`, re-threading only the index entries whose key changed.
    fn replace_raw(&mut self, updated: T) -> Result<T, StoreError> {
        let id = updated.id();
        self.check_unique(&updated, Some(id))?;
        let current = self.objects.get(&id).ok_or_else(|| Self::not_found(id))?;
        for (spec, index) in self.specs.iter().zip(self.indices.iter_mut()) {
            let old_key = Self::entry_key(spec, current);
            let new_key = Self::entry_key(spec, &updated);
            if old_key != new_key {
                index.entries.remove(&old_key);
                index.entries.insert(new_key, id);
            }
        }
        self.objects.insert(id, updated).ok_or_else(|| Self::not_found(id))
    }

    fn record(&mut self, entry: UndoEntry<T>) {
        if let Some(frame) = self.undo.back_mut() {
            frame.log.push(entry);
        }
    }

    // ---- Mutations ----

    /// Allocate the next id, run `init` on a blank object and insert it.
    ///
    /// # Errors
    ///
    /// [`StoreError::UniqueViolation`] if a unique index already holds the
    /// new object's key. Nothing is inserted and the id is not consumed.
    pub fn create(&mut self, init: impl FnOnce(&mut T)) -> Result<&T, StoreError> {
        let id = self.next_id;
        let mut obj = T::default();
        init(&mut obj);
        obj.set_id(id);
        self.insert_raw(obj)?;
        self.next_id += 1;
        self.record(UndoEntry::Created(id));
        self.get(id)
    }

    /// Apply `mutate` to a copy of the object and swap it in.
    ///
    /// The id is restored after `mutate` runs, so it cannot be changed.
    ///
    /// # Errors
    ///
    /// - [`StoreError::NotFound`] if `id` is not live.
    /// - [`StoreError::UniqueViolation`] if the mutated keys collide. The
    ///   stored object is left untouched.
    pub fn modify(&mut self, id: ObjectId, mutate: impl FnOnce(&mut T)) -> Result<&T, StoreError> {
        let mut updated = self.get(id)?.clone();
        mutate(&mut updated);
        updated.set_id(id);
        let prior = self.replace_raw(updated)?;
        self.record(UndoEntry::Modified(prior));
        self.get(id)
    }

    /// Erase the object from the primary store and every index.
    pub fn remove(&mut self, id: ObjectId) -> Result<T, StoreError> {
        let obj = self.remove_raw(id)?;
        self.record(UndoEntry::Removed(obj.clone()));
        Ok(obj)
    }

    // ---- Undo ----

    pub(crate) fn start_undo(&mut self, revision: i64) {
        self.undo.push_back(UndoFrame { revision, next_id: self.next_id, log: Vec::new() });
    }

    pub(crate) fn undo(&mut self) -> Result<(), StoreError> {
        let frame = self.undo.pop_back().ok_or(StoreError::NoSession)?;
        for entry in frame.log.into_iter().rev() {
            match entry {
                UndoEntry::Created(id) => {
                    self.remove_raw(id)?;
                }
                UndoEntry::Modified(prior) => {
                    self.replace_raw(prior)?;
                }
                UndoEntry::Removed(obj) => self.insert_raw(obj)?,
            }
        }
        self.next_id = frame.next_id;
        Ok(())
    }

    /// Fold the newest frame into its parent. Without a parent the changes
    /// simply become permanent.
    pub(crate) fn squash(&mut self) -> Result<(), StoreError> {
        let frame = self.undo.pop_back().ok_or(StoreError::NoSession)?;
        if let Some(parent) = self.undo.back_mut() {
            parent.log.extend(frame.log);
        }
        Ok(())
    }

    /// Forget every frame at or below `revision`.
    pub(crate) fn commit(&mut self, revision: i64) {
        while self.undo.front().is_some_and(|frame| frame.revision <= revision) {
            self.undo.pop_front();
        }
    }

    pub fn undo_depth(&self) -> usize {
        self.undo.len()
    }

    // ---- Queries ----

    /// # Errors
    ///
    /// [`StoreError::NotFound`] if `id` is not live.
    pub fn get(&self, id: ObjectId) -> Result<&T, StoreError> {
        self.objects.get(&id).ok_or_else(|| Self::not_found(id))
    }

    pub fn find(&self, id: ObjectId) -> Option<&T> {
        self.objects.get(&id)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Next id `create` will assign.
    pub fn next_id(&self) -> ObjectId {
        self.next_id
    }

    /// All objects in id order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + '_ {
        self.objects.values()
    }

    pub fn index_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.specs.iter().map(|spec| spec.name)
    }

    /// Point lookup. On a unique index the key must match exactly; on a
    /// non-unique index the first object carrying `key` is returned.
    pub fn find_by(&self, index: &str, key: &IndexKey) -> Result<Option<&T>, StoreError> {
        let idx = self.index(index)?;
        let id = if idx.unique {
            idx.entries.get(key).copied()
        } else {
            idx.entries
                .range((Bound::Included(key.clone()), Bound::Unbounded))
                .next()
                .filter(|(k, _)| k.starts_with(key) && k.len() == key.len() + 1)
                .map(|(_, id)| *id)
        };
        Ok(id.and_then(|id| self.objects.get(&id)))
    }

    /// Like [`Table::find_by`] but absence is an error.
    pub fn get_by(&self, index: &str, key: &IndexKey) -> Result<&T, StoreError> {
        self.find_by(index, key)?.ok_or_else(|| StoreError::NotFound {
            type_name: T::TYPE_NAME,
            key: format!("{index} {key}"),
        })
    }

    /// Every object in `index` order.
    pub fn iter_by<'a>(&'a self, index: &str) -> Result<impl DoubleEndedIterator<Item = &'a T> + use<'a, T>, StoreError> {
        let idx = self.index(index)?;
        Ok(idx.entries.values().filter_map(|id| self.objects.get(id)))
    }

    /// First object in `index` order.
    pub fn first_by(&self, index: &str) -> Result<Option<&T>, StoreError> {
        Ok(self.iter_by(index)?.next())
    }

    /// Objects whose key is `>= key`, in order.
    pub fn lower_bound<'a>(
        &'a self,
        index: &str,
        key: &IndexKey,
    ) -> Result<impl Iterator<Item = &'a T> + use<'a, T>, StoreError> {
        let idx = self.index(index)?;
        Ok(idx
            .entries
            .range((Bound::Included(key.clone()), Bound::Unbounded))
            .filter_map(|(_, id)| self.objects.get(id)))
    }

    /// Objects whose key is greater than `key` and does not extend it.
    pub fn upper_bound<'a>(
        &'a self,
        index: &str,
        key: &IndexKey,
    ) -> Result<impl Iterator<Item = &'a T> + use<'a, T>, StoreError> {
        let idx = self.index(index)?;
        let prefix = key.clone();
        Ok(idx
            .entries
            .range((Bound::Excluded(key.clone()), Bound::Unbounded))
            .skip_while(move |(k, _)| k.starts_with(&prefix))
            .filter_map(|(_, id)| self.objects.get(id)))
    }

    /// Objects whose key extends `prefix`, in order.
    pub fn prefix<'a>(
        &'a self,
        index: &str,
        prefix: &IndexKey,
    ) -> Result<impl DoubleEndedIterator<Item = &'a T> + use<'a, T>, StoreError> {
        let idx = self.index(index)?;
        let owned = prefix.clone();
        let mut upper = None;
        // Find the first key past the prefix block so the range is double-ended.
        for (k, _) in idx.entries.range((Bound::Included(prefix.clone()), Bound::Unbounded)) {
            if !k.starts_with(&owned) {
                upper = Some(k.clone());
                break;
            }
        }
        let upper = match upper {
            Some(k) => Bound::Excluded(k),
            None => Bound::Unbounded,
        };
        Ok(idx
            .entries
            .range((Bound::Included(owned), upper))
            .filter_map(|(_, id)| self.objects.get(id)))
    }

    /// Rebuild every index from the primary store and compare.
    ///
    /// # Errors
    ///
    /// [`StoreError::Inconsistent`] naming the first index that differs.
    pub fn verify_indices(&self) -> Result<(), StoreError> {
        for (spec, index) in self.specs.iter().zip(&self.indices) {
            let rebuilt: BTreeMap<IndexKey, ObjectId> =
                self.objects.values().map(|obj| (Self::entry_key(spec, obj), obj.id())).collect();
            if rebuilt != index.entries {
                return Err(StoreError::Inconsistent { type_name: T::TYPE_NAME, index: spec.name });
            }
        }
        Ok(())
    }
}

/// Type-erased view used by [`crate::ObjectDatabase`] to drive undo across
/// every registered table.
pub(crate) trait AnyTable: Send + Sync {
    fn type_name(&self) -> &'static str;
    fn start_undo(&mut self, revision: i64);
    fn undo(&mut self) -> Result<(), StoreError>;
    fn squash(&mut self) -> Result<(), StoreError>;
    fn commit(&mut self, revision: i64);
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Object> AnyTable for Table<T> {
    fn type_name(&self) -> &'static str {
        T::TYPE_NAME
    }

    fn start_undo(&mut self, revision: i64) {
        Table::start_undo(self, revision);
    }

    fn undo(&mut self) -> Result<(), StoreError> {
        Table::undo(self)
    }

    fn squash(&mut self) -> Result<(), StoreError> {
        Table::squash(self)
    }

    fn commit(&mut self, revision: i64) {
        Table::commit(self, revision);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
