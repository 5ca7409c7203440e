//! The [`Object`] trait implemented by every stored entity.
use std::fmt;

use crate::key::IndexKey;

/// Stable per-type identity. Ids are assigned in increasing order and are
/// never handed out twice by the same table.
pub type ObjectId = u64;

/// Declaration of one secondary index.
pub struct IndexSpec<T> {
    pub name: &'static str,
    /// Unique indices reject a second object with an equal key. Non-unique
    /// indices break ties by object id.
    pub unique: bool,
    pub key: fn(&T) -> IndexKey,
}

impl<T> IndexSpec<T> {
    pub fn unique(name: &'static str, key: fn(&T) -> IndexKey) -> Self {
        Self { name, unique: true, key }
    }

    pub fn non_unique(name: &'static str, key: fn(&T) -> IndexKey) -> Self {
        Self { name, unique: false, key }
    }
}

impl<T> Clone for IndexSpec<T> {
    fn clone(&self) -> Self {
        Self { name: self.name, unique: self.unique, key: self.key }
    }
}

impl<T> fmt::Debug for IndexSpec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexSpec").field("name", &self.name).field("unique", &self.unique).finish()
    }
}

/// A persisted entity with a numeric id and declared secondary indices.
///
/// `Default` supplies the blank instance an initializer fills in on create.
pub trait Object: Clone + fmt::Debug + PartialEq + Default + Send + Sync + 'static {
    const TYPE_NAME: &'static str;

    fn id(&self) -> ObjectId;

    /// Only the store assigns ids.
    fn set_id(&mut self, id: ObjectId);

    /// Secondary indices, in declaration order.
    fn indices() -> Vec<IndexSpec<Self>>;
}
