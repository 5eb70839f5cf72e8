//! Sparse per-kind component storage.
//!
//! Each component kind lives in its own [`ComponentTable`], a map from
//! [`EntityId`] to value. An entity "has" a component iff it has an entry in
//! that table. Entries are kept ordered by entity id so every iteration pass
//! is deterministic and visits each present entity exactly once.

use std::collections::btree_map::{self, BTreeMap};

use serde::{Deserialize, Serialize};

use crate::entity::EntityId;

/// A typed sparse table mapping entities to component values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentTable<T> {
    rows: BTreeMap<EntityId, T>,
}

impl<T> Default for ComponentTable<T> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
        }
    }
}

impl<T> ComponentTable<T> {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared reference to the entity's value, if present.
    #[inline]
    pub fn get(&self, entity: EntityId) -> Option<&T> {
        self.rows.get(&entity)
    }

    /// Mutable reference to the entity's value, if present.
    #[inline]
    pub fn get_mut(&mut self, entity: EntityId) -> Option<&mut T> {
        self.rows.get_mut(&entity)
    }

    /// Set the entity's value, returning the previous one.
    ///
    /// The table does not check liveness; [`World::insert`](crate::world::World::insert)
    /// is the checked entry point.
    pub fn insert(&mut self, entity: EntityId, value: T) -> Option<T> {
        self.rows.insert(entity, value)
    }

    /// Remove and return the entity's value.
    pub fn remove(&mut self, entity: EntityId) -> Option<T> {
        self.rows.remove(&entity)
    }

    /// Whether the entity has an entry.
    #[inline]
    pub fn contains(&self, entity: EntityId) -> bool {
        self.rows.contains_key(&entity)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Iterate `(entity, &value)` in ascending entity order.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            inner: self.rows.iter(),
        }
    }

    /// Iterate `(entity, &mut value)` in ascending entity order.
    pub fn iter_mut(&mut self) -> IterMut<'_, T> {
        IterMut {
            inner: self.rows.iter_mut(),
        }
    }

    /// Entities with an entry, in ascending order.
    pub fn entities(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.rows.keys().copied()
    }

    /// The lowest entity id with an entry.
    pub fn first(&self) -> Option<EntityId> {
        self.rows.keys().next().copied()
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.rows.clear();
    }
}

impl<T: Clone> ComponentTable<T> {
    /// Owned `(entity, value)` pairs in ascending entity order.
    pub fn to_rows(&self) -> Vec<(EntityId, T)> {
        self.rows.iter().map(|(&e, v)| (e, v.clone())).collect()
    }
}

impl<T> FromIterator<(EntityId, T)> for ComponentTable<T> {
    fn from_iter<I: IntoIterator<Item = (EntityId, T)>>(iter: I) -> Self {
        Self {
            rows: iter.into_iter().collect(),
        }
    }
}

impl<'a, T> IntoIterator for &'a ComponentTable<T> {
    type Item = (EntityId, &'a T);
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

// ---------------------------------------------------------------------------
// Iterators
// ---------------------------------------------------------------------------

/// Shared iterator over a [`ComponentTable`].
pub struct Iter<'a, T> {
    inner: btree_map::Iter<'a, EntityId, T>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = (EntityId, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(&e, v)| (e, v))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

/// Mutable iterator over a [`ComponentTable`].
pub struct IterMut<'a, T> {
    inner: btree_map::IterMut<'a, EntityId, T>,
}

impl<'a, T> Iterator for IterMut<'a, T> {
    type Item = (EntityId, &'a mut T);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(&e, v)| (e, v))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
