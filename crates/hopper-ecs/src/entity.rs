//! Entity identifiers and allocation.
//!
//! An [`EntityId`] is an opaque 64-bit handle. Ids are handed out in strictly
//! increasing order and are never recycled within a world, so a destroyed
//! id can never alias a newer entity.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// EntityId
// ---------------------------------------------------------------------------

/// An opaque entity identifier. Carries no data of its own.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(u64);

impl EntityId {
    /// Raw `u64` representation.
    #[inline]
    pub fn to_raw(self) -> u64 {
        self.0
    }

    /// Reconstruct from a raw `u64`.
    #[inline]
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({})", self.0)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// EntityAllocator
// ---------------------------------------------------------------------------

/// Allocates monotonically increasing [`EntityId`]s and tracks which are live.
#[derive(Debug, Clone, Default)]
pub struct EntityAllocator {
    /// The id the next call to [`allocate`](Self::allocate) will return.
    next: u64,
    /// Currently live ids, ordered for deterministic iteration.
    alive: BTreeSet<EntityId>,
}

impl EntityAllocator {
    /// Create a new, empty allocator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh [`EntityId`] and mark it live.
    pub fn allocate(&mut self) -> EntityId {
        let id = EntityId(self.next);
        self.next += 1;
        self.alive.insert(id);
        id
    }

    /// Mark an entity dead.
    ///
    /// Returns `true` if the entity was alive and is now dead, `false` if it
    /// was already dead or never allocated.
    pub fn deallocate(&mut self, id: EntityId) -> bool {
        self.alive.remove(&id)
    }

    /// Returns `true` if `id` refers to a currently live entity.
    pub fn is_alive(&self, id: EntityId) -> bool {
        self.alive.contains(&id)
    }

    /// Total number of currently live entities.
    pub fn alive_count(&self) -> usize {
        self.alive.len()
    }

    /// Live ids in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.alive.iter().copied()
    }

    /// The id that the next allocation will produce.
    pub fn next_id(&self) -> u64 {
        self.next
    }

    /// Rebuild an allocator from a captured `next_id` and live set.
    ///
    /// Live ids at or above `next_id` bump `next_id` past them so that future
    /// allocations stay unique.
    pub fn restore(next_id: u64, alive: impl IntoIterator<Item = EntityId>) -> Self {
        let alive: BTreeSet<EntityId> = alive.into_iter().collect();
        let next = alive
            .last()
            .map_or(next_id, |last| next_id.max(last.0 + 1));
        Self { next, alive }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocate_monotonic_ids() {
        let mut alloc = EntityAllocator::new();
        let ids: Vec<EntityId> = (0..100).map(|_| alloc.allocate()).collect();
        for pair in ids.windows(2) {
            assert!(pair[0] < pair[1]);
        }
        assert_eq!(ids[0].to_raw(), 0);
        assert_eq!(ids[99].to_raw(), 99);
    }

    #[test]
    fn ids_are_never_recycled() {
        let mut alloc = EntityAllocator::new();
        let e0 = alloc.allocate();
        assert!(alloc.deallocate(e0));
        let e1 = alloc.allocate();
        assert_ne!(e0, e1);
        assert!(!alloc.is_alive(e0), "destroyed id must stay dead");
        assert!(alloc.is_alive(e1));
    }

    #[test]
    fn double_deallocate_returns_false() {
        let mut alloc = EntityAllocator::new();
        let e = alloc.allocate();
        assert!(alloc.deallocate(e));
        assert!(!alloc.deallocate(e));
    }

    #[test]
    fn alive_count_tracks_correctly() {
        let mut alloc = EntityAllocator::new();
        let e0 = alloc.allocate();
        let _e1 = alloc.allocate();
        assert_eq!(alloc.alive_count(), 2);
        alloc.deallocate(e0);
        assert_eq!(alloc.alive_count(), 1);
        assert_eq!(alloc.next_id(), 2);
    }

    #[test]
    fn restore_keeps_ids_unique() {
        let alloc = EntityAllocator::restore(2, [EntityId(0), EntityId(5)]);
        assert_eq!(alloc.next_id(), 6);
        assert!(alloc.is_alive(EntityId(5)));
        assert_eq!(alloc.alive_count(), 2);
    }

    #[test]
    fn entity_id_roundtrip() {
        let id = EntityId::from_raw(42);
        assert_eq!(id.to_raw(), 42);
        assert_eq!(format!("{id}"), "#42");
        assert_eq!(format!("{id:?}"), "EntityId(42)");
    }
}
