//! Ordered storage for the live components of one system
//!
//! Each system owns exactly one [`EntityList`]: a slot-keyed arena plus an
//! insertion-order index. The list keeps the bookkeeping the per-frame
//! machinery depends on — tracked count, emptiness flag, cached head — in
//! sync on every add and remove, and queues removals requested from inside
//! hook dispatch so the owning system can run the full destroy protocol at
//! a safe point.

use bitflags::bitflags;
use slotmap::SlotMap;

use super::entity::EntityId;

bitflags! {
    /// Per-entity lifecycle flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub(crate) struct EntityFlags: u8 {
        /// The entity's first-dispatch hooks have run
        const INITIALIZED = 1 << 0;
        /// The entity currently participates in enable-gated hooks
        const ENABLED = 1 << 1;
        /// Enabled state observed at the last dispatch, for edge detection
        const WAS_ENABLED = 1 << 2;
        /// A despawn request is queued for this entity
        const PENDING_REMOVAL = 1 << 3;
        /// The destroy protocol has started; counts are already updated
        const REMOVING = 1 << 4;
    }
}

pub(crate) struct Entry<C> {
    pub(crate) value: C,
    pub(crate) flags: EntityFlags,
}

/// Ordered collection of the live components bound to one system
///
/// Iteration and queries follow registration order. The tracked `len` and
/// `has_entities` values never diverge from the stored entries outside the
/// destroy protocol, where counts are updated *before* the will-destroy
/// hook runs and the entry is removed *after* — so the hook observes fresh
/// counts over the still-complete collection.
pub struct EntityList<C> {
    entries: SlotMap<EntityId, Entry<C>>,
    order: Vec<EntityId>,
    count: usize,
    has_entities: bool,
    first: Option<EntityId>,
    pending_removals: Vec<EntityId>,
}

impl<C> Default for EntityList<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> EntityList<C> {
    /// Create an empty list
    pub fn new() -> Self {
        Self {
            entries: SlotMap::with_key(),
            order: Vec::new(),
            count: 0,
            has_entities: false,
            first: None,
            pending_removals: Vec::new(),
        }
    }

    /// Number of live components
    pub fn len(&self) -> usize {
        self.count
    }

    /// Whether the list holds no components
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Whether the system currently has any components
    pub fn has_entities(&self) -> bool {
        self.has_entities
    }

    /// Id of the first-registered live component, if any
    pub fn first_id(&self) -> Option<EntityId> {
        self.first
    }

    /// The first-registered live component, if any
    pub fn first(&self) -> Option<&C> {
        self.first.and_then(|id| self.get(id))
    }

    /// Whether the entity is still present in the collection
    pub fn contains(&self, id: EntityId) -> bool {
        self.entries.contains_key(id)
    }

    /// Immutable access to one component
    pub fn get(&self, id: EntityId) -> Option<&C> {
        self.entries.get(id).map(|entry| &entry.value)
    }

    /// Mutable access to one component
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut C> {
        self.entries.get_mut(id).map(|entry| &mut entry.value)
    }

    /// Whether the entity currently participates in enable-gated hooks
    pub fn enabled(&self, id: EntityId) -> bool {
        self.entries
            .get(id)
            .is_some_and(|entry| entry.flags.contains(EntityFlags::ENABLED))
    }

    /// Enable or disable one entity
    ///
    /// Pure state change; the matching enabled/disabled hooks fire at the
    /// entity's next dispatch, not here.
    pub fn set_enabled(&mut self, id: EntityId, enabled: bool) -> bool {
        match self.entries.get_mut(id) {
            Some(entry) => {
                entry.flags.set(EntityFlags::ENABLED, enabled);
                true
            }
            None => false,
        }
    }

    /// Request removal of one entity
    ///
    /// The request is queued; the owning system drains the queue between
    /// hook dispatches and runs the destroy protocol there. Safe to call
    /// from inside any hook. Returns false if the entity is already gone
    /// or already on its way out.
    pub fn despawn(&mut self, id: EntityId) -> bool {
        match self.entries.get_mut(id) {
            Some(entry)
                if !entry
                    .flags
                    .intersects(EntityFlags::PENDING_REMOVAL | EntityFlags::REMOVING) =>
            {
                entry.flags.insert(EntityFlags::PENDING_REMOVAL);
                self.pending_removals.push(id);
                true
            }
            _ => false,
        }
    }

    /// Iterate live components in registration order
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &C)> {
        self.order
            .iter()
            .filter_map(|id| self.entries.get(*id).map(|entry| (*id, &entry.value)))
    }

    /// Iterate live components mutably in registration order
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (EntityId, &mut C)> {
        // SlotMap::iter_mut yields in slot order; reorder through the index.
        let positions: std::collections::HashMap<EntityId, usize> = self
            .order
            .iter()
            .enumerate()
            .map(|(position, id)| (*id, position))
            .collect();
        let mut by_id: Vec<(EntityId, &mut C)> = self
            .entries
            .iter_mut()
            .map(|(id, entry)| (id, &mut entry.value))
            .collect();
        by_id.sort_by_key(|(id, _)| positions.get(id).copied().unwrap_or(usize::MAX));
        by_id.into_iter()
    }

    /// Find the first component matching a predicate, in registration order
    pub fn find_first<P>(&self, mut predicate: P) -> Option<(EntityId, &C)>
    where
        P: FnMut(&C) -> bool,
    {
        self.iter().find(|(_, value)| predicate(value))
    }

    /// Find all components matching a predicate, in registration order
    pub fn find_all<P>(&self, mut predicate: P) -> Vec<(EntityId, &C)>
    where
        P: FnMut(&C) -> bool,
    {
        self.iter().filter(|(_, value)| predicate(value)).collect()
    }

    // --- internal mutation protocol, driven by the owning system cell ---

    /// Append a new entity; bookkeeping runs before any hook fires.
    pub(crate) fn insert(&mut self, value: C) -> EntityId {
        let id = self.entries.insert(Entry {
            value,
            flags: EntityFlags::ENABLED,
        });
        if !self.has_entities {
            self.first = Some(id);
        }
        self.order.push(id);
        self.count += 1;
        self.has_entities = true;
        id
    }

    /// Start the destroy protocol: counts change, the entry stays.
    pub(crate) fn begin_remove(&mut self, id: EntityId) -> bool {
        match self.entries.get_mut(id) {
            Some(entry) if !entry.flags.contains(EntityFlags::REMOVING) => {
                entry.flags.remove(EntityFlags::PENDING_REMOVAL);
                entry.flags.insert(EntityFlags::REMOVING);
                self.count -= 1;
                self.has_entities = self.count > 0;
                true
            }
            _ => false,
        }
    }

    /// Finish the destroy protocol: drop the entry, recompute the head.
    pub(crate) fn finish_remove(&mut self, id: EntityId) -> Option<C> {
        let entry = self.entries.remove(id)?;
        self.order.retain(|ordered| *ordered != id);
        self.first = self.order.first().copied();
        Some(entry.value)
    }

    /// Take the oldest queued despawn request, if any.
    pub(crate) fn take_pending(&mut self) -> Option<EntityId> {
        if self.pending_removals.is_empty() {
            None
        } else {
            Some(self.pending_removals.remove(0))
        }
    }

    /// Whether the entity should still be dispatched this tick.
    pub(crate) fn is_live(&self, id: EntityId) -> bool {
        self.entries.get(id).is_some_and(|entry| {
            !entry
                .flags
                .intersects(EntityFlags::PENDING_REMOVAL | EntityFlags::REMOVING)
        })
    }

    pub(crate) fn flags(&self, id: EntityId) -> Option<EntityFlags> {
        self.entries.get(id).map(|entry| entry.flags)
    }

    /// Apply a flag update if the entity is still present.
    pub(crate) fn update_flags<F>(&mut self, id: EntityId, update: F)
    where
        F: FnOnce(&mut EntityFlags),
    {
        if let Some(entry) = self.entries.get_mut(id) {
            update(&mut entry.flags);
        }
    }

    /// Snapshot of the registration order, captured at tick entry.
    pub(crate) fn order_snapshot(&self) -> Vec<EntityId> {
        self.order.clone()
    }
}
