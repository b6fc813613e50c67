//! Fixed-capacity slot pools for security keys.
//!
//! Keys live in numbered slots because the slot number is the persistence
//! tag's low half: a key stored at slot 3 today must load back into slot 3
//! after a restart. The pool therefore exposes both positional insertion
//! (for loads) and lowest-free-slot allocation (for new keys).

use bluemesh_core::tag::InternalIndex;

/// Errors from pool slot operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PoolError {
    #[error("pool is full (capacity {capacity})")]
    Exhausted { capacity: usize },

    #[error("slot {index} is out of range (capacity {capacity})")]
    OutOfRange { index: u16, capacity: usize },
}

/// A pool of `slot_count` numbered slots holding at most `max_live` values.
///
/// The slot space is fixed by the on-disk tag layout; the live bound is the
/// allocator limit and may be lower (tests use this to force exhaustion).
#[derive(Debug)]
pub struct KeyPool<T> {
    slots: Vec<Option<T>>,
    live: usize,
    max_live: usize,
}

impl<T> KeyPool<T> {
    /// Pool where the allocator may fill every slot.
    pub fn new(slot_count: usize) -> Self {
        Self::bounded(slot_count, slot_count)
    }

    /// Pool with `slot_count` addressable slots but at most `max_live`
    /// occupied at once.
    pub fn bounded(slot_count: usize, max_live: usize) -> Self {
        let mut slots = Vec::with_capacity(slot_count);
        slots.resize_with(slot_count, || None);
        Self {
            slots,
            live: 0,
            max_live: max_live.min(slot_count),
        }
    }

    /// Insert into the lowest free slot and return its index.
    pub fn insert(&mut self, value: T) -> Result<InternalIndex, PoolError> {
        if self.live >= self.max_live {
            return Err(PoolError::Exhausted {
                capacity: self.max_live,
            });
        }
        let free = self
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or(PoolError::Exhausted {
                capacity: self.max_live,
            })?;
        self.slots[free] = Some(value);
        self.live += 1;
        Ok(InternalIndex(free as u16))
    }

    /// Insert at a specific slot, returning the replaced value if the slot
    /// was occupied. Filling a free slot counts against the live bound;
    /// replacement does not.
    pub fn insert_at(&mut self, index: InternalIndex, value: T) -> Result<Option<T>, PoolError> {
        let slot = index.0 as usize;
        if slot >= self.slots.len() {
            return Err(PoolError::OutOfRange {
                index: index.0,
                capacity: self.slots.len(),
            });
        }
        if self.slots[slot].is_none() {
            if self.live >= self.max_live {
                return Err(PoolError::Exhausted {
                    capacity: self.max_live,
                });
            }
            self.live += 1;
        }
        Ok(self.slots[slot].replace(value))
    }

    pub fn get(&self, index: InternalIndex) -> Option<&T> {
        self.slots.get(index.0 as usize)?.as_ref()
    }

    pub fn get_mut(&mut self, index: InternalIndex) -> Option<&mut T> {
        self.slots.get_mut(index.0 as usize)?.as_mut()
    }

    /// Clear a slot, returning its value if it was occupied.
    pub fn remove(&mut self, index: InternalIndex) -> Option<T> {
        let removed = self.slots.get_mut(index.0 as usize)?.take();
        if removed.is_some() {
            self.live -= 1;
        }
        removed
    }

    /// Occupied slots in ascending slot order.
    pub fn iter(&self) -> impl Iterator<Item = (InternalIndex, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|v| (InternalIndex(i as u16), v)))
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn is_full(&self) -> bool {
        self.live >= self.max_live
    }

    /// Number of addressable slots.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Maximum number of simultaneously occupied slots.
    pub fn max_live(&self) -> usize {
        self.max_live
    }
}
