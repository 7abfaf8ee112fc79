//! Reusable-object pools for high-churn entity kinds
//!
//! A pool owns a slab of slots plus a free list. Acquiring pops a free slot
//! (or grows the slab), resets it, and hands back a generational
//! [`PoolHandle`]. Releasing bumps the slot generation so stale handles stop
//! resolving. Active slots are tracked in acquisition order, which gives the
//! simulation a stable oldest-first iteration order for collision tie-breaks
//! and limit enforcement.

use serde::{Deserialize, Serialize};

use super::limiter::excess_count;

/// Objects that can live in a [`Pool`]
pub trait Poolable: Default {
    /// Reinitialize every field before the slot is handed out again
    fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Generational reference to a pooled slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PoolHandle {
    index: u32,
    generation: u32,
}

impl PoolHandle {
    /// Slot index (identical across release/acquire cycles of the same slot)
    pub fn index(self) -> u32 {
        self.index
    }

    pub fn generation(self) -> u32 {
        self.generation
    }
}

/// Diagnostic counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PoolStats {
    pub available: usize,
    pub active: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Slot<T> {
    value: T,
    generation: u32,
    active: bool,
}

/// Per-kind object pool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pool<T> {
    slots: Vec<Slot<T>>,
    /// Released slot indices (LIFO, so the most recently released slot is reused first)
    free: Vec<u32>,
    /// Active slot indices in acquisition order (oldest first)
    order: Vec<u32>,
}

impl<T> Default for Pool<T> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            order: Vec::new(),
        }
    }
}

impl<T: Poolable> Pool<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-allocate `count` free slots
    pub fn with_capacity(count: usize) -> Self {
        let mut pool = Self::default();
        for _ in 0..count {
            let index = pool.slots.len() as u32;
            pool.slots.push(Slot {
                value: T::default(),
                generation: 0,
                active: false,
            });
            pool.free.push(index);
        }
        pool
    }

    /// Take a slot (reused if one is free), reset it, then run `init` on it
    pub fn acquire(&mut self, init: impl FnOnce(&mut T)) -> PoolHandle {
        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                self.slots.push(Slot {
                    value: T::default(),
                    generation: 0,
                    active: false,
                });
                (self.slots.len() - 1) as u32
            }
        };

        let slot = &mut self.slots[index as usize];
        slot.value.reset();
        init(&mut slot.value);
        slot.active = true;
        self.order.push(index);

        PoolHandle {
            index,
            generation: slot.generation,
        }
    }

    /// Return a slot to the free list. No-op (returns false) unless the handle is active.
    pub fn release(&mut self, handle: PoolHandle) -> bool {
        if !self.is_live(handle) {
            return false;
        }
        let slot = &mut self.slots[handle.index as usize];
        slot.active = false;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);
        self.order.retain(|&i| i != handle.index);
        true
    }

    /// Release several handles; returns how many were actually active
    pub fn release_many(&mut self, handles: impl IntoIterator<Item = PoolHandle>) -> usize {
        handles
            .into_iter()
            .filter(|&handle| self.release(handle))
            .count()
    }

    /// Release every active slot failing `keep`; returns the number released
    pub fn retain(&mut self, mut keep: impl FnMut(&T) -> bool) -> usize {
        let doomed: Vec<PoolHandle> = self
            .iter()
            .filter(|(_, value)| !keep(value))
            .map(|(handle, _)| handle)
            .collect();
        self.release_many(doomed)
    }

    /// Release the oldest active slots until at most `max` remain
    pub fn enforce_limit(&mut self, max: usize) -> usize {
        let excess = excess_count(self.order.len(), max);
        let oldest: Vec<PoolHandle> = self.handles().into_iter().take(excess).collect();
        self.release_many(oldest)
    }

    /// Drop every slot, free and active
    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.order.clear();
    }
}

impl<T> Pool<T> {
    fn is_live(&self, handle: PoolHandle) -> bool {
        self.slots
            .get(handle.index as usize)
            .is_some_and(|slot| slot.active && slot.generation == handle.generation)
    }

    pub fn get(&self, handle: PoolHandle) -> Option<&T> {
        if self.is_live(handle) {
            Some(&self.slots[handle.index as usize].value)
        } else {
            None
        }
    }

    pub fn get_mut(&mut self, handle: PoolHandle) -> Option<&mut T> {
        if self.is_live(handle) {
            Some(&mut self.slots[handle.index as usize].value)
        } else {
            None
        }
    }

    /// Active handles, oldest first
    pub fn handles(&self) -> Vec<PoolHandle> {
        self.order
            .iter()
            .map(|&index| PoolHandle {
                index,
                generation: self.slots[index as usize].generation,
            })
            .collect()
    }

    /// Active objects with their handles, oldest first
    pub fn iter(&self) -> impl Iterator<Item = (PoolHandle, &T)> {
        self.order.iter().map(move |&index| {
            let slot = &self.slots[index as usize];
            (
                PoolHandle {
                    index,
                    generation: slot.generation,
                },
                &slot.value,
            )
        })
    }

    /// Active objects, oldest first
    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.iter().map(|(_, value)| value)
    }

    /// Mutate every active object in acquisition order
    pub fn for_each_mut(&mut self, mut f: impl FnMut(&mut T)) {
        for &index in &self.order {
            f(&mut self.slots[index as usize].value);
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            available: self.free.len(),
            active: self.order.len(),
            total: self.slots.len(),
        }
    }
}
