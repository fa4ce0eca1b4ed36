//! Deduplicating link registry with per-event epochs.
//!
//! Raw ZEBRA links are addresses into memory the foreign runtime may
//! relocate; the registry gives each distinct link value a stable slot for
//! the duration of one event, and hands out [`ZebraPtr`] handles naming
//! that slot. Because creation deduplicates by value, two traversals that
//! reach the same bank converge on the same handle, which is what lets a
//! handle serve as a map key when cross-references are resolved.
//!
//! Handles are only meaningful within the event that created them. The
//! conversion driver calls [`ZebraRegistry::reset`] exactly once per event
//! (after the sink hand-off); the epoch counter embedded in each handle
//! makes any later dereference fail with
//! [`ZebraError::StalePointer`](crate::ZebraError::StalePointer) instead of
//! silently resolving a recycled slot.

use std::collections::HashMap;

use tracing::trace;

use crate::arena::Arena;
use crate::error::{Result, ZebraError};

/// Slot capacity of the registry, matching the foreign registry size.
///
/// Exhausting it is a fatal logic error (runaway chain or missing reset),
/// never a recoverable data condition.
pub const REGISTRY_CAPACITY: usize = 1000;

/// Opaque handle to a registered link.
///
/// A handle is a relation plus a lookup: it names a slot, it never owns
/// arena memory. The default handle is invalid: it models "no bank" (a
/// zero link) and compares equal only to other invalid handles, sorting
/// before every valid one.
///
/// Equality, ordering and hashing use `(epoch, slot)`. Within one epoch
/// the deduplication invariant makes slot identity coincide with the link
/// value at creation time; for slots mutated in place afterwards, compare
/// through [`ZebraRegistry::links_equal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ZebraPtr {
    epoch: u32,
    slot: i32,
}

impl ZebraPtr {
    /// The invalid handle ("no bank" / end of chain).
    pub const fn invalid() -> Self {
        Self { epoch: 0, slot: -1 }
    }

    /// True for the default-constructed handle.
    ///
    /// This is a purely local check; a handle can also be invalidated by a
    /// registry reset, which only [`ZebraRegistry::is_valid`] can see.
    pub fn is_invalid(&self) -> bool {
        self.slot < 0
    }
}

impl Default for ZebraPtr {
    fn default() -> Self {
        Self::invalid()
    }
}

/// Registry of live link values for the current event.
#[derive(Debug)]
pub struct ZebraRegistry {
    links: Vec<i32>,
    by_value: HashMap<i32, usize>,
    epoch: u32,
    capacity: usize,
}

impl Default for ZebraRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ZebraRegistry {
    /// Registry with the standard [`REGISTRY_CAPACITY`].
    pub fn new() -> Self {
        Self::with_capacity(REGISTRY_CAPACITY)
    }

    /// Registry with an explicit slot capacity (tests exercise exhaustion
    /// without allocating a thousand slots).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            links: Vec::new(),
            by_value: HashMap::new(),
            epoch: 1,
            capacity,
        }
    }

    /// Register `link`, returning the existing handle if the value is
    /// already known in this epoch.
    ///
    /// Accepts the arena's native signed representation; callers holding
    /// unsigned links cast them bit-exactly.
    pub fn create(&mut self, link: i32) -> Result<ZebraPtr> {
        if let Some(&slot) = self.by_value.get(&link) {
            return Ok(ZebraPtr {
                epoch: self.epoch,
                slot: slot as i32,
            });
        }
        if self.links.len() >= self.capacity {
            return Err(ZebraError::RegistryFull {
                capacity: self.capacity,
            });
        }
        let slot = self.links.len();
        self.links.push(link);
        self.by_value.insert(link, slot);
        Ok(ZebraPtr {
            epoch: self.epoch,
            slot: slot as i32,
        })
    }

    /// Whether `ptr` can currently be dereferenced.
    pub fn is_valid(&self, ptr: ZebraPtr) -> bool {
        !ptr.is_invalid() && ptr.epoch == self.epoch && (ptr.slot as usize) < self.links.len()
    }

    /// Current link value stored in the handle's slot.
    ///
    /// This is the live value: an [`update`](Self::update) between
    /// creation and resolution is visible here by design.
    pub fn resolve(&self, ptr: ZebraPtr) -> Result<i32> {
        if ptr.is_invalid() {
            return Err(ZebraError::InvalidPointer);
        }
        if ptr.epoch != self.epoch {
            return Err(ZebraError::StalePointer {
                held: ptr.epoch,
                current: self.epoch,
            });
        }
        self.links
            .get(ptr.slot as usize)
            .copied()
            .ok_or(ZebraError::InvalidPointer)
    }

    /// Replace the link stored in the handle's slot.
    ///
    /// Used when an external routine relinks a bank in place. The reverse
    /// lookup is moved to the new value; deduplication applies at creation
    /// time only, so a value collision between a mutated slot and an
    /// existing one leaves both slots live.
    pub fn update(&mut self, ptr: ZebraPtr, link: i32) -> Result<()> {
        let old = self.resolve(ptr)?;
        let slot = ptr.slot as usize;
        if self.by_value.get(&old) == Some(&slot) {
            self.by_value.remove(&old);
        }
        self.links[slot] = link;
        self.by_value.entry(link).or_insert(slot);
        Ok(())
    }

    /// Integer field at `offset` words from the handle's bank.
    pub fn int_at(&self, arena: &dyn Arena, ptr: ZebraPtr, offset: i32) -> Result<i32> {
        Ok(arena.iq(self.resolve(ptr)? + offset))
    }

    /// Float field at `offset` words from the handle's bank.
    pub fn float_at(&self, arena: &dyn Arena, ptr: ZebraPtr, offset: i32) -> Result<f32> {
        Ok(arena.q(self.resolve(ptr)? + offset))
    }

    /// Raw link field at `offset` words from the handle's bank.
    pub fn link_at(&self, arena: &dyn Arena, ptr: ZebraPtr, offset: i32) -> Result<i32> {
        Ok(arena.lq(self.resolve(ptr)? + offset))
    }

    /// Handle for the bank linked at `offset`; the invalid handle when the
    /// link is zero (end of chain / no such relation).
    pub fn child_at(&mut self, arena: &dyn Arena, ptr: ZebraPtr, offset: i32) -> Result<ZebraPtr> {
        let link = self.link_at(arena, ptr, offset)?;
        if link == 0 {
            Ok(ZebraPtr::invalid())
        } else {
            self.create(link)
        }
    }

    /// Compare two handles through their resolved link values.
    ///
    /// Unresolvable handles (invalid or stale) compare equal to each other
    /// and unequal to any resolvable one.
    pub fn links_equal(&self, a: ZebraPtr, b: ZebraPtr) -> bool {
        self.resolve(a).ok() == self.resolve(b).ok()
    }

    /// Clear all slots and start a new epoch, invalidating every handle
    /// issued so far. Called exactly once per event by the driver.
    pub fn reset(&mut self) {
        trace!(slots = self.links.len(), epoch = self.epoch, "registry reset");
        self.links.clear();
        self.by_value.clear();
        self.epoch += 1;
    }

    /// Current slot occupancy, for diagnostics.
    pub fn len(&self) -> usize {
        self.links.len()
    }

    /// Whether no links are registered.
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}
