//! Live allocation storage.
//!
//! The [`LiveStore`] trait is the seam between the engine and whatever keeps
//! live allocations. Its contract is what makes claims safe:
//!
//! - `update`, `read` and `extract_with` on the same token are mutually
//!   exclusive; on different tokens they run in parallel.
//! - `insert_if_vacant` is an atomic check-and-insert.
//! - `extract_with` removes the allocation only if its closure succeeds, and
//!   nothing can observe the allocation between the closure and the removal.

use crate::{Allocation, Token};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;

/// Storage for live allocations, keyed by token.
pub trait LiveStore: Send + Sync {
    /// Inserts `allocation` unless its token is already live.
    ///
    /// Returns `false` on collision, leaving the existing allocation as is.
    fn insert_if_vacant(&self, allocation: Allocation) -> bool;

    /// Runs `f` with exclusive access to the allocation.
    ///
    /// Returns `None` if the token is not live.
    fn update<F, T>(&self, token: &Token, f: F) -> Option<T>
    where
        F: FnOnce(&mut Allocation) -> T;

    /// Runs `f` with read access to the allocation.
    fn read<F, T>(&self, token: &Token, f: F) -> Option<T>
    where
        F: FnOnce(&Allocation) -> T;

    /// Tokens of every allocation whose visibility deadline is before `now`.
    fn expired(&self, now: u64) -> Vec<Token>;

    /// Runs `f` with exclusive access and removes the allocation if `f`
    /// returns `Ok`.
    ///
    /// Returns `None` if the token is not live.
    fn extract_with<F, T, E>(&self, token: &Token, f: F) -> Option<Result<T, E>>
    where
        F: FnOnce(&Allocation) -> Result<T, E>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Emptied when the allocation is extracted, before it is unlinked from the
/// map, so holders of a stale handle see the token as gone.
type Slot = Arc<Mutex<Option<Allocation>>>;

/// In-memory [`LiveStore`] with one lock per allocation.
///
/// The map lock is only held long enough to find or replace a slot. Lock
/// order is always map, then slot; no path takes the map lock while holding a
/// slot lock.
#[derive(Default, Debug)]
pub struct MemoryStore {
    slots: RwLock<HashMap<Token, Slot>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, token: &Token) -> Option<Slot> {
        self.slots.read().get(token).cloned()
    }
}

impl LiveStore for MemoryStore {
    fn insert_if_vacant(&self, allocation: Allocation) -> bool {
        let mut slots = self.slots.write();
        let token = allocation.token();
        if slots.get(&token).is_some_and(|slot| slot.lock().is_some()) {
            return false;
        }
        slots.insert(token, Arc::new(Mutex::new(Some(allocation))));
        true
    }

    fn update<F, T>(&self, token: &Token, f: F) -> Option<T>
    where
        F: FnOnce(&mut Allocation) -> T,
    {
        let slot = self.slot(token)?;
        let mut guard = slot.lock();
        guard.as_mut().map(f)
    }

    fn read<F, T>(&self, token: &Token, f: F) -> Option<T>
    where
        F: FnOnce(&Allocation) -> T,
    {
        let slot = self.slot(token)?;
        let guard = slot.lock();
        guard.as_ref().map(f)
    }

    fn expired(&self, now: u64) -> Vec<Token> {
        let slots: Vec<Slot> = self.slots.read().values().cloned().collect();
        slots
            .iter()
            .filter_map(|slot| {
                slot.lock()
                    .as_ref()
                    .filter(|allocation| allocation.is_expired(now))
                    .map(Allocation::token)
            })
            .collect()
    }

    fn extract_with<F, T, E>(&self, token: &Token, f: F) -> Option<Result<T, E>>
    where
        F: FnOnce(&Allocation) -> Result<T, E>,
    {
        let slot = self.slot(token)?;
        let outcome = {
            let mut guard = slot.lock();
            let outcome = f(guard.as_ref()?);
            if outcome.is_ok() {
                *guard = None;
            }
            outcome
        };

        if outcome.is_ok() {
            let mut slots = self.slots.write();
            // A new allocation may have reused the token since the slot was
            // emptied; only unlink our own slot.
            if slots.get(token).is_some_and(|live| Arc::ptr_eq(live, &slot)) {
                slots.remove(token);
            }
        }
        Some(outcome)
    }

    fn len(&self) -> usize {
        let slots: Vec<Slot> = self.slots.read().values().cloned().collect();
        slots.iter().filter(|slot| slot.lock().is_some()).count()
    }
}
