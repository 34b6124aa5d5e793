//! # Per-event-type dispatcher.
//!
//! [`Dispatcher`] owns the ordered slot list for a single event type and
//! runs synchronous delivery over it. Delivery iterates a shared-ownership
//! snapshot of the list, so handlers are free to subscribe and unsubscribe
//! (concurrently from other threads or re-entrantly from inside a
//! callback) while an iteration is in progress: structural edits never
//! invalidate a running iteration, and removals are honored through each
//! slot's `active` flag, re-checked just before invocation.
//!
//! ## Rules
//! - The slot list is sorted by priority descending; ties keep
//!   subscription order (the sort is stable).
//! - At rest (no delivery in flight) the list holds no inactive slots.
//! - No lock is held while a callback runs.
//! - For one-shot slots the `active` test-and-clear is the invocation
//!   claim: exactly one delivery wins it, everyone else skips.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{BusError, HandlerError};
use crate::handler::{HandlerId, Priority};

/// Callable payload of one registration.
pub(crate) type Callback<E> = Box<dyn Fn(&E) -> Result<(), HandlerError> + Send + Sync>;

/// One registration: a callback plus its delivery metadata.
///
/// Shared between the dispatcher's list and transient delivery snapshots.
/// Everything but `active` is immutable after creation.
struct Slot<E> {
    id: HandlerId,
    priority: Priority,
    callback: Callback<E>,
    one_shot: bool,
    active: AtomicBool,
}

/// Slot list and delivery loop for a single event type.
pub(crate) struct Dispatcher<E> {
    slots: RwLock<Vec<Arc<Slot<E>>>>,
}

impl<E> Dispatcher<E> {
    pub(crate) fn new() -> Self {
        Self {
            slots: RwLock::new(Vec::new()),
        }
    }

    /// Registers a slot and restores priority order.
    ///
    /// Safe to call while a delivery is iterating on another thread, or
    /// from within a handler on this one: running iterations keep their
    /// own snapshot and are untouched by the re-sort.
    pub(crate) fn add(
        &self,
        id: HandlerId,
        priority: Priority,
        callback: Callback<E>,
        one_shot: bool,
    ) {
        let slot = Arc::new(Slot {
            id,
            priority,
            callback,
            one_shot,
            active: AtomicBool::new(true),
        });

        let mut slots = self.slots.write();
        slots.push(slot);
        slots.sort_by(|a, b| b.priority.cmp(&a.priority));
    }

    /// Deactivates the slot with `id` and excises inactive entries.
    ///
    /// Returns `false` when the id is unknown or the slot was already
    /// claimed or removed. In-flight snapshots hold their own `Arc`s, so
    /// excision is safe at any time.
    pub(crate) fn remove(&self, id: HandlerId) -> bool {
        let mut slots = self.slots.write();
        let was_active = match slots.iter().find(|slot| slot.id == id) {
            Some(slot) => slot.active.swap(false, Ordering::AcqRel),
            None => return false,
        };
        slots.retain(|slot| slot.active.load(Ordering::Relaxed));
        was_active
    }

    /// Delivers `event` to every active slot, in priority order.
    ///
    /// Iterates a snapshot taken under the read lock; the lock is released
    /// before the first callback runs. A callback error stops the
    /// iteration; slots not yet visited are skipped for this delivery
    /// only.
    pub(crate) fn deliver(&self, event: &E) -> Result<(), BusError> {
        let snapshot: Vec<Arc<Slot<E>>> = self.slots.read().clone();

        let mut cleanup = CleanupGuard::new(self);
        for slot in &snapshot {
            if slot.one_shot {
                if slot
                    .active
                    .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
                    .is_err()
                {
                    continue;
                }
                cleanup.schedule();
            } else if !slot.active.load(Ordering::Acquire) {
                // Re-checked just before invocation so a handler removed
                // earlier in this same delivery is not run.
                continue;
            }

            (slot.callback)(event).map_err(|source| BusError::handler_failed(slot.id, source))?;
        }
        Ok(())
    }

    /// Invokes exactly one slot on `event`, applying the same claim
    /// protocol as [`deliver`](Self::deliver).
    ///
    /// Used when a handler subscribed during an in-flight delivery has to
    /// observe the current event. Unknown ids are ignored.
    pub(crate) fn deliver_one(&self, id: HandlerId, event: &E) -> Result<(), BusError> {
        let slot = {
            let slots = self.slots.read();
            match slots.iter().find(|slot| slot.id == id) {
                Some(slot) => Arc::clone(slot),
                None => return Ok(()),
            }
        };

        let mut cleanup = CleanupGuard::new(self);
        if slot.one_shot {
            if slot
                .active
                .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
            {
                return Ok(());
            }
            cleanup.schedule();
        } else if !slot.active.load(Ordering::Acquire) {
            return Ok(());
        }

        (slot.callback)(event).map_err(|source| BusError::handler_failed(slot.id, source))
    }

    /// Number of active slots.
    pub(crate) fn active_count(&self) -> usize {
        self.slots
            .read()
            .iter()
            .filter(|slot| slot.active.load(Ordering::Relaxed))
            .count()
    }

    /// Excises every inactive slot.
    fn cleanup(&self) {
        self.slots
            .write()
            .retain(|slot| slot.active.load(Ordering::Relaxed));
    }
}

/// Excises claimed one-shot slots when a delivery ends, no matter how.
///
/// Runs on the success path, the error path, and during unwinding, so the
/// at-rest invariant (no inactive slots in the list) survives failing
/// handlers.
struct CleanupGuard<'a, E> {
    dispatcher: &'a Dispatcher<E>,
    scheduled: bool,
}

impl<'a, E> CleanupGuard<'a, E> {
    fn new(dispatcher: &'a Dispatcher<E>) -> Self {
        Self {
            dispatcher,
            scheduled: false,
        }
    }

    fn schedule(&mut self) {
        self.scheduled = true;
    }
}

impl<E> Drop for CleanupGuard<'_, E> {
    fn drop(&mut self) {
        if self.scheduled {
            self.dispatcher.cleanup();
        }
    }
}
