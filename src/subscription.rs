//! # Scoped registrations.
//!
//! [`Subscription`] ties a handler registration to a lexical scope: when
//! the value drops, the handler is unsubscribed. Useful for handlers that
//! borrow from a component with a shorter life than the bus.
//!
//! ## Example
//!
//! ```rust
//! use evbus::{EventBus, Priority};
//!
//! struct Ping;
//!
//! let bus = EventBus::new();
//! {
//!     let _sub = bus.subscribe_scoped(Priority::Normal, |_: &Ping| Ok(()))?;
//!     assert_eq!(bus.handler_count::<Ping>(), 1);
//! }
//! assert_eq!(bus.handler_count::<Ping>(), 0);
//! # Ok::<(), evbus::BusError>(())
//! ```

use std::fmt;

use crate::bus::EventBus;
use crate::handler::HandlerId;

/// RAII wrapper that unsubscribes its handler on drop.
///
/// Move-only, like every Rust value without `Copy`: moving it transfers
/// the registration, and the source is statically out of play. Dropping
/// the wrapper is equivalent to calling
/// [`EventBus::unsubscribe`](crate::EventBus::unsubscribe) with the
/// wrapped id.
#[must_use = "dropping a Subscription immediately unsubscribes its handler"]
pub struct Subscription<'bus> {
    bus: &'bus EventBus,
    id: Option<HandlerId>,
}

impl<'bus> Subscription<'bus> {
    /// Wraps an issued handler id.
    pub fn new(bus: &'bus EventBus, id: HandlerId) -> Self {
        Self { bus, id: Some(id) }
    }

    /// The wrapped id, or `None` once disconnected.
    pub fn id(&self) -> Option<HandlerId> {
        self.id
    }

    /// Unsubscribes now instead of at scope end. Idempotent.
    pub fn disconnect(&mut self) {
        if let Some(id) = self.id.take() {
            self.bus.unsubscribe(id);
        }
    }
}

impl Drop for Subscription<'_> {
    fn drop(&mut self) {
        self.disconnect();
    }
}

impl fmt::Debug for Subscription<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use crate::handler::Priority;

    use super::*;

    struct Ping;

    fn counting_bus() -> (EventBus, Arc<AtomicU32>) {
        let bus = EventBus::new();
        let calls = Arc::new(AtomicU32::new(0));
        (bus, calls)
    }

    #[test]
    fn drop_unsubscribes() {
        let (bus, calls) = counting_bus();

        {
            let calls_for_closure = Arc::clone(&calls);
            let _sub = bus
                .subscribe_scoped(Priority::Normal, move |_: &Ping| {
                    calls_for_closure.fetch_add(1, Ordering::Relaxed);
                    Ok(())
                })
                .unwrap();

            bus.publish(Ping).unwrap();
            assert_eq!(calls.load(Ordering::Relaxed), 1);
        }

        bus.publish(Ping).unwrap();
        assert_eq!(calls.load(Ordering::Relaxed), 1);
        assert_eq!(bus.handler_count::<Ping>(), 0);
    }

    #[test]
    fn disconnect_is_idempotent() {
        let bus = EventBus::new();
        let mut sub = bus
            .subscribe_scoped(Priority::Normal, |_: &Ping| Ok(()))
            .unwrap();

        assert!(sub.id().is_some());
        sub.disconnect();
        assert!(sub.id().is_none());
        sub.disconnect();
        assert_eq!(bus.handler_count::<Ping>(), 0);
    }

    #[test]
    fn moving_transfers_the_registration() {
        let bus = EventBus::new();
        let sub = bus
            .subscribe_scoped(Priority::Normal, |_: &Ping| Ok(()))
            .unwrap();

        let moved = sub;
        assert_eq!(bus.handler_count::<Ping>(), 1);

        drop(moved);
        assert_eq!(bus.handler_count::<Ping>(), 0);
    }

    #[test]
    fn wrapping_a_manual_subscription_works() {
        let bus = EventBus::new();
        let id = bus.subscribe(Priority::Normal, |_: &Ping| Ok(())).unwrap();

        drop(Subscription::new(&bus, id));
        assert_eq!(bus.handler_count::<Ping>(), 0);
    }
}
