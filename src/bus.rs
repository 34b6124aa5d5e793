//! # Event bus: the cross-type coordinator.
//!
//! [`EventBus`] routes subscribe/publish/unsubscribe by event type. It
//! owns one dispatcher per payload `TypeId`, hands out process-unique
//! [`HandlerId`]s, and keeps the thread-local dispatch context that lets a
//! handler subscribe to the event type it is currently receiving and still
//! observe the in-flight event exactly once.
//!
//! Delivery is fully synchronous: handlers run on the publishing thread,
//! in priority order, with no internal lock held while they execute.

use std::any::TypeId;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, trace};

use crate::dispatch::{notify_innermost, DispatchFrame, Dispatcher, ErasedDispatcher, FrameGuard};
use crate::error::{BusError, HandlerError};
use crate::event::Event;
use crate::handler::{HandlerId, Priority};
use crate::subscription::Subscription;

/// Synchronous publish/subscribe hub for in-process events.
///
/// Each event type gets its own dispatcher, created lazily on first use;
/// publishing one type never touches the handlers of another. The bus is
/// neither `Clone` nor `Copy`: share it by reference or wrap it in an
/// [`Arc`] when handlers need to reach it from inside their callbacks.
///
/// ## Example
///
/// ```rust
/// use evbus::{EventBus, Priority};
///
/// struct Connected {
///     peer: String,
/// }
///
/// let bus = EventBus::new();
///
/// bus.subscribe(Priority::Normal, |ev: &Connected| {
///     println!("peer {} is up", ev.peer);
///     Ok(())
/// })?;
///
/// bus.publish(Connected { peer: "10.0.0.7".into() })?;
/// # Ok::<(), evbus::BusError>(())
/// ```
pub struct EventBus {
    /// One dispatcher per event `TypeId`, created on first use.
    dispatchers: DashMap<TypeId, Arc<dyn ErasedDispatcher>>,
    /// Resolves a handler id back to its event type for type-agnostic
    /// unsubscription.
    handler_types: DashMap<HandlerId, TypeId>,
    next_id: AtomicU64,
}

impl EventBus {
    /// Creates an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self {
            dispatchers: DashMap::new(),
            handler_types: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Registers `handler` for events of type `E` and returns its id.
    ///
    /// When called from inside a handler that is currently receiving an
    /// `E` on this bus, the new handler additionally runs on that
    /// in-flight event, exactly once, before the outer delivery moves on.
    /// The `Err` case only arises from that immediate invocation failing;
    /// the registration itself cannot fail and stays in place (the id is
    /// recoverable via [`BusError::handler_id`]).
    pub fn subscribe<E, F>(&self, priority: Priority, handler: F) -> Result<HandlerId, BusError>
    where
        E: Event,
        F: Fn(&E) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.subscribe_impl(priority, handler, false)
    }

    /// Registers a one-shot handler: it fires at most once, globally,
    /// no matter how many publishes race for it.
    ///
    /// Shares every other property with [`subscribe`](Self::subscribe),
    /// including participation in an in-flight delivery of `E`.
    pub fn subscribe_once<E, F>(
        &self,
        priority: Priority,
        handler: F,
    ) -> Result<HandlerId, BusError>
    where
        E: Event,
        F: Fn(&E) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.subscribe_impl(priority, handler, true)
    }

    /// Like [`subscribe`](Self::subscribe), but wraps the registration in
    /// a [`Subscription`] that unsubscribes when dropped.
    pub fn subscribe_scoped<E, F>(
        &self,
        priority: Priority,
        handler: F,
    ) -> Result<Subscription<'_>, BusError>
    where
        E: Event,
        F: Fn(&E) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        let id = self.subscribe(priority, handler)?;
        Ok(Subscription::new(self, id))
    }

    /// Like [`subscribe_once`](Self::subscribe_once), scoped.
    pub fn subscribe_once_scoped<E, F>(
        &self,
        priority: Priority,
        handler: F,
    ) -> Result<Subscription<'_>, BusError>
    where
        E: Event,
        F: Fn(&E) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        let id = self.subscribe_once(priority, handler)?;
        Ok(Subscription::new(self, id))
    }

    /// Removes the handler with `id`, whatever its event type.
    ///
    /// Unknown (or already removed) ids are a silent no-op, which keeps
    /// [`Subscription`] drops safe after a manual unsubscribe. Safe to
    /// call from inside a handler, including on the handler's own id: a
    /// delivery that has not reached the slot yet will skip it, and the
    /// running callback completes normally.
    pub fn unsubscribe(&self, id: HandlerId) {
        let Some((_, event_type)) = self.handler_types.remove(&id) else {
            return;
        };

        let dispatcher = match self.dispatchers.get(&event_type) {
            Some(entry) => Arc::clone(entry.value()),
            None => return,
        };

        let removed = dispatcher.remove(id);
        debug!(id = id.value(), removed, "handler unsubscribed");
    }

    /// Delivers `event` to every active handler of type `E`, in priority
    /// order, on the calling thread.
    ///
    /// Handlers of equal priority run in subscription order as of the
    /// start of this publish. A handler error aborts the remaining
    /// iteration and is returned; the bus stays usable. Re-entrant
    /// publishing (of this or any other event type) is allowed.
    pub fn publish<E: Event>(&self, event: E) -> Result<(), BusError> {
        let dispatcher = self.dispatcher_for::<E>();
        let event = Arc::new(event);

        let _frame = FrameGuard::push(DispatchFrame::new(
            self.identity(),
            Arc::clone(&dispatcher),
            Arc::clone(&event),
        ));

        trace!(event_type = std::any::type_name::<E>(), "publishing");
        dispatcher.deliver(&event)
    }

    /// Number of active handlers registered for `E`.
    ///
    /// Counts neither unsubscribed handlers nor one-shots that already
    /// fired.
    #[must_use]
    pub fn handler_count<E: Event>(&self) -> usize {
        let dispatcher = match self.dispatchers.get(&TypeId::of::<E>()) {
            Some(entry) => Arc::clone(entry.value()),
            None => return 0,
        };
        dispatcher.active_count()
    }

    fn subscribe_impl<E, F>(
        &self,
        priority: Priority,
        handler: F,
        one_shot: bool,
    ) -> Result<HandlerId, BusError>
    where
        E: Event,
        F: Fn(&E) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        let id = HandlerId::new(self.next_id.fetch_add(1, Ordering::Relaxed));

        let dispatcher = self.dispatcher_for::<E>();
        dispatcher.add(id, priority, Box::new(handler), one_shot);
        self.handler_types.insert(id, TypeId::of::<E>());

        debug!(id = id.value(), ?priority, one_shot, "handler subscribed");

        // A subscription issued mid-delivery of the same event type runs
        // the new handler on the in-flight event before the outer
        // iteration continues.
        notify_innermost(self.identity(), TypeId::of::<E>(), id)?;
        Ok(id)
    }

    /// Returns the dispatcher for `E`, creating it on first use.
    ///
    /// Insert-if-absent under the registry shard lock: exactly one
    /// dispatcher exists per event type for the bus's lifetime. The handle
    /// is cloned out so no registry lock is held while dispatcher state is
    /// touched.
    fn dispatcher_for<E: Event>(&self) -> Arc<Dispatcher<E>> {
        let erased = {
            let entry = self.dispatchers.entry(TypeId::of::<E>()).or_insert_with(|| {
                trace!(event_type = std::any::type_name::<E>(), "dispatcher created");
                Arc::new(Dispatcher::<E>::new()) as Arc<dyn ErasedDispatcher>
            });
            Arc::clone(entry.value())
        };

        match erased.into_any().downcast::<Dispatcher<E>>() {
            Ok(dispatcher) => dispatcher,
            // The registry is keyed by TypeId, so the entry for `E` can
            // only ever hold a Dispatcher<E>.
            Err(_) => unreachable!("dispatcher registry holds a foreign type"),
        }
    }

    /// Identity used to match dispatch frames back to this bus. Stable for
    /// the duration of any publish, since `publish` borrows `self`.
    fn identity(&self) -> usize {
        self as *const EventBus as usize
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("event_types", &self.dispatchers.len())
            .field("handlers", &self.handler_types.len())
            .finish()
    }
}
