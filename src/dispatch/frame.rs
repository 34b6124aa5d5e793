//! # Thread-local dispatch frames.
//!
//! Every `publish` pushes one frame describing the delivery in progress on
//! the current thread: which bus, which event type, and how to invoke a
//! single handler on the event being delivered. A subscription issued from
//! inside a handler scans this stack for the innermost matching delivery
//! and runs the new handler on its event; that is what implements the
//! subscribe-during-dispatch rule without any global registry.
//!
//! The stack is strictly per-thread, so it needs no locking. Frames never
//! outlive their `publish` call: [`FrameGuard`] pops on every exit path,
//! including unwinding out of a panicking handler.

use std::any::TypeId;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use crate::error::BusError;
use crate::handler::HandlerId;

use super::dispatcher::Dispatcher;

thread_local! {
    static DISPATCH_STACK: RefCell<Vec<Rc<DispatchFrame>>> = const { RefCell::new(Vec::new()) };
}

type Invoker = Box<dyn Fn(HandlerId) -> Result<(), BusError>>;

/// One in-flight delivery on the current thread.
pub(crate) struct DispatchFrame {
    /// Address of the publishing bus; distinguishes nested deliveries of
    /// the same event type on different buses.
    bus: usize,
    event_type: TypeId,
    /// Runs one handler on the event this frame is delivering. Owns the
    /// event and the dispatcher, so the frame is self-contained.
    invoke: Invoker,
}

impl DispatchFrame {
    pub(crate) fn new<E: 'static>(bus: usize, dispatcher: Arc<Dispatcher<E>>, event: Arc<E>) -> Self {
        Self {
            bus,
            event_type: TypeId::of::<E>(),
            invoke: Box::new(move |id| dispatcher.deliver_one(id, &event)),
        }
    }
}

/// Pops the frame pushed for one `publish`, even when a handler fails or
/// panics.
pub(crate) struct FrameGuard;

impl FrameGuard {
    pub(crate) fn push(frame: DispatchFrame) -> Self {
        DISPATCH_STACK.with(|stack| stack.borrow_mut().push(Rc::new(frame)));
        FrameGuard
    }
}

impl Drop for FrameGuard {
    fn drop(&mut self) {
        DISPATCH_STACK.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

/// Invokes `id` on the innermost in-flight delivery of `event_type` on the
/// bus identified by `bus`, if the current thread is inside one.
///
/// The frame is cloned out of the stack before the handler runs: handlers
/// may publish again (pushing further frames), so no borrow of the stack
/// may span the invocation.
pub(crate) fn notify_innermost(
    bus: usize,
    event_type: TypeId,
    id: HandlerId,
) -> Result<(), BusError> {
    let frame = DISPATCH_STACK.with(|stack| {
        stack
            .borrow()
            .iter()
            .rev()
            .find(|frame| frame.bus == bus && frame.event_type == event_type)
            .cloned()
    });

    match frame {
        Some(frame) => (frame.invoke)(id),
        None => Ok(()),
    }
}
