//! # Delivery engine internals.
//!
//! One [`Dispatcher`] exists per event type; the bus reaches it through
//! the type-erased [`ErasedDispatcher`] interface and coordinates
//! re-entrant deliveries through the thread-local frame stack in
//! [`frame`].

mod dispatcher;
mod erased;
mod frame;

pub(crate) use dispatcher::Dispatcher;
pub(crate) use erased::ErasedDispatcher;
pub(crate) use frame::{notify_innermost, DispatchFrame, FrameGuard};
