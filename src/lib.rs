//! # evbus
//!
//! **evbus** is a synchronous, type-safe in-process event bus.
//!
//! Producers publish plain-value events; registered handlers receive them
//! on the publishing thread, in priority order. The bus is built for full
//! re-entrancy: a handler may publish further events, subscribe new
//! handlers, or unsubscribe any handler (itself included) while the
//! delivery that invoked it is still running.
//!
//! ## Features
//!
//! | Area              | Description                                                        | Key types                      |
//! |-------------------|--------------------------------------------------------------------|--------------------------------|
//! | **Publishing**    | Synchronous, priority-ordered delivery, one dispatcher per type.   | [`EventBus`]                   |
//! | **Subscriptions** | Permanent, one-shot, and scoped (auto-unsubscribing) registrations.| [`HandlerId`], [`Subscription`]|
//! | **Priorities**    | Three delivery classes, subscription order within a class.         | [`Priority`]                   |
//! | **Errors**        | Handler failures abort the delivery and surface to the publisher.  | [`BusError`], [`HandlerError`] |
//!
//! ## Guarantees
//!
//! - A one-shot handler fires at most once, globally, under any number of
//!   concurrent publishers.
//! - A handler subscribed during delivery of its own event type observes
//!   the in-flight event exactly once.
//! - An unsubscribed handler is skipped for the remainder of any in-flight
//!   delivery that has not reached it yet.
//! - No internal lock is held while a handler runs; re-entrant publishing
//!   cannot deadlock.
//!
//! ## Example
//!
//! ```rust
//! use evbus::{EventBus, Priority};
//!
//! struct Tick {
//!     n: u32,
//! }
//!
//! let bus = EventBus::new();
//!
//! bus.subscribe(Priority::High, |tick: &Tick| {
//!     println!("high sees {}", tick.n);
//!     Ok(())
//! })?;
//!
//! let low = bus.subscribe(Priority::Low, |tick: &Tick| {
//!     println!("low sees {}", tick.n);
//!     Ok(())
//! })?;
//!
//! bus.publish(Tick { n: 1 })?;
//!
//! bus.unsubscribe(low);
//! assert_eq!(bus.handler_count::<Tick>(), 1);
//! # Ok::<(), evbus::BusError>(())
//! ```

mod bus;
mod dispatch;
mod error;
mod event;
mod handler;
mod subscription;

pub use bus::EventBus;
pub use error::{BusError, HandlerError};
pub use event::Event;
pub use handler::{HandlerId, Priority};
pub use subscription::Subscription;
