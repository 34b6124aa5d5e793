//! # Event payload constraint.

/// Marker for types that can travel over an [`EventBus`](crate::EventBus).
///
/// Any `'static` type qualifies; the bus keys its dispatchers on the
/// payload's [`TypeId`](std::any::TypeId), so the payload carries no
/// registration metadata of its own. Implemented automatically; there is
/// nothing to derive.
pub trait Event: 'static {}

impl<T: 'static> Event for T {}
