//! # Error types surfaced by the bus.
//!
//! The bus raises no control-flow errors of its own; the only failure it
//! reports is a handler failing mid-delivery:
//!
//! - [`HandlerError`] is what a handler returns to abort the delivery.
//! - [`BusError`] is what the publisher receives, wrapping the handler's
//!   error together with the offending [`HandlerId`].

use thiserror::Error;

use crate::handler::HandlerId;

/// Error a handler returns to abort the current delivery.
///
/// Any error type can be boxed into this; `?` and `.into()` work on
/// everything implementing [`std::error::Error`], and plain strings
/// convert too (`Err("boom".into())`).
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors produced by publishing or subscribing.
///
/// Every variant wraps a failure reported by a user handler; the bus
/// itself stays consistent and usable after any of them.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum BusError {
    /// A handler returned an error during delivery.
    ///
    /// Delivery stops at the failing handler: slots not yet visited are
    /// skipped for this publish only. Subsequent publishes are unaffected.
    #[error("handler {id} failed: {source}")]
    HandlerFailed {
        /// Identifier of the failing handler.
        id: HandlerId,
        /// The error the handler reported.
        #[source]
        source: HandlerError,
    },
}

impl BusError {
    pub(crate) fn handler_failed(id: HandlerId, source: HandlerError) -> Self {
        BusError::HandlerFailed { id, source }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            BusError::HandlerFailed { .. } => "handler_failed",
        }
    }

    /// Identifier of the handler the error originates from.
    pub fn handler_id(&self) -> HandlerId {
        match self {
            BusError::HandlerFailed { id, .. } => *id,
        }
    }
}
