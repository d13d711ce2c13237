use std::time::Duration;

use thiserror::Error;

use super::events::EventKind;

/// Errors raised while negotiating terminal capabilities.
///
/// None of these abort a connection on their own: the bootstrap pipeline logs them
/// and falls back to safe defaults. Only [`NegotiationError::Closed`] and
/// [`NegotiationError::Io`] mean the peer is gone.
#[derive(Debug, Error)]
pub enum NegotiationError {
    /// The terminal answered with data that cannot be right for the question asked.
    #[error("unexpected state: {0}")]
    UnexpectedState(String),

    /// The answer failed sanity bounds.
    #[error("invalid response: {0}")]
    Invalid(String),

    /// No matching response before the deadline.
    #[error("no {expected} within {}ms", .after.as_millis())]
    Timeout { expected: EventKind, after: Duration },

    /// Inbound side of the connection closed while a query was outstanding.
    #[error("connection closed while awaiting {0}")]
    Closed(EventKind),

    /// Writing the query to the transport failed.
    #[error("transport error: {0}")]
    Io(#[from] std::io::Error),
}

impl NegotiationError {
    /// True when the peer is gone and there is nothing left to negotiate with.
    pub fn is_disconnect(&self) -> bool {
        matches!(self, NegotiationError::Closed(_) | NegotiationError::Io(_))
    }
}
