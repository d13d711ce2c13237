//! Deadline-bounded terminal query.
//!
//! Write a query, then wait for exactly one answer of the expected kind or for the
//! deadline, whichever comes first. Unrelated traffic that shows up in the meantime
//! (NAWS, device attributes, keystrokes) is folded into the session's terminal state
//! rather than mistaken for the answer. No retries; callers decide what a timeout means.
use std::time::Duration;

use log::debug;
use tokio::time::{timeout_at, Instant};

use super::errors::NegotiationError;
use super::events::{EventKind, TermEvent};
use super::session::Session;
use crate::ansi::CursorPositionReport;
use crate::logutil::escape_bytes;

/// Send `query` and await the next event of kind `expected`.
///
/// The session's event source holds a listener for the duration of the call and
/// none afterwards, whichever way the call ends.
pub async fn issue(
    session: &mut Session,
    query: &[u8],
    expected: EventKind,
    deadline: Duration,
) -> Result<TermEvent, NegotiationError> {
    debug!(
        "session {}: query {} awaiting {} ({}ms)",
        session.id,
        escape_bytes(query),
        expected,
        deadline.as_millis()
    );
    // Anything queued now arrived while nobody was listening (e.g. a reply to an
    // earlier query that already timed out); it must not answer this one.
    session.drain_pending();
    session.raw_write(query).await?;

    let until = Instant::now() + deadline;
    let mut pending = session.events.register(expected, until);
    loop {
        match timeout_at(pending.deadline(), pending.next_event()).await {
            Ok(Some(event)) if event.kind() == expected => return Ok(pending.resolve(event)),
            Ok(Some(other)) => session.term.absorb(other),
            Ok(None) => return Err(pending.abandon()),
            Err(_) => return Err(pending.expire()),
        }
    }
}

/// [`issue`] for the common case of a cursor position report.
pub async fn query_cursor_position(
    session: &mut Session,
    query: &[u8],
    deadline: Duration,
) -> Result<CursorPositionReport, NegotiationError> {
    match issue(session, query, EventKind::CursorPositionReport, deadline).await? {
        TermEvent::CursorPositionReport(report) => Ok(report),
        other => Err(NegotiationError::UnexpectedState(format!(
            "expected cursor position report, got {}",
            other.kind()
        ))),
    }
}
