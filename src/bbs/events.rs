//! Event plumbing for a connected terminal.
//!
//! Two very different things live here:
//!
//! * [`EventSource`] - the per-session inbound stream of decoded terminal events, with a
//!   single listener slot that a [`PendingQuery`] occupies while a negotiation step waits
//!   for its answer.
//! * [`SystemEvents`] - the process-wide broadcast bus on which sessions announce
//!   themselves (`TermDetected`) for any interested subsystem.

use log::trace;
use serde::Serialize;
use tokio::sync::{broadcast, mpsc};
use tokio::time::Instant;

use super::errors::NegotiationError;
use crate::ansi::decoder::DeviceAttributes;
use crate::ansi::CursorPositionReport;

/// One decoded unit of inbound traffic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TermEvent {
    CursorPositionReport(CursorPositionReport),
    DeviceAttributes(DeviceAttributes),
    /// Telnet NAWS report
    WindowSize { width: u16, height: u16 },
    /// Anything that is not a recognized reply (keystrokes, unknown sequences)
    Input(Vec<u8>),
}

impl TermEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            TermEvent::CursorPositionReport(_) => EventKind::CursorPositionReport,
            TermEvent::DeviceAttributes(_) => EventKind::DeviceAttributes,
            TermEvent::WindowSize { .. } => EventKind::WindowSize,
            TermEvent::Input(_) => EventKind::Input,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    CursorPositionReport,
    DeviceAttributes,
    WindowSize,
    Input,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EventKind::CursorPositionReport => "cursor position report",
            EventKind::DeviceAttributes => "device attributes",
            EventKind::WindowSize => "window size",
            EventKind::Input => "input",
        };
        f.write_str(name)
    }
}

/// The registered listener while a query is outstanding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Listener {
    pub expected: EventKind,
    pub issued_at: Instant,
    pub deadline: Instant,
}

/// Inbound events for one session, fed by the connection's reader task.
pub struct EventSource {
    rx: mpsc::UnboundedReceiver<TermEvent>,
    listener: Option<Listener>,
}

impl EventSource {
    pub fn new(rx: mpsc::UnboundedReceiver<TermEvent>) -> Self {
        Self { rx, listener: None }
    }

    /// Convenience constructor returning the feeding half alongside the source.
    pub fn channel() -> (mpsc::UnboundedSender<TermEvent>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Self::new(rx))
    }

    /// 0 or 1; a session never has more than one query outstanding.
    pub fn listener_count(&self) -> usize {
        usize::from(self.listener.is_some())
    }

    pub fn listener(&self) -> Option<Listener> {
        self.listener
    }

    /// Next event with no query outstanding (post-bootstrap consumption).
    pub async fn recv(&mut self) -> Option<TermEvent> {
        debug_assert!(self.listener.is_none(), "recv() while a query is pending");
        self.rx.recv().await
    }

    /// Already-queued event, if any, without waiting.
    pub fn try_recv(&mut self) -> Option<TermEvent> {
        self.rx.try_recv().ok()
    }

    /// Occupy the listener slot until the returned guard is resolved, expired or dropped.
    pub fn register(&mut self, expected: EventKind, deadline: Instant) -> PendingQuery<'_> {
        let listener = Listener {
            expected,
            issued_at: Instant::now(),
            deadline,
        };
        debug_assert!(self.listener.is_none(), "listener slot already occupied");
        self.listener = Some(listener);
        trace!("listener registered for {expected}");
        PendingQuery {
            source: self,
            listener,
        }
    }
}

/// An outstanding query. Resolution consumes the guard, so it happens at most once; the
/// listener slot is cleared on drop, which covers the response path, the deadline path
/// and cancellation when the owning task goes away mid-wait.
pub struct PendingQuery<'a> {
    source: &'a mut EventSource,
    listener: Listener,
}

impl PendingQuery<'_> {
    pub fn expected(&self) -> EventKind {
        self.listener.expected
    }

    pub fn deadline(&self) -> Instant {
        self.listener.deadline
    }

    /// Wait for the next inbound event of any kind. `None` once the reader side hangs up.
    pub async fn next_event(&mut self) -> Option<TermEvent> {
        self.source.rx.recv().await
    }

    /// Complete with the matching response.
    pub fn resolve(self, event: TermEvent) -> TermEvent {
        trace!(
            "{} answered after {}ms",
            self.listener.expected,
            self.listener.issued_at.elapsed().as_millis()
        );
        event
    }

    /// Complete because the deadline passed.
    pub fn expire(self) -> NegotiationError {
        NegotiationError::Timeout {
            expected: self.listener.expected,
            after: self.listener.deadline - self.listener.issued_at,
        }
    }

    /// Complete because the inbound channel closed.
    pub fn abandon(self) -> NegotiationError {
        NegotiationError::Closed(self.listener.expected)
    }
}

impl Drop for PendingQuery<'_> {
    fn drop(&mut self) {
        self.source.listener = None;
    }
}

/// Snapshot of a session announced once its terminal has been characterized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TermDetected {
    pub session_id: String,
    pub peer: String,
    pub term_height: u16,
    pub term_width: u16,
    pub cpr_offset: u16,
    pub term_type: Option<String>,
    /// Dimensions are the configured fallback rather than detected
    pub degraded: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SystemEvent {
    TermDetected(TermDetected),
}

impl SystemEvent {
    pub fn name(&self) -> &'static str {
        match self {
            SystemEvent::TermDetected(_) => "term_detected",
        }
    }
}

/// Process-wide publish/subscribe bus.
#[derive(Clone, Debug)]
pub struct SystemEvents {
    tx: broadcast::Sender<SystemEvent>,
}

impl Default for SystemEvents {
    fn default() -> Self {
        Self::new(64)
    }
}

impl SystemEvents {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish to current subscribers; returns how many received it (0 is fine).
    pub fn publish(&self, event: SystemEvent) -> usize {
        trace!("publish {}", event.name());
        self.tx.send(event).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SystemEvent> {
        self.tx.subscribe()
    }
}
