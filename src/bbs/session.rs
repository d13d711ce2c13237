use chrono::{DateTime, Utc};
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncWrite, AsyncWriteExt};

use super::events::{EventSource, TermDetected, TermEvent};
use crate::logutil::escape_bytes;

/// Write half of a connection. Boxed so TCP, duplex pipes in tests and anything else
/// byte-shaped can back a session.
pub type Transport = Box<dyn AsyncWrite + Send + Unpin>;

/// # Connected Terminal Session
///
/// One per accepted connection, owned by that connection's task for its whole
/// lifetime. Holds the write side of the transport, the inbound [`EventSource`], and
/// everything learned about the terminal so far in [`TermState`].
///
/// ## Bootstrap Stages
///
/// Sessions walk through [`BootstrapStage`] in order while the connection bootstrap
/// runs:
/// 1. **Connected** - socket accepted, nothing sent yet
/// 2. **DeviceAttributes** - DA query written
/// 3. **HomePosition** - probing cursor origin (0- vs 1-based)
/// 4. **ScreenSize** - probing width and height
/// 5. **Priming** - attributes reset and screen cleared
/// 6. **Banner** - welcome banner written
/// 7. **Detected** - `TermDetected` published
/// 8. **Menu** - handed off to the menu stack
/// 9. **Disconnected** - connection gone
///
/// ## Usage
///
/// ```rust,no_run
/// use ansibbs::bbs::events::EventSource;
/// use ansibbs::bbs::session::{BootstrapStage, Session};
///
/// let (_tx, events) = EventSource::channel();
/// let session = Session::new("127.0.0.1:5000", Box::new(tokio::io::sink()), events);
/// assert_eq!(session.stage, BootstrapStage::Connected);
/// assert!(!session.term.size_known());
/// ```
pub struct Session {
    pub id: String,
    pub peer: String,
    pub term: TermState,
    pub events: EventSource,
    pub stage: BootstrapStage,
    pub connected_at: DateTime<Utc>,
    transport: Transport,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum BootstrapStage {
    Connected,
    DeviceAttributes,
    HomePosition,
    ScreenSize,
    Priming,
    Banner,
    Detected,
    Menu,
    Disconnected,
}

/// What is known about the remote terminal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TermState {
    /// Rows; 0 while unknown
    pub term_height: u16,
    /// Columns; 0 while unknown
    pub term_width: u16,
    /// Added to every reported cursor coordinate (1 for 0-based terminals)
    pub cpr_offset: u16,
    /// Family derived from the device attributes reply, if any arrived
    pub term_type: Option<String>,
    pub device_attributes: Option<Vec<u32>>,
}

impl TermState {
    pub fn size_known(&self) -> bool {
        self.term_height > 0 && self.term_width > 0
    }

    /// Fold an event that nobody is waiting for into the terminal state.
    ///
    /// Window size and device attributes update what we know; stray cursor reports and
    /// keystrokes typed during negotiation are dropped.
    pub fn absorb(&mut self, event: TermEvent) {
        match event {
            TermEvent::WindowSize { width, height } => {
                debug!("out-of-band size {}x{}", width, height);
                self.term_width = width;
                self.term_height = height;
            }
            TermEvent::DeviceAttributes(da) => {
                let family = da.terminal_family();
                debug!("device attributes {:?} -> {}", da.params, family);
                self.term_type = Some(family.to_string());
                self.device_attributes = Some(da.params);
            }
            TermEvent::CursorPositionReport(report) => {
                trace!("unsolicited cursor position report {report} dropped");
            }
            TermEvent::Input(bytes) => {
                trace!("input dropped: {}", escape_bytes(&bytes));
            }
        }
    }
}

impl Session {
    /// Create a new session with a fresh id
    pub fn new(peer: impl Into<String>, transport: Transport, events: EventSource) -> Self {
        Session {
            id: uuid::Uuid::new_v4().to_string(),
            peer: peer.into(),
            term: TermState::default(),
            events,
            stage: BootstrapStage::Connected,
            connected_at: Utc::now(),
            transport,
        }
    }

    /// Write bytes verbatim and flush.
    pub async fn raw_write(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        trace!("session {} <- {}", self.id, escape_bytes(bytes));
        self.transport.write_all(bytes).await?;
        self.transport.flush().await
    }

    /// Write text for display, translating bare `\n` into `\r\n`.
    pub async fn write_text(&mut self, text: &str) -> std::io::Result<()> {
        let mut out = String::with_capacity(text.len() + 16);
        let mut prev = '\0';
        for ch in text.chars() {
            if ch == '\n' && prev != '\r' {
                out.push('\r');
            }
            out.push(ch);
            prev = ch;
        }
        self.raw_write(out.as_bytes()).await
    }

    /// Fold everything already queued on the event source into the terminal state.
    /// Returns how many events were absorbed.
    pub fn drain_pending(&mut self) -> usize {
        let mut absorbed = 0;
        while let Some(event) = self.events.try_recv() {
            self.term.absorb(event);
            absorbed += 1;
        }
        absorbed
    }

    pub fn set_stage(&mut self, stage: BootstrapStage) {
        debug!("session {}: {:?} -> {:?}", self.id, self.stage, stage);
        self.stage = stage;
    }

    /// Snapshot used for the `TermDetected` announcement.
    pub fn detected(&self, degraded: bool) -> TermDetected {
        TermDetected {
            session_id: self.id.clone(),
            peer: self.peer.clone(),
            term_height: self.term.term_height,
            term_width: self.term.term_width,
            cpr_offset: self.term.cpr_offset,
            term_type: self.term.term_type.clone(),
            degraded,
        }
    }

    /// Time since accept
    pub fn session_duration(&self) -> chrono::Duration {
        Utc::now() - self.connected_at
    }

    pub async fn shutdown(&mut self) {
        self.set_stage(BootstrapStage::Disconnected);
        let _ = self.transport.shutdown().await;
    }
}
