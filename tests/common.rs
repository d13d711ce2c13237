//! Test utilities & fixtures.
//! A session wired to an in-memory duplex pipe, scripted terminal replies, and a menu
//! stack that records when it was entered.
#![allow(dead_code)] // Each test binary uses a different subset.

use ansibbs::ansi::CursorPositionReport;
use ansibbs::bbs::events::{EventSource, TermEvent};
use ansibbs::bbs::menu::MenuStack;
use ansibbs::bbs::session::Session;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, DuplexStream};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::Instant;

pub struct Harness {
    /// Feeds decoded terminal events into the session
    pub tx: UnboundedSender<TermEvent>,
    /// Terminal side of the transport; everything the session writes shows up here
    pub client: DuplexStream,
    pub session: Session,
}

pub fn harness() -> Harness {
    let (client, server) = tokio::io::duplex(64 * 1024);
    let (tx, events) = EventSource::channel();
    Harness {
        tx,
        client,
        session: Session::new("test-peer", Box::new(server), events),
    }
}

pub fn cpr(row: u16, col: u16) -> TermEvent {
    TermEvent::CursorPositionReport(CursorPositionReport::new(row, col))
}

/// Deliver `event` to the session `delay_ms` from now.
pub fn reply_after(tx: &UnboundedSender<TermEvent>, delay_ms: u64, event: TermEvent) -> JoinHandle<()> {
    let tx = tx.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        let _ = tx.send(event);
    })
}

/// Close the session's side and collect everything it wrote.
pub async fn written(session: Session, mut client: DuplexStream) -> Vec<u8> {
    drop(session);
    let mut out = Vec::new();
    client.read_to_end(&mut out).await.expect("read transport");
    out
}

pub fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Read from `stream` until `needle` has been seen; returns everything read so far.
pub async fn read_until<S: AsyncRead + Unpin>(stream: &mut S, needle: &[u8], seen: &mut Vec<u8>) {
    let wait = async {
        let mut buf = [0u8; 512];
        while find(seen, needle).is_none() {
            let n = stream.read(&mut buf).await.expect("read");
            assert!(n > 0, "stream closed before {:?} arrived", String::from_utf8_lossy(needle));
            seen.extend_from_slice(&buf[..n]);
        }
    };
    tokio::time::timeout(Duration::from_secs(10), wait)
        .await
        .expect("timed out waiting for expected bytes");
}

/// Menu stack that remembers every `goto` and when it happened.
#[derive(Default)]
pub struct RecordingMenu {
    pub visits: Vec<(String, Instant)>,
}

impl MenuStack for RecordingMenu {
    fn goto(&mut self, name: &str) -> anyhow::Result<()> {
        self.visits.push((name.to_string(), Instant::now()));
        Ok(())
    }

    fn current(&self) -> Option<&str> {
        self.visits.last().map(|(n, _)| n.as_str())
    }
}

pub fn within(elapsed: Duration, expected_ms: u64) -> bool {
    elapsed >= Duration::from_millis(expected_ms) && elapsed < Duration::from_millis(expected_ms + 20)
}
