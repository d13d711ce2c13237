use anyhow::{anyhow, Result};
use log::{debug, info, trace, warn};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;

use super::connect::{connect_entry, BootstrapOptions};
use super::events::{EventSource, SystemEvent, SystemEvents, TermEvent};
use super::menu::NavStack;
use super::session::Session;
use crate::ansi::ResponseDecoder;
use crate::config::Config;
use crate::telnet::{self, TelnetChunk, TelnetFilter};

/// # BBS Server - Connection Acceptor
///
/// Accepts telnet (or raw TCP) callers and gives each one its own task running the
/// connection bootstrap, then the menu stack.
///
/// ## Architecture
///
/// ```text
/// ┌──────────────┐   accept   ┌──────────────────────────────────────────┐
/// │ TcpListener  │──────────→ │ connection task (one per caller)         │
/// └──────────────┘            │  reader: socket → telnet → decoder → mpsc│
///        │                    │  session: bootstrap → menu stack         │
///        │                    └──────────────────────────────────────────┘
///        │                                      │ TermDetected
///        ▼                                      ▼
/// ┌──────────────┐                     ┌──────────────────┐
/// │  run() loop  │ ←────────────────── │  SystemEvents    │
/// └──────────────┘                     └──────────────────┘
/// ```
///
/// ## Usage
///
/// ```rust,no_run
/// use ansibbs::bbs::BbsServer;
/// use ansibbs::config::Config;
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let config = Config::load("config.toml").await?;
///     let mut server = BbsServer::new(config).await?;
///     server.run().await
/// }
/// ```
///
/// Sessions share nothing mutable; the server only tracks how many are active so it
/// can turn callers away once `bbs.max_connections` is reached.
pub struct BbsServer {
    config: Config,
    bus: SystemEvents,
    listener: Option<TcpListener>,
    active: Arc<AtomicUsize>,
}

/// Decrements the active connection count when the connection task ends.
struct ConnectionSlot(Arc<AtomicUsize>);

impl Drop for ConnectionSlot {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl BbsServer {
    pub async fn new(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            bus: SystemEvents::default(),
            listener: None,
            active: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Bind the configured address (idempotent). Returns the bound address, which is
    /// how callers discover the port when binding to `:0`.
    pub async fn bind(&mut self) -> Result<SocketAddr> {
        if self.listener.is_none() {
            let listener = TcpListener::bind(&self.config.telnet.bind)
                .await
                .map_err(|e| anyhow!("Failed to bind {}: {}", self.config.telnet.bind, e))?;
            self.listener = Some(listener);
        }
        match &self.listener {
            Some(l) => Ok(l.local_addr()?),
            None => Err(anyhow!("listener unavailable")),
        }
    }

    /// Handle on the system bus, for subsystems that want `TermDetected`.
    pub fn events(&self) -> SystemEvents {
        self.bus.clone()
    }

    pub fn active_connections(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Accept connections until ctrl-c.
    pub async fn run(&mut self) -> Result<()> {
        let addr = self.bind().await?;
        let listener = self
            .listener
            .take()
            .ok_or_else(|| anyhow!("listener unavailable"))?;
        info!(
            "BBS '{}' (sysop {}) listening on {} ({})",
            self.config.bbs.name,
            self.config.bbs.sysop,
            addr,
            if self.config.telnet.enabled { "telnet" } else { "raw" }
        );

        let mut announcements = self.bus.subscribe();
        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => self.spawn_connection(stream, peer),
                        Err(e) => warn!("accept error: {e}"),
                    }
                }

                announced = announcements.recv() => {
                    match announced {
                        Ok(SystemEvent::TermDetected(d)) => {
                            debug!(
                                "term_detected session={} peer={} {}x{} offset={} degraded={}",
                                d.session_id, d.peer, d.term_width, d.term_height, d.cpr_offset, d.degraded
                            );
                        }
                        Err(RecvError::Lagged(n)) => debug!("system bus lagged; {n} events skipped"),
                        Err(RecvError::Closed) => {}
                    }
                }

                _ = tokio::signal::ctrl_c() => {
                    info!("Received shutdown signal");
                    break;
                }
            }
        }

        info!(
            "BBS shutting down ({} connection(s) still active)",
            self.active_connections()
        );
        Ok(())
    }

    fn spawn_connection(&self, stream: TcpStream, peer: SocketAddr) {
        let max = self.config.bbs.max_connections;
        if self.active.load(Ordering::SeqCst) >= max {
            warn!("rejecting {peer}: {max} connection(s) already active");
            let notice = format!(
                "{} is at capacity ({} callers). Please try again later.\r\n",
                self.config.bbs.name, max
            );
            tokio::spawn(async move {
                let mut stream = stream;
                let _ = stream.write_all(notice.as_bytes()).await;
                let _ = stream.shutdown().await;
            });
            return;
        }

        self.active.fetch_add(1, Ordering::SeqCst);
        let slot = ConnectionSlot(self.active.clone());
        let opts = BootstrapOptions::from(&self.config.terminal);
        let telnet = self.config.telnet.enabled;
        let bus = self.bus.clone();
        tokio::spawn(async move {
            let _slot = slot;
            if let Err(e) = handle_connection(stream, peer.to_string(), telnet, opts, bus).await {
                debug!("connection {peer} ended: {e:#}");
            }
        });
    }
}

/// Drive one connection from accept to disconnect.
pub async fn handle_connection<S>(
    stream: S,
    peer: String,
    telnet_enabled: bool,
    opts: BootstrapOptions,
    bus: SystemEvents,
) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    let (rd, wr) = tokio::io::split(stream);
    let (tx, events) = EventSource::channel();
    let reader = tokio::spawn(pump_events(rd, tx, telnet_enabled));

    let mut session = Session::new(peer, Box::new(wr), events);
    info!("session {} connected from {}", session.id, session.peer);

    let result = async {
        if telnet_enabled {
            session.raw_write(&telnet::initial_negotiation()).await?;
        }
        let mut menu = NavStack::new(session.id.clone());
        connect_entry(&mut session, &opts, &bus, &mut menu).await?;

        // Menus run elsewhere; keep folding terminal updates in until the caller leaves.
        while let Some(event) = session.events.recv().await {
            session.term.absorb(event);
        }
        Ok::<(), anyhow::Error>(())
    }
    .await;

    reader.abort();
    session.shutdown().await;
    info!(
        "session {} from {} disconnected after {}s",
        session.id,
        session.peer,
        session.session_duration().num_seconds()
    );
    result
}

/// Read the socket, strip telnet, decode terminal replies and forward them as events.
/// Returns when the socket closes or the session stops listening.
pub async fn pump_events<R>(mut rd: R, tx: mpsc::UnboundedSender<TermEvent>, telnet_enabled: bool)
where
    R: AsyncRead + Unpin,
{
    let mut filter = TelnetFilter::new();
    let mut decoder = ResponseDecoder::new();
    let mut buf = [0u8; 1024];
    loop {
        let n = match rd.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                debug!("read error: {e}");
                break;
            }
        };
        let chunks = if telnet_enabled {
            filter.feed(&buf[..n])
        } else {
            vec![TelnetChunk::Data(buf[..n].to_vec())]
        };
        for chunk in chunks {
            let mut events = Vec::new();
            match chunk {
                TelnetChunk::Data(data) => {
                    decoder.push(&data);
                    events.extend(std::iter::from_fn(|| decoder.next_event()));
                }
                TelnetChunk::WindowSize { width, height } => {
                    events.push(TermEvent::WindowSize { width, height });
                }
            }
            for event in events {
                trace!("event {:?}", event.kind());
                if tx.send(event).is_err() {
                    return;
                }
            }
        }
    }
}
