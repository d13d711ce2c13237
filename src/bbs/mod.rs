//! # BBS Core Module
//!
//! Everything between a raw accepted socket and the first menu.
//!
//! ## Components
//!
//! - [`server`] - Listener, per-connection tasks, telnet/decoder pump
//! - [`session`] - Per-connection state: transport, terminal facts, bootstrap stage
//! - [`events`] - Inbound event source with its single listener slot; system bus
//! - [`query`] - Deadline-bounded query primitive
//! - [`negotiate`] - Home position and screen size negotiators
//! - [`connect`] - The bootstrap pipeline and welcome banner
//! - [`menu`] - Seam to the menu-navigation stack
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  connect_entry  │ ← Ordered bootstrap, never fails on negotiation
//! └─────────────────┘
//!          │
//! ┌─────────────────┐
//! │  negotiators    │ ← Home position, screen size
//! └─────────────────┘
//!          │
//! ┌─────────────────┐
//! │  query::issue   │ ← Write, wait for one answer or the deadline
//! └─────────────────┘
//!          │
//! ┌─────────────────┐
//! │  EventSource    │ ← Decoded replies from the reader task
//! └─────────────────┘
//! ```
//!
//! ## Session Lifecycle
//!
//! 1. Caller connects; server spawns a connection task
//! 2. Telnet options offered (ECHO, SGA, NAWS)
//! 3. Terminal negotiated: origin offset, then screen size
//! 4. Screen primed, banner shown, `TermDetected` published
//! 5. Half a second later the menu stack takes over
//! 6. Session ends when the caller disconnects

pub mod connect;
pub mod errors;
pub mod events;
pub mod menu;
pub mod negotiate;
pub mod query;
pub mod server;
pub mod session;

pub use server::BbsServer;
