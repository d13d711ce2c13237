//! # ansibbs - Telnet Bulletin Board System
//!
//! ansibbs hosts ANSI-BBS terminal callers over telnet. Before a caller reaches the
//! menus, the server works out what kind of terminal is on the other end using nothing
//! but escape sequences and deadlines.
//!
//! ## Features
//!
//! - **Origin detection**: Spots terminals that count cursor positions from 0 and records a correction offset.
//! - **Screen size detection**: Sentinel cursor goto plus the `ESC[255n` size report, raced against telnet NAWS.
//! - **Never stalls a caller**: Every probe has a deadline; anything unanswered falls back to 80×25.
//! - **Async Design**: One Tokio task per caller; sessions share no mutable state.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ansibbs::config::Config;
//! use ansibbs::bbs::BbsServer;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml").await?;
//!     let mut server = BbsServer::new(config).await?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`bbs`] - Server, sessions, negotiation and the bootstrap pipeline
//! - [`ansi`] - Escape sequence encoders and the inbound reply decoder
//! - [`telnet`] - IAC stripping and NAWS
//! - [`config`] - Configuration management and validation
//! - [`metrics`] - Negotiation outcome counters
//! - [`logutil`] - Log-safe rendering of raw terminal bytes

pub mod ansi;
pub mod bbs;
pub mod config;
pub mod logutil;
pub mod metrics;
pub mod telnet;
