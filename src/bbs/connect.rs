//! # Connection Bootstrap
//!
//! Runs once per connection, between accept and the first menu:
//!
//! 1. device attributes query (fire-and-forget; the reply is picked up whenever it lands)
//! 2. home position negotiation
//! 3. screen size negotiation, falling back to the configured size
//! 4. attribute reset + clear screen
//! 5. welcome banner
//! 6. `TermDetected` announcement on the system bus
//! 7. short pause, then hand off to the menu stack
//!
//! Negotiation failures never stop the pipeline; the worst case is a session running
//! at the fallback size with no origin correction. The only early exit is the peer
//! going away.
use std::time::Duration;

use anyhow::{Context, Result};
use log::{debug, info, warn};

use super::events::{SystemEvent, SystemEvents};
use super::menu::MenuStack;
use super::negotiate::{discover_home_position, query_term_size_if_needed, HomeOrigin, SizeSource};
use super::session::{BootstrapStage, Session};
use crate::ansi;
use crate::config::TerminalConfig;
use crate::metrics;

const BANNER_TEMPLATE: &str = "{cyan}Connected to {green}ansi{bright}BBS {cyan}version {red}{version}\n\
{cyan}Copyright (c) 2024-2026 the ansibbs authors\n\
{cyan}Source {yellow}- {red}{repository}\n\
{cyan}Docs   {yellow}- {red}{documentation}\n";

const DOCUMENTATION_URL: &str = "https://docs.rs/ansibbs";

/// Deadlines, fallback and handoff target for one bootstrap run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapOptions {
    pub home_deadline: Duration,
    pub size_deadline: Duration,
    pub handoff_delay: Duration,
    pub fallback_width: u16,
    pub fallback_height: u16,
    pub entry_menu: String,
}

impl From<&TerminalConfig> for BootstrapOptions {
    fn from(cfg: &TerminalConfig) -> Self {
        Self {
            home_deadline: cfg.home_position_timeout(),
            size_deadline: cfg.screen_size_timeout(),
            handoff_delay: cfg.menu_handoff_delay(),
            fallback_width: cfg.fallback_width,
            fallback_height: cfg.fallback_height,
            entry_menu: cfg.entry_menu.clone(),
        }
    }
}

impl Default for BootstrapOptions {
    fn default() -> Self {
        Self::from(&TerminalConfig::default())
    }
}

/// Terminal facts the session ended up with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapOutcome {
    pub term_height: u16,
    pub term_width: u16,
    pub cpr_offset: u16,
    /// `None` when home negotiation failed
    pub home: Option<HomeOrigin>,
    /// `None` when size negotiation failed
    pub size: Option<SizeSource>,
    /// Size is the fallback rather than anything the terminal told us
    pub degraded: bool,
}

/// Welcome banner with colors applied and the version and project links filled in.
pub fn banner() -> String {
    let mut text = BANNER_TEMPLATE
        .replace("{cyan}", &ansi::sgr(&[0, 36]))
        .replace("{green}", &ansi::sgr(&[0, 32]))
        .replace("{bright}", &ansi::sgr(&[1, 32]))
        .replace("{yellow}", &ansi::sgr(&[1, 33]))
        .replace("{red}", &ansi::sgr(&[1, 31]))
        .replace("{version}", env!("CARGO_PKG_VERSION"))
        .replace("{repository}", env!("CARGO_PKG_REPOSITORY"))
        .replace("{documentation}", DOCUMENTATION_URL);
    text.push_str(ansi::normal());
    text
}

/// Characterize the terminal, greet it, announce it and hand it to the menu stack.
///
/// Returns an error only if the connection dropped (or the menu stack refused the
/// entry menu); every negotiation problem is absorbed into the outcome.
pub async fn connect_entry(
    session: &mut Session,
    opts: &BootstrapOptions,
    bus: &SystemEvents,
    menu: &mut dyn MenuStack,
) -> Result<BootstrapOutcome> {
    session.set_stage(BootstrapStage::DeviceAttributes);
    session
        .raw_write(ansi::query_device_attributes(0).as_bytes())
        .await?;

    session.set_stage(BootstrapStage::HomePosition);
    let home = match discover_home_position(session, opts.home_deadline).await {
        Ok(origin) => Some(origin),
        Err(e) if e.is_disconnect() => return Err(e.into()),
        Err(e) => {
            warn!("session {}: home position discovery: {}", session.id, e);
            None
        }
    };

    session.set_stage(BootstrapStage::ScreenSize);
    let mut degraded = false;
    let size = match query_term_size_if_needed(session, opts.size_deadline).await {
        Ok(source) => Some(source),
        Err(e) if e.is_disconnect() => return Err(e.into()),
        Err(e) => {
            // NAWS may still have landed while we were waiting.
            if session.term.size_known() {
                debug!(
                    "session {}: size query failed ({}) but size known ({}x{})",
                    session.id, e, session.term.term_width, session.term.term_height
                );
            } else {
                session.term.term_height = opts.fallback_height;
                session.term.term_width = opts.fallback_width;
                degraded = true;
                metrics::inc_size_fallbacks();
                warn!(
                    "session {}: could not determine screen size ({}); assuming {}x{}",
                    session.id, e, opts.fallback_width, opts.fallback_height
                );
            }
            None
        }
    };

    session.set_stage(BootstrapStage::Priming);
    let prime = format!(
        "{}{}{}",
        ansi::normal(),
        ansi::clear_screen(),
        ansi::cursor_home()
    );
    session.raw_write(prime.as_bytes()).await?;

    session.set_stage(BootstrapStage::Banner);
    session.write_text(&banner()).await?;

    session.set_stage(BootstrapStage::Detected);
    let detected = session.detected(degraded);
    info!(
        "session {}: terminal {}x{} cpr_offset={} type={} degraded={}",
        session.id,
        detected.term_width,
        detected.term_height,
        detected.cpr_offset,
        detected.term_type.as_deref().unwrap_or("unknown"),
        degraded
    );
    bus.publish(SystemEvent::TermDetected(detected));
    metrics::inc_bootstraps_completed();

    tokio::time::sleep(opts.handoff_delay).await;
    session.set_stage(BootstrapStage::Menu);
    menu.goto(&opts.entry_menu)
        .with_context(|| format!("entering menu '{}'", opts.entry_menu))?;

    Ok(BootstrapOutcome {
        term_height: session.term.term_height,
        term_width: session.term.term_width,
        cpr_offset: session.term.cpr_offset,
        home,
        size,
        degraded,
    })
}
