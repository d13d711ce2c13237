//! Terminal capability negotiators.
//!
//! Both negotiators ride on [`query_cursor_position`]: put the cursor somewhere known,
//! ask where it ended up, and read a physical fact off the answer.
//!
//! * Home position: after `ESC[H` a standards-conforming terminal reports `1;1`. Some
//!   clients report `0;0`; those need every later report shifted by one.
//! * Screen size: `ESC[999;999H` clamps the cursor to the bottom-right cell, so the
//!   report *is* the screen size. `ESC[255n` is sent alongside for terminals that
//!   implement the non-standard size report instead.
use std::time::Duration;

use log::{debug, info};

use super::errors::NegotiationError;
use super::query::query_cursor_position;
use super::session::Session;
use crate::ansi::{self, CursorPositionReport};
use crate::metrics;

pub const HOME_POSITION_DEADLINE: Duration = Duration::from_millis(3000);
pub const SCREEN_SIZE_DEADLINE: Duration = Duration::from_millis(2000);

/// Out-of-range goto coordinate; a terminal that honors the goto never reports it back.
pub const SIZE_SENTINEL: u16 = 999;
/// Smallest height or width accepted from a size report.
pub const MIN_DIMENSION: u16 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HomeOrigin {
    /// Reports `0;0` at home; needs `cpr_offset = 1`
    ZeroBased,
    /// ANSI-standard `1;1` (mixed `0;1` / `1;0` also land here)
    OneBased,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeSource {
    /// Size was known before negotiation; nothing was sent
    AlreadyKnown,
    /// Size arrived via another channel (NAWS) while the query was outstanding
    OutOfBand,
    /// Taken from the sentinel cursor report
    Detected,
}

/// Classify a report taken with the cursor at home.
pub fn classify_home_position(report: CursorPositionReport) -> Result<HomeOrigin, NegotiationError> {
    if report.row > 1 || report.col > 1 {
        return Err(NegotiationError::UnexpectedState(format!(
            "home position report expected 0 or 1, got {report}"
        )));
    }
    if report.row == 0 && report.col == 0 {
        Ok(HomeOrigin::ZeroBased)
    } else {
        Ok(HomeOrigin::OneBased)
    }
}

/// Sanity-check a sentinel report; returns `(height, width)`.
pub fn validate_screen_size(report: CursorPositionReport) -> Result<(u16, u16), NegotiationError> {
    let (height, width) = (report.row, report.col);
    if height < MIN_DIMENSION || width < MIN_DIMENSION {
        return Err(NegotiationError::Invalid(format!(
            "screen size {width}x{height} below {MIN_DIMENSION}x{MIN_DIMENSION}"
        )));
    }
    if height == SIZE_SENTINEL || width == SIZE_SENTINEL {
        return Err(NegotiationError::Invalid(format!(
            "screen size {width}x{height} echoes the goto sentinel"
        )));
    }
    Ok((height, width))
}

/// Work out whether the terminal counts rows/columns from 0 or 1.
///
/// Only a `0;0` answer changes anything (`cpr_offset = 1`). Timeouts and implausible
/// answers leave the offset alone and come back as errors for the caller to log.
pub async fn discover_home_position(
    session: &mut Session,
    deadline: Duration,
) -> Result<HomeOrigin, NegotiationError> {
    let query = format!("{}{}", ansi::cursor_home(), ansi::query_position());
    let report = query_cursor_position(session, query.as_bytes(), deadline)
        .await
        .map_err(|e| {
            if matches!(e, NegotiationError::Timeout { .. }) {
                metrics::inc_home_timeouts();
            }
            e
        })?;

    let origin = classify_home_position(report).map_err(|e| {
        metrics::inc_home_unexpected();
        e
    })?;
    match origin {
        HomeOrigin::ZeroBased => {
            session.term.cpr_offset = 1;
            metrics::inc_home_offset_applied();
            info!("session {}: terminal reports 0-based positions; cpr_offset=1", session.id);
        }
        HomeOrigin::OneBased => {
            debug!("session {}: home position {} needs no correction", session.id, report);
        }
    }
    Ok(origin)
}

/// Probe width and height unless both are already known.
///
/// On success `term_height`/`term_width` are set. Timeouts and rejected reports are
/// returned as errors; choosing a fallback is the caller's job.
pub async fn query_term_size_if_needed(
    session: &mut Session,
    deadline: Duration,
) -> Result<SizeSource, NegotiationError> {
    // A NAWS report may be sitting in the queue behind the home position reply.
    session.drain_pending();
    if session.term.size_known() {
        debug!(
            "session {}: size already known ({}x{}); skipping query",
            session.id, session.term.term_width, session.term.term_height
        );
        return Ok(SizeSource::AlreadyKnown);
    }

    let query = format!(
        "{}{}",
        ansi::goto(SIZE_SENTINEL, SIZE_SENTINEL),
        ansi::query_screen_size()
    );
    let report = query_cursor_position(session, query.as_bytes(), deadline)
        .await
        .map_err(|e| {
            if matches!(e, NegotiationError::Timeout { .. }) {
                metrics::inc_size_timeouts();
            }
            e
        })?;

    // Another channel may have answered while we waited; prefer it over this report.
    if session.term.size_known() {
        metrics::inc_size_out_of_band();
        debug!(
            "session {}: size arrived out-of-band ({}x{}); ignoring report {}",
            session.id, session.term.term_width, session.term.term_height, report
        );
        return Ok(SizeSource::OutOfBand);
    }

    let (height, width) = validate_screen_size(report).map_err(|e| {
        metrics::inc_size_rejected();
        e
    })?;
    session.term.term_height = height;
    session.term.term_width = width;
    metrics::inc_size_detected();
    info!("session {}: screen size {}x{}", session.id, width, height);
    Ok(SizeSource::Detected)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn home_classification() {
        let c = |r, c| classify_home_position(CursorPositionReport::new(r, c));
        assert_eq!(c(0, 0).unwrap(), HomeOrigin::ZeroBased);
        assert_eq!(c(1, 1).unwrap(), HomeOrigin::OneBased);
        assert_eq!(c(0, 1).unwrap(), HomeOrigin::OneBased);
        assert_eq!(c(1, 0).unwrap(), HomeOrigin::OneBased);
        for (r, col) in [(2, 1), (1, 2), (24, 80)] {
            assert!(matches!(c(r, col), Err(NegotiationError::UnexpectedState(_))));
        }
    }

    #[test]
    fn size_validation_bounds() {
        let v = |r, c| validate_screen_size(CursorPositionReport::new(r, c));
        assert_eq!(v(25, 80).unwrap(), (25, 80));
        assert_eq!(v(10, 10).unwrap(), (10, 10));
        assert!(matches!(v(5, 80), Err(NegotiationError::Invalid(_))));
        assert!(matches!(v(25, 9), Err(NegotiationError::Invalid(_))));
        assert!(matches!(v(25, 999), Err(NegotiationError::Invalid(_))));
        assert!(matches!(v(999, 80), Err(NegotiationError::Invalid(_))));
    }
}
