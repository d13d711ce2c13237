//! # ANSI Escape-Sequence Codec
//!
//! Encoders for the handful of control sequences the connection bootstrap sends to a
//! freshly connected terminal, plus the decoder for cursor position report payloads.
//!
//! All outbound sequences are bit-exact with what VT100 / ANSI-BBS clients expect:
//!
//! | Purpose                         | Sequence           |
//! |---------------------------------|--------------------|
//! | Device attributes query         | `ESC [ 0 c`        |
//! | Cursor home                     | `ESC [ H`          |
//! | Cursor goto(row, col)           | `ESC [ r ; c H`    |
//! | Cursor position report request  | `ESC [ 6 n`        |
//! | Screen size report request      | `ESC [ 255 n`      |
//! | Normal attributes               | `ESC [ 0 m`        |
//! | Clear screen                    | `ESC [ 2 J`        |
//!
//! Inbound parsing lives in [`decoder`]; it hands well-formed `row;col` payloads to
//! [`decode_cpr_payload`].

pub mod decoder;

pub use decoder::ResponseDecoder;

/// Escape introducer
pub const ESC: char = '\x1b';
/// Control Sequence Introducer (`ESC [`)
pub const CSI: &str = "\x1b[";

/// Cursor position as reported by the terminal (`ESC [ row ; col R`).
///
/// Values are exactly what the terminal sent; origin correction (`cpr_offset`) is the
/// caller's job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CursorPositionReport {
    pub row: u16,
    pub col: u16,
}

impl CursorPositionReport {
    pub fn new(row: u16, col: u16) -> Self {
        Self { row, col }
    }
}

impl std::fmt::Display for CursorPositionReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// Primary device attributes request. `0` is the only parameter anyone sends.
pub fn query_device_attributes(param: u8) -> String {
    format!("{CSI}{param}c")
}

/// Move the cursor to row 1, column 1.
pub fn cursor_home() -> &'static str {
    "\x1b[H"
}

/// Move the cursor to a 1-based `(row, col)`. Terminals clamp out-of-range values.
pub fn goto(row: u16, col: u16) -> String {
    format!("{CSI}{row};{col}H")
}

/// DSR 6: ask the terminal where the cursor is.
pub fn query_position() -> &'static str {
    "\x1b[6n"
}

/// DSR 255: non-standard screen size report. Terminals that honor it (SyncTERM,
/// NetRunner, …) answer in cursor position report form with the bottom-right cell.
pub fn query_screen_size() -> &'static str {
    "\x1b[255n"
}

/// SGR 0: reset all text attributes.
pub fn normal() -> &'static str {
    "\x1b[0m"
}

/// ED 2: erase the whole display.
pub fn clear_screen() -> &'static str {
    "\x1b[2J"
}

/// SGR with arbitrary parameters, e.g. `sgr(&[1, 32])` for bright green.
pub fn sgr(params: &[u8]) -> String {
    let joined = params
        .iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join(";");
    format!("{CSI}{joined}m")
}

/// Decode the `row;col` payload of a cursor position report.
///
/// Returns `None` if the payload is not exactly two decimal fields separated by `;`.
/// A bare `R` with no parameters is treated as `1;1`, matching ANSI default params.
pub fn decode_cpr_payload(payload: &str) -> Option<CursorPositionReport> {
    if payload.is_empty() {
        return Some(CursorPositionReport::new(1, 1));
    }
    let (row, col) = payload.split_once(';')?;
    let row = row.parse::<u16>().ok()?;
    let col = col.parse::<u16>().ok()?;
    Some(CursorPositionReport { row, col })
}
