//! Incremental decoder for terminal responses on the inbound byte stream.
//!
//! Only the replies the connection bootstrap cares about are recognized:
//!
//!   `ESC [ row ; col R`      cursor position report
//!   `ESC [ ? p ; p ; … c`    device attributes (VT-style)
//!   `ESC [ = p ; p ; … c`    device attributes (CTerm / SyncTERM style)
//!
//! Everything else, including unrecognized CSI sequences, comes out as raw input so the
//! menu layer still sees arrow keys and the like. Feed arbitrary chunks with
//! [`ResponseDecoder::push`] and drain with [`ResponseDecoder::next_event`]; partial
//! sequences are held until the rest arrives.
use bytes::{Buf, BytesMut};

use super::{decode_cpr_payload, ESC};
use crate::bbs::events::TermEvent;

/// Longest CSI body (after `ESC [`) we are willing to buffer before giving up on it
const MAX_CSI_LEN: usize = 32;

/// CTerm identifies itself as `ESC[=67;84;101;114;109;…c` ("CTerm" in decimal ASCII)
const CTERM_SIGNATURE: [u32; 5] = [67, 84, 101, 114, 109];

/// Device attributes reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceAttributes {
    /// Private marker byte that followed `ESC [` (`?` or `=`)
    pub marker: u8,
    pub params: Vec<u32>,
}

impl DeviceAttributes {
    /// Coarse terminal family derived from the reply.
    pub fn terminal_family(&self) -> &'static str {
        match self.marker {
            b'=' if self.params.starts_with(&CTERM_SIGNATURE) => "syncterm",
            b'=' => "cterm-compatible",
            _ => "vt100",
        }
    }
}

pub struct ResponseDecoder {
    buf: BytesMut,
}

impl Default for ResponseDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseDecoder {
    pub fn new() -> Self {
        Self {
            buf: BytesMut::with_capacity(256),
        }
    }

    pub fn push(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Bytes held waiting for the rest of an escape sequence.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    /// Pull the next complete event, or `None` if more bytes are needed.
    pub fn next_event(&mut self) -> Option<TermEvent> {
        if self.buf.is_empty() {
            return None;
        }
        let esc = ESC as u8;

        if self.buf[0] != esc {
            let run = self
                .buf
                .iter()
                .position(|&b| b == esc)
                .unwrap_or(self.buf.len());
            return Some(TermEvent::Input(self.buf.split_to(run).to_vec()));
        }

        // Lone ESC: could be the start of a reply or a keypress; wait for the next byte.
        if self.buf.len() < 2 {
            return None;
        }
        if self.buf[1] == esc {
            // ESC keypress immediately followed by another sequence
            return Some(TermEvent::Input(self.buf.split_to(1).to_vec()));
        }
        if self.buf[1] != b'[' {
            return Some(TermEvent::Input(self.buf.split_to(2).to_vec()));
        }

        let mut idx = 2;
        let marker = match self.buf.get(idx) {
            Some(&m) if matches!(m, b'?' | b'=' | b'>' | b'<') => {
                idx += 1;
                Some(m)
            }
            _ => None,
        };
        let params_start = idx;

        while let Some(&b) = self.buf.get(idx) {
            match b {
                0x30..=0x3F | 0x20..=0x2F => idx += 1,
                0x40..=0x7E => return Some(self.take_sequence(marker, params_start, idx)),
                _ => {
                    // Control byte inside a CSI: not a reply; hand back what we have as input.
                    return Some(TermEvent::Input(self.buf.split_to(idx).to_vec()));
                }
            }
            if idx - 2 > MAX_CSI_LEN {
                return Some(TermEvent::Input(self.buf.split_to(idx).to_vec()));
            }
        }
        None
    }

    fn take_sequence(&mut self, marker: Option<u8>, params_start: usize, final_idx: usize) -> TermEvent {
        let final_byte = self.buf[final_idx];
        let params = String::from_utf8_lossy(&self.buf[params_start..final_idx]).into_owned();

        let event = match (marker, final_byte) {
            (None, b'R') => decode_cpr_payload(&params).map(TermEvent::CursorPositionReport),
            (Some(m @ (b'?' | b'=')), b'c') => Some(TermEvent::DeviceAttributes(DeviceAttributes {
                marker: m,
                params: params
                    .split(';')
                    .filter_map(|p| p.trim().parse::<u32>().ok())
                    .collect(),
            })),
            _ => None,
        };

        match event {
            Some(ev) => {
                self.buf.advance(final_idx + 1);
                ev
            }
            None => TermEvent::Input(self.buf.split_to(final_idx + 1).to_vec()),
        }
    }
}
