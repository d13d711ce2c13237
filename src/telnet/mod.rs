//! # Telnet option layer
//!
//! Just enough telnet to host ANSI-BBS clients: the server offers ECHO/SGA, asks for
//! NAWS, and strips every IAC command from the inbound stream. NAWS subnegotiation is
//! decoded into a [`TelnetChunk::WindowSize`], which is the out-of-band size channel the
//! screen-size negotiation races against.
//!
//! Options are never renegotiated after the initial offer; replies from the client are
//! logged at trace level and dropped.

use log::trace;

pub const IAC: u8 = 255;
pub const DONT: u8 = 254;
pub const DO: u8 = 253;
pub const WONT: u8 = 252;
pub const WILL: u8 = 251;
pub const SB: u8 = 250;
pub const SE: u8 = 240;

pub const OPT_ECHO: u8 = 1;
pub const OPT_SGA: u8 = 3;
pub const OPT_NAWS: u8 = 31;

/// Cap on a single subnegotiation body; anything longer is discarded.
const MAX_SUBNEG: usize = 64;

/// Bytes sent immediately after accept.
pub fn initial_negotiation() -> Vec<u8> {
    vec![
        IAC, WILL, OPT_ECHO, //
        IAC, WILL, OPT_SGA, //
        IAC, DO, OPT_SGA, //
        IAC, DO, OPT_NAWS,
    ]
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TelnetChunk {
    /// Plain data with IAC commands removed
    Data(Vec<u8>),
    /// NAWS report, both dimensions non-zero
    WindowSize { width: u16, height: u16 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Data,
    Iac,
    Verb(u8),
    Sub,
    SubIac,
}

/// Streaming IAC stripper. State survives across `feed` calls.
pub struct TelnetFilter {
    state: State,
    sub: Vec<u8>,
}

impl Default for TelnetFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl TelnetFilter {
    pub fn new() -> Self {
        Self {
            state: State::Data,
            sub: Vec::new(),
        }
    }

    pub fn feed(&mut self, input: &[u8]) -> Vec<TelnetChunk> {
        let mut out = Vec::new();
        let mut data = Vec::with_capacity(input.len());

        for &b in input {
            self.state = match self.state {
                State::Data if b == IAC => State::Iac,
                State::Data => {
                    data.push(b);
                    State::Data
                }
                State::Iac => match b {
                    IAC => {
                        data.push(IAC);
                        State::Data
                    }
                    WILL | WONT | DO | DONT => State::Verb(b),
                    SB => {
                        self.sub.clear();
                        State::Sub
                    }
                    other => {
                        trace!("telnet command {other} ignored");
                        State::Data
                    }
                },
                State::Verb(verb) => {
                    trace!("telnet option reply verb={verb} opt={b}");
                    State::Data
                }
                State::Sub if b == IAC => State::SubIac,
                State::Sub => {
                    if self.sub.len() < MAX_SUBNEG {
                        self.sub.push(b);
                    }
                    State::Sub
                }
                State::SubIac => match b {
                    SE => {
                        if !data.is_empty() {
                            out.push(TelnetChunk::Data(std::mem::take(&mut data)));
                        }
                        if let Some(chunk) = self.finish_subnegotiation() {
                            out.push(chunk);
                        }
                        State::Data
                    }
                    IAC => {
                        if self.sub.len() < MAX_SUBNEG {
                            self.sub.push(IAC);
                        }
                        State::Sub
                    }
                    _ => State::Sub,
                },
            };
        }

        if !data.is_empty() {
            out.push(TelnetChunk::Data(data));
        }
        out
    }

    fn finish_subnegotiation(&mut self) -> Option<TelnetChunk> {
        let sub = std::mem::take(&mut self.sub);
        match sub.as_slice() {
            [OPT_NAWS, w_hi, w_lo, h_hi, h_lo] => {
                let width = u16::from_be_bytes([*w_hi, *w_lo]);
                let height = u16::from_be_bytes([*h_hi, *h_lo]);
                if width == 0 || height == 0 {
                    trace!("NAWS with zero dimension ignored ({width}x{height})");
                    None
                } else {
                    Some(TelnetChunk::WindowSize { width, height })
                }
            }
            [opt, ..] => {
                trace!("subnegotiation for option {opt} ignored ({} bytes)", sub.len());
                None
            }
            [] => None,
        }
    }
}
