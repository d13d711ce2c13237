//! Logging utilities for keeping terminal traffic readable in single-line logs.
//! Escape sequences and control bytes are spelled out instead of being written raw,
//! which would otherwise repaint whatever terminal is tailing the log.

/// Longest byte run rendered before truncating with an ellipsis.
const MAX_PREVIEW: usize = 120;

/// Render raw terminal bytes for a log line:
/// - ESC => `\e`
/// - `\r`, `\n`, `\t` => `\\r`, `\\n`, `\\t`
/// - backslash => `\\\\`
/// - other control or non-ASCII bytes => `\xNN`
///
/// Input longer than the preview limit is truncated with `…`.
pub fn escape_bytes(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let mut out = String::with_capacity(bytes.len().min(MAX_PREVIEW) * 2 + 4);
    for (count, &b) in bytes.iter().enumerate() {
        if count >= MAX_PREVIEW {
            out.push('…');
            break;
        }
        match b {
            0x1b => out.push_str("\\e"),
            b'\\' => out.push_str("\\\\"),
            b'\n' => out.push_str("\\n"),
            b'\r' => out.push_str("\\r"),
            b'\t' => out.push_str("\\t"),
            0x20..=0x7e => out.push(b as char),
            _ => {
                let _ = write!(&mut out, "\\x{:02X}", b);
            }
        }
    }
    out
}
