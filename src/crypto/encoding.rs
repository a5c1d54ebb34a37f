//! Text-safe token encoding.
//!
//! A cipher token is base64-encoded and then every structurally significant
//! character (`[ ] < > = ( ) | ; { } +`) is percent-escaped, so the result can
//! sit inside a header value or a JSON string without further quoting.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

use crate::crypto::CodecError;

/// Characters that are percent-escaped on the wire.
pub const ESCAPED_CHARS: &[char] = &['[', ']', '<', '>', '=', '(', ')', '|', ';', '{', '}', '+'];

/// Percent-escape the reserved characters. Hex digits are lowercase.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + text.len() / 8);
    for c in text.chars() {
        if ESCAPED_CHARS.contains(&c) {
            out.push_str(&format!("%{:02x}", c as u32));
        } else {
            out.push(c);
        }
    }
    out
}

/// Reverse [`escape`]. Any `%XX` pair (either case) is decoded; a `%` not
/// followed by two hex digits is kept as-is.
pub fn unescape(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(hi), Some(lo)) = (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
                out.push(char::from(hi << 4 | lo));
                i += 3;
                continue;
            }
        }
        // `i` only ever advances by whole chars or by an ASCII `%XX` triple.
        let ch = text[i..].chars().next().unwrap_or('\u{FFFD}');
        out.push(ch);
        i += ch.len_utf8();
    }
    out
}

/// Wrap a cipher token for transit: base64, then escape.
pub fn wrap(token: &str) -> String {
    if token.trim().is_empty() {
        return String::new();
    }
    escape(&BASE64.encode(token.as_bytes()))
}

/// Unwrap a transit string back into the cipher token.
pub fn unwrap(text: &str) -> Result<String, CodecError> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(String::new());
    }
    let decoded = BASE64.decode(unescape(text))?;
    String::from_utf8(decoded).map_err(|_| CodecError::Utf8)
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}
