//! Lowercase hex encoding used for digests and key identifiers.

use crate::error::CoreError;

/// Encode bytes as a lowercase hex string.
pub fn encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Decode a hex string (either case, surrounding whitespace ignored).
pub fn decode(hex: &str) -> Result<Vec<u8>, CoreError> {
    let hex = hex.trim();
    if let Some(i) = hex.bytes().position(|b| !b.is_ascii_hexdigit()) {
        return Err(CoreError::Hex(format!("invalid hex digit at position {i}")));
    }
    if hex.len() % 2 != 0 {
        return Err(CoreError::Hex("hex string must have even length".to_string()));
    }
    hex.as_bytes()
        .chunks_exact(2)
        .map(|pair| Ok((nibble(pair[0]) << 4) | nibble(pair[1])))
        .collect()
}

// Callers guarantee `b` is an ASCII hex digit.
fn nibble(b: u8) -> u8 {
    match b {
        b'0'..=b'9' => b - b'0',
        b'a'..=b'f' => b - b'a' + 10,
        _ => b - b'A' + 10,
    }
}

/// First four bytes as hex, for `Debug` output that must not print whole values.
pub fn prefix(bytes: &[u8]) -> String {
    encode(&bytes[..bytes.len().min(4)])
}
