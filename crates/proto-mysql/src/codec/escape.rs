//! Backslash escaping for binary column payloads.

use crate::error::{MapperError, Result};

/// Escape bytes that are unsafe inside MySQL string data.
///
/// `NUL`, `LF`, `CR`, `0x1A`, `'`, `"` and `\` become two-byte backslash
/// sequences; every other byte is copied unchanged.
pub fn escape_bytes(input: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(input.len() + input.len() / 8);
    for &b in input {
        match b {
            0x00 => out.extend_from_slice(b"\\0"),
            b'\n' => out.extend_from_slice(b"\\n"),
            b'\r' => out.extend_from_slice(b"\\r"),
            0x1a => out.extend_from_slice(b"\\Z"),
            b'\'' => out.extend_from_slice(b"\\'"),
            b'"' => out.extend_from_slice(b"\\\""),
            b'\\' => out.extend_from_slice(b"\\\\"),
            other => out.push(other),
        }
    }
    out
}

/// Exact inverse of [`escape_bytes`].
///
/// Fails on an unknown escape sequence or a trailing lone backslash.
pub fn unescape_bytes(input: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(input.len());
    let mut iter = input.iter().copied().enumerate();
    while let Some((pos, b)) = iter.next() {
        if b != b'\\' {
            out.push(b);
            continue;
        }
        let decoded = match iter.next() {
            Some((_, b'0')) => 0x00,
            Some((_, b'n')) => b'\n',
            Some((_, b'r')) => b'\r',
            Some((_, b'Z')) => 0x1a,
            Some((_, b'\'')) => b'\'',
            Some((_, b'"')) => b'"',
            Some((_, b'\\')) => b'\\',
            Some((_, other)) => {
                return Err(MapperError::MalformedPayload(format!(
                    "unknown escape sequence \\{} at offset {}",
                    char::from(other).escape_default(),
                    pos
                )))
            }
            None => {
                return Err(MapperError::MalformedPayload(format!(
                    "dangling backslash at offset {}",
                    pos
                )))
            }
        };
        out.push(decoded);
    }
    Ok(out)
}
