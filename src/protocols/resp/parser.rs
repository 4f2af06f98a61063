//! RESP (Redis Serialization Protocol) frame codec.
//!
//! Covers the RESP2 frame types a server may send back to a PING.
//! Parsing is incremental: callers keep appending socket reads to a buffer
//! and call [`parse`] until it stops returning `Incomplete`.

use bytes::{Bytes, BytesMut};

/// Upper bound on a declared bulk string or array length.
///
/// A PING reply is a handful of bytes; anything claiming more than this is
/// treated as garbage rather than waited on.
const MAX_DECLARED_LEN: i64 = 64 * 1024;

/// Longest header line (type byte plus payload, excluding CRLF).
const MAX_LINE_LENGTH: usize = 1024;

/// Deepest array nesting accepted. A PING reply is at most one level deep.
const MAX_DEPTH: usize = 8;

/// RESP frame types
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// Simple string: +OK\r\n
    Simple(String),
    /// Error: -ERR message\r\n
    Error(String),
    /// Integer: :1000\r\n
    Integer(i64),
    /// Bulk string: $5\r\nhello\r\n or $-1\r\n (null)
    Bulk(Option<Bytes>),
    /// Array: *2\r\n... or *-1\r\n (null)
    Array(Option<Vec<Frame>>),
}

/// Encode a command as an array of bulk strings: `*1\r\n$4\r\nPING\r\n`.
pub fn encode_command(args: &[&[u8]]) -> BytesMut {
    let mut buf = BytesMut::new();
    put_line(&mut buf, b'*', args.len().to_string().as_bytes());
    for arg in args {
        put_line(&mut buf, b'$', arg.len().to_string().as_bytes());
        buf.extend_from_slice(arg);
        buf.extend_from_slice(b"\r\n");
    }
    buf
}

fn put_line(buf: &mut BytesMut, prefix: u8, body: &[u8]) {
    buf.reserve(body.len() + 3);
    buf.extend_from_slice(&[prefix]);
    buf.extend_from_slice(body);
    buf.extend_from_slice(b"\r\n");
}

/// Parse result
#[derive(Debug)]
pub enum ParseResult {
    /// Successfully parsed a frame with bytes consumed
    Complete(Frame, usize),
    /// Need more data
    Incomplete,
    /// Parse error
    Error(String),
}

/// Parse a RESP frame from a buffer
pub fn parse(buffer: &[u8]) -> ParseResult {
    parse_at_depth(buffer, 0)
}

fn parse_at_depth(buffer: &[u8], depth: usize) -> ParseResult {
    let Some(&kind) = buffer.first() else {
        return ParseResult::Incomplete;
    };

    // Only the first MAX_LINE_LENGTH + CRLF bytes can hold the header
    let window = &buffer[..buffer.len().min(MAX_LINE_LENGTH + 2)];
    let Some(end) = find_crlf(window) else {
        return if window.len() == MAX_LINE_LENGTH + 2 {
            ParseResult::Error("Header line too long".to_string())
        } else {
            ParseResult::Incomplete
        };
    };
    let header = &buffer[1..end];
    let after_header = end + 2;

    match kind {
        b'+' => match utf8(header, "simple string") {
            Ok(s) => ParseResult::Complete(Frame::Simple(s.to_string()), after_header),
            Err(e) => e,
        },
        b'-' => match utf8(header, "error") {
            Ok(s) => ParseResult::Complete(Frame::Error(s.to_string()), after_header),
            Err(e) => e,
        },
        b':' => match integer(header, "integer") {
            Ok(n) => ParseResult::Complete(Frame::Integer(n), after_header),
            Err(e) => e,
        },
        b'$' => match length(header, "bulk string") {
            Ok(None) => ParseResult::Complete(Frame::Bulk(None), after_header),
            Ok(Some(len)) => parse_bulk_body(buffer, after_header, len),
            Err(e) => e,
        },
        b'*' => match length(header, "array") {
            Ok(None) => ParseResult::Complete(Frame::Array(None), after_header),
            Ok(Some(_)) if depth >= MAX_DEPTH => {
                ParseResult::Error("Array nesting too deep".to_string())
            }
            Ok(Some(len)) => parse_array_items(buffer, after_header, len, depth + 1),
            Err(e) => e,
        },
        other => ParseResult::Error(format!("Unknown frame type: {}", other as char)),
    }
}

/// Find CRLF in buffer, return position of \r
fn find_crlf(buffer: &[u8]) -> Option<usize> {
    buffer.windows(2).position(|w| w == b"\r\n")
}

fn utf8<'a>(raw: &'a [u8], what: &str) -> Result<&'a str, ParseResult> {
    std::str::from_utf8(raw).map_err(|_| ParseResult::Error(format!("Invalid UTF-8 in {what}")))
}

fn integer(raw: &[u8], what: &str) -> Result<i64, ParseResult> {
    let s = utf8(raw, what)?;
    s.parse()
        .map_err(|_| ParseResult::Error(format!("Invalid {what}: {s}")))
}

/// Decode a declared length; negative means null.
fn length(raw: &[u8], what: &str) -> Result<Option<usize>, ParseResult> {
    let len = integer(raw, &format!("{what} length"))?;
    if len < 0 {
        Ok(None)
    } else if len > MAX_DECLARED_LEN {
        Err(ParseResult::Error(format!("{what} length {len} exceeds limit")))
    } else {
        Ok(Some(len as usize))
    }
}

/// Bulk payload: `len` bytes followed by CRLF.
fn parse_bulk_body(buffer: &[u8], start: usize, len: usize) -> ParseResult {
    let data_end = start + len;
    let total_len = data_end + 2;

    if buffer.len() < total_len {
        return ParseResult::Incomplete;
    }
    if &buffer[data_end..total_len] != b"\r\n" {
        return ParseResult::Error("Bulk string missing trailing CRLF".to_string());
    }

    let data = Bytes::copy_from_slice(&buffer[start..data_end]);
    ParseResult::Complete(Frame::Bulk(Some(data)), total_len)
}

fn parse_array_items(buffer: &[u8], start: usize, len: usize, depth: usize) -> ParseResult {
    let mut offset = start;
    let mut frames = Vec::with_capacity(len.min(16));

    for _ in 0..len {
        match parse_at_depth(&buffer[offset..], depth) {
            ParseResult::Complete(frame, consumed) => {
                frames.push(frame);
                offset += consumed;
            }
            other => return other,
        }
    }

    ParseResult::Complete(Frame::Array(Some(frames)), offset)
}
