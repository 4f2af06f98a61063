//! Ping dialect request and reply parsing.

/// Maximum reply line length before the reply is rejected.
const MAX_LINE_LENGTH: usize = 1024;

/// Parsed server reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// `PONG`.
    Pong,
    /// `ERROR <reason>`.
    Error(String),
    /// Any other line.
    Other(Vec<u8>),
}

/// Parse result.
#[derive(Debug)]
pub enum ParseResult {
    /// Successfully parsed reply with bytes consumed.
    Complete(Reply, usize),
    /// Need more data.
    Incomplete,
    /// Reply line exceeded the length limit.
    TooLong,
}

/// The liveness request.
pub fn request() -> &'static [u8] {
    b"PING\r\n"
}

/// Parse a single reply line from the input buffer.
pub fn parse(input: &[u8]) -> ParseResult {
    let line_end = match find_crlf(input) {
        Some(pos) => pos,
        None if input.len() > MAX_LINE_LENGTH => return ParseResult::TooLong,
        None => return ParseResult::Incomplete,
    };

    if line_end > MAX_LINE_LENGTH {
        return ParseResult::TooLong;
    }

    let line = &input[..line_end];
    let consumed = line_end + 2; // include \r\n

    let reply = if line.eq_ignore_ascii_case(b"PONG") {
        Reply::Pong
    } else if line.len() >= 5 && line[..5].eq_ignore_ascii_case(b"ERROR") {
        let reason = String::from_utf8_lossy(&line[5..]).trim().to_string();
        Reply::Error(reason)
    } else {
        Reply::Other(line.to_vec())
    };

    ParseResult::Complete(reply, consumed)
}

/// Find \r\n in buffer, returning the position of \r.
fn find_crlf(buffer: &[u8]) -> Option<usize> {
    buffer.windows(2).position(|w| w == b"\r\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pong() {
        match parse(b"PONG\r\n") {
            ParseResult::Complete(Reply::Pong, 6) => {}
            other => panic!("unexpected: {:?}", other),
        }

        match parse(b"pong\r\n") {
            ParseResult::Complete(Reply::Pong, 6) => {}
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_parse_error_reply() {
        match parse(b"ERROR unknown command\r\n") {
            ParseResult::Complete(Reply::Error(reason), 23) => {
                assert_eq!(reason, "unknown command");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_parse_other_reply() {
        match parse(b"+PONG\r\n") {
            ParseResult::Complete(Reply::Other(line), 7) => assert_eq!(line, b"+PONG"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_incomplete() {
        match parse(b"PON") {
            ParseResult::Incomplete => {}
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_too_long() {
        let junk = vec![b'x'; MAX_LINE_LENGTH + 1];
        match parse(&junk) {
            ParseResult::TooLong => {}
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_request() {
        assert_eq!(request(), b"PING\r\n");
    }
}
