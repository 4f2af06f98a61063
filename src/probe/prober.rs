//! Blocking PING prober.

use bytes::BytesMut;
use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};
use tracing::{debug, info};

use super::{ProbeError, ProbeResult, ProbeState};
use crate::config::{Config, Endpoint, ProtocolType};
use crate::protocols::ping::parser as ping_parser;
use crate::protocols::resp::parser::{self as resp_parser, Frame};

/// Read chunk size. A PONG is 7 bytes; replies never need more than one read
/// unless the server splits them.
const READ_CHUNK: usize = 512;

/// Most reply bytes buffered before the reply is rejected.
const MAX_REPLY_LEN: usize = 64 * 1024;

/// Result of checking the bytes received so far.
enum ReplyCheck {
    Pong,
    NeedData,
    Invalid(String),
}

/// Measures PING round-trip time against one endpoint.
#[derive(Debug, Clone)]
pub struct Prober {
    endpoint: Endpoint,
    timeout: Duration,
    protocol: ProtocolType,
}

impl Prober {
    pub fn new(endpoint: Endpoint, timeout: Duration, protocol: ProtocolType) -> Self {
        Self {
            endpoint,
            timeout,
            protocol,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.endpoint.clone(), config.timeout, config.protocol)
    }

    /// Run one probe. The connection is closed before this returns.
    pub fn probe(&self) -> ProbeResult {
        let started = Instant::now();
        let deadline = started + self.timeout;
        let mut state = ProbeState::Disconnected;

        info!(
            endpoint = %self.endpoint,
            protocol = ?self.protocol,
            timeout_ms = self.timeout.as_millis() as u64,
            "Probing"
        );

        state.advance(ProbeState::Connecting);
        let outcome = self.connect(deadline).and_then(|mut stream| {
            state.advance(ProbeState::AwaitingResponse);
            self.exchange(&mut stream, deadline)
        });

        state.advance(ProbeState::Completed {
            success: outcome.is_ok(),
        });
        debug_assert!(state.is_terminal());

        let result = match outcome {
            Ok(rtt) => ProbeResult::succeeded(rtt),
            Err(e) => {
                debug!(error = %e, detail = %e.detail(), "Probe failed");
                ProbeResult::failed(started.elapsed(), e)
            }
        };

        debug!(
            success = result.success(),
            elapsed_us = result.elapsed().as_micros() as u64,
            "Probe complete"
        );
        result
    }

    /// Resolve the endpoint and connect to the first address that accepts.
    fn connect(&self, deadline: Instant) -> Result<TcpStream, ProbeError> {
        let addrs: Vec<SocketAddr> = (self.endpoint.host.as_str(), self.endpoint.port)
            .to_socket_addrs()
            .map_err(ProbeError::Connection)?
            .collect();

        let mut last_error = None;
        for addr in addrs {
            let left = remaining(deadline).ok_or(ProbeError::Timeout)?;
            match connect_addr(addr, left) {
                Ok(stream) => {
                    debug!(peer = %addr, "Connected");
                    return Ok(stream);
                }
                Err(e) => {
                    debug!(peer = %addr, error = %e, "Connect attempt failed");
                    last_error = Some(e);
                }
            }
        }

        Err(connect_failure(last_error, &self.endpoint.host))
    }

    /// Send the liveness request and wait for the acknowledgement.
    /// Returns the time from send to receipt of a complete reply.
    fn exchange(&self, stream: &mut TcpStream, deadline: Instant) -> Result<Duration, ProbeError> {
        let request = match self.protocol {
            ProtocolType::Resp => resp_parser::encode_command(&[b"PING".as_slice()]),
            ProtocolType::Text => BytesMut::from(ping_parser::request()),
        };

        let left = remaining(deadline).ok_or(ProbeError::Timeout)?;
        stream
            .set_write_timeout(Some(left))
            .map_err(ProbeError::Connection)?;

        let sent_at = Instant::now();
        stream.write_all(&request).map_err(ProbeError::from_io)?;

        let mut received = BytesMut::with_capacity(READ_CHUNK);
        let mut chunk = [0u8; READ_CHUNK];

        loop {
            let left = remaining(deadline).ok_or(ProbeError::Timeout)?;
            stream
                .set_read_timeout(Some(left))
                .map_err(ProbeError::Connection)?;

            let n = match stream.read(&mut chunk) {
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(ProbeError::from_io(e)),
            };

            if n == 0 {
                return Err(if received.is_empty() {
                    ProbeError::Connection(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "server closed the connection without replying",
                    ))
                } else {
                    ProbeError::Protocol("connection closed mid-reply".to_string())
                });
            }

            received.extend_from_slice(&chunk[..n]);
            if received.len() > MAX_REPLY_LEN {
                return Err(ProbeError::Protocol(format!(
                    "reply exceeds {MAX_REPLY_LEN} bytes"
                )));
            }

            match check_reply(self.protocol, &received) {
                ReplyCheck::Pong => return Ok(sent_at.elapsed()),
                ReplyCheck::NeedData => continue,
                ReplyCheck::Invalid(reason) => return Err(ProbeError::Protocol(reason)),
            }
        }
    }
}

/// Time left before `deadline`, or `None` once it has passed.
fn remaining(deadline: Instant) -> Option<Duration> {
    deadline
        .checked_duration_since(Instant::now())
        .filter(|d| !d.is_zero())
}

/// Error for a connect where every resolved address failed.
fn connect_failure(last_error: Option<io::Error>, host: &str) -> ProbeError {
    match last_error {
        Some(e) => ProbeError::from_io(e),
        None => ProbeError::Connection(io::Error::new(
            io::ErrorKind::NotFound,
            format!("{host} resolved to no addresses"),
        )),
    }
}

fn connect_addr(addr: SocketAddr, timeout: Duration) -> io::Result<TcpStream> {
    let socket = socket2::Socket::new(
        match addr {
            SocketAddr::V4(_) => socket2::Domain::IPV4,
            SocketAddr::V6(_) => socket2::Domain::IPV6,
        },
        socket2::Type::STREAM,
        Some(socket2::Protocol::TCP),
    )?;

    socket.set_nodelay(true)?;
    socket.connect_timeout(&addr.into(), timeout)?;

    Ok(socket.into())
}

fn check_reply(protocol: ProtocolType, received: &[u8]) -> ReplyCheck {
    match protocol {
        ProtocolType::Resp => match resp_parser::parse(received) {
            resp_parser::ParseResult::Complete(frame, _) => check_resp_frame(frame),
            resp_parser::ParseResult::Incomplete => ReplyCheck::NeedData,
            resp_parser::ParseResult::Error(e) => ReplyCheck::Invalid(e),
        },
        ProtocolType::Text => match ping_parser::parse(received) {
            ping_parser::ParseResult::Complete(ping_parser::Reply::Pong, _) => ReplyCheck::Pong,
            ping_parser::ParseResult::Complete(ping_parser::Reply::Error(reason), _) => {
                ReplyCheck::Invalid(format!("server replied with error: {reason}"))
            }
            ping_parser::ParseResult::Complete(ping_parser::Reply::Other(line), _) => {
                ReplyCheck::Invalid(format!(
                    "unexpected reply: {}",
                    String::from_utf8_lossy(&line)
                ))
            }
            ping_parser::ParseResult::Incomplete => ReplyCheck::NeedData,
            ping_parser::ParseResult::TooLong => {
                ReplyCheck::Invalid("reply line too long".to_string())
            }
        },
    }
}

/// `+PONG`, or `["pong", ""]` from a connection in subscribe mode.
fn check_resp_frame(frame: Frame) -> ReplyCheck {
    match frame {
        Frame::Simple(s) if s.eq_ignore_ascii_case("PONG") => ReplyCheck::Pong,
        Frame::Array(Some(items)) if items.first().is_some_and(is_pong_bulk) => ReplyCheck::Pong,
        Frame::Error(msg) => ReplyCheck::Invalid(format!("server replied with error: {msg}")),
        other => ReplyCheck::Invalid(format!("unexpected reply: {:?}", other)),
    }
}

fn is_pong_bulk(frame: &Frame) -> bool {
    matches!(frame, Frame::Bulk(Some(b)) if b.eq_ignore_ascii_case(b"pong"))
}
