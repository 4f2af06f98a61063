//! Probe outcome types.

use std::fmt;
use std::io;
use std::process::ExitCode;
use std::time::Duration;

/// Why a probe failed. Every variant is terminal for the invocation.
#[derive(Debug)]
pub enum ProbeError {
    /// Refused, unreachable, unresolvable, or reset before a reply arrived.
    Connection(io::Error),
    /// The deadline passed while connecting or awaiting the reply.
    Timeout,
    /// The server answered with something other than a well-formed PONG.
    Protocol(String),
}

impl ProbeError {
    /// Process exit code reported for this failure.
    pub fn exit_code(&self) -> u8 {
        match self {
            ProbeError::Connection(_) => 3,
            ProbeError::Timeout => 4,
            ProbeError::Protocol(_) => 5,
        }
    }

    /// Underlying cause, for logs. `Display` stays the fixed user-facing text.
    pub fn detail(&self) -> String {
        match self {
            ProbeError::Connection(e) => e.to_string(),
            ProbeError::Timeout => "deadline exceeded".to_string(),
            ProbeError::Protocol(reason) => reason.clone(),
        }
    }

    /// Map a socket error, folding read/connect timeouts into `Timeout`.
    pub(crate) fn from_io(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => ProbeError::Timeout,
            _ => ProbeError::Connection(e),
        }
    }
}

impl fmt::Display for ProbeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeError::Connection(_) => write!(f, "connection failed"),
            ProbeError::Timeout => write!(f, "timeout"),
            ProbeError::Protocol(_) => write!(f, "protocol error"),
        }
    }
}

impl std::error::Error for ProbeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProbeError::Connection(e) => Some(e),
            _ => None,
        }
    }
}

/// Outcome of a single probe. Fixed once built.
#[derive(Debug)]
pub struct ProbeResult {
    success: bool,
    elapsed: Duration,
    error: Option<ProbeError>,
}

impl ProbeResult {
    /// A probe that received PONG `elapsed` after sending PING.
    pub fn succeeded(elapsed: Duration) -> Self {
        Self {
            success: true,
            elapsed,
            error: None,
        }
    }

    /// A probe that gave up `elapsed` after it started.
    pub fn failed(elapsed: Duration, error: ProbeError) -> Self {
        Self {
            success: false,
            elapsed,
            error: Some(error),
        }
    }

    pub fn success(&self) -> bool {
        self.success
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn error(&self) -> Option<&ProbeError> {
        self.error.as_ref()
    }

    /// Elapsed time in fractional milliseconds.
    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed.as_secs_f64() * 1000.0
    }

    pub fn exit_code(&self) -> ExitCode {
        match &self.error {
            None => ExitCode::SUCCESS,
            Some(e) => ExitCode::from(e.exit_code()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let refused = io::Error::from(io::ErrorKind::ConnectionRefused);
        assert_eq!(ProbeError::Connection(refused).to_string(), "connection failed");
        assert_eq!(ProbeError::Timeout.to_string(), "timeout");
        assert_eq!(
            ProbeError::Protocol("bad frame".into()).to_string(),
            "protocol error"
        );
    }

    #[test]
    fn test_detail_keeps_cause() {
        let reason = ProbeError::Protocol("Array nesting too deep".into());
        assert_eq!(reason.detail(), "Array nesting too deep");
        assert!(std::error::Error::source(&reason).is_none());

        let refused = ProbeError::Connection(io::Error::from(io::ErrorKind::ConnectionRefused));
        assert!(std::error::Error::source(&refused).is_some());
        assert!(!refused.detail().is_empty());
    }

    #[test]
    fn test_from_io_classifies_timeouts() {
        for kind in [io::ErrorKind::WouldBlock, io::ErrorKind::TimedOut] {
            assert!(matches!(
                ProbeError::from_io(io::Error::from(kind)),
                ProbeError::Timeout
            ));
        }
        assert!(matches!(
            ProbeError::from_io(io::Error::from(io::ErrorKind::ConnectionReset)),
            ProbeError::Connection(_)
        ));
    }

    #[test]
    fn test_result_accessors() {
        let ok = ProbeResult::succeeded(Duration::from_micros(1500));
        assert!(ok.success());
        assert!(ok.error().is_none());
        assert!((ok.elapsed_ms() - 1.5).abs() < 1e-9);

        let failed = ProbeResult::failed(Duration::from_millis(3), ProbeError::Timeout);
        assert!(!failed.success());
        assert_eq!(failed.error().map(|e| e.to_string()).as_deref(), Some("timeout"));
        assert_eq!(failed.error().map(ProbeError::exit_code), Some(4));
    }

    #[test]
    fn test_distinct_exit_codes() {
        let codes = [
            ProbeError::Connection(io::Error::from(io::ErrorKind::ConnectionRefused)).exit_code(),
            ProbeError::Timeout.exit_code(),
            ProbeError::Protocol(String::new()).exit_code(),
        ];
        // 1 is configuration errors, 2 is clap usage errors
        assert!(codes.iter().all(|&c| c > 2));
        assert_ne!(codes[0], codes[1]);
        assert_ne!(codes[1], codes[2]);
    }
}
