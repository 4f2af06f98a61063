//! redis-latency-probe: PING latency check for Redis-compatible servers
//!
//! Opens one connection, sends one liveness request, and prints how long
//! the acknowledgement took:
//! - Redis RESP `PING` (default) or the plain-text `PING` line protocol
//! - One overall deadline covering connect and reply
//! - Exit code tells connection failures, timeouts and protocol errors apart
//! - Configuration via CLI arguments or TOML file

mod config;
mod probe;
mod protocols;

use config::{Config, Endpoint};
use probe::{ProbeResult, Prober};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    // Load configuration
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    // Initialize logging; stdout is reserved for the result line
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = Prober::from_config(&config).probe();
    println!("{}", report_line(&config.endpoint, &result));

    result.exit_code()
}

/// The single line printed for a finished probe.
fn report_line(endpoint: &Endpoint, result: &ProbeResult) -> String {
    match result.error() {
        None => format!("The ping took: {:.3} ms", result.elapsed_ms()),
        Some(e) => format!("Probe of {endpoint} failed: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::ProbeError;
    use std::time::Duration;

    #[test]
    fn test_success_line() {
        let endpoint: Endpoint = "127.0.0.1:6379".parse().unwrap();
        let result = ProbeResult::succeeded(Duration::from_micros(412));
        assert_eq!(report_line(&endpoint, &result), "The ping took: 0.412 ms");
    }

    #[test]
    fn test_failure_line() {
        let endpoint: Endpoint = "127.0.0.1:1".parse().unwrap();
        let refused = std::io::Error::from(std::io::ErrorKind::ConnectionRefused);
        let result = ProbeResult::failed(Duration::from_millis(1), ProbeError::Connection(refused));
        assert_eq!(
            report_line(&endpoint, &result),
            "Probe of 127.0.0.1:1 failed: connection failed"
        );
    }
}
