//! Configuration module for redis-latency-probe.
//!
//! Supports both command-line arguments and TOML configuration file.
//! CLI arguments take precedence over config file values.

use clap::{Parser, ValueEnum};
use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Command-line arguments for the probe
#[derive(Parser, Debug)]
#[command(name = "redis-latency-probe")]
#[command(author = "redis-latency-probe authors")]
#[command(version = "0.1.0")]
#[command(about = "Measure the PING latency of a Redis-compatible server", long_about = None)]
pub struct CliArgs {
    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Endpoint to probe (e.g., localhost:6379 or [::1]:6379)
    #[arg(short, long)]
    pub endpoint: Option<String>,

    /// Overall probe timeout in milliseconds
    #[arg(short = 't', long)]
    pub timeout_ms: Option<u64>,

    /// Liveness request dialect
    #[arg(short, long, value_enum)]
    pub protocol: Option<ProtocolType>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,
}

/// Liveness request dialect spoken by the probe.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ProtocolType {
    /// Redis RESP: `*1\r\n$4\r\nPING\r\n`, expects `+PONG`.
    #[default]
    Resp,
    /// Plain line protocol: `PING\r\n`, expects `PONG`.
    Text,
}

/// TOML configuration file structure
#[derive(Debug, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub probe: ProbeConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Probe-related configuration
#[derive(Debug, Deserialize)]
pub struct ProbeConfig {
    /// Endpoint to probe
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Overall probe timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Liveness request dialect
    #[serde(default)]
    pub protocol: ProtocolType,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            timeout_ms: default_timeout_ms(),
            protocol: ProtocolType::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_endpoint() -> String {
    "localhost:6379".to_string()
}

fn default_timeout_ms() -> u64 {
    5000
}

fn default_log_level() -> String {
    "warn".to_string()
}

/// A probe target: host name or IP literal plus port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl FromStr for Endpoint {
    type Err = ConfigError;

    /// Parse `host:port`. IPv6 literals must be bracketed: `[::1]:6379`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid =
            |reason: &str| ConfigError::InvalidEndpoint(s.to_string(), reason.to_string());

        let (host, port) = s.rsplit_once(':').ok_or_else(|| invalid("expected host:port"))?;

        let host = match host.strip_prefix('[') {
            Some(rest) => rest
                .strip_suffix(']')
                .ok_or_else(|| invalid("unterminated '[' in host"))?,
            None if host.contains(':') => {
                return Err(invalid("IPv6 addresses must be written as [addr]:port"))
            }
            None => host,
        };

        if host.is_empty() {
            return Err(invalid("host is empty"));
        }

        let port: u16 = port.parse().map_err(|_| invalid("port must be 1-65535"))?;
        if port == 0 {
            return Err(invalid("port must be 1-65535"));
        }

        Ok(Endpoint {
            host: host.to_string(),
            port,
        })
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

/// Final resolved configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub endpoint: Endpoint,
    pub timeout: Duration,
    pub protocol: ProtocolType,
    pub log_level: String,
}

impl Config {
    /// Load configuration from CLI args and optional TOML file.
    /// CLI arguments take precedence over TOML file values.
    pub fn load() -> Result<Self, ConfigError> {
        let cli = CliArgs::parse();

        // Load TOML config if specified
        let toml_config = if let Some(ref config_path) = cli.config {
            let contents = std::fs::read_to_string(config_path)
                .map_err(|e| ConfigError::FileRead(config_path.clone(), e))?;
            toml::from_str(&contents)
                .map_err(|e| ConfigError::TomlParse(config_path.clone(), e))?
        } else {
            TomlConfig::default()
        };

        Self::from_parts(cli, toml_config)
    }

    /// Merge CLI args over TOML values and validate the result.
    pub fn from_parts(cli: CliArgs, toml_config: TomlConfig) -> Result<Self, ConfigError> {
        let endpoint = cli
            .endpoint
            .unwrap_or(toml_config.probe.endpoint)
            .parse::<Endpoint>()?;

        let timeout_ms = cli.timeout_ms.unwrap_or(toml_config.probe.timeout_ms);
        if timeout_ms == 0 {
            return Err(ConfigError::InvalidTimeout);
        }

        Ok(Config {
            endpoint,
            timeout: Duration::from_millis(timeout_ms),
            protocol: cli.protocol.unwrap_or(toml_config.probe.protocol),
            log_level: cli.log_level.unwrap_or(toml_config.logging.level),
        })
    }
}

/// Configuration loading errors
#[derive(Debug)]
pub enum ConfigError {
    FileRead(PathBuf, std::io::Error),
    TomlParse(PathBuf, toml::de::Error),
    InvalidEndpoint(String, String),
    InvalidTimeout,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::FileRead(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::TomlParse(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigError::InvalidEndpoint(endpoint, reason) => {
                write!(f, "Invalid endpoint '{endpoint}': {reason}")
            }
            ConfigError::InvalidTimeout => write!(f, "Timeout must be a positive duration"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::FileRead(_, e) => Some(e),
            ConfigError::TomlParse(_, e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> CliArgs {
        let argv = std::iter::once("redis-latency-probe").chain(args.iter().copied());
        CliArgs::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_default_config() {
        let config = Config::from_parts(cli(&[]), TomlConfig::default()).unwrap();
        assert_eq!(config.endpoint.host, "localhost");
        assert_eq!(config.endpoint.port, 6379);
        assert_eq!(config.timeout, Duration::from_millis(5000));
        assert_eq!(config.protocol, ProtocolType::Resp);
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn test_toml_parsing() {
        let toml_str = r#"
            [probe]
            endpoint = "10.0.0.5:6380"
            timeout_ms = 250
            protocol = "text"

            [logging]
            level = "debug"
        "#;

        let config: TomlConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.probe.endpoint, "10.0.0.5:6380");
        assert_eq!(config.probe.timeout_ms, 250);
        assert_eq!(config.probe.protocol, ProtocolType::Text);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: TomlConfig = toml::from_str("[probe]\ntimeout_ms = 100\n").unwrap();
        assert_eq!(config.probe.endpoint, "localhost:6379");
        assert_eq!(config.probe.protocol, ProtocolType::Resp);
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    fn test_cli_overrides_toml() {
        let toml_config: TomlConfig = toml::from_str(
            r#"
            [probe]
            endpoint = "10.0.0.5:6380"
            timeout_ms = 250

            [logging]
            level = "debug"
        "#,
        )
        .unwrap();

        let config = Config::from_parts(
            cli(&["-e", "127.0.0.1:7000", "--timeout-ms", "50", "-p", "text"]),
            toml_config,
        )
        .unwrap();
        assert_eq!(config.endpoint.to_string(), "127.0.0.1:7000");
        assert_eq!(config.timeout, Duration::from_millis(50));
        assert_eq!(config.protocol, ProtocolType::Text);
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let err = Config::from_parts(cli(&["-t", "0"]), TomlConfig::default()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidTimeout));
    }

    #[test]
    fn test_parse_endpoint() {
        let ep: Endpoint = "redis.internal:6379".parse().unwrap();
        assert_eq!(ep.host, "redis.internal");
        assert_eq!(ep.port, 6379);

        let ep: Endpoint = "[::1]:6380".parse().unwrap();
        assert_eq!(ep.host, "::1");
        assert_eq!(ep.port, 6380);
        assert_eq!(ep.to_string(), "[::1]:6380");
    }

    #[test]
    fn test_parse_invalid_endpoint() {
        let inputs = [
            "localhost",
            ":6379",
            "localhost:0",
            "localhost:70000",
            "::1:6379",
            "[::1:6379",
        ];
        for input in inputs {
            match input.parse::<Endpoint>() {
                Err(ConfigError::InvalidEndpoint(s, _)) => assert_eq!(s, input),
                other => panic!("unexpected for {input}: {:?}", other),
            }
        }
    }
}
