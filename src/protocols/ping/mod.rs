//! Plain-text ping dialect.
//!
//! A minimal line protocol for health checks and latency measurement,
//! spoken by line-oriented cache servers that do not understand RESP:
//!
//! ```text
//! Request:  PING\r\n
//! Response: PONG\r\n
//! ```
//!
//! Servers answer unknown input with `ERROR <reason>\r\n`.

pub mod parser;
