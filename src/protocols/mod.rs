//! Liveness dialects the probe can speak.
//!
//! - `resp`: Redis RESP protocol (default)
//! - `ping`: plain-text `PING`/`PONG` line protocol

pub mod ping;
pub mod resp;
