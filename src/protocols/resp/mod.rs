//! RESP (Redis Serialization Protocol) implementation.
//!
//! Only RESP2 framing is needed: the probe never negotiates RESP3 via HELLO.

pub mod parser;
