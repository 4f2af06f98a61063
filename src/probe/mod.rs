//! Latency probe.
//!
//! One probe opens one connection, sends one liveness request, and waits
//! for the acknowledgement under a single deadline:
//!
//! ```text
//! Disconnected -> Connecting -> AwaitingResponse -> Completed(ok)
//!                      |               |
//!                      +---------------+---------> Completed(failed)
//! ```

mod prober;
mod result;

pub use prober::Prober;
pub use result::{ProbeError, ProbeResult};

use tracing::trace;

/// Where a probe is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeState {
    /// No socket yet.
    Disconnected,
    /// Resolving and connecting.
    Connecting,
    /// Request written, reading the reply.
    AwaitingResponse,
    /// Terminal.
    Completed { success: bool },
}

impl ProbeState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProbeState::Completed { .. })
    }

    /// Whether `next` is a legal successor of this state.
    pub fn can_advance_to(&self, next: ProbeState) -> bool {
        matches!(
            (self, next),
            (ProbeState::Disconnected, ProbeState::Connecting)
                | (ProbeState::Connecting, ProbeState::AwaitingResponse)
                | (ProbeState::Connecting, ProbeState::Completed { success: false })
                | (ProbeState::AwaitingResponse, ProbeState::Completed { .. })
        )
    }

    pub(crate) fn advance(&mut self, next: ProbeState) {
        debug_assert!(
            self.can_advance_to(next),
            "illegal probe transition {:?} -> {:?}",
            self,
            next
        );
        trace!(from = ?self, to = ?next, "Probe state");
        *self = next;
    }
}
