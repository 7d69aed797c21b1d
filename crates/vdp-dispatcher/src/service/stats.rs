//! Dispatch counters, per connection or shared across connections.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Statistics for a dispatcher
#[derive(Debug, Default)]
pub struct DispatchStats {
    /// Envelopes received
    pub received: AtomicU64,
    /// Operations invoked
    pub invoked: AtomicU64,
    /// Deferred completions registered
    pub deferred: AtomicU64,
    /// Responses handed to the connection
    pub responses_sent: AtomicU64,
    /// Of those, error responses
    pub error_responses: AtomicU64,
    /// Responses discarded (connection gone or unsealable)
    pub dropped: AtomicU64,
}

/// Point-in-time copy of [`DispatchStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchStatsSnapshot {
    /// Envelopes received
    pub received: u64,
    /// Operations invoked
    pub invoked: u64,
    /// Deferred completions registered
    pub deferred: u64,
    /// Responses handed to the connection
    pub responses_sent: u64,
    /// Of those, error responses
    pub error_responses: u64,
    /// Responses discarded
    pub dropped: u64,
}

impl DispatchStats {
    /// Copy the current values.
    pub fn snapshot(&self) -> DispatchStatsSnapshot {
        DispatchStatsSnapshot {
            received: self.received.load(Ordering::Relaxed),
            invoked: self.invoked.load(Ordering::Relaxed),
            deferred: self.deferred.load(Ordering::Relaxed),
            responses_sent: self.responses_sent.load(Ordering::Relaxed),
            error_responses: self.error_responses.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}
