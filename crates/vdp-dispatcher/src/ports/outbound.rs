//! # Outbound Port - ConnectionSink
//!
//! The connection layer's send primitive. Framing and byte-level I/O live
//! behind it.

use shared_types::CorrelationKey;
use thiserror::Error;

/// Send failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendError {
    /// The connection is gone; the response is discarded.
    #[error("connection closed")]
    Closed,
}

/// Fire-and-forget response sink of one client connection.
///
/// Called from worker threads and from deferred completions, possibly
/// concurrently.
pub trait ConnectionSink: Send + Sync {
    /// Queue response bytes for transmission.
    ///
    /// # Errors
    ///
    /// Returns `SendError::Closed` if the connection is gone.
    fn send(&self, envelope: Vec<u8>, correlation_key: CorrelationKey) -> Result<(), SendError>;

    /// Returns false once the connection is gone.
    fn is_open(&self) -> bool;
}
