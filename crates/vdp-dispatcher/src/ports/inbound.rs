//! # Inbound Port - DispatchApi
//!
//! Primary driving port called by the connection layer once per received
//! request envelope.

use shared_types::CorrelationKey;

/// Entry point for raw request envelopes.
///
/// # Contract
///
/// - Returns without waiting for the invocation to run.
/// - Every call ends in exactly one response on the connection, unless the
///   connection is gone by the time the response is ready.
/// - Responses may be sent in any order; `correlation_key` pairs them with
///   their requests.
pub trait DispatchApi: Send + Sync {
    /// Hand over one request envelope.
    fn dispatch(&self, raw_envelope: Vec<u8>, correlation_key: CorrelationKey);
}
