//! # Shared Types Crate
//!
//! Wire-level types exchanged between client sessions and the remote-invocation
//! dispatcher.
//!
//! ## Design Principles
//!
//! - **Opaque Correlation**: The `CorrelationKey` is created by the transport and
//!   only ever copied onto the response envelope.
//! - **Tagged Payloads**: The first byte of every payload says whether the body
//!   is sealed. Confidentiality is decided from this tag alone.
//! - **Structured Failures**: Callers always receive either a `Value` or an
//!   `ErrorRecord` carrying an `ErrorKind` and an optional cause chain.

pub mod codec;
pub mod envelope;
pub mod errors;
pub mod invocation;

pub use codec::{
    decode_message, encode_message, WireMessage, MAX_BODY_LEN, MAX_NESTING_DEPTH,
};
pub use envelope::{CorrelationKey, Envelope, Payload, PayloadTag};
pub use errors::{EnvelopeError, ErrorKind, ErrorRecord, WireError};
pub use invocation::{InvocationDescriptor, InvocationResult, Value, ValueType};
