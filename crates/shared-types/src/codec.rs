//! # Body Codec
//!
//! Message bodies are bincode-encoded `WireMessage`s. Sealing, when required,
//! happens on the encoded bytes.
//!
//! Decoding is bounded twice over: a body may not claim more than
//! `MAX_BODY_LEN` bytes, and values and error causes may not nest deeper
//! than `MAX_NESTING_DEPTH`. Either violation is a `WireError::Decode`.

use bincode::Options;
use serde::{de, Deserialize, Serialize};
use std::cell::Cell;

use crate::errors::WireError;
use crate::invocation::{InvocationDescriptor, InvocationResult};

/// Everything that can travel inside an envelope body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WireMessage {
    /// Client request.
    Invocation(InvocationDescriptor),
    /// Server response.
    Result(InvocationResult),
}

/// Largest body the codec will encode or decode.
pub const MAX_BODY_LEN: u64 = 16 * 1024 * 1024;

/// Deepest nesting of list values or error causes accepted on decode.
pub const MAX_NESTING_DEPTH: usize = 64;

thread_local! {
    static DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// One level of nesting on the current decoding thread. Released on drop.
pub(crate) struct NestingGuard;

impl NestingGuard {
    pub(crate) fn enter<E: de::Error>() -> Result<Self, E> {
        DEPTH.with(|depth| {
            let next = depth.get() + 1;
            if next > MAX_NESTING_DEPTH {
                return Err(E::custom(format!(
                    "nesting deeper than {MAX_NESTING_DEPTH} levels"
                )));
            }
            depth.set(next);
            Ok(NestingGuard)
        })
    }
}

impl Drop for NestingGuard {
    fn drop(&mut self) {
        DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

fn options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_limit(MAX_BODY_LEN)
}

/// Encode a message body.
///
/// # Errors
///
/// Returns `WireError::Encode` if bincode rejects the message.
pub fn encode_message(message: &WireMessage) -> Result<Vec<u8>, WireError> {
    options()
        .serialize(message)
        .map_err(|e| WireError::Encode(e.to_string()))
}

/// Decode a message body.
///
/// # Errors
///
/// Returns `WireError::Decode` for truncated, oversized, trailing or too
/// deeply nested input.
pub fn decode_message(bytes: &[u8]) -> Result<WireMessage, WireError> {
    options()
        .deserialize(bytes)
        .map_err(|e| WireError::Decode(e.to_string()))
}
