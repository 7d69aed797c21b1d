//! # Envelope
//!
//! The carrier for request and response payloads on a session connection.
//!
//! ## Wire Layout
//!
//! ```text
//! ┌─────────┬──────────────────────────────┐
//! │ tag: u8 │ body (bincode or ciphertext) │
//! └─────────┴──────────────────────────────┘
//! ```
//!
//! The correlation key travels next to the bytes, never inside them. The
//! transport owns the key; the dispatcher copies it from the request envelope
//! to the response envelope and does nothing else with it.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::errors::EnvelopeError;

/// Identifier binding a response to its originating request on a connection.
///
/// Unique per outstanding call on a connection. The transport enforces that a
/// key is never in flight twice at the same time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationKey(Uuid);

impl CorrelationKey {
    /// Generate a fresh random key.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Parse from the hyphenated string form.
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Uuid::parse_str(s).map(Self)
    }

    /// Get the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for CorrelationKey {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CorrelationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for CorrelationKey {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Discriminator byte leading every payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PayloadTag {
    /// Body is a bincode-encoded message.
    Plain = 0x00,
    /// Body is ciphertext produced by the connection's crypto context.
    Sealed = 0x01,
}

impl PayloadTag {
    /// Decode a tag byte.
    pub fn from_byte(byte: u8) -> Result<Self, EnvelopeError> {
        match byte {
            0x00 => Ok(Self::Plain),
            0x01 => Ok(Self::Sealed),
            other => Err(EnvelopeError::UnknownTag(other)),
        }
    }

    /// The byte written on the wire.
    pub fn as_byte(self) -> u8 {
        self as u8
    }
}

/// A payload, tagged by confidentiality.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Unencrypted message body.
    Plain(Vec<u8>),
    /// Encrypted message body.
    Sealed(Vec<u8>),
}

impl Payload {
    /// Returns true if the body is ciphertext.
    pub fn is_sealed(&self) -> bool {
        matches!(self, Payload::Sealed(_))
    }

    /// The wire tag for this payload.
    pub fn tag(&self) -> PayloadTag {
        match self {
            Payload::Plain(_) => PayloadTag::Plain,
            Payload::Sealed(_) => PayloadTag::Sealed,
        }
    }

    /// Borrow the body bytes.
    pub fn body(&self) -> &[u8] {
        match self {
            Payload::Plain(body) | Payload::Sealed(body) => body,
        }
    }

    /// Take ownership of the body bytes.
    pub fn into_body(self) -> Vec<u8> {
        match self {
            Payload::Plain(body) | Payload::Sealed(body) => body,
        }
    }
}

/// Request or response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    correlation_key: CorrelationKey,
    payload: Payload,
}

impl Envelope {
    /// Create an envelope from its parts.
    pub fn new(correlation_key: CorrelationKey, payload: Payload) -> Self {
        Self {
            correlation_key,
            payload,
        }
    }

    /// Parse raw transport bytes received under `correlation_key`.
    ///
    /// # Errors
    ///
    /// Returns `EnvelopeError::Empty` for a zero-length buffer and
    /// `EnvelopeError::UnknownTag` when the leading byte is not a known tag.
    pub fn from_bytes(bytes: &[u8], correlation_key: CorrelationKey) -> Result<Self, EnvelopeError> {
        let (&tag, body) = bytes.split_first().ok_or(EnvelopeError::Empty)?;
        let payload = match PayloadTag::from_byte(tag)? {
            PayloadTag::Plain => Payload::Plain(body.to_vec()),
            PayloadTag::Sealed => Payload::Sealed(body.to_vec()),
        };
        Ok(Self::new(correlation_key, payload))
    }

    /// Serialize to transport bytes paired with the same correlation key.
    pub fn to_bytes(&self) -> (Vec<u8>, CorrelationKey) {
        let body = self.payload.body();
        let mut bytes = Vec::with_capacity(body.len() + 1);
        bytes.push(self.payload.tag().as_byte());
        bytes.extend_from_slice(body);
        (bytes, self.correlation_key)
    }

    /// The correlation key this envelope belongs to.
    pub fn correlation_key(&self) -> CorrelationKey {
        self.correlation_key
    }

    /// Borrow the payload.
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Returns true if the payload is sealed.
    pub fn is_sealed(&self) -> bool {
        self.payload.is_sealed()
    }

    /// Split into key and payload.
    pub fn into_parts(self) -> (CorrelationKey, Payload) {
        (self.correlation_key, self.payload)
    }
}
