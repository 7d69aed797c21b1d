//! # Error Types
//!
//! The error taxonomy carried back to callers, plus the decode errors of this
//! crate.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use thiserror::Error;

use crate::codec::NestingGuard;

/// Kind of failure reported in an `ErrorRecord`.
///
/// This is the only way a caller can tell a resolution failure from an
/// invocation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// The inbound payload could not be unsealed.
    Decryption,
    /// The response could not be sealed.
    Encryption,
    /// No service is registered under the requested id.
    UnknownService,
    /// No single operation matches the name and arguments.
    NoMatchingOperation,
    /// The operation reported a recognized business or data failure.
    Processing,
    /// Anything else.
    System,
}

impl ErrorKind {
    /// Stable label, used for metrics and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Decryption => "decryption",
            Self::Encryption => "encryption",
            Self::UnknownService => "unknown_service",
            Self::NoMatchingOperation => "no_matching_operation",
            Self::Processing => "processing",
            Self::System => "system",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured error description returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorRecord {
    /// Failure kind.
    pub kind: ErrorKind,
    /// Human-readable message.
    pub message: String,
    /// Category reported by the failing operation, if any.
    pub category: Option<String>,
    /// Chained cause.
    pub cause: Option<Box<ErrorRecord>>,
}

#[derive(Deserialize)]
#[serde(rename = "ErrorRecord")]
struct ErrorRecordRepr {
    kind: ErrorKind,
    message: String,
    category: Option<String>,
    cause: Option<Box<ErrorRecord>>,
}

impl<'de> Deserialize<'de> for ErrorRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let _level = NestingGuard::enter::<D::Error>()?;
        let ErrorRecordRepr {
            kind,
            message,
            category,
            cause,
        } = ErrorRecordRepr::deserialize(deserializer)?;
        Ok(Self {
            kind,
            message,
            category,
            cause,
        })
    }
}

impl ErrorRecord {
    /// Create a record without category or cause.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            category: None,
            cause: None,
        }
    }

    /// Attach the category reported by the operation.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Attach a chained cause.
    pub fn with_cause(mut self, cause: ErrorRecord) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// Iterate over this record and its causes, outermost first.
    pub fn chain(&self) -> impl Iterator<Item = &ErrorRecord> {
        std::iter::successors(Some(self), |record| record.cause.as_deref())
    }

    /// The innermost record of the chain.
    pub fn root_cause(&self) -> &ErrorRecord {
        self.chain().last().unwrap_or(self)
    }
}

impl fmt::Display for ErrorRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)?;
        if let Some(cause) = &self.cause {
            write!(f, ": caused by {cause}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ErrorRecord {}

/// Errors parsing raw envelope bytes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvelopeError {
    /// Zero-length buffer.
    #[error("empty envelope")]
    Empty,

    /// Leading byte is not a known payload tag.
    #[error("unknown payload tag: {0:#04x}")]
    UnknownTag(u8),
}

/// Errors encoding or decoding a message body.
#[derive(Debug, Error)]
pub enum WireError {
    /// Body could not be encoded.
    #[error("encode failed: {0}")]
    Encode(String),

    /// Body could not be decoded.
    #[error("decode failed: {0}")]
    Decode(String),
}
