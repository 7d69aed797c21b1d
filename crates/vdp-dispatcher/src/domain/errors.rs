//! Dispatch failures raised before or around an invocation.
//!
//! Faults raised *by* an operation are [`ServiceFault`]s and go through the
//! classification policy instead.
//!
//! [`ServiceFault`]: super::fault::ServiceFault

use shared_crypto::CryptoError;
use shared_types::{EnvelopeError, ErrorKind, ErrorRecord, WireError};
use thiserror::Error;

use super::resolution::ResolutionError;

/// Errors produced by the dispatcher itself.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Raw bytes are not a valid envelope.
    #[error("malformed envelope: {0}")]
    Envelope(#[from] EnvelopeError),

    /// Sealed request could not be unsealed.
    #[error("failed to unseal request: {0}")]
    Decryption(#[source] CryptoError),

    /// Response could not be sealed.
    #[error("failed to seal response: {0}")]
    Encryption(#[source] CryptoError),

    /// Body could not be encoded or decoded.
    #[error("wire codec failure: {0}")]
    Wire(#[from] WireError),

    /// Body decoded but is not an invocation.
    #[error("unexpected message contents: expected an invocation, got {0}")]
    UnexpectedMessage(&'static str),

    /// No service under the requested id.
    #[error("unknown service '{0}'")]
    UnknownService(String),

    /// Operation resolution failed.
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
}

impl DispatchError {
    /// Wire error kind reported to the caller.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DispatchError::Decryption(_) => ErrorKind::Decryption,
            DispatchError::Encryption(_) => ErrorKind::Encryption,
            DispatchError::UnknownService(_) => ErrorKind::UnknownService,
            DispatchError::Resolution(_) => ErrorKind::NoMatchingOperation,
            DispatchError::Envelope(_)
            | DispatchError::Wire(_)
            | DispatchError::UnexpectedMessage(_) => ErrorKind::System,
        }
    }

    /// Build the caller-facing record, chaining the crypto cause if any.
    pub fn to_record(&self) -> ErrorRecord {
        let record = ErrorRecord::new(self.kind(), self.to_string());
        match self {
            DispatchError::Decryption(cause) | DispatchError::Encryption(cause) => {
                record.with_cause(ErrorRecord::new(ErrorKind::System, cause.to_string()))
            }
            _ => record,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(
            DispatchError::UnknownService("Ghost".into()).kind(),
            ErrorKind::UnknownService
        );
        assert_eq!(
            DispatchError::Resolution(ResolutionError::UnknownOperation {
                operation: "x".into()
            })
            .kind(),
            ErrorKind::NoMatchingOperation
        );
        assert_eq!(
            DispatchError::Decryption(CryptoError::DecryptionFailed("aead".into())).kind(),
            ErrorKind::Decryption
        );
        assert_eq!(
            DispatchError::UnexpectedMessage("result").kind(),
            ErrorKind::System
        );
        assert_eq!(DispatchError::from(EnvelopeError::Empty).kind(), ErrorKind::System);
    }

    #[test]
    fn test_record_chains_crypto_cause() {
        let record =
            DispatchError::Encryption(CryptoError::EncryptionFailed("no key".into())).to_record();
        assert_eq!(record.kind, ErrorKind::Encryption);
        assert!(record.root_cause().message.contains("no key"));

        let record = DispatchError::UnknownService("Ghost".into()).to_record();
        assert_eq!(record.message, "unknown service 'Ghost'");
        assert!(record.cause.is_none());
    }
}
