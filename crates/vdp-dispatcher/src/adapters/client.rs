//! # Session Client Codec
//!
//! The client side of the envelope protocol: builds request envelopes and
//! reads response envelopes with the same crypto context the server-side
//! connection uses. Used by loopback sessions and tests.

use shared_crypto::CryptoContext;
use shared_types::{
    decode_message, encode_message, CorrelationKey, Envelope, InvocationDescriptor,
    InvocationResult, Payload, WireMessage,
};
use std::sync::Arc;

use crate::domain::errors::DispatchError;

/// A decoded response envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// Key copied from the request.
    pub correlation_key: CorrelationKey,
    /// Whether the response body was sealed.
    pub sealed: bool,
    /// Value or error.
    pub result: InvocationResult,
}

/// Encodes requests and decodes responses for one session.
#[derive(Clone)]
pub struct SessionClient {
    crypto: Arc<dyn CryptoContext>,
}

impl SessionClient {
    /// Create a client sharing the session's crypto context.
    pub fn new(crypto: Arc<dyn CryptoContext>) -> Self {
        Self { crypto }
    }

    /// Encode a request under a fresh correlation key.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError::Wire` or `DispatchError::Encryption`.
    pub fn encode_request(
        &self,
        descriptor: InvocationDescriptor,
        seal: bool,
    ) -> Result<(Vec<u8>, CorrelationKey), DispatchError> {
        self.encode_message(&WireMessage::Invocation(descriptor), seal)
    }

    /// Encode an arbitrary message body. Lets tests send bodies that are not
    /// invocations.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError::Wire` or `DispatchError::Encryption`.
    pub fn encode_message(
        &self,
        message: &WireMessage,
        seal: bool,
    ) -> Result<(Vec<u8>, CorrelationKey), DispatchError> {
        let body = encode_message(message)?;
        let payload = if seal {
            Payload::Sealed(self.crypto.seal(&body).map_err(DispatchError::Encryption)?)
        } else {
            Payload::Plain(body)
        };
        Ok(Envelope::new(CorrelationKey::new(), payload).to_bytes())
    }

    /// Decode a response envelope.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError::Envelope`, `Decryption`, `Wire`, or
    /// `UnexpectedMessage` if the body is not a result.
    pub fn decode_response(
        &self,
        bytes: &[u8],
        correlation_key: CorrelationKey,
    ) -> Result<Response, DispatchError> {
        let envelope = Envelope::from_bytes(bytes, correlation_key)?;
        let sealed = envelope.is_sealed();
        let body = match envelope.payload() {
            Payload::Sealed(body) => self.crypto.unseal(body).map_err(DispatchError::Decryption)?,
            Payload::Plain(body) => body.clone(),
        };
        match decode_message(&body)? {
            WireMessage::Result(result) => Ok(Response {
                correlation_key,
                sealed,
                result,
            }),
            WireMessage::Invocation(_) => Err(DispatchError::UnexpectedMessage("invocation")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_crypto::{Cipher, SecretKey, SessionCryptor};
    use shared_types::{PayloadTag, Value};

    fn client() -> SessionClient {
        SessionClient::new(Arc::new(SessionCryptor::new(
            Cipher::default(),
            SecretKey::generate(),
        )))
    }

    #[test]
    fn test_request_tag_follows_seal_flag() {
        let client = client();
        let descriptor = InvocationDescriptor::new("FileService", "remove", vec!["a".into()]);

        let (plain, _) = client.encode_request(descriptor.clone(), false).unwrap();
        assert_eq!(plain[0], PayloadTag::Plain.as_byte());

        let (sealed, _) = client.encode_request(descriptor, true).unwrap();
        assert_eq!(sealed[0], PayloadTag::Sealed.as_byte());
    }

    #[test]
    fn test_decode_sealed_result() {
        let client = client();
        let message = WireMessage::Result(InvocationResult::Value(Value::Bool(false)));
        let (bytes, key) = client.encode_message(&message, true).unwrap();

        let response = client.decode_response(&bytes, key).unwrap();
        assert!(response.sealed);
        assert_eq!(response.correlation_key, key);
        assert_eq!(response.result, InvocationResult::Value(Value::Bool(false)));
    }

    #[test]
    fn test_decode_rejects_invocation_body() {
        let client = client();
        let descriptor = InvocationDescriptor::new("X", "y", vec![]);
        let (bytes, key) = client.encode_request(descriptor, false).unwrap();
        assert!(matches!(
            client.decode_response(&bytes, key),
            Err(DispatchError::UnexpectedMessage(_))
        ));
    }
}
