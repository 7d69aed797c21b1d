//! # Session Crypto Context
//!
//! The object a connection uses to seal and unseal message bodies. Contexts
//! hold no per-message state and are shared between worker threads.

use crate::hashing::{derive_session_key, key_fingerprint};
use crate::symmetric::{open, seal, Cipher, SecretKey};
use crate::CryptoError;

/// Seals and unseals payload bodies for one session.
pub trait CryptoContext: Send + Sync {
    /// Encrypt a plaintext body.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError` if the body cannot be sealed.
    fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError>;

    /// Decrypt a sealed body.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError` on truncated, tampered, or foreign ciphertext.
    fn unseal(&self, sealed: &[u8]) -> Result<Vec<u8>, CryptoError>;
}

/// AEAD context keyed for a single session.
#[derive(Debug, Clone)]
pub struct SessionCryptor {
    cipher: Cipher,
    key: SecretKey,
}

impl SessionCryptor {
    /// Create from an explicit key.
    pub fn new(cipher: Cipher, key: SecretKey) -> Self {
        Self { cipher, key }
    }

    /// Derive the session key from a master secret.
    pub fn for_session(cipher: Cipher, master: &SecretKey, session_id: &str) -> Self {
        Self::new(cipher, derive_session_key(master, session_id))
    }

    /// Cipher in use.
    pub fn cipher(&self) -> Cipher {
        self.cipher
    }

    /// Loggable fingerprint of the session key.
    pub fn fingerprint(&self) -> [u8; 8] {
        key_fingerprint(&self.key)
    }
}

impl CryptoContext for SessionCryptor {
    fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        seal(self.cipher, &self.key, plaintext)
    }

    fn unseal(&self, sealed: &[u8]) -> Result<Vec<u8>, CryptoError> {
        open(self.cipher, &self.key, sealed)
    }
}

/// Context that refuses to seal or unseal.
///
/// Used by connections that never negotiated a session key. Any sealed inbound
/// payload fails to unseal.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCryptor;

impl CryptoContext for NoCryptor {
    fn seal(&self, _plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        Err(CryptoError::EncryptionFailed(
            "no session key negotiated".to_string(),
        ))
    }

    fn unseal(&self, _sealed: &[u8]) -> Result<Vec<u8>, CryptoError> {
        Err(CryptoError::DecryptionFailed(
            "no session key negotiated".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_session_roundtrip() {
        let master = SecretKey::generate();
        let cryptor = SessionCryptor::for_session(Cipher::default(), &master, "s-1");
        let sealed = cryptor.seal(b"payload").unwrap();
        assert_eq!(cryptor.unseal(&sealed).unwrap(), b"payload");
    }

    #[test]
    fn test_other_session_cannot_unseal() {
        let master = SecretKey::generate();
        let a = SessionCryptor::for_session(Cipher::default(), &master, "s-a");
        let b = SessionCryptor::for_session(Cipher::default(), &master, "s-b");
        let sealed = a.seal(b"payload").unwrap();
        assert!(b.unseal(&sealed).is_err());
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_no_cryptor_fails_both_ways() {
        let ctx: Arc<dyn CryptoContext> = Arc::new(NoCryptor);
        assert!(matches!(ctx.seal(b"x"), Err(CryptoError::EncryptionFailed(_))));
        assert!(matches!(ctx.unseal(b"x"), Err(CryptoError::DecryptionFailed(_))));
    }

    #[test]
    fn test_shared_across_threads() {
        let cryptor = Arc::new(SessionCryptor::new(Cipher::Aes256Gcm, SecretKey::generate()));
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let c = Arc::clone(&cryptor);
                std::thread::spawn(move || {
                    let msg = format!("message {i}");
                    let sealed = c.seal(msg.as_bytes()).unwrap();
                    assert_eq!(c.unseal(&sealed).unwrap(), msg.as_bytes());
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
    }
}
