//! # Symmetric Sealing
//!
//! XChaCha20-Poly1305 (default) or AES-256-GCM over a 256-bit key.
//!
//! ## Sealed Layout
//!
//! ```text
//! ┌──────────────────────────┬──────────────────────────┐
//! │ nonce (24 or 12 bytes)   │ ciphertext ‖ tag (16 B)  │
//! └──────────────────────────┴──────────────────────────┘
//! ```
//!
//! A fresh random nonce is drawn for every seal. With XChaCha20's 192-bit nonce
//! random generation is safe; AES-GCM's 96-bit nonce should only be used with
//! low per-key message counts, which per-session keys provide.

use crate::CryptoError;
use aes_gcm::Aes256Gcm;
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    XChaCha20Poly1305, XNonce,
};
use std::fmt;
use std::str::FromStr;
use zeroize::Zeroize;

/// AEAD authentication tag length for both ciphers.
pub const TAG_LEN: usize = 16;

/// Secret key (256-bit).
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct SecretKey([u8; 32]);

impl SecretKey {
    /// Create from bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Create from a slice, checking its length.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::InvalidKeyLength` unless the slice is 32 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let array: [u8; 32] = bytes.try_into().map_err(|_| CryptoError::InvalidKeyLength {
            expected: 32,
            actual: bytes.len(),
        })?;
        Ok(Self(array))
    }

    /// Generate random key.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut bytes);
        Self(bytes)
    }

    /// Get inner bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Returns true if every byte is zero.
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey(..)")
    }
}

/// Cipher selection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Cipher {
    /// XChaCha20-Poly1305 (default, side-channel immune)
    #[default]
    XChaCha20Poly1305,
    /// AES-256-GCM (use with AES-NI only)
    Aes256Gcm,
}

impl Cipher {
    /// Nonce length prefixed to every sealed payload.
    pub fn nonce_len(self) -> usize {
        match self {
            Cipher::XChaCha20Poly1305 => 24,
            Cipher::Aes256Gcm => 12,
        }
    }

    /// Configuration name.
    pub fn as_str(self) -> &'static str {
        match self {
            Cipher::XChaCha20Poly1305 => "xchacha20",
            Cipher::Aes256Gcm => "aes-gcm",
        }
    }
}

impl FromStr for Cipher {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "xchacha20" | "xchacha20poly1305" | "xchacha20-poly1305" => {
                Ok(Cipher::XChaCha20Poly1305)
            }
            "aes-gcm" | "aes256gcm" | "aes-256-gcm" => Ok(Cipher::Aes256Gcm),
            other => Err(format!("unknown cipher: {other}")),
        }
    }
}

fn random_nonce(len: usize) -> Vec<u8> {
    let mut nonce = vec![0u8; len];
    rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut nonce);
    nonce
}

/// Seal plaintext, returning `nonce ‖ ciphertext`.
///
/// # Errors
///
/// Returns `CryptoError::EncryptionFailed` if the AEAD rejects the input.
pub fn seal(cipher: Cipher, key: &SecretKey, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let nonce = random_nonce(cipher.nonce_len());
    let ciphertext = match cipher {
        Cipher::XChaCha20Poly1305 => XChaCha20Poly1305::new(key.as_bytes().into())
            .encrypt(XNonce::from_slice(&nonce), plaintext),
        Cipher::Aes256Gcm => Aes256Gcm::new(key.as_bytes().into())
            .encrypt(aes_gcm::Nonce::from_slice(&nonce), plaintext),
    }
    .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

    let mut sealed = nonce;
    sealed.extend_from_slice(&ciphertext);
    Ok(sealed)
}

/// Open a payload produced by [`seal`].
///
/// # Errors
///
/// Returns `CryptoError::Truncated` if the input cannot hold a nonce and tag,
/// and `CryptoError::DecryptionFailed` on a wrong key or tampered bytes.
pub fn open(cipher: Cipher, key: &SecretKey, sealed: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let min = cipher.nonce_len() + TAG_LEN;
    if sealed.len() < min {
        return Err(CryptoError::Truncated {
            len: sealed.len(),
            min,
        });
    }
    let (nonce, ciphertext) = sealed.split_at(cipher.nonce_len());

    match cipher {
        Cipher::XChaCha20Poly1305 => XChaCha20Poly1305::new(key.as_bytes().into())
            .decrypt(XNonce::from_slice(nonce), ciphertext),
        Cipher::Aes256Gcm => Aes256Gcm::new(key.as_bytes().into())
            .decrypt(aes_gcm::Nonce::from_slice(nonce), ciphertext),
    }
    .map_err(|e| CryptoError::DecryptionFailed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seal_open_roundtrip() {
        for cipher in [Cipher::XChaCha20Poly1305, Cipher::Aes256Gcm] {
            let key = SecretKey::generate();
            let sealed = seal(cipher, &key, b"listFiles folder1").unwrap();
            assert_eq!(sealed.len(), cipher.nonce_len() + 17 + TAG_LEN);
            assert_eq!(open(cipher, &key, &sealed).unwrap(), b"listFiles folder1");
        }
    }

    #[test]
    fn test_wrong_key_fails() {
        let key1 = SecretKey::generate();
        let key2 = SecretKey::generate();

        let sealed = seal(Cipher::default(), &key1, b"Secret message").unwrap();
        let result = open(Cipher::default(), &key2, &sealed);

        assert!(matches!(result, Err(CryptoError::DecryptionFailed(_))));
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let key = SecretKey::generate();

        let mut sealed = seal(Cipher::default(), &key, b"Secret message").unwrap();
        let last = sealed.len() - 1;
        sealed[last] ^= 0xFF;

        assert!(open(Cipher::default(), &key, &sealed).is_err());
    }

    #[test]
    fn test_truncated_input_rejected() {
        let key = SecretKey::generate();
        let result = open(Cipher::XChaCha20Poly1305, &key, &[0u8; 10]);
        assert_eq!(result, Err(CryptoError::Truncated { len: 10, min: 40 }));
    }

    #[test]
    fn test_nonces_differ_between_seals() {
        let key = SecretKey::generate();
        let a = seal(Cipher::default(), &key, b"same").unwrap();
        let b = seal(Cipher::default(), &key, b"same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_key_from_slice() {
        assert!(SecretKey::from_slice(&[1u8; 32]).is_ok());
        assert_eq!(
            SecretKey::from_slice(&[1u8; 16]).unwrap_err(),
            CryptoError::InvalidKeyLength {
                expected: 32,
                actual: 16
            }
        );
        assert!(SecretKey::from_bytes([0u8; 32]).is_zero());
    }

    #[test]
    fn test_cipher_from_str() {
        assert_eq!("aes-gcm".parse::<Cipher>().unwrap(), Cipher::Aes256Gcm);
        assert_eq!("XChaCha20".parse::<Cipher>().unwrap(), Cipher::XChaCha20Poly1305);
        assert!("rot13".parse::<Cipher>().is_err());
    }
}
