//! # Shared Crypto - Session Payload Sealing
//!
//! ## Components
//!
//! | Module | Algorithm | Use Case |
//! |--------|-----------|----------|
//! | `symmetric` | XChaCha20-Poly1305, AES-GCM | Sealing message bodies |
//! | `hashing` | BLAKE3 | Per-session key derivation |
//! | `context` | - | Per-connection seal/unseal object |
//!
//! ## Security Properties
//!
//! - **XChaCha20**: 192-bit nonce, constant-time, side-channel immune
//! - **BLAKE3 derive_key**: domain-separated session keys from one master secret
//! - **Zeroize**: key material is wiped on drop

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod context;
pub mod errors;
pub mod hashing;
pub mod symmetric;

// Re-exports
pub use context::{CryptoContext, NoCryptor, SessionCryptor};
pub use errors::CryptoError;
pub use hashing::{blake3_derive_key, derive_session_key, key_fingerprint};
pub use symmetric::{open, seal, Cipher, SecretKey};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    #[test]
    fn test_version() {
        assert!(!super::VERSION.is_empty());
    }
}
