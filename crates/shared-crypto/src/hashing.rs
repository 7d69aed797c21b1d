//! # BLAKE3 Key Derivation
//!
//! Per-session keys are derived from the node's master secret and the session
//! id, so two sessions never share a sealing key.

use crate::symmetric::SecretKey;

/// Context string for session key derivation. Changing it rotates every key.
pub const SESSION_KEY_CONTEXT: &str = "vdp 2024 session payload sealing";

/// Derive key from context and input key material.
pub fn blake3_derive_key(context: &str, key_material: &[u8]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new_derive_key(context);
    hasher.update(key_material);
    *hasher.finalize().as_bytes()
}

/// Derive the sealing key for one session.
pub fn derive_session_key(master: &SecretKey, session_id: &str) -> SecretKey {
    let mut material = Vec::with_capacity(32 + session_id.len());
    material.extend_from_slice(master.as_bytes());
    material.extend_from_slice(session_id.as_bytes());
    SecretKey::from_bytes(blake3_derive_key(SESSION_KEY_CONTEXT, &material))
}

/// Short non-secret fingerprint of a key, safe to log.
pub fn key_fingerprint(key: &SecretKey) -> [u8; 8] {
    let hash = blake3::hash(key.as_bytes());
    let mut out = [0u8; 8];
    out.copy_from_slice(&hash.as_bytes()[..8]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_key_deterministic() {
        let k1 = blake3_derive_key("ctx", b"material");
        let k2 = blake3_derive_key("ctx", b"material");
        assert_eq!(k1, k2);
    }

    #[test]
    fn test_derive_key_context_separation() {
        let k1 = blake3_derive_key("ctx-a", b"material");
        let k2 = blake3_derive_key("ctx-b", b"material");
        assert_ne!(k1, k2);
    }

    #[test]
    fn test_session_keys_differ_per_session() {
        let master = SecretKey::from_bytes([7u8; 32]);
        let a = derive_session_key(&master, "session-a");
        let b = derive_session_key(&master, "session-b");
        assert_ne!(a.as_bytes(), b.as_bytes());
        assert_eq!(
            derive_session_key(&master, "session-a").as_bytes(),
            a.as_bytes()
        );
    }

    #[test]
    fn test_fingerprint_hex() {
        let key = SecretKey::from_bytes([1u8; 32]);
        let fp = hex::encode(key_fingerprint(&key));
        assert_eq!(fp.len(), 16);
    }
}
