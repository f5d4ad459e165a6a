//! Reversible obfuscation of user IDs embedded in token subjects.
//!
//! IDs are sealed with AES-256-GCM under a dedicated secret so that database
//! identifiers never appear verbatim inside a token. Every call draws a fresh
//! nonce, so encrypting the same ID twice gives different ciphertexts.

use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit},
};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Nonce size for AES-256-GCM (96 bits)
const NONCE_SIZE: usize = 12;

/// GCM authentication tag size
const TAG_SIZE: usize = 16;

/// Encrypts and decrypts user IDs for token subjects.
#[derive(Clone)]
pub struct SubjectCodec {
    cipher: Aes256Gcm,
}

impl SubjectCodec {
    /// Create a codec keyed by the SHA-256 digest of `secret`.
    pub fn new(secret: &[u8]) -> Self {
        let key = Sha256::digest(secret);
        Self {
            cipher: Aes256Gcm::new(&key),
        }
    }

    /// Encrypt a user ID. Output is base64url(nonce || ciphertext || tag).
    pub fn encrypt(&self, user_id: i64) -> Result<String, SubjectError> {
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        rand::rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, user_id.to_string().as_bytes())
            .map_err(|_| SubjectError::Encryption)?;

        let mut payload = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        payload.extend_from_slice(&nonce_bytes);
        payload.extend_from_slice(&ciphertext);

        Ok(URL_SAFE_NO_PAD.encode(payload))
    }

    /// Decrypt a subject back into a user ID.
    ///
    /// A wrong key or any corruption fails authentication of the ciphertext
    /// and yields `DecryptionFailed`, never a garbage ID.
    pub fn decrypt(&self, subject: &str) -> Result<i64, SubjectError> {
        let payload = URL_SAFE_NO_PAD
            .decode(subject)
            .map_err(|_| SubjectError::Malformed)?;

        if payload.len() <= NONCE_SIZE + TAG_SIZE {
            return Err(SubjectError::Malformed);
        }

        let (nonce_bytes, ciphertext) = payload.split_at(NONCE_SIZE);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|_| SubjectError::DecryptionFailed)?;

        std::str::from_utf8(&plaintext)
            .ok()
            .and_then(|s| s.parse::<i64>().ok())
            .ok_or(SubjectError::InvalidPlaintext)
    }
}

/// Errors from sealing or opening a subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubjectError {
    /// Not valid base64url, or too short to hold a nonce and tag
    Malformed,
    /// Authentication tag mismatch (wrong key or tampered ciphertext)
    DecryptionFailed,
    /// Decrypted cleanly but is not a user ID
    InvalidPlaintext,
    /// The cipher refused to encrypt
    Encryption,
}

impl std::fmt::Display for SubjectError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubjectError::Malformed => write!(f, "Malformed subject"),
            SubjectError::DecryptionFailed => write!(f, "Subject decryption failed"),
            SubjectError::InvalidPlaintext => write!(f, "Subject plaintext is not a user ID"),
            SubjectError::Encryption => write!(f, "Subject encryption failed"),
        }
    }
}

impl std::error::Error for SubjectError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let codec = SubjectCodec::new(b"subject-secret-for-testing-only!");

        for id in [0, 1, 42, i64::MAX, -7] {
            let sealed = codec.encrypt(id).unwrap();
            assert_eq!(codec.decrypt(&sealed).unwrap(), id);
        }
    }

    #[test]
    fn test_fresh_nonce_per_call() {
        let codec = SubjectCodec::new(b"subject-secret-for-testing-only!");

        let a = codec.encrypt(42).unwrap();
        let b = codec.encrypt(42).unwrap();
        assert_ne!(a, b, "Repeated encryption should not be deterministic");
    }

    #[test]
    fn test_wrong_secret_fails() {
        let codec1 = SubjectCodec::new(b"secret-1");
        let codec2 = SubjectCodec::new(b"secret-2");

        let sealed = codec1.encrypt(42).unwrap();
        assert_eq!(
            codec2.decrypt(&sealed),
            Err(SubjectError::DecryptionFailed)
        );
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let codec = SubjectCodec::new(b"secret");

        let sealed = codec.encrypt(42).unwrap();
        let mut bytes = URL_SAFE_NO_PAD.decode(&sealed).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;
        let tampered = URL_SAFE_NO_PAD.encode(bytes);

        assert_eq!(
            codec.decrypt(&tampered),
            Err(SubjectError::DecryptionFailed)
        );
    }

    #[test]
    fn test_malformed_input() {
        let codec = SubjectCodec::new(b"secret");

        assert_eq!(codec.decrypt("not base64!"), Err(SubjectError::Malformed));
        assert_eq!(codec.decrypt(""), Err(SubjectError::Malformed));
        assert_eq!(codec.decrypt("AAAA"), Err(SubjectError::Malformed));
    }
}
