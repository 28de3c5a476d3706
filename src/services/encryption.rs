//! Sealed storage format for the persisted service-account credential.
//!
//! A sealed file is `MAGIC || nonce || ciphertext`. The magic header doubles as
//! AES-GCM associated data, so a blob sealed for some other purpose with the
//! same key does not open as a credential.

use aes_gcm::aead::{Aead, KeyInit, OsRng, Payload};
use aes_gcm::{AeadCore, Aes256Gcm, Nonce};
use base64::Engine;

const MAGIC: &[u8] = b"SVCRED1\n";
const NONCE_LEN: usize = 12;

/// AES-256-GCM sealing for the persisted service-account credential.
pub struct CredentialCipher {
    cipher: Aes256Gcm,
}

impl CredentialCipher {
    /// Create from a base64-encoded 32-byte key.
    pub fn from_base64(key_base64: &str) -> Result<Self, EncryptionError> {
        let key_bytes = base64::engine::general_purpose::STANDARD
            .decode(key_base64.trim())
            .map_err(|_| EncryptionError::InvalidKey)?;

        let cipher =
            Aes256Gcm::new_from_slice(&key_bytes).map_err(|_| EncryptionError::InvalidKey)?;

        Ok(Self { cipher })
    }

    /// Whether `bytes` carry the sealed-credential header.
    pub fn is_sealed(bytes: &[u8]) -> bool {
        bytes.starts_with(MAGIC)
    }

    pub fn seal(&self, credential_json: &[u8]) -> Result<Vec<u8>, EncryptionError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(
                &nonce,
                Payload {
                    msg: credential_json,
                    aad: MAGIC,
                },
            )
            .map_err(|_| EncryptionError::SealFailed)?;

        let mut sealed = Vec::with_capacity(MAGIC.len() + NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(MAGIC);
        sealed.extend_from_slice(&nonce);
        sealed.extend(ciphertext);
        Ok(sealed)
    }

    pub fn open(&self, sealed: &[u8]) -> Result<Vec<u8>, EncryptionError> {
        let body = sealed
            .strip_prefix(MAGIC)
            .ok_or(EncryptionError::NotSealed)?;
        if body.len() < NONCE_LEN {
            return Err(EncryptionError::OpenFailed);
        }

        let (nonce_bytes, ciphertext) = body.split_at(NONCE_LEN);
        self.cipher
            .decrypt(
                Nonce::from_slice(nonce_bytes),
                Payload {
                    msg: ciphertext,
                    aad: MAGIC,
                },
            )
            .map_err(|_| EncryptionError::OpenFailed)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EncryptionError {
    #[error("Invalid credential key (must be 32 bytes, base64-encoded)")]
    InvalidKey,

    #[error("Failed to seal credential")]
    SealFailed,

    #[error("Persisted credential is not sealed")]
    NotSealed,

    #[error("Failed to open sealed credential (wrong key or corrupted file)")]
    OpenFailed,
}
