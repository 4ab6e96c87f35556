//! Encrypted envelope schema
//!
//! The envelope is the persisted container for an encrypted vault payload:
//! opaque ciphertext plus the cipher/KDF metadata needed to decrypt it again.
//! Everything here is stored; key material never is.

use serde::{Deserialize, Serialize};

use crate::crypto::{Argon2Params, KdfAlgorithm, KdfParams, Pbkdf2Params};
use crate::error::{Result, VaultError};

/// Current envelope schema version.
pub const ENVELOPE_VERSION: u32 = 2;

/// Symmetric cipher selector, persisted in the envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CipherAlgorithm {
    /// AES-256-GCM with a 12-byte nonce
    Aes256Gcm,
    /// XChaCha20-Poly1305 stream construction with a 24-byte header
    XChaCha20Poly1305,
}

/// Persisted encrypted container holding ciphertext + cipher/KDF metadata
///
/// Exactly one of the KDF parameter structures is meaningful, selected by
/// `kdf`. `salt` and `header_iv` are base64 so the envelope can be embedded
/// in non-binary contexts (e.g. the portable linking string).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncryptedEnvelope {
    /// Envelope schema version at creation time
    pub version: u32,

    /// Last migration applied; 0 until `upgrade()` runs
    #[serde(default)]
    pub current_version: u32,

    /// Cipher used to produce `ciphertext`
    pub algorithm: CipherAlgorithm,

    /// KDF used to derive the cipher key from the user secret
    pub kdf: KdfAlgorithm,

    /// Argon2id tuning, present when `kdf` is Argon2id
    #[serde(default)]
    pub argon2_params: Option<Argon2Params>,

    /// PBKDF2 tuning, present when `kdf` is Pbkdf2HmacSha512
    #[serde(default)]
    pub pbkdf2_params: Option<Pbkdf2Params>,

    /// Ciphertext including the authentication tag
    pub ciphertext: Vec<u8>,

    /// Base64 KDF salt
    pub salt: String,

    /// Base64 nonce (AES-GCM) or stream header (XChaCha20-Poly1305)
    pub header_iv: String,
}

impl EncryptedEnvelope {
    /// Build a fresh envelope at the current schema version
    pub fn new(
        algorithm: CipherAlgorithm,
        kdf_params: &KdfParams,
        ciphertext: Vec<u8>,
        salt: String,
        header_iv: String,
    ) -> Self {
        let (argon2_params, pbkdf2_params) = match kdf_params {
            KdfParams::Argon2id(p) => (Some(*p), None),
            KdfParams::Pbkdf2(p) => (None, Some(*p)),
        };

        Self {
            version: ENVELOPE_VERSION,
            current_version: 0,
            algorithm,
            kdf: kdf_params.algorithm(),
            argon2_params,
            pbkdf2_params,
            ciphertext,
            salt,
            header_iv,
        }
    }

    /// The KDF parameters selected by `kdf`
    ///
    /// Fails with a configuration error when the matching parameter
    /// structure is missing from the envelope.
    pub fn kdf_params(&self) -> Result<KdfParams> {
        match self.kdf {
            KdfAlgorithm::Argon2id => self
                .argon2_params
                .map(KdfParams::Argon2id)
                .ok_or_else(|| {
                    VaultError::Config("envelope is missing Argon2 parameters".to_string())
                }),
            KdfAlgorithm::Pbkdf2HmacSha512 => self
                .pbkdf2_params
                .map(KdfParams::Pbkdf2)
                .ok_or_else(|| {
                    VaultError::Config("envelope is missing PBKDF2 parameters".to_string())
                }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_envelope_carries_matching_params() {
        let envelope = EncryptedEnvelope::new(
            CipherAlgorithm::Aes256Gcm,
            &KdfParams::Argon2id(Argon2Params::default()),
            vec![1, 2, 3],
            "c2FsdA==".to_string(),
            "aXY=".to_string(),
        );

        assert_eq!(envelope.version, ENVELOPE_VERSION);
        assert_eq!(envelope.kdf, KdfAlgorithm::Argon2id);
        assert!(envelope.argon2_params.is_some());
        assert!(envelope.pbkdf2_params.is_none());
        assert!(matches!(
            envelope.kdf_params(),
            Ok(KdfParams::Argon2id(_))
        ));
    }

    #[test]
    fn test_missing_params_is_config_error() {
        let mut envelope = EncryptedEnvelope::new(
            CipherAlgorithm::XChaCha20Poly1305,
            &KdfParams::Pbkdf2(Pbkdf2Params::default()),
            vec![],
            String::new(),
            String::new(),
        );
        envelope.pbkdf2_params = None;

        assert!(matches!(
            envelope.kdf_params(),
            Err(VaultError::Config(_))
        ));
    }
}
