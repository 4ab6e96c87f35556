//! One-shot encrypted transfer package for bootstrapping a second device
//!
//! The payload travels as an opaque encrypted blob; the secret travels
//! out-of-band as a freshly generated mnemonic phrase. Portable form is a
//! colon-joined base64 triple `ciphertext:salt:header` so it fits wherever
//! text fits (QR codes, copy/paste).

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use bip39::Mnemonic;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::crypto::{self, Argon2Params, KdfParams};
use crate::envelope::{CipherAlgorithm, EncryptedEnvelope};
use crate::error::{Result, VaultError};

/// Words in a linking phrase
const PHRASE_WORDS: usize = 12;

/// KDF used for linking packages: memory-hard with the stock parameters.
/// The package carries no KDF metadata, so both sides must agree on these.
const LINKING_KDF: KdfParams = KdfParams::Argon2id(Argon2Params {
    ops_limit: crate::crypto::DEFAULT_ARGON2_OPS_LIMIT,
    memory_limit_mib: crate::crypto::DEFAULT_ARGON2_MEMORY_MIB,
});

/// Encrypted device-bootstrap package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkingPackage {
    /// Sealed payload (ciphertext + tag)
    pub ciphertext: Vec<u8>,
    /// Base64 KDF salt
    pub salt: String,
    /// Base64 stream header
    pub header: String,
}

impl LinkingPackage {
    /// Build a package from a payload, returning the one-time phrase to
    /// hand over out-of-band
    pub fn create(payload: &[u8]) -> Result<(String, LinkingPackage)> {
        Self::create_with_params(payload, &LINKING_KDF)
    }

    /// As [`create`](Self::create) with explicit KDF tuning
    pub fn create_with_params(
        payload: &[u8],
        kdf_params: &KdfParams,
    ) -> Result<(String, LinkingPackage)> {
        let mnemonic = Mnemonic::generate(PHRASE_WORDS)
            .map_err(|e| VaultError::Crypto(format!("phrase generation failed: {e}")))?;
        let phrase = mnemonic.to_string();

        let envelope = crypto::encrypt(
            payload,
            phrase.as_bytes(),
            CipherAlgorithm::XChaCha20Poly1305,
            kdf_params,
        )?;

        let package = LinkingPackage {
            ciphertext: envelope.ciphertext,
            salt: envelope.salt,
            header: envelope.header_iv,
        };

        info!("Created linking package ({} bytes)", package.ciphertext.len());
        Ok((phrase, package))
    }

    /// Decrypt a package with the phrase received out-of-band
    pub fn decrypt(&self, phrase: &str) -> Result<Vec<u8>> {
        self.decrypt_with_params(phrase, &LINKING_KDF)
    }

    /// As [`decrypt`](Self::decrypt) with explicit KDF tuning
    pub fn decrypt_with_params(&self, phrase: &str, kdf_params: &KdfParams) -> Result<Vec<u8>> {
        // Parsing normalizes whitespace/case and rejects garbled phrases
        // before any expensive key derivation runs
        let mnemonic = Mnemonic::parse(phrase)
            .map_err(|e| VaultError::Decryption(format!("invalid linking phrase: {e}")))?;
        let phrase = mnemonic.to_string();

        let envelope = EncryptedEnvelope::new(
            CipherAlgorithm::XChaCha20Poly1305,
            kdf_params,
            self.ciphertext.clone(),
            self.salt.clone(),
            self.header.clone(),
        );

        crypto::decrypt(&envelope, phrase.as_bytes())
    }

    /// Portable text form: `ciphertext:salt:header`, each segment base64
    pub fn to_portable_string(&self) -> String {
        format!(
            "{}:{}:{}",
            BASE64.encode(&self.ciphertext),
            self.salt,
            self.header
        )
    }

    /// Parse the portable text form
    pub fn from_portable_string(portable: &str) -> Result<LinkingPackage> {
        let segments: Vec<&str> = portable.split(':').collect();
        if segments.len() != 3 || segments.iter().any(|s| s.is_empty()) {
            return Err(VaultError::Format(
                "expected ciphertext:salt:header".to_string(),
            ));
        }

        let ciphertext = BASE64
            .decode(segments[0])
            .map_err(|e| VaultError::Format(format!("invalid ciphertext segment: {e}")))?;
        // Salt and header stay base64; decode to validate the segments
        BASE64
            .decode(segments[1])
            .map_err(|e| VaultError::Format(format!("invalid salt segment: {e}")))?;
        BASE64
            .decode(segments[2])
            .map_err(|e| VaultError::Format(format!("invalid header segment: {e}")))?;

        Ok(LinkingPackage {
            ciphertext,
            salt: segments[1].to_string(),
            header: segments[2].to_string(),
        })
    }
}
