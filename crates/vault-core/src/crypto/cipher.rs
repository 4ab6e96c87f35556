//! Authenticated encryption of vault payloads
//!
//! Two interchangeable schemes, both keyed through [`derive_key`]:
//! - AES-256-GCM: 16-byte random salt, 12-byte random nonce
//! - XChaCha20-Poly1305: 16-byte random salt, 24-byte stream header, the
//!   whole payload sealed as a single final-tagged chunk
//!
//! Envelope ciphertext is ciphertext+tag; `salt`/`header_iv` carry the salt
//! and nonce/header in base64. Every call draws fresh randomness, so two
//! encryptions of identical input never match.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chacha20poly1305::{XChaCha20Poly1305, XNonce};
use rand::RngCore;

use super::key_derivation::{derive_key, KdfParams};
use crate::envelope::{CipherAlgorithm, EncryptedEnvelope};
use crate::error::{Result, VaultError};

/// Salt length for both schemes (bytes)
pub const SALT_LEN: usize = 16;

/// AES-256-GCM nonce length (bytes)
pub const AES_GCM_NONCE_LEN: usize = 12;

/// XChaCha20-Poly1305 stream header length (bytes)
pub const STREAM_HEADER_LEN: usize = 24;

/// Derived key length for both schemes (bytes)
const KEY_LEN: usize = 32;

/// Encrypt a payload into a fresh envelope
///
/// # Arguments
/// * `plaintext` - The serialized vault payload
/// * `secret` - The user's secret phrase as bytes
/// * `algorithm` - Cipher choice recorded in the envelope
/// * `kdf_params` - KDF choice and tuning recorded in the envelope
pub fn encrypt(
    plaintext: &[u8],
    secret: &[u8],
    algorithm: CipherAlgorithm,
    kdf_params: &KdfParams,
) -> Result<EncryptedEnvelope> {
    kdf_params.validate()?;

    let mut salt = [0u8; SALT_LEN];
    rand::rngs::OsRng.fill_bytes(&mut salt);

    let key = derive_key(secret, &salt, kdf_params, KEY_LEN)?;

    let (ciphertext, header_iv) = match algorithm {
        CipherAlgorithm::Aes256Gcm => {
            let mut nonce = [0u8; AES_GCM_NONCE_LEN];
            rand::rngs::OsRng.fill_bytes(&mut nonce);

            let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
                .map_err(|e| VaultError::Encryption(e.to_string()))?;
            let ciphertext = cipher
                .encrypt(Nonce::from_slice(&nonce), plaintext)
                .map_err(|e| VaultError::Encryption(e.to_string()))?;

            (ciphertext, BASE64.encode(nonce))
        }
        CipherAlgorithm::XChaCha20Poly1305 => {
            let mut header = [0u8; STREAM_HEADER_LEN];
            rand::rngs::OsRng.fill_bytes(&mut header);

            let cipher = XChaCha20Poly1305::new_from_slice(key.as_bytes())
                .map_err(|e| VaultError::Encryption(e.to_string()))?;
            let ciphertext = cipher
                .encrypt(XNonce::from_slice(&header), plaintext)
                .map_err(|e| VaultError::Encryption(e.to_string()))?;

            (ciphertext, BASE64.encode(header))
        }
    };

    Ok(EncryptedEnvelope::new(
        algorithm,
        kdf_params,
        ciphertext,
        BASE64.encode(salt),
        header_iv,
    ))
}

/// Decrypt an envelope back into the plaintext payload
///
/// The cipher, KDF, and KDF parameters are read from the envelope itself.
/// Any authentication failure, malformed header material, or wrong secret
/// surfaces as a decryption error; partial plaintext is never returned.
pub fn decrypt(envelope: &EncryptedEnvelope, secret: &[u8]) -> Result<Vec<u8>> {
    let kdf_params = envelope.kdf_params()?;

    let salt = BASE64
        .decode(&envelope.salt)
        .map_err(|e| VaultError::Decryption(format!("invalid salt encoding: {e}")))?;
    let header_iv = BASE64
        .decode(&envelope.header_iv)
        .map_err(|e| VaultError::Decryption(format!("invalid header encoding: {e}")))?;

    let key = derive_key(secret, &salt, &kdf_params, KEY_LEN)?;

    match envelope.algorithm {
        CipherAlgorithm::Aes256Gcm => {
            if header_iv.len() != AES_GCM_NONCE_LEN {
                return Err(VaultError::Decryption(format!(
                    "invalid nonce length: expected {}, got {}",
                    AES_GCM_NONCE_LEN,
                    header_iv.len()
                )));
            }

            let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
                .map_err(|e| VaultError::Decryption(e.to_string()))?;
            cipher
                .decrypt(Nonce::from_slice(&header_iv), envelope.ciphertext.as_slice())
                .map_err(|_| VaultError::Decryption("authentication failed".to_string()))
        }
        CipherAlgorithm::XChaCha20Poly1305 => {
            if header_iv.len() != STREAM_HEADER_LEN {
                return Err(VaultError::Decryption(format!(
                    "invalid stream header length: expected {}, got {}",
                    STREAM_HEADER_LEN,
                    header_iv.len()
                )));
            }

            let cipher = XChaCha20Poly1305::new_from_slice(key.as_bytes())
                .map_err(|e| VaultError::Decryption(e.to_string()))?;
            cipher
                .decrypt(XNonce::from_slice(&header_iv), envelope.ciphertext.as_slice())
                .map_err(|_| VaultError::Decryption("authentication failed".to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::key_derivation::{Argon2Params, Pbkdf2Params};

    fn fast_kdfs() -> Vec<KdfParams> {
        vec![
            KdfParams::Argon2id(Argon2Params {
                ops_limit: 1,
                memory_limit_mib: 8,
            }),
            KdfParams::Pbkdf2(Pbkdf2Params { iterations: 1_000 }),
        ]
    }

    #[test]
    fn test_round_trip_all_algorithm_kdf_pairs() {
        let plaintext = b"the quick brown fox";

        for algorithm in [
            CipherAlgorithm::Aes256Gcm,
            CipherAlgorithm::XChaCha20Poly1305,
        ] {
            for kdf in fast_kdfs() {
                let envelope = encrypt(plaintext, b"secret-phrase", algorithm, &kdf).unwrap();
                let decrypted = decrypt(&envelope, b"secret-phrase").unwrap();

                assert_eq!(decrypted, plaintext);
                assert_eq!(envelope.algorithm, algorithm);
                assert_eq!(envelope.kdf, kdf.algorithm());
            }
        }
    }

    #[test]
    fn test_empty_plaintext_round_trip() {
        let kdf = KdfParams::Pbkdf2(Pbkdf2Params { iterations: 1_000 });
        let envelope = encrypt(b"", b"secret", CipherAlgorithm::Aes256Gcm, &kdf).unwrap();
        let decrypted = decrypt(&envelope, b"secret").unwrap();
        assert!(decrypted.is_empty());
    }

    #[test]
    fn test_encryption_is_non_deterministic() {
        let kdf = KdfParams::Pbkdf2(Pbkdf2Params { iterations: 1_000 });

        let a = encrypt(b"same input", b"secret", CipherAlgorithm::XChaCha20Poly1305, &kdf).unwrap();
        let b = encrypt(b"same input", b"secret", CipherAlgorithm::XChaCha20Poly1305, &kdf).unwrap();

        assert_ne!(a.salt, b.salt);
        assert_ne!(a.header_iv, b.header_iv);
        assert_ne!(a.ciphertext, b.ciphertext);
    }

    #[test]
    fn test_wrong_secret_fails() {
        let kdf = KdfParams::Pbkdf2(Pbkdf2Params { iterations: 1_000 });
        let envelope = encrypt(b"data", b"right", CipherAlgorithm::Aes256Gcm, &kdf).unwrap();

        let result = decrypt(&envelope, b"wrong");
        assert!(matches!(result, Err(VaultError::Decryption(_))));
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let kdf = KdfParams::Pbkdf2(Pbkdf2Params { iterations: 1_000 });

        for algorithm in [
            CipherAlgorithm::Aes256Gcm,
            CipherAlgorithm::XChaCha20Poly1305,
        ] {
            let mut envelope = encrypt(b"data", b"secret", algorithm, &kdf).unwrap();
            envelope.ciphertext[0] ^= 0xFF;

            let result = decrypt(&envelope, b"secret");
            assert!(matches!(result, Err(VaultError::Decryption(_))));
        }
    }

    #[test]
    fn test_malformed_header_fails() {
        let kdf = KdfParams::Pbkdf2(Pbkdf2Params { iterations: 1_000 });
        let mut envelope = encrypt(b"data", b"secret", CipherAlgorithm::Aes256Gcm, &kdf).unwrap();
        envelope.header_iv = "not base64!!".to_string();

        assert!(matches!(
            decrypt(&envelope, b"secret"),
            Err(VaultError::Decryption(_))
        ));

        envelope.header_iv = BASE64.encode([0u8; 5]);
        assert!(matches!(
            decrypt(&envelope, b"secret"),
            Err(VaultError::Decryption(_))
        ));
    }

    #[test]
    fn test_wrong_kdf_params_fail_decryption() {
        let kdf = KdfParams::Pbkdf2(Pbkdf2Params { iterations: 1_000 });
        let mut envelope = encrypt(b"data", b"secret", CipherAlgorithm::Aes256Gcm, &kdf).unwrap();
        envelope.pbkdf2_params = Some(Pbkdf2Params { iterations: 2_000 });

        let result = decrypt(&envelope, b"secret");
        assert!(matches!(result, Err(VaultError::Decryption(_))));
    }

    #[test]
    fn test_missing_kdf_params_is_config_error() {
        let kdf = KdfParams::Argon2id(Argon2Params {
            ops_limit: 1,
            memory_limit_mib: 8,
        });
        let mut envelope = encrypt(b"data", b"secret", CipherAlgorithm::Aes256Gcm, &kdf).unwrap();
        envelope.argon2_params = None;

        assert!(matches!(
            decrypt(&envelope, b"secret"),
            Err(VaultError::Config(_))
        ));
    }
}
