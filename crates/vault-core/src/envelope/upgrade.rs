//! Envelope schema migrations
//!
//! v2: envelopes written before KDF parameters were stored explicitly relied
//! on implied defaults; the migration backfills the parameter structure so
//! every envelope is self-describing.

use super::types::{EncryptedEnvelope, ENVELOPE_VERSION};
use crate::crypto::{Argon2Params, KdfAlgorithm, Pbkdf2Params};
use crate::error::Result;
use crate::migrate::{run_migrations, Migration, UpgradeOutcome, Versioned};

impl Versioned for EncryptedEnvelope {
    fn version(&self) -> u32 {
        self.version
    }
    fn current_version(&self) -> u32 {
        self.current_version
    }
    fn set_current_version(&mut self, version: u32) {
        self.current_version = version;
    }
}

const MIGRATIONS: &[Migration<EncryptedEnvelope>] = &[(2, backfill_kdf_params)];

/// Bring a decoded envelope up to the current schema
pub fn upgrade(envelope: &mut EncryptedEnvelope) -> Result<UpgradeOutcome> {
    run_migrations(envelope, ENVELOPE_VERSION, MIGRATIONS)
}

fn backfill_kdf_params(envelope: &mut EncryptedEnvelope) -> Result<()> {
    match envelope.kdf {
        KdfAlgorithm::Argon2id => {
            if envelope.argon2_params.is_none() {
                envelope.argon2_params = Some(Argon2Params::default());
            }
        }
        KdfAlgorithm::Pbkdf2HmacSha512 => {
            if envelope.pbkdf2_params.is_none() {
                envelope.pbkdf2_params = Some(Pbkdf2Params::default());
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::CipherAlgorithm;

    fn v1_envelope_without_params() -> EncryptedEnvelope {
        EncryptedEnvelope {
            version: 1,
            current_version: 0,
            algorithm: CipherAlgorithm::Aes256Gcm,
            kdf: KdfAlgorithm::Argon2id,
            argon2_params: None,
            pbkdf2_params: None,
            ciphertext: vec![0xAA; 48],
            salt: "c2FsdHNhbHRzYWx0c2FsdA==".to_string(),
            header_iv: "bm9uY2Vub25jZW5vbg==".to_string(),
        }
    }

    #[test]
    fn test_v1_envelope_gets_default_params() {
        let mut envelope = v1_envelope_without_params();
        let outcome = upgrade(&mut envelope).unwrap();

        assert!(outcome.upgraded);
        assert!(outcome.requires_persist);
        assert_eq!(envelope.current_version, ENVELOPE_VERSION);
        assert_eq!(envelope.argon2_params, Some(Argon2Params::default()));
    }

    #[test]
    fn test_current_envelope_untouched() {
        let mut envelope = v1_envelope_without_params();
        envelope.version = ENVELOPE_VERSION;

        let outcome = upgrade(&mut envelope).unwrap();

        assert!(!outcome.upgraded);
        // A fresh envelope still has its migration stamp written
        assert!(outcome.requires_persist);
        assert!(envelope.argon2_params.is_none());
    }

    #[test]
    fn test_existing_params_preserved() {
        let mut envelope = v1_envelope_without_params();
        envelope.argon2_params = Some(Argon2Params {
            ops_limit: 2,
            memory_limit_mib: 64,
        });

        upgrade(&mut envelope).unwrap();

        assert_eq!(
            envelope.argon2_params,
            Some(Argon2Params {
                ops_limit: 2,
                memory_limit_mib: 64,
            })
        );
    }
}
