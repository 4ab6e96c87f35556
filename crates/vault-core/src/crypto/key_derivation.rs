//! Password-based key derivation
//!
//! Two interchangeable strategies:
//! - Argon2id (memory-hard, the default for new vaults)
//! - PBKDF2 with HMAC-SHA-512 (iteration-based, kept for older envelopes)

use argon2::{Algorithm, Argon2, Params, Version};
use pbkdf2::pbkdf2_hmac;
use serde::{Deserialize, Serialize};
use sha2::Sha512;

use super::secure_memory::DerivedKey;
use crate::error::{Result, VaultError};

/// Default Argon2id passes over memory.
pub const DEFAULT_ARGON2_OPS_LIMIT: u32 = 3;

/// Default Argon2id memory limit in MiB.
pub const DEFAULT_ARGON2_MEMORY_MIB: u32 = 256;

/// Accepted Argon2id ops-limit range.
pub const ARGON2_OPS_RANGE: std::ops::RangeInclusive<u32> = 1..=4;

/// Accepted Argon2id memory range in MiB.
pub const ARGON2_MEMORY_RANGE_MIB: std::ops::RangeInclusive<u32> = 1..=4024;

/// Default PBKDF2 iteration count.
pub const DEFAULT_PBKDF2_ITERATIONS: u32 = 200_000;

/// Key derivation function selector, persisted in the envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KdfAlgorithm {
    /// Argon2id (memory-hard)
    Argon2id,
    /// PBKDF2 with HMAC-SHA-512
    Pbkdf2HmacSha512,
}

/// Parameters for Argon2id key derivation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Argon2Params {
    /// Number of passes over memory (1-4)
    pub ops_limit: u32,
    /// Memory limit in MiB (1-4024), converted to KiB internally
    pub memory_limit_mib: u32,
}

impl Default for Argon2Params {
    fn default() -> Self {
        Self {
            ops_limit: DEFAULT_ARGON2_OPS_LIMIT,
            memory_limit_mib: DEFAULT_ARGON2_MEMORY_MIB,
        }
    }
}

impl Argon2Params {
    /// Validate parameters against the documented bounds
    pub fn validate(&self) -> Result<()> {
        if !ARGON2_OPS_RANGE.contains(&self.ops_limit) {
            return Err(VaultError::Config(format!(
                "Argon2 ops limit {} outside range {:?}",
                self.ops_limit, ARGON2_OPS_RANGE
            )));
        }
        if !ARGON2_MEMORY_RANGE_MIB.contains(&self.memory_limit_mib) {
            return Err(VaultError::Config(format!(
                "Argon2 memory limit {} MiB outside range {:?}",
                self.memory_limit_mib, ARGON2_MEMORY_RANGE_MIB
            )));
        }
        Ok(())
    }
}

/// Parameters for PBKDF2 key derivation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pbkdf2Params {
    /// Iteration count
    pub iterations: u32,
}

impl Default for Pbkdf2Params {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_PBKDF2_ITERATIONS,
        }
    }
}

impl Pbkdf2Params {
    /// Validate parameters
    pub fn validate(&self) -> Result<()> {
        if self.iterations == 0 {
            return Err(VaultError::Config(
                "PBKDF2 iteration count must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Parameters for a concrete KDF choice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KdfParams {
    Argon2id(Argon2Params),
    Pbkdf2(Pbkdf2Params),
}

impl KdfParams {
    /// The algorithm these parameters belong to
    pub fn algorithm(&self) -> KdfAlgorithm {
        match self {
            KdfParams::Argon2id(_) => KdfAlgorithm::Argon2id,
            KdfParams::Pbkdf2(_) => KdfAlgorithm::Pbkdf2HmacSha512,
        }
    }

    /// Validate the wrapped parameters
    pub fn validate(&self) -> Result<()> {
        match self {
            KdfParams::Argon2id(p) => p.validate(),
            KdfParams::Pbkdf2(p) => p.validate(),
        }
    }
}

impl Default for KdfParams {
    fn default() -> Self {
        KdfParams::Argon2id(Argon2Params::default())
    }
}

/// Derive a symmetric key of `key_len` bytes from a secret and salt
///
/// # Arguments
/// * `secret` - The user's secret phrase as bytes
/// * `salt` - Random salt stored alongside the ciphertext (not secret)
/// * `params` - KDF selection and tuning parameters
/// * `key_len` - Requested key length in bytes
pub fn derive_key(
    secret: &[u8],
    salt: &[u8],
    params: &KdfParams,
    key_len: usize,
) -> Result<DerivedKey> {
    params.validate()?;

    let mut output = vec![0u8; key_len];

    match params {
        KdfParams::Argon2id(p) => {
            let argon2_params = Params::new(
                p.memory_limit_mib * 1024, // KiB
                p.ops_limit,
                1,
                Some(key_len),
            )
            .map_err(|e| VaultError::Crypto(e.to_string()))?;

            let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon2_params);
            argon2
                .hash_password_into(secret, salt, &mut output)
                .map_err(|e| VaultError::Crypto(e.to_string()))?;
        }
        KdfParams::Pbkdf2(p) => {
            pbkdf2_hmac::<Sha512>(secret, salt, p.iterations, &mut output);
        }
    }

    Ok(DerivedKey::new(output))
}
