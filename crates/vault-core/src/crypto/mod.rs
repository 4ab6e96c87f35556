//! Cryptographic primitives for vault encryption
//!
//! This module provides:
//! - AES-256-GCM and XChaCha20-Poly1305 authenticated encryption
//! - Argon2id and PBKDF2-HMAC-SHA512 key derivation
//! - Secure memory handling with zeroize

mod cipher;
mod key_derivation;
mod secure_memory;

pub use cipher::{decrypt, encrypt, AES_GCM_NONCE_LEN, SALT_LEN, STREAM_HEADER_LEN};
pub use key_derivation::{
    derive_key, Argon2Params, KdfAlgorithm, KdfParams, Pbkdf2Params, ARGON2_MEMORY_RANGE_MIB,
    ARGON2_OPS_RANGE, DEFAULT_ARGON2_MEMORY_MIB, DEFAULT_ARGON2_OPS_LIMIT,
    DEFAULT_PBKDF2_ITERATIONS,
};
pub use secure_memory::{DerivedKey, VaultSecret};
