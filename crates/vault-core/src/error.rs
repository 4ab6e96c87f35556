//! Error types for vault-core

use thiserror::Error;

/// Result type alias for vault operations
pub type Result<T> = std::result::Result<T, VaultError>;

/// Vault error types
#[derive(Error, Debug)]
pub enum VaultError {
    #[error("Vault is locked - unlock with the secret phrase first")]
    VaultLocked,

    #[error("No vault exists yet - create one first")]
    NotInitialized,

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Crypto failure: {0}")]
    Crypto(String),

    #[error("Encryption failed: {0}")]
    Encryption(String),

    #[error("Decryption failed: {0}")]
    Decryption(String),

    #[error("Malformed data: {0}")]
    Format(String),

    #[error("Migration to version {version} failed: {reason}")]
    Migration { version: u32, reason: String },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
