//! # vault-core
//!
//! Core vault functionality for Keyvault including:
//! - AES-256-GCM / XChaCha20-Poly1305 encryption with Argon2id or PBKDF2
//!   key derivation inside a versioned envelope format
//! - A content-addressed, replayable change log so vault copies on
//!   different devices reconcile without a central server
//! - Version-gated schema migrations for persisted payloads
//! - One-shot encrypted linking packages for bootstrapping a new device

pub mod codec;
pub mod crypto;
pub mod envelope;
pub mod error;
pub mod linking;
pub mod migrate;
pub mod storage;
pub mod vault;
mod manager;

pub use error::{Result, VaultError};
pub use manager::{VaultManager, VaultState};

pub use crypto::{Argon2Params, DerivedKey, KdfAlgorithm, KdfParams, Pbkdf2Params, VaultSecret};
pub use envelope::{CipherAlgorithm, EncryptedEnvelope};
pub use linking::LinkingPackage;
pub use migrate::UpgradeOutcome;
pub use storage::{FileVaultStorage, VaultStorage};
pub use vault::{
    ChangeFlags, ChangeKind, Configuration, Credential, CredentialKind, CredentialProps,
    CustomField, CustomFieldKind, Diff, DiffChange, Group, LinkedDevice, TotpAlgorithm,
    TotpConfig, Vault,
};
