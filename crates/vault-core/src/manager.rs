//! Vault orchestration: unlock, lock, persist, and serialized mutation
//!
//! One `VaultManager` owns one vault instance. Every operation that touches
//! vault state runs under a single mutex for its whole read-compute-append
//! sequence - diff recording reads the credential set, computes a hash, and
//! appends to the log, and a second mutation observing stale state in
//! between would corrupt the hash chain. Independent managers (independent
//! vaults) proceed in parallel without coordination.

use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use crate::codec;
use crate::crypto::{self, KdfParams, VaultSecret};
use crate::envelope::{self, CipherAlgorithm};
use crate::error::{Result, VaultError};
use crate::linking::LinkingPackage;
use crate::storage::VaultStorage;
use crate::vault::{self, Credential, CredentialProps, Diff, Group, Vault};

/// Vault state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VaultState {
    /// No vault has been created yet
    NotInitialized,
    /// A vault exists in storage but is not unlocked
    Locked,
    /// Vault is unlocked and ready
    Unlocked,
}

/// An unlocked vault plus the secret needed to persist it again
struct OpenVault {
    vault: Vault,
    secret: VaultSecret,
}

/// Orchestrates a single vault instance
pub struct VaultManager {
    /// Storage backend
    storage: Arc<dyn VaultStorage>,
    /// Storage slot this vault lives in
    slot: Option<u32>,
    /// Cipher used when persisting
    algorithm: CipherAlgorithm,
    /// KDF used when persisting
    kdf_params: KdfParams,
    /// The open vault; one mutex serializes every mutation
    open: Mutex<Option<OpenVault>>,
}

impl VaultManager {
    /// Create a manager with the default cipher/KDF choices
    pub fn new(storage: Arc<dyn VaultStorage>) -> Self {
        Self::with_crypto(
            storage,
            None,
            CipherAlgorithm::XChaCha20Poly1305,
            KdfParams::default(),
        )
    }

    /// Create a manager with explicit slot and crypto configuration
    pub fn with_crypto(
        storage: Arc<dyn VaultStorage>,
        slot: Option<u32>,
        algorithm: CipherAlgorithm,
        kdf_params: KdfParams,
    ) -> Self {
        Self {
            storage,
            slot,
            algorithm,
            kdf_params,
            open: Mutex::new(None),
        }
    }

    /// Get the current vault state
    pub async fn state(&self) -> VaultState {
        if self.open.lock().await.is_some() {
            return VaultState::Unlocked;
        }
        match self.storage.load(self.slot).await {
            Ok(Some(_)) => VaultState::Locked,
            _ => VaultState::NotInitialized,
        }
    }

    /// Check if the vault is unlocked
    pub async fn is_unlocked(&self) -> bool {
        self.open.lock().await.is_some()
    }

    /// Create a new empty vault protected by the given secret
    pub async fn create(&self, secret: &str) -> Result<()> {
        if self.storage.load(self.slot).await?.is_some() {
            return Err(VaultError::Storage("vault already exists".to_string()));
        }

        let mut guard = self.open.lock().await;

        let mut vault = Vault::new();
        vault::upgrade(&mut vault)?;

        let open = OpenVault {
            vault,
            secret: VaultSecret::from(secret),
        };
        self.persist(&open).await?;
        *guard = Some(open);

        info!("Created new vault");
        Ok(())
    }

    /// Unlock the vault with the secret phrase
    ///
    /// Decrypts and decodes the stored envelope, then runs both schema
    /// upgrade passes; an upgraded payload is written back immediately.
    pub async fn unlock(&self, secret: &str) -> Result<()> {
        let mut guard = self.open.lock().await;
        if guard.is_some() {
            debug!("Vault already unlocked");
            return Ok(());
        }

        let bytes = self
            .storage
            .load(self.slot)
            .await?
            .ok_or(VaultError::NotInitialized)?;

        let mut envelope = codec::decode_envelope(&bytes)?;
        let envelope_outcome = envelope::upgrade(&mut envelope)?;

        let payload = crypto::decrypt(&envelope, secret.as_bytes())?;
        let mut vault = codec::decode_vault(&payload)?;
        let vault_outcome = vault::upgrade(&mut vault)?;

        let open = OpenVault {
            vault,
            secret: VaultSecret::from(secret),
        };

        if envelope_outcome.requires_persist || vault_outcome.requires_persist {
            debug!(
                "Persisting upgraded vault (envelope v{}, vault v{})",
                envelope_outcome.new_version, vault_outcome.new_version
            );
            self.persist(&open).await?;
        }

        *guard = Some(open);

        info!("Vault unlocked");
        Ok(())
    }

    /// Lock the vault (zeroizes key material in memory)
    pub async fn lock(&self) {
        let mut guard = self.open.lock().await;
        *guard = None;
        info!("Vault locked");
    }

    /// Change the secret phrase; requires the vault to be unlocked and the
    /// old phrase to match
    pub async fn change_secret(&self, old_secret: &str, new_secret: &str) -> Result<()> {
        let mut guard = self.open.lock().await;
        let open = guard.as_mut().ok_or(VaultError::VaultLocked)?;

        if open.secret.expose() != old_secret {
            return Err(VaultError::Decryption("wrong secret phrase".to_string()));
        }

        open.secret = VaultSecret::from(new_secret);
        self.persist(open).await?;

        info!("Vault secret changed");
        Ok(())
    }

    /// Delete the vault from storage and forget the in-memory state
    pub async fn destroy(&self) -> Result<()> {
        let mut guard = self.open.lock().await;
        *guard = None;
        self.storage.delete(self.slot).await?;
        info!("Vault destroyed");
        Ok(())
    }

    // ── Credential and group operations ──────────────────────────────────

    /// Create a credential and persist the vault
    pub async fn create_credential(&self, props: CredentialProps) -> Result<Credential> {
        let mut guard = self.open.lock().await;
        let open = guard.as_mut().ok_or(VaultError::VaultLocked)?;

        let credential = open.vault.create_credential(props);
        self.persist(open).await?;
        Ok(credential)
    }

    /// Update a credential and persist the vault; `None` for unknown ids
    pub async fn update_credential(
        &self,
        id: Uuid,
        props: CredentialProps,
    ) -> Result<Option<Credential>> {
        let mut guard = self.open.lock().await;
        let open = guard.as_mut().ok_or(VaultError::VaultLocked)?;

        let updated = open.vault.update_credential(id, props);
        if updated.is_some() {
            self.persist(open).await?;
        }
        Ok(updated)
    }

    /// Delete a credential and persist the vault
    pub async fn delete_credential(&self, id: Uuid) -> Result<()> {
        let mut guard = self.open.lock().await;
        let open = guard.as_mut().ok_or(VaultError::VaultLocked)?;

        open.vault.delete_credential(id);
        self.persist(open).await?;
        Ok(())
    }

    /// All credentials in sorted-id order
    pub async fn credentials(&self) -> Result<Vec<Credential>> {
        let guard = self.open.lock().await;
        let open = guard.as_ref().ok_or(VaultError::VaultLocked)?;
        Ok(open
            .vault
            .sorted_credentials()
            .into_iter()
            .cloned()
            .collect())
    }

    /// Create a group and persist the vault
    pub async fn create_group(&self, name: &str, icon: &str, color: &str) -> Result<Group> {
        let mut guard = self.open.lock().await;
        let open = guard.as_mut().ok_or(VaultError::VaultLocked)?;

        let group = open.vault.create_group(name, icon, color);
        self.persist(open).await?;
        Ok(group)
    }

    /// Delete a group (members become ungrouped) and persist the vault
    pub async fn delete_group(&self, id: Uuid) -> Result<()> {
        let mut guard = self.open.lock().await;
        let open = guard.as_mut().ok_or(VaultError::VaultLocked)?;

        open.vault.delete_group(id);
        self.persist(open).await?;
        Ok(())
    }

    /// Bulk-seed pre-validated records from an importer
    pub async fn import(
        &self,
        credentials: Vec<CredentialProps>,
        groups: Vec<Group>,
    ) -> Result<()> {
        let mut guard = self.open.lock().await;
        let open = guard.as_mut().ok_or(VaultError::VaultLocked)?;

        open.vault.import(credentials, groups);
        self.persist(open).await?;
        Ok(())
    }

    // ── Reconciliation ───────────────────────────────────────────────────

    /// The most recent content hash
    pub async fn latest_hash(&self) -> Result<String> {
        let mut guard = self.open.lock().await;
        let open = guard.as_mut().ok_or(VaultError::VaultLocked)?;
        Ok(open.vault.latest_hash())
    }

    /// Everything recorded after the given hash (see [`Vault::diffs_since`])
    pub async fn diffs_since(&self, hash: Option<&str>) -> Result<Vec<Diff>> {
        let guard = self.open.lock().await;
        let open = guard.as_ref().ok_or(VaultError::VaultLocked)?;
        Ok(open.vault.diffs_since(hash))
    }

    /// Replay diffs received from a peer and persist the result
    pub async fn apply_diffs(&self, diffs: &[Diff]) -> Result<()> {
        let mut guard = self.open.lock().await;
        let open = guard.as_mut().ok_or(VaultError::VaultLocked)?;

        open.vault.apply_diffs(diffs);
        self.persist(open).await?;
        Ok(())
    }

    /// Truncate the change log after an unrecoverable divergence
    pub async fn purge_diffs(&self) -> Result<()> {
        let mut guard = self.open.lock().await;
        let open = guard.as_mut().ok_or(VaultError::VaultLocked)?;

        open.vault.purge_diffs();
        self.persist(open).await?;
        Ok(())
    }

    // ── Device linking ───────────────────────────────────────────────────

    /// Build a linking package from the current vault payload; the returned
    /// phrase goes to the other device out-of-band
    pub async fn create_linking_package(&self) -> Result<(String, LinkingPackage)> {
        let guard = self.open.lock().await;
        let open = guard.as_ref().ok_or(VaultError::VaultLocked)?;

        let payload = codec::encode_vault(&open.vault)?;
        LinkingPackage::create_with_params(&payload, &self.kdf_params)
    }

    /// Bootstrap this (empty) vault from a linking package
    pub async fn accept_linking_package(
        &self,
        package: &LinkingPackage,
        phrase: &str,
        secret: &str,
    ) -> Result<()> {
        if self.storage.load(self.slot).await?.is_some() {
            return Err(VaultError::Storage("vault already exists".to_string()));
        }

        let mut guard = self.open.lock().await;

        let payload = package.decrypt_with_params(phrase, &self.kdf_params)?;
        let mut vault = codec::decode_vault(&payload)?;
        vault::upgrade(&mut vault)?;

        let open = OpenVault {
            vault,
            secret: VaultSecret::from(secret),
        };
        self.persist(&open).await?;
        *guard = Some(open);

        info!("Vault bootstrapped from linking package");
        Ok(())
    }

    /// Encode, encrypt, and store the vault payload
    async fn persist(&self, open: &OpenVault) -> Result<()> {
        let payload = codec::encode_vault(&open.vault)?;
        let mut envelope = crypto::encrypt(
            &payload,
            open.secret.as_bytes(),
            self.algorithm,
            &self.kdf_params,
        )?;
        // Stamp the fresh envelope as current so the next unlock does not
        // see a pending migration and rewrite storage
        envelope::upgrade(&mut envelope)?;
        let bytes = codec::encode_envelope(&envelope)?;
        self.storage.save(self.slot, &bytes).await?;

        debug!("Persisted vault ({} bytes)", bytes.len());
        Ok(())
    }
}
