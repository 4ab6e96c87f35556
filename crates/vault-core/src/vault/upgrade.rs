//! Vault schema migrations
//!
//! v2 is the linked-devices redesign: vaults written by the old
//! service-bound sync model carry no usable reconciliation state, so the
//! migration normalizes the configuration and drops log entries that predate
//! content hashing (their hash field is empty and they can never anchor a
//! replay).

use super::types::{Configuration, Vault, VAULT_VERSION};
use crate::error::Result;
use crate::migrate::{run_migrations, Migration, UpgradeOutcome, Versioned};

impl Versioned for Vault {
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

const MIGRATIONS: &[Migration<Vault>] = &[(2, migrate_to_linked_devices)];

/// Bring a decoded vault payload up to the current schema
pub fn upgrade(vault: &mut Vault) -> Result<UpgradeOutcome> {
    run_migrations(vault, VAULT_VERSION, MIGRATIONS)
}

fn migrate_to_linked_devices(vault: &mut Vault) -> Result<()> {
    if vault.configuration.max_diff_count == 0 {
        vault.configuration.max_diff_count = Configuration::default().max_diff_count;
    }
    vault.diffs.retain(|d| !d.hash.is_empty());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vault::types::Diff;

    #[test]
    fn test_v1_vault_is_normalized() {
        let mut vault = Vault::new();
        vault.version = 1;
        vault.configuration.max_diff_count = 0;
        vault.diffs.push(Diff {
            hash: String::new(),
            changes: None,
        });
        vault.diffs.push(Diff {
            hash: "da39a3ee5e6b4b0d3255bfef95601890afd80709".to_string(),
            changes: None,
        });

        let outcome = upgrade(&mut vault).unwrap();

        assert!(outcome.upgraded);
        assert!(outcome.requires_persist);
        assert_eq!(vault.current_version, VAULT_VERSION);
        assert_eq!(vault.configuration.max_diff_count, 500);
        assert_eq!(vault.diffs.len(), 1);
    }

    #[test]
    fn test_fresh_vault_is_not_migrated() {
        let mut vault = Vault::new();
        vault.diffs.push(Diff {
            hash: String::new(), // would be dropped if the migration ran
            changes: None,
        });

        let outcome = upgrade(&mut vault).unwrap();

        assert!(!outcome.upgraded);
        assert_eq!(vault.current_version, VAULT_VERSION);
        assert_eq!(vault.diffs.len(), 1);
    }

    #[test]
    fn test_upgrade_twice_is_stable() {
        let mut vault = Vault::new();
        vault.version = 1;

        upgrade(&mut vault).unwrap();
        let outcome = upgrade(&mut vault).unwrap();

        assert!(!outcome.upgraded);
        assert!(!outcome.requires_persist);
    }
}
