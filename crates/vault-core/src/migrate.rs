//! Version-gated schema migrations
//!
//! Both persisted object types (vault payload, encrypted envelope) evolve
//! through the same state machine: `current_version` starts at 0 on a fresh
//! object and only `upgrade()` moves it forward. Migrations apply for every
//! target version above `max(current_version, version)` - an object created
//! under the newest schema is already current and is never re-migrated on
//! first load; only objects decoded from older persisted bytes are.

use crate::error::{Result, VaultError};

/// A persisted object that tracks its schema versions
pub trait Versioned {
    /// Schema version the object was created under (immutable)
    fn version(&self) -> u32;

    /// Last migration applied; 0 until `upgrade()` runs
    fn current_version(&self) -> u32;

    /// Record the migration level after an upgrade pass
    fn set_current_version(&mut self, version: u32);
}

/// Result of an upgrade pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpgradeOutcome {
    /// Whether any migration ran
    pub upgraded: bool,
    /// The migration level after the pass (the latest known version)
    pub new_version: u32,
    /// Whether the object changed in a way that must be written back
    pub requires_persist: bool,
}

/// One migration step, keyed by the version it upgrades *to*
pub type Migration<T> = (u32, fn(&mut T) -> Result<()>);

/// Apply every applicable migration from the table, in ascending order
///
/// The table must be sorted by target version. A failing step aborts the
/// pass; migration failures are unexpected and fatal to the caller.
pub fn run_migrations<T: Versioned>(
    target: &mut T,
    latest: u32,
    migrations: &[Migration<T>],
) -> Result<UpgradeOutcome> {
    let initial = target.current_version();
    let floor = initial.max(target.version());

    let mut applied = 0usize;
    for (version, migrate) in migrations {
        if *version > floor && *version <= latest {
            migrate(target).map_err(|e| VaultError::Migration {
                version: *version,
                reason: e.to_string(),
            })?;
            applied += 1;
        }
    }

    target.set_current_version(latest);

    Ok(UpgradeOutcome {
        upgraded: applied > 0,
        new_version: latest,
        requires_persist: applied > 0 || initial != latest,
    })
}
