//! Storage trait definitions

use crate::error::Result;
use async_trait::async_trait;

/// Trait for vault blob storage collaborators
///
/// The core hands storage fully encoded, fully encrypted envelope bytes and
/// nothing else. `index` selects among multiple vaults held by the same
/// backend; `None` addresses the default slot.
#[async_trait]
pub trait VaultStorage: Send + Sync {
    /// Persist envelope bytes for the given slot
    async fn save(&self, index: Option<u32>, bytes: &[u8]) -> Result<()>;

    /// Load envelope bytes for the given slot, `None` when absent
    async fn load(&self, index: Option<u32>) -> Result<Option<Vec<u8>>>;

    /// Remove the given slot; absent slots are accepted silently
    async fn delete(&self, index: Option<u32>) -> Result<()>;

    /// Get a human-readable name for this storage backend
    fn backend_name(&self) -> &'static str;
}
