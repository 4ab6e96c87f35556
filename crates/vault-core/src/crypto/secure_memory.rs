//! Secure memory handling with automatic zeroization

use zeroize::{Zeroize, ZeroizeOnDrop};

/// Symmetric key material derived from the user's secret phrase -
/// automatically zeroed when dropped
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey {
    key: Vec<u8>,
}

impl DerivedKey {
    /// Create a new derived key from raw bytes
    pub fn new(key: Vec<u8>) -> Self {
        Self { key }
    }

    /// Get the key bytes (use carefully - avoid copying)
    pub fn as_bytes(&self) -> &[u8] {
        &self.key
    }

    /// Key length in bytes
    pub fn len(&self) -> usize {
        self.key.len()
    }

    /// Whether the key is empty
    pub fn is_empty(&self) -> bool {
        self.key.is_empty()
    }
}

impl Clone for DerivedKey {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
        }
    }
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedKey")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

/// The user's secret phrase, kept in memory only while the vault is open -
/// automatically zeroed when dropped
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct VaultSecret {
    value: String,
}

impl VaultSecret {
    /// Create a new vault secret
    pub fn new(value: String) -> Self {
        Self { value }
    }

    /// Get the secret value (use carefully)
    pub fn expose(&self) -> &str {
        &self.value
    }

    /// The secret as raw bytes, for key derivation
    pub fn as_bytes(&self) -> &[u8] {
        self.value.as_bytes()
    }

    /// Consume and return the inner value
    pub fn into_inner(mut self) -> String {
        std::mem::take(&mut self.value)
    }
}

impl Clone for VaultSecret {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
        }
    }
}

impl From<&str> for VaultSecret {
    fn from(value: &str) -> Self {
        Self::new(value.to_string())
    }
}

impl std::fmt::Debug for VaultSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultSecret")
            .field("value", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_key_bytes() {
        let key = DerivedKey::new(vec![42u8; 32]);
        assert_eq!(key.as_bytes(), &[42u8; 32]);
        assert_eq!(key.len(), 32);
    }

    #[test]
    fn test_vault_secret_expose() {
        let secret = VaultSecret::new("my-secret".to_string());
        assert_eq!(secret.expose(), "my-secret");
        assert_eq!(secret.as_bytes(), b"my-secret");
    }

    #[test]
    fn test_debug_redacted() {
        let key = DerivedKey::new(vec![0u8; 32]);
        let debug = format!("{:?}", key);
        assert!(debug.contains("REDACTED"));

        let secret = VaultSecret::new("hunter2".to_string());
        let debug = format!("{:?}", secret);
        assert!(!debug.contains("hunter2"));
    }
}
