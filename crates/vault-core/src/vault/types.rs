//! Vault data model
//!
//! Everything persisted inside the encrypted payload lives here: credentials,
//! groups, the change log, and the vault configuration. The user secret is
//! deliberately absent - key material is held by the manager and never
//! serialized.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current vault schema version.
pub const VAULT_VERSION: u32 = 2;

/// Separator used to join tag lists into the single stored string.
/// A control character so it can never collide with user input.
pub const TAG_SEPARATOR: char = '\u{1}';

/// Join a tag list into the stored representation, dropping empties
pub fn join_tags<S: AsRef<str>>(tags: &[S]) -> String {
    tags.iter()
        .map(|t| t.as_ref().trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(&TAG_SEPARATOR.to_string())
}

/// Split the stored representation back into a tag list
pub fn split_tags(tags: &str) -> Vec<String> {
    tags.split(TAG_SEPARATOR)
        .filter(|t| !t.is_empty())
        .map(|t| t.to_string())
        .collect()
}

/// Type of credential
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialKind {
    /// SSH key pair
    SshKey,
    /// Username/password pair
    Credentials,
    /// Free-form secure note
    Note,
    /// Identity record (name, address, ...)
    Identity,
}

impl Default for CredentialKind {
    fn default() -> Self {
        Self::Credentials
    }
}

/// Supported hashing algorithm for TOTP codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TotpAlgorithm {
    Sha1,
    Sha256,
    Sha512,
}

/// Time-based OTP descriptor attached to a credential
///
/// Code generation happens outside the core; only the descriptor is stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TotpConfig {
    pub label: String,
    pub algorithm: TotpAlgorithm,
    pub digits: u8,
    pub period: u16,
    pub secret: String,
}

/// Type of a custom field value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CustomFieldKind {
    /// Plain text, shown as-is
    Text,
    /// Concealed like a password
    Hidden,
}

impl Default for CustomFieldKind {
    fn default() -> Self {
        Self::Text
    }
}

/// User-defined extra field on a credential (ordered)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomField {
    pub id: Uuid,
    pub name: String,
    pub kind: CustomFieldKind,
    pub value: String,
}

/// A single credential record
///
/// `id` is a UUIDv7: lexicographic byte order matches creation order, which
/// is what keeps the content hash reproducible across replicas without a
/// stored ordering. `hash` is a derived cache, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    /// Sortable unique identifier, assigned at creation, never reused
    pub id: Uuid,

    /// Kind of credential
    #[serde(default)]
    pub kind: CredentialKind,

    /// Owning group, None = ungrouped
    #[serde(default)]
    pub group_id: Option<Uuid>,

    pub name: String,
    pub username: String,
    pub password: String,

    /// Optional TOTP descriptor
    #[serde(default)]
    pub totp: Option<TotpConfig>,

    /// Separator-joined tag list (see [`TAG_SEPARATOR`])
    #[serde(default)]
    pub tags: String,

    pub url: String,
    pub notes: String,

    /// Set once at creation, immutable
    pub date_created: DateTime<Utc>,

    /// Set on every field-changing update
    pub date_modified: DateTime<Utc>,

    /// Set only when the password value actually changes
    #[serde(default)]
    pub date_password_changed: Option<DateTime<Utc>>,

    /// Ordered user-defined fields
    #[serde(default)]
    pub custom_fields: Vec<CustomField>,

    /// Cached content hash; recomputed lazily, invalidated on mutation
    #[serde(skip)]
    pub(crate) hash: Option<String>,
}

impl Credential {
    /// Drop the cached hash after a mutation
    pub fn invalidate_hash(&mut self) {
        self.hash = None;
    }

    /// The tag list as individual strings
    pub fn tag_list(&self) -> Vec<String> {
        split_tags(&self.tags)
    }
}

// The hash cache is derived state; two credentials with the same fields are
// equal regardless of which caches have been filled.
impl PartialEq for Credential {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.kind == other.kind
            && self.group_id == other.group_id
            && self.name == other.name
            && self.username == other.username
            && self.password == other.password
            && self.totp == other.totp
            && self.tags == other.tags
            && self.url == other.url
            && self.notes == other.notes
            && self.date_created == other.date_created
            && self.date_modified == other.date_modified
            && self.date_password_changed == other.date_password_changed
            && self.custom_fields == other.custom_fields
    }
}

impl Eq for Credential {}

/// Credential group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: Uuid,
    pub name: String,
    pub icon: String,
    pub color: String,
}

/// Serde helper for patch fields where "absent", "clear", and "set" are all
/// distinct: the outer Option is carried by field presence, the inner one by
/// null vs value.
mod double_option {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<T, S>(value: &Option<Option<T>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: Serialize,
        S: Serializer,
    {
        match value {
            Some(inner) => inner.serialize(serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        T: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}

/// Partial credential: only the fields carried by a form submission or a
/// diff are populated
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialProps {
    #[serde(default)]
    pub id: Option<Uuid>,
    #[serde(default)]
    pub kind: Option<CredentialKind>,
    /// `Some(None)` moves the credential out of its group
    #[serde(
        default,
        with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub group_id: Option<Option<Uuid>>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// `Some(None)` removes the TOTP descriptor
    #[serde(
        default,
        with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub totp: Option<Option<TotpConfig>>,
    #[serde(default)]
    pub tags: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub date_created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub date_modified: Option<DateTime<Utc>>,
    #[serde(default)]
    pub date_password_changed: Option<DateTime<Utc>>,
    #[serde(default)]
    pub custom_fields: Option<Vec<CustomField>>,
}

impl From<&Credential> for CredentialProps {
    /// Full snapshot of a credential (minus the volatile hash cache)
    fn from(c: &Credential) -> Self {
        Self {
            id: Some(c.id),
            kind: Some(c.kind),
            group_id: Some(c.group_id),
            name: Some(c.name.clone()),
            username: Some(c.username.clone()),
            password: Some(c.password.clone()),
            totp: Some(c.totp.clone()),
            tags: Some(c.tags.clone()),
            url: Some(c.url.clone()),
            notes: Some(c.notes.clone()),
            date_created: Some(c.date_created),
            date_modified: Some(c.date_modified),
            date_password_changed: c.date_password_changed,
            custom_fields: Some(c.custom_fields.clone()),
        }
    }
}

/// Kind of recorded change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Add,
    Update,
    Delete,
}

/// One flag per mutable credential field; a flag is true when and only when
/// that field's value differs from the prior snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeFlags {
    #[serde(default)]
    pub kind: bool,
    #[serde(default)]
    pub group_id: bool,
    #[serde(default)]
    pub name: bool,
    #[serde(default)]
    pub username: bool,
    #[serde(default)]
    pub password: bool,
    #[serde(default)]
    pub totp: bool,
    #[serde(default)]
    pub tags: bool,
    #[serde(default)]
    pub url: bool,
    #[serde(default)]
    pub notes: bool,
    #[serde(default)]
    pub custom_fields: bool,
    #[serde(default)]
    pub date_modified: bool,
    #[serde(default)]
    pub date_password_changed: bool,
}

impl ChangeFlags {
    /// Whether any field-level flag is set (timestamps excluded: they never
    /// change on their own)
    pub fn any_field(&self) -> bool {
        self.kind
            || self.group_id
            || self.name
            || self.username
            || self.password
            || self.totp
            || self.tags
            || self.url
            || self.notes
            || self.custom_fields
    }
}

/// A single recorded mutation of the credential set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffChange {
    pub kind: ChangeKind,
    /// Target credential
    pub id: Uuid,
    /// Changed fields only; full credential for Add, empty for Delete
    #[serde(default)]
    pub props: CredentialProps,
    /// Field flags; meaningful for Update
    #[serde(default)]
    pub flags: ChangeFlags,
}

/// Change-log entry: one mutation plus the content hash of the entire
/// credential set immediately after it was applied
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diff {
    pub hash: String,
    /// Absent for a checkpoint entry (e.g. after a bulk import)
    #[serde(default)]
    pub changes: Option<DiffChange>,
}

/// Change-log tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Configuration {
    /// Upper bound on the change-log length
    #[serde(default = "default_max_diff_count")]
    pub max_diff_count: usize,

    /// Collapse the log to the single latest entry while no devices are
    /// linked (nothing to reconcile against)
    #[serde(default = "default_save_only_latest")]
    pub save_only_latest_diff_when_no_linked: bool,

    /// Disable log growth and hash recomputation entirely (bulk seeding)
    #[serde(default)]
    pub inhibit_diff_generation: bool,
}

fn default_max_diff_count() -> usize {
    500
}

fn default_save_only_latest() -> bool {
    true
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            max_diff_count: default_max_diff_count(),
            save_only_latest_diff_when_no_linked: default_save_only_latest(),
            inhibit_diff_generation: false,
        }
    }
}

/// A device this vault reconciles with
///
/// The core only ever asks "how many peers are there"; everything else about
/// device linking lives outside.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedDevice {
    pub id: Uuid,
    pub name: String,
    pub added_at: DateTime<Utc>,
}

/// The decrypted vault payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vault {
    /// Schema version at creation time, immutable
    pub version: u32,

    /// Last migration applied; 0 until `upgrade()` runs
    #[serde(default)]
    pub current_version: u32,

    #[serde(default)]
    pub configuration: Configuration,

    #[serde(default)]
    pub linked_devices: Vec<LinkedDevice>,

    #[serde(default)]
    pub groups: Vec<Group>,

    #[serde(default)]
    pub credentials: Vec<Credential>,

    #[serde(default)]
    pub diffs: Vec<Diff>,
}

impl Vault {
    /// Create an empty vault at the current schema version
    pub fn new() -> Self {
        Self {
            version: VAULT_VERSION,
            current_version: 0,
            configuration: Configuration::default(),
            linked_devices: Vec::new(),
            groups: Vec::new(),
            credentials: Vec::new(),
            diffs: Vec::new(),
        }
    }

    /// Number of linked peers (drives the no-peer log collapsing rule)
    pub fn peer_count(&self) -> usize {
        self.linked_devices.len()
    }
}

impl Default for Vault {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_round_trip() {
        let tags = join_tags(&["work", "email", "  spaced  "]);
        assert_eq!(split_tags(&tags), vec!["work", "email", "spaced"]);
    }

    #[test]
    fn test_empty_tags() {
        assert_eq!(join_tags::<&str>(&[]), "");
        assert!(split_tags("").is_empty());
    }

    #[test]
    fn test_credential_equality_ignores_hash_cache() {
        let now = Utc::now();
        let mut a = Credential {
            id: Uuid::now_v7(),
            kind: CredentialKind::Credentials,
            group_id: None,
            name: "a".to_string(),
            username: String::new(),
            password: String::new(),
            totp: None,
            tags: String::new(),
            url: String::new(),
            notes: String::new(),
            date_created: now,
            date_modified: now,
            date_password_changed: None,
            custom_fields: Vec::new(),
            hash: None,
        };
        let b = a.clone();

        a.hash = Some("cached".to_string());
        assert_eq!(a, b);
    }

    #[test]
    fn test_configuration_defaults() {
        let config = Configuration::default();
        assert_eq!(config.max_diff_count, 500);
        assert!(config.save_only_latest_diff_when_no_linked);
        assert!(!config.inhibit_diff_generation);
    }
}
