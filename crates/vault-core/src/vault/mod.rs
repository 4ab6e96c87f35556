//! Vault state: credentials, groups, and the replayable change log

mod changelog;
mod store;
mod types;
mod upgrade;

pub use changelog::{credential_hash, diff_changes};
pub use types::{
    join_tags, split_tags, ChangeFlags, ChangeKind, Configuration, Credential, CredentialKind,
    CredentialProps, CustomField, CustomFieldKind, Diff, DiffChange, Group, LinkedDevice,
    TotpAlgorithm, TotpConfig, Vault, TAG_SEPARATOR, VAULT_VERSION,
};
pub use upgrade::upgrade;
