//! Change log: content hashing, minimal change detection, and replay
//!
//! Every mutation of the credential set appends one entry holding the
//! mutation and the content hash of the whole set right after it applied.
//! Replaying the entries in order onto an empty store reproduces both the
//! state and the hash sequence, which is how two replicas agree on "what
//! changed since hash X" without a server arbitrating.

use sha1::{Digest, Sha1};
use tracing::debug;

use super::types::{
    ChangeFlags, ChangeKind, Configuration, Credential, CredentialKind, CredentialProps,
    CustomFieldKind, Diff, DiffChange, TotpAlgorithm, Vault,
};

/// Content hash of a single credential: a fixed, ordered subset of fields
/// concatenated into one canonical string, then SHA-1 (40 hex chars).
/// Empty/absent fields contribute the empty string.
pub fn credential_hash(credential: &Credential) -> String {
    let mut canonical = String::new();

    canonical.push_str(&credential.id.to_string());
    canonical.push_str(kind_label(credential.kind));
    if let Some(group_id) = credential.group_id {
        canonical.push_str(&group_id.to_string());
    }
    canonical.push_str(&credential.name);
    canonical.push_str(&credential.username);
    canonical.push_str(&credential.password);
    canonical.push_str(&credential.tags);
    canonical.push_str(&credential.url);
    canonical.push_str(&credential.notes);
    canonical.push_str(&credential.date_created.to_rfc3339());
    canonical.push_str(&credential.date_modified.to_rfc3339());
    if let Some(date) = credential.date_password_changed {
        canonical.push_str(&date.to_rfc3339());
    }
    for field in &credential.custom_fields {
        canonical.push_str(&field.id.to_string());
        canonical.push_str(&field.name);
        canonical.push_str(custom_field_kind_label(field.kind));
        canonical.push_str(&field.value);
    }
    if let Some(totp) = &credential.totp {
        canonical.push_str(&totp.label);
        canonical.push_str(totp_algorithm_label(totp.algorithm));
        canonical.push_str(&totp.digits.to_string());
        canonical.push_str(&totp.period.to_string());
        canonical.push_str(&totp.secret);
    }

    let digest = Sha1::digest(canonical.as_bytes());
    hex::encode(digest)
}

// Canonical labels are part of the hash input and must never change.
fn kind_label(kind: CredentialKind) -> &'static str {
    match kind {
        CredentialKind::SshKey => "ssh_key",
        CredentialKind::Credentials => "credentials",
        CredentialKind::Note => "note",
        CredentialKind::Identity => "identity",
    }
}

fn totp_algorithm_label(algorithm: TotpAlgorithm) -> &'static str {
    match algorithm {
        TotpAlgorithm::Sha1 => "sha1",
        TotpAlgorithm::Sha256 => "sha256",
        TotpAlgorithm::Sha512 => "sha512",
    }
}

fn custom_field_kind_label(kind: CustomFieldKind) -> &'static str {
    match kind {
        CustomFieldKind::Text => "text",
        CustomFieldKind::Hidden => "hidden",
    }
}

/// Minimal change between two credential snapshots
///
/// `None` prev means the credential is new: the change carries the full
/// snapshot. Otherwise fields are compared one by one; each difference sets
/// the matching flag and copies the new value. TOTP and custom fields
/// compare structurally. No differing field means no change at all (`None`),
/// which is how saving a form with unchanged values avoids log growth.
pub fn diff_changes(prev: Option<&Credential>, next: &Credential) -> Option<DiffChange> {
    let Some(prev) = prev else {
        return Some(DiffChange {
            kind: ChangeKind::Add,
            id: next.id,
            props: CredentialProps::from(next),
            flags: ChangeFlags::default(),
        });
    };

    let mut props = CredentialProps::default();
    let mut flags = ChangeFlags::default();

    if next.kind != prev.kind {
        flags.kind = true;
        props.kind = Some(next.kind);
    }
    if next.group_id != prev.group_id {
        flags.group_id = true;
        props.group_id = Some(next.group_id);
    }
    if next.name != prev.name {
        flags.name = true;
        props.name = Some(next.name.clone());
    }
    if next.username != prev.username {
        flags.username = true;
        props.username = Some(next.username.clone());
    }
    if next.password != prev.password {
        flags.password = true;
        props.password = Some(next.password.clone());
    }
    if next.totp != prev.totp {
        flags.totp = true;
        props.totp = Some(next.totp.clone());
    }
    if next.tags != prev.tags {
        flags.tags = true;
        props.tags = Some(next.tags.clone());
    }
    if next.url != prev.url {
        flags.url = true;
        props.url = Some(next.url.clone());
    }
    if next.notes != prev.notes {
        flags.notes = true;
        props.notes = Some(next.notes.clone());
    }
    if next.custom_fields != prev.custom_fields {
        flags.custom_fields = true;
        props.custom_fields = Some(next.custom_fields.clone());
    }

    if !flags.any_field() {
        return None;
    }

    // A real change always carries the modification timestamp; it never
    // produces a change on its own.
    flags.date_modified = true;
    props.date_modified = Some(next.date_modified);

    if next.date_password_changed != prev.date_password_changed {
        flags.date_password_changed = true;
        props.date_password_changed = next.date_password_changed;
    }

    Some(DiffChange {
        kind: ChangeKind::Update,
        id: next.id,
        props,
        flags,
    })
}

impl Vault {
    /// Content hash of the whole credential set: per-credential hashes
    /// concatenated in sorted-id order, then SHA-1
    ///
    /// Two replicas holding the same logical credential set produce the same
    /// value regardless of how they got there. Per-credential hashes are
    /// cached on the credentials.
    pub fn content_hash(&mut self) -> String {
        let mut order: Vec<usize> = (0..self.credentials.len()).collect();
        order.sort_by(|&a, &b| {
            self.credentials[a]
                .id
                .as_bytes()
                .cmp(self.credentials[b].id.as_bytes())
        });

        let mut hasher = Sha1::new();
        for index in order {
            if self.credentials[index].hash.is_none() {
                let computed = credential_hash(&self.credentials[index]);
                self.credentials[index].hash = Some(computed);
            }
            if let Some(hash) = &self.credentials[index].hash {
                hasher.update(hash.as_bytes());
            }
        }
        hex::encode(hasher.finalize())
    }

    /// Record a detected change in the log; no-op when diff generation is
    /// inhibited or nothing changed
    pub(crate) fn record_diff(&mut self, changes: Option<DiffChange>) {
        if self.configuration.inhibit_diff_generation {
            return;
        }
        let Some(changes) = changes else {
            return;
        };
        let hash = self.content_hash();
        self.append_entry(Diff {
            hash,
            changes: Some(changes),
        });
    }

    /// Record a checkpoint entry: the current content hash with no change
    /// payload (used to anchor state after bulk seeding)
    pub(crate) fn record_checkpoint(&mut self) {
        if self.configuration.inhibit_diff_generation {
            return;
        }
        let hash = self.content_hash();
        self.append_entry(Diff {
            hash,
            changes: None,
        });
    }

    fn append_entry(&mut self, diff: Diff) {
        let max = self.configuration.max_diff_count;
        if max > 0 && self.diffs.len() >= max {
            // Keep the newest max-1 so the appended entry lands at capacity
            let drop_count = self.diffs.len() - (max - 1);
            self.diffs.drain(..drop_count);
        }

        // With nobody to reconcile against, history older than the latest
        // entry is dead weight.
        if self.peer_count() == 0 && self.configuration.save_only_latest_diff_when_no_linked {
            self.diffs.clear();
        }

        debug!("Recorded diff {}", diff.hash);
        self.diffs.push(diff);
    }

    /// Replay a diff sequence, in order, onto this vault
    ///
    /// Add/Update apply update-or-create semantics; Delete removes silently.
    /// Entries that change nothing (already applied) are skipped entirely,
    /// so replaying the same sequence twice is harmless.
    pub fn apply_diffs(&mut self, diffs: &[Diff]) {
        for diff in diffs {
            let Some(change) = &diff.changes else {
                continue;
            };
            if self.apply_change(change) {
                self.record_diff(Some(change.clone()));
            }
        }
    }

    /// The log's most recent hash, or the live content hash for a vault
    /// that has no history yet
    pub fn latest_hash(&mut self) -> String {
        match self.diffs.last() {
            Some(diff) => diff.hash.clone(),
            None => self.content_hash(),
        }
    }

    /// All recorded hashes, most recent first
    pub fn all_hashes(&self) -> Vec<String> {
        self.diffs.iter().rev().map(|d| d.hash.clone()).collect()
    }

    /// Everything recorded after the given hash
    ///
    /// `None` means the peer has nothing: one Add entry per current
    /// credential is synthesized in sorted order by driving a disposable
    /// vault through creation. An unknown hash returns an empty sequence -
    /// the caller's signal to fall back to a full resync.
    pub fn diffs_since(&self, hash: Option<&str>) -> Vec<Diff> {
        let Some(hash) = hash else {
            return self.bootstrap_diffs();
        };

        match self.diffs.iter().position(|d| d.hash == hash) {
            Some(index) => self.diffs[index + 1..].to_vec(),
            None => Vec::new(),
        }
    }

    fn bootstrap_diffs(&self) -> Vec<Diff> {
        let mut bootstrap = Vault::new();
        bootstrap.configuration = Configuration {
            max_diff_count: self.credentials.len().max(1),
            save_only_latest_diff_when_no_linked: false,
            inhibit_diff_generation: false,
        };

        for credential in self.sorted_credentials() {
            bootstrap.create_credential(CredentialProps::from(credential));
        }
        bootstrap.diffs
    }

    /// Truncate the log to the single most recent entry (recovery action
    /// after a detected unrecoverable divergence)
    pub fn purge_diffs(&mut self) {
        if self.diffs.len() > 1 {
            let keep_from = self.diffs.len() - 1;
            self.diffs.drain(..keep_from);
        }
    }
}
