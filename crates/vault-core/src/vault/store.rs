//! Credential store: the in-memory authoritative list of credentials and
//! groups
//!
//! Every mutation flows through here so the change log sees a consistent
//! read-compute-append sequence. Not-found updates and deletes are silent
//! no-ops: log replay has to tolerate already-applied and out-of-order
//! operations.

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use super::changelog::diff_changes;
use super::types::{
    join_tags, split_tags, ChangeFlags, ChangeKind, Credential, CredentialProps, DiffChange,
    Group, Vault,
};

impl Vault {
    /// Look up a credential by id
    pub fn credential(&self, id: Uuid) -> Option<&Credential> {
        self.credentials.iter().find(|c| c.id == id)
    }

    /// Look up a group by id
    pub fn group(&self, id: Uuid) -> Option<&Group> {
        self.groups.iter().find(|g| g.id == id)
    }

    /// Credentials ordered by id bytes
    ///
    /// With time-ordered sortable identifiers this is deterministic across
    /// replicas regardless of insertion order, which is what makes the
    /// content hash reproducible without a stored ordering.
    pub fn sorted_credentials(&self) -> Vec<&Credential> {
        let mut sorted: Vec<&Credential> = self.credentials.iter().collect();
        sorted.sort_by(|a, b| a.id.as_bytes().cmp(b.id.as_bytes()));
        sorted
    }

    /// Create a credential from (possibly partial) form input
    ///
    /// A fresh sortable id and creation timestamp are assigned unless the
    /// input carries them (log replay and imports do). String fields are
    /// trimmed; tag lists are re-normalized.
    pub fn create_credential(&mut self, props: CredentialProps) -> Credential {
        let now = Utc::now();
        let date_created = props.date_created.unwrap_or(now);

        let credential = Credential {
            id: props.id.unwrap_or_else(Uuid::now_v7),
            kind: props.kind.unwrap_or_default(),
            group_id: props.group_id.flatten(),
            name: props.name.as_deref().map(str::trim).unwrap_or("").to_string(),
            username: props
                .username
                .as_deref()
                .map(str::trim)
                .unwrap_or("")
                .to_string(),
            password: props.password.unwrap_or_default(),
            totp: props.totp.flatten(),
            tags: normalize_tags(props.tags.as_deref().unwrap_or("")),
            url: props.url.as_deref().map(str::trim).unwrap_or("").to_string(),
            notes: props.notes.unwrap_or_default(),
            date_created,
            date_modified: props.date_modified.unwrap_or(date_created),
            date_password_changed: props.date_password_changed,
            custom_fields: props.custom_fields.unwrap_or_default(),
            hash: None,
        };

        self.credentials.push(credential.clone());
        let change = diff_changes(None, &credential);
        self.record_diff(change);

        debug!("Created credential {}", credential.id);
        credential
    }

    /// Update a credential from form input
    ///
    /// Returns `None` when the id is unknown. `date_password_changed` is
    /// stamped only when the password value actually differs;
    /// `date_modified` is stamped whenever any field changed. A submission
    /// with unchanged values records nothing.
    pub fn update_credential(&mut self, id: Uuid, props: CredentialProps) -> Option<Credential> {
        let index = self.credentials.iter().position(|c| c.id == id)?;
        let existing = self.credentials[index].clone();

        let mut candidate = existing.clone();
        apply_form_props(&mut candidate, &props);

        if candidate == existing {
            debug!("Update of credential {} changed nothing", id);
            return Some(existing);
        }

        let now = Utc::now();
        candidate.date_modified = now;
        if candidate.password != existing.password {
            candidate.date_password_changed = Some(now);
        }
        candidate.invalidate_hash();

        let change = diff_changes(Some(&existing), &candidate);
        self.credentials[index] = candidate.clone();
        self.record_diff(change);

        debug!("Updated credential {}", id);
        Some(candidate)
    }

    /// Delete a credential; silently accepted when the id is unknown
    pub fn delete_credential(&mut self, id: Uuid) {
        let Some(index) = self.credentials.iter().position(|c| c.id == id) else {
            debug!("Delete of unknown credential {} ignored", id);
            return;
        };

        self.credentials.remove(index);
        self.record_diff(Some(DiffChange {
            kind: ChangeKind::Delete,
            id,
            props: CredentialProps::default(),
            flags: ChangeFlags::default(),
        }));

        debug!("Deleted credential {}", id);
    }

    /// Apply a single logged change (diff-driven path, used by replay)
    ///
    /// Flags select which fields to overwrite; timestamps come from the
    /// props, not the clock. Updates of unknown ids create the credential.
    /// Returns whether the credential set actually changed.
    pub(crate) fn apply_change(&mut self, change: &DiffChange) -> bool {
        match change.kind {
            ChangeKind::Add | ChangeKind::Update => {
                match self.credentials.iter().position(|c| c.id == change.id) {
                    Some(index) => {
                        let existing = &self.credentials[index];
                        let mut candidate = existing.clone();
                        apply_change_props(&mut candidate, change);

                        if candidate == *existing {
                            return false;
                        }

                        candidate.invalidate_hash();
                        self.credentials[index] = candidate;
                        true
                    }
                    None => {
                        let mut credential = empty_credential(change.id);
                        apply_change_props(&mut credential, change);
                        self.credentials.push(credential);
                        true
                    }
                }
            }
            ChangeKind::Delete => {
                match self.credentials.iter().position(|c| c.id == change.id) {
                    Some(index) => {
                        self.credentials.remove(index);
                        true
                    }
                    None => false,
                }
            }
        }
    }

    /// Create a group
    pub fn create_group(&mut self, name: &str, icon: &str, color: &str) -> Group {
        let group = Group {
            id: Uuid::now_v7(),
            name: name.trim().to_string(),
            icon: icon.to_string(),
            color: color.to_string(),
        };
        self.groups.push(group.clone());
        debug!("Created group {}", group.id);
        group
    }

    /// Update a group; `None` when the id is unknown
    pub fn update_group(&mut self, group: Group) -> Option<Group> {
        let existing = self.groups.iter_mut().find(|g| g.id == group.id)?;
        existing.name = group.name.trim().to_string();
        existing.icon = group.icon;
        existing.color = group.color;
        Some(existing.clone())
    }

    /// Delete a group, moving its credentials to ungrouped
    ///
    /// Ungrouping is a real field change on every member, so each one gets
    /// its own log entry.
    pub fn delete_group(&mut self, id: Uuid) {
        let Some(index) = self.groups.iter().position(|g| g.id == id) else {
            return;
        };
        self.groups.remove(index);

        let members: Vec<Uuid> = self
            .credentials
            .iter()
            .filter(|c| c.group_id == Some(id))
            .map(|c| c.id)
            .collect();

        for member in members {
            self.update_credential(
                member,
                CredentialProps {
                    group_id: Some(None),
                    ..CredentialProps::default()
                },
            );
        }

        debug!("Deleted group {}", id);
    }

    /// Bulk-seed credentials and groups (import collaborator boundary)
    ///
    /// Seeding runs with diff generation inhibited so the log does not grow
    /// by one entry per imported row; a single checkpoint entry anchors the
    /// resulting state afterwards.
    pub fn import(&mut self, credentials: Vec<CredentialProps>, groups: Vec<Group>) {
        let count = credentials.len();
        let inhibit_before = self.configuration.inhibit_diff_generation;
        self.configuration.inhibit_diff_generation = true;

        for group in groups {
            if self.group(group.id).is_none() {
                self.groups.push(group);
            }
        }
        for props in credentials {
            self.create_credential(props);
        }

        self.configuration.inhibit_diff_generation = inhibit_before;
        if !inhibit_before {
            self.record_checkpoint();
        }

        info!("Imported {} credentials", count);
    }
}

/// Normalize a joined tag string: trim components, drop empties
fn normalize_tags(tags: &str) -> String {
    join_tags(&split_tags(tags))
}

/// Blank credential used as the base for update-or-create during replay
fn empty_credential(id: Uuid) -> Credential {
    let now = Utc::now();
    Credential {
        id,
        kind: Default::default(),
        group_id: None,
        name: String::new(),
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
    }
}

/// Apply form input: every present prop overwrites, with normalization.
/// Timestamps are ignored here - the store stamps them itself.
fn apply_form_props(credential: &mut Credential, props: &CredentialProps) {
    if let Some(kind) = props.kind {
        credential.kind = kind;
    }
    if let Some(group_id) = props.group_id {
        credential.group_id = group_id;
    }
    if let Some(name) = &props.name {
        credential.name = name.trim().to_string();
    }
    if let Some(username) = &props.username {
        credential.username = username.trim().to_string();
    }
    if let Some(password) = &props.password {
        credential.password = password.clone();
    }
    if let Some(totp) = &props.totp {
        credential.totp = totp.clone();
    }
    if let Some(tags) = &props.tags {
        credential.tags = normalize_tags(tags);
    }
    if let Some(url) = &props.url {
        credential.url = url.trim().to_string();
    }
    if let Some(notes) = &props.notes {
        credential.notes = notes.clone();
    }
    if let Some(custom_fields) = &props.custom_fields {
        credential.custom_fields = custom_fields.clone();
    }
}

/// Apply a logged change: for Add every present prop is copied verbatim,
/// for Update the flags select what to overwrite. Timestamps come from the
/// props so replicas converge on identical field values.
fn apply_change_props(credential: &mut Credential, change: &DiffChange) {
    let props = &change.props;
    let flags = &change.flags;
    let take_all = change.kind == ChangeKind::Add;

    if take_all || flags.kind {
        if let Some(kind) = props.kind {
            credential.kind = kind;
        }
    }
    if take_all || flags.group_id {
        if let Some(group_id) = props.group_id {
            credential.group_id = group_id;
        }
    }
    if take_all || flags.name {
        if let Some(name) = &props.name {
            credential.name = name.clone();
        }
    }
    if take_all || flags.username {
        if let Some(username) = &props.username {
            credential.username = username.clone();
        }
    }
    if take_all || flags.password {
        if let Some(password) = &props.password {
            credential.password = password.clone();
        }
    }
    if take_all || flags.totp {
        if let Some(totp) = &props.totp {
            credential.totp = totp.clone();
        }
    }
    if take_all || flags.tags {
        if let Some(tags) = &props.tags {
            credential.tags = tags.clone();
        }
    }
    if take_all || flags.url {
        if let Some(url) = &props.url {
            credential.url = url.clone();
        }
    }
    if take_all || flags.notes {
        if let Some(notes) = &props.notes {
            credential.notes = notes.clone();
        }
    }
    if take_all || flags.custom_fields {
        if let Some(custom_fields) = &props.custom_fields {
            credential.custom_fields = custom_fields.clone();
        }
    }
    if take_all {
        if let Some(date_created) = props.date_created {
            credential.date_created = date_created;
        }
    }
    if take_all || flags.date_modified {
        if let Some(date_modified) = props.date_modified {
            credential.date_modified = date_modified;
        }
    }
    if take_all || flags.date_password_changed {
        if let Some(date) = props.date_password_changed {
            credential.date_password_changed = Some(date);
        }
    }
}
