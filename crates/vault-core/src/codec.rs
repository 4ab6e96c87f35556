//! Binary codec for persisted entities
//!
//! CBOR via `ciborium`: length-delimited, self-describing maps keyed by
//! field name, so old and new binaries interoperate - unknown fields on
//! read are skipped, new fields are additive with serde defaults. Nothing
//! outside this module touches the wire representation.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::envelope::EncryptedEnvelope;
use crate::error::{Result, VaultError};
use crate::vault::Vault;

/// Serialize a vault payload to bytes (the plaintext fed to the cipher)
pub fn encode_vault(vault: &Vault) -> Result<Vec<u8>> {
    encode(vault)
}

/// Deserialize a vault payload from bytes
pub fn decode_vault(bytes: &[u8]) -> Result<Vault> {
    decode(bytes)
}

/// Serialize an envelope to bytes (what storage persists)
pub fn encode_envelope(envelope: &EncryptedEnvelope) -> Result<Vec<u8>> {
    encode(envelope)
}

/// Deserialize an envelope from bytes
pub fn decode_envelope(bytes: &[u8]) -> Result<EncryptedEnvelope> {
    decode(bytes)
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    ciborium::ser::into_writer(value, &mut bytes)
        .map_err(|e| VaultError::Format(e.to_string()))?;
    Ok(bytes)
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    ciborium::de::from_reader(bytes).map_err(|e| VaultError::Format(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{Argon2Params, KdfParams};
    use crate::envelope::CipherAlgorithm;
    use crate::vault::{
        CredentialProps, CustomField, CustomFieldKind, TotpAlgorithm, TotpConfig,
    };
    use uuid::Uuid;

    fn populated_vault() -> Vault {
        let mut vault = Vault::new();
        vault.configuration.save_only_latest_diff_when_no_linked = false;

        vault.create_group("Work", "briefcase", "#336699");
        let credential = vault.create_credential(CredentialProps {
            name: Some("Mail".to_string()),
            username: Some("alice@example.com".to_string()),
            password: Some("correct horse".to_string()),
            url: Some("https://mail.example.com".to_string()),
            notes: Some("personal account".to_string()),
            tags: Some(crate::vault::join_tags(&["mail", "personal"])),
            totp: Some(Some(TotpConfig {
                label: "mail".to_string(),
                algorithm: TotpAlgorithm::Sha1,
                digits: 6,
                period: 30,
                secret: "JBSWY3DPEHPK3PXP".to_string(),
            })),
            custom_fields: Some(vec![CustomField {
                id: Uuid::now_v7(),
                name: "recovery".to_string(),
                kind: CustomFieldKind::Hidden,
                value: "42".to_string(),
            }]),
            ..CredentialProps::default()
        });
        vault
            .update_credential(
                credential.id,
                CredentialProps {
                    notes: Some("shared account".to_string()),
                    ..CredentialProps::default()
                },
            )
            .unwrap();
        vault
    }

    #[test]
    fn test_empty_vault_round_trip() {
        let vault = Vault::new();
        let bytes = encode_vault(&vault).unwrap();
        let decoded = decode_vault(&bytes).unwrap();
        assert_eq!(decoded, vault);
    }

    #[test]
    fn test_populated_vault_round_trip() {
        let vault = populated_vault();
        let bytes = encode_vault(&vault).unwrap();
        let decoded = decode_vault(&bytes).unwrap();

        assert_eq!(decoded, vault);
        assert_eq!(decoded.diffs, vault.diffs);
        assert_eq!(decoded.credentials[0].totp, vault.credentials[0].totp);
    }

    #[test]
    fn test_credential_and_diff_round_trip() {
        let vault = populated_vault();
        let credential = vault.credentials[0].clone();
        let diff = vault.diffs.last().unwrap().clone();

        let decoded: crate::vault::Credential =
            decode(&encode(&credential).unwrap()).unwrap();
        assert_eq!(decoded, credential);

        let decoded: crate::vault::Diff = decode(&encode(&diff).unwrap()).unwrap();
        assert_eq!(decoded, diff);
    }

    #[test]
    fn test_envelope_round_trip() {
        let envelope = EncryptedEnvelope::new(
            CipherAlgorithm::XChaCha20Poly1305,
            &KdfParams::Argon2id(Argon2Params::default()),
            vec![0xDE, 0xAD, 0xBE, 0xEF],
            "c2FsdA==".to_string(),
            "aGVhZGVy".to_string(),
        );

        let bytes = encode_envelope(&envelope).unwrap();
        let decoded = decode_envelope(&bytes).unwrap();
        assert_eq!(decoded, envelope);
    }

    #[test]
    fn test_malformed_bytes_is_format_error() {
        let result = decode_vault(&[0xFF, 0x00, 0x13, 0x37]);
        assert!(matches!(result, Err(VaultError::Format(_))));

        let result = decode_envelope(b"not cbor at all");
        assert!(matches!(result, Err(VaultError::Format(_))));
    }

    #[test]
    fn test_clearing_updates_survive_the_wire() {
        // An "ungroup" or "remove TOTP" diff must round-trip as a clear,
        // not collapse into "unchanged"
        let mut vault = Vault::new();
        vault.configuration.save_only_latest_diff_when_no_linked = false;

        let group = vault.create_group("Work", "briefcase", "#336699");
        let credential = vault.create_credential(CredentialProps {
            name: Some("VPN".to_string()),
            group_id: Some(Some(group.id)),
            ..CredentialProps::default()
        });
        vault
            .update_credential(
                credential.id,
                CredentialProps {
                    group_id: Some(None),
                    ..CredentialProps::default()
                },
            )
            .unwrap();

        let bytes = encode_vault(&vault).unwrap();
        let decoded = decode_vault(&bytes).unwrap();

        let change = decoded.diffs.last().unwrap().changes.as_ref().unwrap();
        assert!(change.flags.group_id);
        assert_eq!(change.props.group_id, Some(None));
    }

    #[test]
    fn test_unknown_fields_are_skipped() {
        // A future writer may add fields; today's reader must ignore them
        let vault = populated_vault();
        let bytes = encode_vault(&vault).unwrap();

        let mut value: ciborium::Value = ciborium::de::from_reader(bytes.as_slice()).unwrap();
        if let ciborium::Value::Map(entries) = &mut value {
            entries.push((
                ciborium::Value::Text("field_from_the_future".to_string()),
                ciborium::Value::Integer(7.into()),
            ));
        } else {
            panic!("vault should encode as a map");
        }

        let mut extended = Vec::new();
        ciborium::ser::into_writer(&value, &mut extended).unwrap();

        let decoded = decode_vault(&extended).unwrap();
        assert_eq!(decoded, vault);
    }
}
