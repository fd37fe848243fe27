//! Structured policy descriptions returned on read

use crate::derive::KdfMode;
use crate::policy::{BackupInfo, KeyType, PgpIdentity};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// Everything a read reveals about a policy; never contains private material
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PolicyDescription {
    /// Policy name
    pub name: String,
    /// Algorithm
    #[serde(rename = "type")]
    pub key_type: KeyType,
    /// Context-based derivation enabled
    pub derived: bool,
    /// Policy may be deleted
    pub deletion_allowed: bool,
    /// Oldest stored version
    pub min_available_version: u32,
    /// Oldest version usable for decryption
    pub min_decryption_version: u32,
    /// Oldest version usable for encryption
    pub min_encryption_version: u32,
    /// Newest version
    pub latest_version: u32,
    /// Key may be exported
    pub exportable: bool,
    /// Plaintext backups allowed
    pub allow_plaintext_backup: bool,
    /// Type can encrypt
    pub supports_encryption: bool,
    /// Type can decrypt
    pub supports_decryption: bool,
    /// Type can sign
    pub supports_signing: bool,
    /// Type can derive per-context keys
    pub supports_derivation: bool,
    /// Last backup
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_info: Option<BackupInfo>,
    /// Last restore
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restore_info: Option<BackupInfo>,
    /// KDF, present only on derived policies
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kdf: Option<KdfMode>,
    /// KDF mode, present only for counter-mode derived policies
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kdf_mode: Option<KdfMode>,
    /// Convergent flag, present only on derived policies
    #[serde(skip_serializing_if = "Option::is_none")]
    pub convergent_encryption: Option<bool>,
    /// Convergent format version, present only on convergent policies
    #[serde(skip_serializing_if = "Option::is_none")]
    pub convergent_encryption_version: Option<u32>,
    /// Identity fields, present only on `openpgp` policies
    #[serde(flatten)]
    pub pgp_identity: Option<PgpIdentity>,
    /// Per-version table
    pub keys: VersionTable,
}

/// Per-version table, sorted by version string
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum VersionTable {
    /// Symmetric types: version to creation time in unix seconds
    Symmetric(BTreeMap<String, i64>),
    /// Asymmetric and OpenPGP types: version to public key details
    Asymmetric(BTreeMap<String, AsymmetricKey>),
}

impl VersionTable {
    /// Version strings in the table
    #[must_use]
    pub fn versions(&self) -> Vec<&str> {
        match self {
            Self::Symmetric(table) => table.keys().map(String::as_str).collect(),
            Self::Asymmetric(table) => table.keys().map(String::as_str).collect(),
        }
    }

    /// Public key details for `version`, if this is an asymmetric table
    #[must_use]
    pub fn asymmetric(&self, version: &str) -> Option<&AsymmetricKey> {
        match self {
            Self::Symmetric(_) => None,
            Self::Asymmetric(table) => table.get(version),
        }
    }
}

/// Public details of one asymmetric key version
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AsymmetricKey {
    /// Curve name, algorithm name or OpenPGP identity label
    pub name: String,
    /// Exported public key, empty when it cannot be computed without context
    pub public_key: String,
    /// When the version was created
    pub creation_time: DateTime<Utc>,
}
