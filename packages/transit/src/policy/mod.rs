//! Key policies
//!
//! A [`KeyPolicy`] is the named, versioned aggregate governing one logical
//! key: its algorithm, derivation settings, version bounds and the table of
//! [`KeyVersion`] records. Versions are appended by rotation and never
//! reused; existing key material is never rewritten.

pub mod generation;
pub mod key_type;
pub mod request;
pub mod version;

pub use generation::KeyRingGenerator;
pub use key_type::{EcCurve, KeyFamily, KeyType};
pub use request::PolicyRequest;
pub use version::KeyVersion;

use crate::derive::{self, KdfMode};
use crate::{PolicyError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use zeroize::Zeroizing;

/// Format version recorded on convergent policies
pub const CONVERGENT_VERSION: u32 = 3;

/// When a backup or restore happened and which version it covered
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupInfo {
    /// Time of the backup or restore
    pub time: DateTime<Utc>,
    /// Latest version at that time
    pub version: u32,
}

/// Identity attributes of `openpgp` policies
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PgpIdentity {
    /// Real name of the key holder
    #[serde(default)]
    pub real_name: String,
    /// Email of the key holder
    #[serde(default)]
    pub email: String,
    /// Free-form comment
    #[serde(default)]
    pub comment: String,
}

/// Named, versioned key policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyPolicy {
    /// Unique policy name
    pub name: String,
    /// Algorithm of every version
    #[serde(rename = "type")]
    pub key_type: KeyType,
    /// Context-based derivation enabled
    #[serde(default)]
    pub derived: bool,
    /// KDF used when `derived` is set
    #[serde(default)]
    pub kdf: KdfMode,
    /// Convergent encryption enabled (implies `derived`)
    #[serde(default)]
    pub convergent_encryption: bool,
    /// Convergent derivation format version, zero when not convergent
    #[serde(default)]
    pub convergent_version: u32,
    /// Key may be exported
    #[serde(default)]
    pub exportable: bool,
    /// Plaintext backups are allowed
    #[serde(default)]
    pub allow_plaintext_backup: bool,
    /// Policy may be deleted
    #[serde(default)]
    pub deletion_allowed: bool,
    /// Oldest version still stored
    pub min_available_version: u32,
    /// Oldest version usable for decryption
    pub min_decryption_version: u32,
    /// Oldest version usable for encryption
    pub min_encryption_version: u32,
    /// Newest version
    pub latest_version: u32,
    /// Key versions by decimal version string
    keys: HashMap<String, KeyVersion>,
    /// Last backup, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_info: Option<BackupInfo>,
    /// Last restore, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restore_info: Option<BackupInfo>,
    /// OpenPGP identity, empty for other types
    #[serde(flatten)]
    pub pgp_identity: PgpIdentity,
}

impl KeyPolicy {
    /// Build a new policy with version 1 from a validated request
    ///
    /// # Errors
    ///
    /// Returns an error if the request is invalid or key generation fails.
    pub fn create(
        request: &PolicyRequest,
        key_ring_generator: Option<&dyn KeyRingGenerator>,
    ) -> Result<Self> {
        request.validate()?;

        let first =
            generation::generate_version(request.key_type, &request.pgp_identity, key_ring_generator)?;

        let mut keys = HashMap::new();
        keys.insert("1".to_string(), first);

        Ok(Self {
            name: request.name.clone(),
            key_type: request.key_type,
            derived: request.derived,
            kdf: KdfMode::default(),
            convergent_encryption: request.convergent,
            convergent_version: if request.convergent {
                CONVERGENT_VERSION
            } else {
                0
            },
            exportable: request.exportable,
            allow_plaintext_backup: request.allow_plaintext_backup,
            deletion_allowed: true,
            min_available_version: 1,
            min_decryption_version: 1,
            min_encryption_version: 1,
            latest_version: 1,
            keys,
            backup_info: None,
            restore_info: None,
            pgp_identity: request.pgp_identity.clone(),
        })
    }

    /// Append a freshly generated version and return its number
    ///
    /// # Errors
    ///
    /// Returns an error if key generation fails; the policy is left unchanged.
    pub fn rotate(&mut self, key_ring_generator: Option<&dyn KeyRingGenerator>) -> Result<u32> {
        let next = self
            .latest_version
            .checked_add(1)
            .ok_or_else(|| PolicyError::internal("key version counter overflow"))?;

        let version =
            generation::generate_version(self.key_type, &self.pgp_identity, key_ring_generator)?;
        self.keys.insert(next.to_string(), version);
        self.latest_version = next;

        Ok(next)
    }

    /// Version table keyed by decimal version string
    #[must_use]
    pub fn keys(&self) -> &HashMap<String, KeyVersion> {
        &self.keys
    }

    /// Record for `version`, if stored
    #[must_use]
    pub fn version(&self, version: u32) -> Option<&KeyVersion> {
        self.keys.get(&version.to_string())
    }

    /// Derive `output_length` bytes for `version` from the caller's context
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The policy is not derived, its type cannot derive, or `context` is
    ///   empty (invalid request)
    /// - `version` is outside `[min_available_version, latest_version]` or
    ///   missing from the table (not found)
    pub fn derive_key(
        &self,
        context: &[u8],
        version: u32,
        output_length: usize,
    ) -> Result<Zeroizing<Vec<u8>>> {
        if !self.key_type.derivation_supported() {
            return Err(PolicyError::invalid_request(format!(
                "key type {} does not support key derivation",
                self.key_type
            )));
        }
        if !self.derived {
            return Err(PolicyError::invalid_request(format!(
                "policy {} is not configured for key derivation",
                self.name
            )));
        }
        if context.is_empty() {
            return Err(PolicyError::invalid_request(
                "missing context for key derivation",
            ));
        }

        let not_found = || PolicyError::VersionNotFound {
            name: self.name.clone(),
            version,
        };
        if version < self.min_available_version || version > self.latest_version {
            return Err(not_found());
        }
        let record = self.version(version).ok_or_else(not_found)?;

        derive::derive_key(self.kdf, record.key_material(), context, output_length)
    }
}
