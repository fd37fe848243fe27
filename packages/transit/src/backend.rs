//! Keys backend: list, create, read and delete named keys
//!
//! Transport-agnostic request surface over [`PolicyStore`] and the export
//! service. Requests are plain serde structs so any routing layer can feed
//! them in.

use crate::export::{self, PolicyDescription};
use crate::policy::{KeyType, PgpIdentity, PolicyRequest};
use crate::store::{PolicyStore, Storage};
use crate::{PolicyError, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Create/update request for a named key
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateKeyRequest {
    /// Key name
    pub name: String,
    /// Key type wire name; `aes256-gcm96` when absent
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub key_type: Option<String>,
    /// Enable key derivation
    #[serde(default)]
    pub derived: bool,
    /// Enable convergent encryption (requires `derived`)
    #[serde(default)]
    pub convergent_encryption: bool,
    /// Allow export of the key
    #[serde(default)]
    pub exportable: bool,
    /// Allow plaintext backups
    #[serde(default)]
    pub allow_plaintext_backup: bool,
    /// OpenPGP real name
    #[serde(default)]
    pub real_name: String,
    /// OpenPGP email
    #[serde(default)]
    pub email: String,
    /// OpenPGP comment
    #[serde(default)]
    pub comment: String,
}

impl CreateKeyRequest {
    /// Request for `name` of the given type wire name
    pub fn new(name: impl Into<String>, key_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            key_type: Some(key_type.into()),
            ..Self::default()
        }
    }

    fn to_policy_request(&self) -> Result<PolicyRequest> {
        if self.convergent_encryption && !self.derived {
            return Err(PolicyError::invalid_request(
                "convergent encryption requires derivation to be enabled",
            ));
        }

        let key_type = match self.key_type.as_deref() {
            Some(raw) => raw.parse::<KeyType>()?,
            None => KeyType::default(),
        };

        Ok(PolicyRequest::new(self.name.clone(), key_type)
            .with_derived(self.derived)
            .with_convergent(self.convergent_encryption)
            .with_exportable(self.exportable)
            .with_allow_plaintext_backup(self.allow_plaintext_backup)
            .with_pgp_identity(PgpIdentity {
                real_name: self.real_name.clone(),
                email: self.email.clone(),
                comment: self.comment.clone(),
            }))
    }
}

/// Outcome of a successful write
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WriteResponse {
    /// Non-fatal notices, such as the key already existing
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// Named key operations
pub struct KeysBackend<S> {
    store: PolicyStore<S>,
}

impl<S: Storage> KeysBackend<S> {
    /// Backend over `store`
    pub fn new(store: PolicyStore<S>) -> Self {
        Self { store }
    }

    /// Underlying policy store
    #[must_use]
    pub fn store(&self) -> &PolicyStore<S> {
        &self.store
    }

    /// Names of all keys in ascending order
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend fails.
    pub async fn list_keys(&self) -> Result<Vec<String>> {
        self.store.list().await
    }

    /// Create `request.name` unless it exists; an existing key is left untouched
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Convergent encryption is requested without derivation
    /// - The key type is unknown or does not support the requested options
    /// - Key generation or storage fails
    pub async fn write_key(&self, request: &CreateKeyRequest) -> Result<WriteResponse> {
        let policy_request = request.to_policy_request()?;
        let (policy, created) = self.store.get_or_create(&policy_request).await?;
        if policy.is_none() {
            return Err(PolicyError::internal(
                "error generating key: returned policy was nil",
            ));
        }

        let mut response = WriteResponse::default();
        if created {
            info!(name = %request.name, key_type = %policy_request.key_type, "created key");
        } else {
            debug!(name = %request.name, "key already existed");
            response
                .warnings
                .push(format!("key {} already existed", request.name));
        }
        Ok(response)
    }

    /// Describe `name`, or `None` when it does not exist
    ///
    /// `context` is base64 and only consulted for derived Ed25519 keys.
    ///
    /// # Errors
    ///
    /// Returns an error if the context is malformed, the stored material
    /// cannot be exported or the storage backend fails.
    pub async fn read_key(
        &self,
        name: &str,
        context: Option<&str>,
    ) -> Result<Option<PolicyDescription>> {
        let Some(policy) = self.store.get(name).await? else {
            return Ok(None);
        };
        export::describe(&policy, context).map(Some)
    }

    /// Append a new version to `name`
    ///
    /// # Errors
    ///
    /// Returns an error if the key does not exist or generation or storage
    /// fails.
    pub async fn rotate_key(&self, name: &str) -> Result<u32> {
        self.store.rotate(name).await
    }

    /// Delete `name`; on failure the key is left in place
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::DeleteFailed`] wrapping the underlying cause.
    pub async fn delete_key(&self, name: &str) -> Result<()> {
        self.store
            .delete(name)
            .await
            .map_err(|source| PolicyError::DeleteFailed {
                name: name.to_string(),
                source: Box::new(source),
            })
    }
}
