//! Policy creation requests

use super::key_type::KeyType;
use super::PgpIdentity;
use crate::{PolicyError, Result};

/// Parameters for fetching or creating a key policy
#[derive(Debug, Clone)]
pub struct PolicyRequest {
    /// Policy name
    pub name: String,
    /// Algorithm used when the policy has to be created
    pub key_type: KeyType,
    /// Enable context-based key derivation
    pub derived: bool,
    /// Enable convergent encryption (requires `derived`)
    pub convergent: bool,
    /// Allow the key to be exported
    pub exportable: bool,
    /// Allow plaintext backups of the policy
    pub allow_plaintext_backup: bool,
    /// Create the policy when it does not exist yet
    pub upsert: bool,
    /// Identity fields for `openpgp` policies
    pub pgp_identity: PgpIdentity,
}

impl PolicyRequest {
    /// Upsert request for `name` with every option off
    pub fn new(name: impl Into<String>, key_type: KeyType) -> Self {
        Self {
            name: name.into(),
            key_type,
            derived: false,
            convergent: false,
            exportable: false,
            allow_plaintext_backup: false,
            upsert: true,
            pgp_identity: PgpIdentity::default(),
        }
    }

    /// Lookup-only request that never creates a policy
    pub fn lookup(name: impl Into<String>) -> Self {
        Self {
            upsert: false,
            ..Self::new(name, KeyType::default())
        }
    }

    /// Set the derivation flag
    #[must_use]
    pub fn with_derived(mut self, derived: bool) -> Self {
        self.derived = derived;
        self
    }

    /// Set the convergent encryption flag
    #[must_use]
    pub fn with_convergent(mut self, convergent: bool) -> Self {
        self.convergent = convergent;
        self
    }

    /// Set the exportable flag
    #[must_use]
    pub fn with_exportable(mut self, exportable: bool) -> Self {
        self.exportable = exportable;
        self
    }

    /// Set the plaintext backup flag
    #[must_use]
    pub fn with_allow_plaintext_backup(mut self, allow: bool) -> Self {
        self.allow_plaintext_backup = allow;
        self
    }

    /// Set the OpenPGP identity
    #[must_use]
    pub fn with_pgp_identity(mut self, identity: PgpIdentity) -> Self {
        self.pgp_identity = identity;
        self
    }

    /// Check the request before any key material is generated
    ///
    /// # Errors
    ///
    /// Returns an invalid request error if:
    /// - The name is empty
    /// - Convergent encryption is requested without derivation
    /// - The key type does not support the requested derivation or
    ///   convergent encryption
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(PolicyError::invalid_request("missing policy name"));
        }

        if self.convergent && !self.derived {
            return Err(PolicyError::invalid_request(
                "convergent encryption requires derivation to be enabled",
            ));
        }

        if self.derived && !self.key_type.derivation_supported() {
            return Err(PolicyError::invalid_request(format!(
                "key derivation not supported for key type {}",
                self.key_type
            )));
        }

        if self.convergent && !self.key_type.convergent_supported() {
            return Err(PolicyError::invalid_request(format!(
                "convergent encryption not supported for key type {}",
                self.key_type
            )));
        }

        Ok(())
    }
}
