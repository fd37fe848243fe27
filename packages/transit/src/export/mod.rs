//! Export service: describe a policy and the public side of every version
//!
//! Dispatch is on the policy's [`KeyFamily`], so adding a family forces this
//! module to decide how it is exported.

mod description;

pub use description::{AsymmetricKey, PolicyDescription, VersionTable};

use crate::codec::pgp::{self, ArmorBlock};
use crate::codec::{ed25519_public_key_base64, rsa_public_key_pem};
use crate::derive::{ED25519_SEED_SIZE, KdfMode};
use crate::policy::{KeyFamily, KeyPolicy, KeyVersion};
use crate::{PolicyError, Result};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use std::collections::BTreeMap;
use tracing::debug;

/// Describe `policy`, using the base64 `context` for derived Ed25519 keys
///
/// # Errors
///
/// Returns an error if:
/// - `context` is not valid base64 (invalid request, checked first)
/// - A version string is not numeric when a derived key must be computed
/// - Stored key material cannot be parsed or re-encoded
pub fn describe(policy: &KeyPolicy, context: Option<&str>) -> Result<PolicyDescription> {
    let context = decode_context(context)?;
    let key_type = policy.key_type;

    let keys = match key_type.family() {
        KeyFamily::Symmetric { .. } => VersionTable::Symmetric(
            policy
                .keys()
                .iter()
                .map(|(version, record)| (version.clone(), record.creation_time().timestamp()))
                .collect(),
        ),
        family => {
            let mut table = BTreeMap::new();
            for (version, record) in policy.keys() {
                let key = describe_version(policy, family, version, record, &context)?;
                table.insert(version.clone(), key);
            }
            VersionTable::Asymmetric(table)
        }
    };

    let (kdf, kdf_mode, convergent_encryption, convergent_encryption_version) = if policy.derived
    {
        (
            Some(policy.kdf),
            (policy.kdf == KdfMode::HmacSha256Counter).then_some(policy.kdf),
            Some(policy.convergent_encryption),
            policy
                .convergent_encryption
                .then_some(policy.convergent_version),
        )
    } else {
        (None, None, None, None)
    };

    debug!(name = %policy.name, versions = policy.keys().len(), "described policy");

    Ok(PolicyDescription {
        name: policy.name.clone(),
        key_type,
        derived: policy.derived,
        deletion_allowed: policy.deletion_allowed,
        min_available_version: policy.min_available_version,
        min_decryption_version: policy.min_decryption_version,
        min_encryption_version: policy.min_encryption_version,
        latest_version: policy.latest_version,
        exportable: policy.exportable,
        allow_plaintext_backup: policy.allow_plaintext_backup,
        supports_encryption: key_type.encryption_supported(),
        supports_decryption: key_type.decryption_supported(),
        supports_signing: key_type.signing_supported(),
        supports_derivation: key_type.derivation_supported(),
        backup_info: policy.backup_info.clone(),
        restore_info: policy.restore_info.clone(),
        kdf,
        kdf_mode,
        convergent_encryption,
        convergent_encryption_version,
        pgp_identity: matches!(key_type.family(), KeyFamily::OpenPgp)
            .then(|| policy.pgp_identity.clone()),
        keys,
    })
}

fn decode_context(context: Option<&str>) -> Result<Vec<u8>> {
    match context {
        Some(encoded) if !encoded.is_empty() => STANDARD
            .decode(encoded)
            .map_err(|_| PolicyError::invalid_request("failed to base64-decode context")),
        _ => Ok(Vec::new()),
    }
}

fn describe_version(
    policy: &KeyPolicy,
    family: KeyFamily,
    version: &str,
    record: &KeyVersion,
    context: &[u8],
) -> Result<AsymmetricKey> {
    let cached = || record.formatted_public_key().unwrap_or_default().to_string();

    let (name, public_key) = match family {
        KeyFamily::Ecdsa(curve) => (curve.name().to_string(), cached()),
        KeyFamily::Ed25519 => {
            let public_key = if !policy.derived {
                cached()
            } else if context.is_empty() {
                String::new()
            } else {
                let number: u32 = version.parse().map_err(|e| {
                    PolicyError::invalid_request(format!("invalid version {version:?}: {e}"))
                })?;
                let seed = policy.derive_key(context, number, ED25519_SEED_SIZE)?;
                ed25519_public_key_base64(&seed)?
            };
            ("ed25519".to_string(), public_key)
        }
        KeyFamily::Rsa { .. } => (
            policy.key_type.as_str().to_string(),
            rsa_public_key_pem(record.key_material())?,
        ),
        KeyFamily::OpenPgp => {
            let (armored, identity) = pgp::extract(record.key_material(), ArmorBlock::PublicKey)?;
            let name = if identity.is_empty() {
                "openpgp".to_string()
            } else {
                identity
            };
            (name, armored)
        }
        KeyFamily::Symmetric { .. } => {
            return Err(PolicyError::internal(format!(
                "symmetric key type {} has no public component",
                policy.key_type
            )));
        }
    };

    Ok(AsymmetricKey {
        name,
        public_key,
        creation_time: record.creation_time(),
    })
}
