//! Key material generation per algorithm family

use super::key_type::{EcCurve, KeyFamily, KeyType};
use super::version::KeyVersion;
use super::PgpIdentity;
use crate::codec::{ec_public_key_pem, ed25519_public_key_base64, pgp};
use crate::{PolicyError, Result};
use p256::elliptic_curve::rand_core::OsRng;
use rand::RngCore;
use rsa::RsaPrivateKey;
use rsa::pkcs1::EncodeRsaPrivateKey;
use zeroize::Zeroizing;

/// Source of OpenPGP key rings for `openpgp` policies
///
/// Generating OpenPGP keys is left to the host; the engine only stores and
/// exports the rings it is handed.
pub trait KeyRingGenerator: Send + Sync {
    /// Produce a binary (unarmored) transferable secret key ring for `identity`
    ///
    /// # Errors
    ///
    /// Implementations return [`PolicyError::KeyGeneration`] when the ring
    /// cannot be produced.
    fn generate(&self, identity: &PgpIdentity) -> Result<Vec<u8>>;
}

/// Fresh key version for `key_type`
///
/// # Errors
///
/// Returns an error if:
/// - `key_type` is `openpgp` and no generator is configured (invalid request)
/// - The underlying generator fails
pub(crate) fn generate_version(
    key_type: KeyType,
    identity: &PgpIdentity,
    key_ring_generator: Option<&dyn KeyRingGenerator>,
) -> Result<KeyVersion> {
    match key_type.family() {
        KeyFamily::Symmetric { key_size } => {
            let mut key = vec![0u8; key_size];
            rand::rng().fill_bytes(&mut key);
            Ok(KeyVersion::new(key, None))
        }
        KeyFamily::Ecdsa(curve) => {
            let secret = ec_secret_scalar(curve);
            let public_pem = ec_public_key_pem(curve, &secret)?;
            Ok(KeyVersion::new(secret.to_vec(), Some(public_pem)))
        }
        KeyFamily::Ed25519 => {
            let mut seed = vec![0u8; 32];
            rand::rng().fill_bytes(&mut seed);
            let public = ed25519_public_key_base64(&seed)?;
            Ok(KeyVersion::new(seed, Some(public)))
        }
        KeyFamily::Rsa { bits } => {
            let private_key = RsaPrivateKey::new(&mut OsRng, bits).map_err(|e| {
                PolicyError::KeyGeneration(format!("failed to generate RSA-{bits} key: {e}"))
            })?;
            let der = private_key.to_pkcs1_der().map_err(|e| {
                PolicyError::KeyGeneration(format!("failed to encode RSA private key: {e}"))
            })?;
            Ok(KeyVersion::new(der.as_bytes().to_vec(), None))
        }
        KeyFamily::OpenPgp => {
            let generator = key_ring_generator.ok_or_else(|| {
                PolicyError::invalid_request("no OpenPGP key ring generator is configured")
            })?;
            let ring = generator.generate(identity)?;
            // reject rings that could never be exported
            pgp::read_key_ring(&ring)?;
            Ok(KeyVersion::new(ring, None))
        }
    }
}

fn ec_secret_scalar(curve: EcCurve) -> Zeroizing<Vec<u8>> {
    let bytes = match curve {
        EcCurve::P256 => p256::SecretKey::random(&mut OsRng).to_bytes().to_vec(),
        EcCurve::P384 => p384::SecretKey::random(&mut OsRng).to_bytes().to_vec(),
        EcCurve::P521 => p521::SecretKey::random(&mut OsRng).to_bytes().to_vec(),
    };
    Zeroizing::new(bytes)
}
