//! Public-component extraction for the RSA, ECDSA and Ed25519 families
//!
//! Stored private material that fails to parse is treated as corruption
//! ([`PolicyError::Parse`]); failing to serialize a parsed key is a logic bug
//! ([`PolicyError::Encoding`]).

use super::pem_armor::encode_public_key;
use crate::policy::EcCurve;
use crate::{PolicyError, Result};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use ed25519_dalek::SigningKey;
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::EncodePublicKey;
use rsa::{RsaPrivateKey, RsaPublicKey};

/// PEM-armored PKIX public key of a PKCS#1 DER RSA private key
///
/// # Errors
///
/// Returns an error if:
/// - The stored private key is not valid PKCS#1 DER
/// - The public key cannot be marshaled to PKIX DER or PEM
pub fn rsa_public_key_pem(private_pkcs1_der: &[u8]) -> Result<String> {
    let private_key = RsaPrivateKey::from_pkcs1_der(private_pkcs1_der)
        .map_err(|e| PolicyError::Parse(format!("invalid RSA private key: {e}")))?;
    let public_key = RsaPublicKey::from(&private_key);

    let der = public_key
        .to_public_key_der()
        .map_err(|e| PolicyError::Encoding(format!("error marshaling RSA public key: {e}")))?;

    encode_public_key(der.as_bytes())
}

/// PEM-armored PKIX public key for an ECDSA secret scalar on `curve`
///
/// # Errors
///
/// Returns an error if:
/// - The scalar is not a valid secret key for the curve
/// - The public key cannot be marshaled to PKIX DER or PEM
pub fn ec_public_key_pem(curve: EcCurve, secret: &[u8]) -> Result<String> {
    let invalid = |e: p256::elliptic_curve::Error| {
        PolicyError::Parse(format!("invalid {} secret key: {e}", curve.name()))
    };

    let der = match curve {
        EcCurve::P256 => p256::SecretKey::from_slice(secret)
            .map_err(invalid)?
            .public_key()
            .to_public_key_der(),
        EcCurve::P384 => p384::SecretKey::from_slice(secret)
            .map_err(invalid)?
            .public_key()
            .to_public_key_der(),
        EcCurve::P521 => p521::SecretKey::from_slice(secret)
            .map_err(invalid)?
            .public_key()
            .to_public_key_der(),
    }
    .map_err(|e| {
        PolicyError::Encoding(format!(
            "error marshaling {} public key: {e}",
            curve.name()
        ))
    })?;

    encode_public_key(der.as_bytes())
}

/// Base64 of the Ed25519 public key for a 32-byte seed
///
/// # Errors
///
/// Returns a parse error if the seed is not exactly 32 bytes.
pub fn ed25519_public_key_base64(seed: &[u8]) -> Result<String> {
    let seed: [u8; 32] = seed.try_into().map_err(|_| {
        PolicyError::Parse(format!(
            "Ed25519 seed must be 32 bytes, got {}",
            seed.len()
        ))
    })?;

    let signing_key = SigningKey::from_bytes(&seed);
    Ok(STANDARD.encode(signing_key.verifying_key().to_bytes()))
}
