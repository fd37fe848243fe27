//! Core Key Derivation Implementation
//!
//! Both modes are seeded from a single key version's material combined with
//! the caller's context.

use super::config::KdfMode;
use crate::{PolicyError, Result};
use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use zeroize::Zeroizing;

type HmacSha256 = Hmac<Sha256>;

/// HMAC-SHA256 block size produced per counter round
const HMAC_SHA256_LEN: usize = 32;

/// Derive `output_length` bytes from a version seed and caller context
///
/// Identical inputs always yield identical output.
///
/// # Errors
///
/// Returns an error if:
/// - `output_length` is zero
/// - The requested length exceeds what the selected mode can produce
pub fn derive_key(
    mode: KdfMode,
    seed: &[u8],
    context: &[u8],
    output_length: usize,
) -> Result<Zeroizing<Vec<u8>>> {
    if output_length == 0 {
        return Err(PolicyError::KeyDerivation(
            "output length must be non-zero".to_string(),
        ));
    }

    match mode {
        KdfMode::HmacSha256Counter => derive_counter_mode(seed, context, output_length),
        KdfMode::HkdfSha256 => derive_hkdf_sha256(seed, context, output_length),
    }
}

/// SP 800-108 counter mode: `HMAC(seed, BE32(i) || context || BE32(bits))` for i = 0..
fn derive_counter_mode(
    seed: &[u8],
    context: &[u8],
    output_length: usize,
) -> Result<Zeroizing<Vec<u8>>> {
    let bits = output_length
        .checked_mul(8)
        .and_then(|bits| u32::try_from(bits).ok())
        .ok_or_else(|| {
            PolicyError::KeyDerivation(format!("output length {output_length} is too large"))
        })?;

    let rounds = output_length.div_ceil(HMAC_SHA256_LEN);
    let mut output = Zeroizing::new(Vec::with_capacity(rounds * HMAC_SHA256_LEN));

    for round in 0..rounds {
        let counter = u32::try_from(round)
            .map_err(|_| PolicyError::KeyDerivation("counter overflow".to_string()))?;

        let mut mac = HmacSha256::new_from_slice(seed)
            .map_err(|e| PolicyError::KeyDerivation(format!("HMAC key setup failed: {e}")))?;
        mac.update(&counter.to_be_bytes());
        mac.update(context);
        mac.update(&bits.to_be_bytes());

        output.extend_from_slice(&mac.finalize().into_bytes());
    }

    output.truncate(output_length);
    Ok(output)
}

/// HKDF-SHA256 with no salt, the seed as input keying material and the context as info
fn derive_hkdf_sha256(
    seed: &[u8],
    context: &[u8],
    output_length: usize,
) -> Result<Zeroizing<Vec<u8>>> {
    let hk = Hkdf::<Sha256>::new(None, seed);
    let mut output = Zeroizing::new(vec![0u8; output_length]);

    hk.expand(context, &mut output)
        .map_err(|e| PolicyError::KeyDerivation(format!("HKDF-SHA256 expansion failed: {e}")))?;

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_hkdf_rfc5869_no_salt_vector() {
        // RFC 5869 A.3: zero-length salt and info
        let ikm = [0x0bu8; 22];
        let okm = derive_key(KdfMode::HkdfSha256, &ikm, &[], 42).unwrap();
        assert_eq!(
            okm.as_slice(),
            hex!(
                "8da4e775a563c18f715f802a063c5a31b8a11f5c5ee1879ec3454e5f3c738d2d"
                "9d201395faa4b61a96c8"
            )
        );
    }

    #[test]
    fn test_counter_mode_blocks() {
        let seed = [7u8; 32];
        let context = b"tenant-42";

        let out = derive_key(KdfMode::HmacSha256Counter, &seed, context, 64).unwrap();
        assert_eq!(out.len(), 64);

        for (round, block) in out.chunks(HMAC_SHA256_LEN).enumerate() {
            let mut mac = HmacSha256::new_from_slice(&seed).unwrap();
            mac.update(&(round as u32).to_be_bytes());
            mac.update(context);
            mac.update(&512u32.to_be_bytes());
            assert_eq!(block, &mac.finalize().into_bytes()[..]);
        }
    }

    #[test]
    fn test_counter_mode_truncates_partial_block() {
        let out = derive_key(KdfMode::HmacSha256Counter, b"seed", b"ctx", 20).unwrap();
        assert_eq!(out.len(), 20);
    }

    #[test]
    fn test_modes_differ() {
        let seed = [1u8; 32];
        let a = derive_key(KdfMode::HmacSha256Counter, &seed, b"ctx", 32).unwrap();
        let b = derive_key(KdfMode::HkdfSha256, &seed, b"ctx", 32).unwrap();
        assert_ne!(a.as_slice(), b.as_slice());
    }

    #[test]
    fn test_zero_length_rejected() {
        let err = derive_key(KdfMode::HkdfSha256, b"seed", b"ctx", 0).unwrap_err();
        assert!(matches!(err, PolicyError::KeyDerivation(_)));
    }

    #[test]
    fn test_hkdf_length_limit() {
        let err = derive_key(KdfMode::HkdfSha256, b"seed", b"ctx", 255 * 32 + 1).unwrap_err();
        assert!(matches!(err, PolicyError::KeyDerivation(_)));
    }
}
