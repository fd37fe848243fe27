//! PEM armoring of PKIX public keys

use crate::{PolicyError, Result};
use pem::{EncodeConfig, LineEnding, Pem};

/// PEM label for SubjectPublicKeyInfo structures
pub const PUBLIC_KEY_TAG: &str = "PUBLIC KEY";

/// Wrap DER bytes in a `PUBLIC KEY` PEM block with LF line endings
///
/// # Errors
///
/// Returns an encoding error if the input is empty or nothing was produced.
pub fn encode_public_key(der: &[u8]) -> Result<String> {
    if der.is_empty() {
        return Err(PolicyError::Encoding(
            "refusing to PEM-encode an empty public key".to_string(),
        ));
    }

    let block = Pem::new(PUBLIC_KEY_TAG, der.to_vec());
    let encoded = pem::encode_config(&block, EncodeConfig::new().set_line_ending(LineEnding::LF));
    if encoded.is_empty() {
        return Err(PolicyError::Encoding(
            "failed to PEM-encode public key".to_string(),
        ));
    }

    Ok(encoded)
}

/// Parse a `PUBLIC KEY` PEM block back to DER
///
/// # Errors
///
/// Returns a parse error if the text is not PEM or carries another label.
pub fn decode_public_key(text: &str) -> Result<Vec<u8>> {
    let block = pem::parse(text).map_err(|e| PolicyError::Parse(format!("invalid PEM: {e}")))?;
    if block.tag() != PUBLIC_KEY_TAG {
        return Err(PolicyError::Parse(format!(
            "unexpected PEM label {:?}, expected {PUBLIC_KEY_TAG:?}",
            block.tag()
        )));
    }
    Ok(block.into_contents())
}
