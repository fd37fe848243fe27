//! OpenPGP key ring export
//!
//! Key rings are stored as raw binary transferable secret keys. Export either
//! re-serializes the first entity's public component or armors the stored
//! bytes verbatim.

pub mod armor;
pub mod packet;

pub use armor::{ArmorBlock, armor, crc24, dearmor};
pub use packet::{Entity, Packet, group_entities, parse_packets};

use crate::{PolicyError, Result};

/// Parse the entities of a binary key ring
///
/// # Errors
///
/// Returns a parse error when the ring is malformed or holds no entity.
pub fn read_key_ring(raw: &[u8]) -> Result<Vec<Entity>> {
    let entities = group_entities(parse_packets(raw)?)?;
    if entities.is_empty() {
        return Err(PolicyError::Parse(
            "no entities found in OpenPGP key ring".to_string(),
        ));
    }
    Ok(entities)
}

/// Armored export of a stored key ring plus the first entity's identity label
///
/// The label is the first User ID of the first entity, or empty when it has
/// none.
///
/// # Errors
///
/// Returns an error if:
/// - The ring cannot be parsed or holds no entity
/// - `block` is neither a public nor a private key block (invalid request)
pub fn extract(raw: &[u8], block: ArmorBlock) -> Result<(String, String)> {
    let entities = read_key_ring(raw)?;
    let entity = &entities[0];
    let identity = entity.first_identity().unwrap_or_default();

    match block {
        ArmorBlock::PublicKey => {
            let public = entity.serialize_public()?;
            Ok((armor(block, &public), identity))
        }
        ArmorBlock::PrivateKey => Ok((armor(block, raw), identity)),
        other => Err(PolicyError::invalid_request(format!(
            "incorrect block type {other}"
        ))),
    }
}
