//! Codec adapters turning stored key material into public-facing text
//!
//! - [`pem_armor`]: PKIX DER wrapped as a `PUBLIC KEY` PEM block
//! - [`public_key`]: public component extraction for RSA, ECDSA and Ed25519
//! - [`pgp`]: OpenPGP key ring parsing and ASCII armor

pub mod pem_armor;
pub mod pgp;
pub mod public_key;

pub use pem_armor::{PUBLIC_KEY_TAG, decode_public_key, encode_public_key};
pub use public_key::{ec_public_key_pem, ed25519_public_key_base64, rsa_public_key_pem};
