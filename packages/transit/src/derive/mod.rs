//! Key Derivation - context-based derivation of per-operation key material
//!
//! Derivation is a pure function of (mode, version seed, context, length). The
//! engine does not know whether the output becomes a symmetric key or a signing
//! seed; that interpretation belongs to the caller.

pub mod config;
pub mod core;

// Re-export main types and functions for convenience
pub use self::config::{ED25519_SEED_SIZE, KdfMode};
pub use self::core::derive_key;
