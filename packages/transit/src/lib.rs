//! # Cyrup Transit Key Policies
//!
//! Named, versioned key policies with per-algorithm public-key export and
//! context-based key derivation.
//!
//! ## Features
//!
//! - **Key Policies**: symmetric AEAD, ECDSA, Ed25519, RSA and OpenPGP keys
//!   behind one versioned model
//! - **Export**: PEM, base64 and ASCII-armored public keys per version
//! - **Derivation**: HKDF-SHA256 and SP 800-108 HMAC-SHA256 counter mode
//! - **Concurrency**: per-name read/write locks with scoped guards
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use cryypt_transit::prelude::*;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = KeysBackend::new(PolicyStore::new(
//!     InMemoryStorage::new(),
//!     TransitConfig::default(),
//! ));
//!
//! backend.write_key(&CreateKeyRequest::new("k1", "rsa-2048")).await?;
//! let description = backend.read_key("k1", None).await?;
//! # Ok(())
//! # }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod backend;
pub mod codec;
pub mod config;
pub mod derive;
pub mod error;
pub mod export;
pub mod logging;
pub mod policy;
pub mod store;

// Re-export core types
pub use error::{PolicyError, Result};

pub use backend::{CreateKeyRequest, KeysBackend, WriteResponse};
pub use config::TransitConfig;
pub use export::{AsymmetricKey, PolicyDescription, VersionTable, describe};
pub use policy::{
    BackupInfo, KeyPolicy, KeyRingGenerator, KeyType, KeyVersion, PgpIdentity, PolicyRequest,
};
pub use store::{InMemoryStorage, LockedPolicy, PolicyStore, Storage};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        CreateKeyRequest, InMemoryStorage, KeyPolicy, KeyType, KeysBackend, PolicyError,
        PolicyRequest, PolicyStore, Result, Storage, TransitConfig,
    };
}
