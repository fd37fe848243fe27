//! Key Derivation Function Configuration
//!
//! KDF selectors persisted on derived policies.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Output length requested when deriving an Ed25519 signing seed
pub const ED25519_SEED_SIZE: usize = 32;

/// Key derivation modes for derived policies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum KdfMode {
    /// NIST SP 800-108 counter mode with HMAC-SHA256 as the PRF
    #[serde(rename = "hmac-sha256-counter")]
    HmacSha256Counter,
    /// HKDF with SHA-256 (default for new policies)
    #[default]
    #[serde(rename = "hkdf_sha256")]
    HkdfSha256,
}

impl KdfMode {
    /// Wire name of the mode as reported on read
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::HmacSha256Counter => "hmac-sha256-counter",
            Self::HkdfSha256 => "hkdf_sha256",
        }
    }
}

impl fmt::Display for KdfMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
