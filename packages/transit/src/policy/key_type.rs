//! Algorithm types supported by key policies
//!
//! [`KeyType`] is the closed set of wire names. [`KeyFamily`] groups them by
//! the fields each family needs so export and generation can match
//! exhaustively.

use crate::{PolicyError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Algorithm of a key policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum KeyType {
    /// AES-128 in GCM mode with 96-bit nonces
    #[serde(rename = "aes128-gcm96")]
    Aes128Gcm96,
    /// AES-256 in GCM mode with 96-bit nonces
    #[default]
    #[serde(rename = "aes256-gcm96")]
    Aes256Gcm96,
    /// ChaCha20-Poly1305 stream cipher AEAD
    #[serde(rename = "chacha20-poly1305")]
    ChaCha20Poly1305,
    /// ECDSA over NIST P-256
    #[serde(rename = "ecdsa-p256")]
    EcdsaP256,
    /// ECDSA over NIST P-384
    #[serde(rename = "ecdsa-p384")]
    EcdsaP384,
    /// ECDSA over NIST P-521
    #[serde(rename = "ecdsa-p521")]
    EcdsaP521,
    /// Ed25519 signatures
    #[serde(rename = "ed25519")]
    Ed25519,
    /// RSA with a 2048-bit modulus
    #[serde(rename = "rsa-2048")]
    Rsa2048,
    /// RSA with a 4096-bit modulus
    #[serde(rename = "rsa-4096")]
    Rsa4096,
    /// OpenPGP transferable secret key ring
    #[serde(rename = "openpgp")]
    OpenPgp,
}

/// NIST curves used by the ECDSA types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EcCurve {
    /// secp256r1
    P256,
    /// secp384r1
    P384,
    /// secp521r1
    P521,
}

impl EcCurve {
    /// Standard curve name reported for each key version
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::P256 => "P-256",
            Self::P384 => "P-384",
            Self::P521 => "P-521",
        }
    }
}

/// Algorithm families, each carrying only what its codec needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyFamily {
    /// Symmetric AEAD key of `key_size` bytes
    Symmetric {
        /// Raw key length in bytes
        key_size: usize,
    },
    /// ECDSA key pair on the given curve
    Ecdsa(EcCurve),
    /// Ed25519 key pair
    Ed25519,
    /// RSA key pair with a modulus of `bits`
    Rsa {
        /// Modulus size in bits
        bits: usize,
    },
    /// OpenPGP key ring
    OpenPgp,
}

impl KeyType {
    /// Every supported key type
    pub const ALL: [KeyType; 10] = [
        KeyType::Aes128Gcm96,
        KeyType::Aes256Gcm96,
        KeyType::ChaCha20Poly1305,
        KeyType::EcdsaP256,
        KeyType::EcdsaP384,
        KeyType::EcdsaP521,
        KeyType::Ed25519,
        KeyType::Rsa2048,
        KeyType::Rsa4096,
        KeyType::OpenPgp,
    ];

    /// Wire name of the type
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Aes128Gcm96 => "aes128-gcm96",
            Self::Aes256Gcm96 => "aes256-gcm96",
            Self::ChaCha20Poly1305 => "chacha20-poly1305",
            Self::EcdsaP256 => "ecdsa-p256",
            Self::EcdsaP384 => "ecdsa-p384",
            Self::EcdsaP521 => "ecdsa-p521",
            Self::Ed25519 => "ed25519",
            Self::Rsa2048 => "rsa-2048",
            Self::Rsa4096 => "rsa-4096",
            Self::OpenPgp => "openpgp",
        }
    }

    /// Family this type belongs to
    #[must_use]
    pub fn family(self) -> KeyFamily {
        match self {
            Self::Aes128Gcm96 => KeyFamily::Symmetric { key_size: 16 },
            Self::Aes256Gcm96 | Self::ChaCha20Poly1305 => KeyFamily::Symmetric { key_size: 32 },
            Self::EcdsaP256 => KeyFamily::Ecdsa(EcCurve::P256),
            Self::EcdsaP384 => KeyFamily::Ecdsa(EcCurve::P384),
            Self::EcdsaP521 => KeyFamily::Ecdsa(EcCurve::P521),
            Self::Ed25519 => KeyFamily::Ed25519,
            Self::Rsa2048 => KeyFamily::Rsa { bits: 2048 },
            Self::Rsa4096 => KeyFamily::Rsa { bits: 4096 },
            Self::OpenPgp => KeyFamily::OpenPgp,
        }
    }

    /// Whether keys of this type can encrypt
    #[must_use]
    pub fn encryption_supported(self) -> bool {
        matches!(
            self,
            Self::Aes128Gcm96
                | Self::Aes256Gcm96
                | Self::ChaCha20Poly1305
                | Self::Rsa2048
                | Self::Rsa4096
        )
    }

    /// Whether keys of this type can decrypt
    #[must_use]
    pub fn decryption_supported(self) -> bool {
        self.encryption_supported()
    }

    /// Whether keys of this type can sign
    #[must_use]
    pub fn signing_supported(self) -> bool {
        matches!(
            self,
            Self::EcdsaP256
                | Self::EcdsaP384
                | Self::EcdsaP521
                | Self::Ed25519
                | Self::Rsa2048
                | Self::Rsa4096
                | Self::OpenPgp
        )
    }

    /// Whether per-operation keys can be derived from context
    #[must_use]
    pub fn derivation_supported(self) -> bool {
        matches!(
            self,
            Self::Aes128Gcm96 | Self::Aes256Gcm96 | Self::ChaCha20Poly1305 | Self::Ed25519
        )
    }

    /// Whether convergent encryption can be enabled
    #[must_use]
    pub fn convergent_supported(self) -> bool {
        matches!(self.family(), KeyFamily::Symmetric { .. })
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KeyType {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self> {
        KeyType::ALL
            .into_iter()
            .find(|key_type| key_type.as_str() == s)
            .ok_or_else(|| PolicyError::invalid_request(format!("unknown key type {s}")))
    }
}
