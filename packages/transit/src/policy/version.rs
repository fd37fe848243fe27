//! Key version records
//!
//! One generation of key material under a policy. Records are written once
//! and never mutated; rotation appends a new record instead.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// One generation of key material plus its cached public representation
#[derive(Clone, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct KeyVersion {
    #[serde(with = "serde_base64")]
    key: Vec<u8>,

    #[zeroize(skip)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    creation_time: Option<DateTime<Utc>>,

    /// Unix seconds written by older records that predate `creation_time`
    #[zeroize(skip)]
    #[serde(default, rename = "time")]
    legacy_creation_time: i64,

    #[zeroize(skip)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    formatted_public_key: Option<String>,
}

impl KeyVersion {
    /// Create a record stamped with the current time
    #[must_use]
    pub fn new(key: Vec<u8>, formatted_public_key: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            key,
            creation_time: Some(now),
            legacy_creation_time: now.timestamp(),
            formatted_public_key,
        }
    }

    /// Raw key material of this version
    pub(crate) fn key_material(&self) -> &[u8] {
        &self.key
    }

    /// Creation time, falling back to the legacy epoch field when unset or zero
    #[must_use]
    pub fn creation_time(&self) -> DateTime<Utc> {
        self.creation_time
            .filter(|time| time.timestamp() != 0)
            .unwrap_or_else(|| {
                DateTime::<Utc>::from_timestamp(self.legacy_creation_time, 0).unwrap_or_default()
            })
    }

    /// Cached textual export of the public component, if the type has one
    #[must_use]
    pub fn formatted_public_key(&self) -> Option<&str> {
        self.formatted_public_key.as_deref()
    }
}

impl fmt::Debug for KeyVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyVersion")
            .field("key", &"[REDACTED]")
            .field("creation_time", &self.creation_time())
            .field("formatted_public_key", &self.formatted_public_key)
            .finish()
    }
}

mod serde_base64 {
    use base64::{Engine as _, engine::general_purpose::STANDARD};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}
