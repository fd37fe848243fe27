//! Engine configuration

use crate::{PolicyError, Result};
use serde::{Deserialize, Serialize};

/// Configuration for the policy store and keys backend
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitConfig {
    /// Skip the policy cache and shared read locks; every read loads a
    /// private copy from storage
    #[serde(default)]
    pub caching_disabled: bool,
    /// Storage key prefix for policy records
    #[serde(default = "default_storage_prefix")]
    pub storage_prefix: String,
}

fn default_storage_prefix() -> String {
    "policy/".to_string()
}

impl Default for TransitConfig {
    fn default() -> Self {
        Self {
            caching_disabled: false,
            storage_prefix: default_storage_prefix(),
        }
    }
}

impl TransitConfig {
    /// Parse a configuration from JSON, filling missing fields with defaults
    ///
    /// # Errors
    ///
    /// Returns an invalid request error if the JSON is malformed or the
    /// storage prefix is empty.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| PolicyError::invalid_request(format!("invalid configuration: {e}")))?;
        if config.storage_prefix.is_empty() {
            return Err(PolicyError::invalid_request(
                "storage_prefix must not be empty",
            ));
        }
        Ok(config)
    }

    /// Storage key of the record for policy `name`
    #[must_use]
    pub fn storage_key(&self, name: &str) -> String {
        format!("{}{name}", self.storage_prefix)
    }
}
