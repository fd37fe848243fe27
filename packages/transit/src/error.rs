//! Error handling for key policy operations
//!
//! Errors fall in two classes: the caller's request was invalid (unknown key
//! type, bad context, unsupported option) or the system failed (corrupted key
//! material, encoding bugs, storage failures). [`PolicyError::is_invalid_request`]
//! and [`PolicyError::is_internal`] tell them apart.

use thiserror::Error;

/// Key policy errors
#[derive(Debug, Error)]
pub enum PolicyError {
    /// Malformed caller input
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// No policy is stored under the given name
    #[error("Policy not found: {name}")]
    PolicyNotFound {
        /// Policy name
        name: String,
    },

    /// The requested key version does not exist or is outside the available range
    #[error("Key version not found: policy={name}, version={version}")]
    VersionNotFound {
        /// Policy name
        name: String,
        /// Requested version
        version: u32,
    },

    /// Stored key material could not be parsed
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serializing otherwise valid key material failed
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Key derivation failed
    #[error("Key derivation error: {0}")]
    KeyDerivation(String),

    /// Key generation failed
    #[error("Key generation error: {0}")]
    KeyGeneration(String),

    /// Storage backend error occurred
    #[error("Storage backend error: {operation} failed - {details}")]
    StorageBackend {
        /// The storage operation that failed
        operation: String,
        /// Error reported by the backend, unmodified
        details: String,
    },

    /// Persisted policy record could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Deleting a policy failed; the policy is left in place
    #[error("error deleting policy {name}: {source}")]
    DeleteFailed {
        /// Policy name
        name: String,
        /// Underlying failure
        #[source]
        source: Box<PolicyError>,
    },

    /// Internal error occurred
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PolicyError {
    /// Create an `InvalidRequest` error
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Create a storage backend error, keeping the backend's message verbatim
    pub fn storage(operation: impl Into<String>, details: impl std::fmt::Display) -> Self {
        Self::StorageBackend {
            operation: operation.into(),
            details: details.to_string(),
        }
    }

    /// Whether the error was caused by the caller's input
    #[must_use]
    pub fn is_invalid_request(&self) -> bool {
        match self {
            Self::InvalidRequest(_) => true,
            Self::DeleteFailed { source, .. } => source.is_invalid_request(),
            _ => false,
        }
    }

    /// Whether the error names something that does not exist
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::PolicyNotFound { .. } | Self::VersionNotFound { .. } => true,
            Self::DeleteFailed { source, .. } => source.is_not_found(),
            _ => false,
        }
    }

    /// Whether the error indicates a system failure rather than bad input
    #[must_use]
    pub fn is_internal(&self) -> bool {
        !self.is_invalid_request() && !self.is_not_found()
    }
}

/// Result type for key policy operations
pub type Result<T> = std::result::Result<T, PolicyError>;
