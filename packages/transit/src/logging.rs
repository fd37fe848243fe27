//! Security event logging for policy lifecycle changes

use tracing::{info, warn};

/// Policy lifecycle events worth an audit line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyEvent {
    /// A policy was created
    Create,
    /// A new key version was appended
    Rotate,
    /// A policy was deleted
    Delete,
}

impl PolicyEvent {
    /// Event label used in log lines
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "POLICY_CREATE",
            Self::Rotate => "POLICY_ROTATE",
            Self::Delete => "POLICY_DELETE",
        }
    }
}

/// Log a policy lifecycle event with standardized fields
///
/// Successful events log at info, failures at warn.
pub fn log_policy_event(event: PolicyEvent, name: &str, details: &str, success: bool) {
    let status = if success { "SUCCESS" } else { "FAILURE" };

    if success {
        info!(event = event.as_str(), policy = %name, status, "{details}");
    } else {
        warn!(event = event.as_str(), policy = %name, status, "{details}");
    }
}
