//! Error type for the credential-policy domain.
//!
//! The decision function and the rotation projection are total over
//! well-formed input; [`AdvisorError`] therefore only covers input validation,
//! configuration validation and, when strict mode is enabled, unresolved
//! policy conflicts. Failures of the external platform (authentication
//! rejected, token revoked, merge conflicts) never surface here.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::PolicyConflict;

/// Errors produced by the advisor.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AdvisorError {
    /// A caller-supplied value is malformed.
    ///
    /// Produced by: identifier constructors, [`crate::TokenSecret::new`],
    /// [`crate::GracePeriod::new`], clone-URL parsing, and binding rotation.
    #[error("Invalid input for '{field}': {reason}")]
    InvalidInput {
        /// Name of the offending field (e.g. `"host"`, `"expires_at"`).
        field: String,
        /// Human-readable description of the problem.
        reason: String,
    },

    /// The organisation's constraints cannot all be satisfied by the
    /// recommended method.
    ///
    /// Only produced when the policy is configured with `strict_conflicts`;
    /// otherwise conflicts are reported alongside the recommendation.
    #[error("Policy conflict: {}", describe_conflicts(.conflicts))]
    PolicyConflict {
        /// Every conflict detected for the request.
        conflicts: Vec<PolicyConflict>,
    },

    /// The advisor configuration is invalid.
    ///
    /// Produced at load time; an advisor is never built from an invalid policy.
    #[error("Configuration error: {message}")]
    ConfigurationError {
        /// Description of the configuration problem.
        message: String,
    },
}

impl AdvisorError {
    /// Shorthand for [`AdvisorError::InvalidInput`].
    pub fn invalid_input(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Returns the offending field for [`AdvisorError::InvalidInput`].
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::InvalidInput { field, .. } => Some(field),
            _ => None,
        }
    }
}

fn describe_conflicts(conflicts: &[PolicyConflict]) -> String {
    conflicts
        .iter()
        .map(|c| c.description())
        .collect::<Vec<_>>()
        .join("; ")
}
