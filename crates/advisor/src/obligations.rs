//! Operational obligations that come with each authentication method.
//!
//! Choosing a method is only half of the setup: the workspace owner still has
//! to be granted access to the integration (and, for tokens, to the secret),
//! the token needs the right scopes, and it must be replaced on a cadence.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{MethodKind, RotationCadence, Scope, TokenSecret};

/// A privilege the workspace owner's role must hold on the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionGrant {
    /// Usage on the API integration that allows traffic to the Git host.
    UsageOnIntegration,
    /// Usage on the secret object holding the token.
    UsageOnSecret,
}

/// Everything an operator has to arrange for a method to work and keep
/// working.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Obligations {
    /// Privileges to grant.
    pub grants: Vec<PermissionGrant>,
    /// Scopes the token must carry. Empty for OAuth.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub required_scopes: BTreeSet<Scope>,
    /// Longest lifetime a token should be issued with. `None` for OAuth.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_token_lifetime: Option<RotationCadence>,
}

/// Derives the obligations of `kind`.
pub fn derive_obligations(
    kind: MethodKind,
    required_scopes: &BTreeSet<Scope>,
    cadence: RotationCadence,
) -> Obligations {
    match kind {
        MethodKind::OAuth => Obligations {
            grants: vec![PermissionGrant::UsageOnIntegration],
            required_scopes: BTreeSet::new(),
            max_token_lifetime: None,
        },
        MethodKind::TokenSecret => Obligations {
            grants: vec![
                PermissionGrant::UsageOnIntegration,
                PermissionGrant::UsageOnSecret,
            ],
            required_scopes: required_scopes.clone(),
            max_token_lifetime: Some(cadence),
        },
    }
}

/// Comparison of a token's scopes against the required set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeReport {
    /// Required scopes the token lacks.
    pub missing: BTreeSet<Scope>,
    /// Scopes the token carries beyond what is required.
    pub extra: BTreeSet<Scope>,
}

impl ScopeReport {
    /// Returns `true` when no required scope is missing.
    pub fn is_sufficient(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Compares `secret`'s scopes with `required`.
pub fn check_scopes(secret: &TokenSecret, required: &BTreeSet<Scope>) -> ScopeReport {
    ScopeReport {
        missing: required.difference(secret.scopes()).cloned().collect(),
        extra: secret.scopes().difference(required).cloned().collect(),
    }
}

/// Returns `true` if `secret` was issued for longer than `cadence` allows.
pub fn exceeds_cadence(secret: &TokenSecret, cadence: RotationCadence) -> bool {
    secret.expires_at().since(secret.created_at()) > cadence.as_delta()
}
