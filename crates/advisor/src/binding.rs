//! A workspace's binding to one repository and its single active method.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    AdvisorError, AuthenticationMethod, GracePeriod, MethodKind, RepositoryTarget,
    RotationObligation, SecretIdentifier, TokenLifecycleState, TokenSecret, Timestamp,
};

/// Follow-up work the operator performs on an external system.
///
/// The advisor never performs these itself; it only names them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ExternalAction {
    /// Issue a new token on the Git host and store it as a new secret.
    RotateSecret {
        /// The secret being replaced.
        secret_identifier: SecretIdentifier,
        /// Deadline after which the workspace loses access.
        expires_at: Timestamp,
    },
    /// Remove a secret that is no longer referenced, and revoke the token on
    /// the Git host.
    DeleteSecret {
        /// The secret to remove.
        secret_identifier: SecretIdentifier,
    },
    /// Store a new token secret for the repository.
    CreateSecret,
    /// Authorise the platform's OAuth application for the repository owner.
    #[serde(rename = "configure_oauth")]
    ConfigureOAuth,
}

/// Result of replacing the active method of a binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotationOutcome {
    /// The method that was active before the change.
    pub previous: AuthenticationMethod,
    /// Clean-up the operator still has to perform.
    pub follow_up: Vec<ExternalAction>,
}

/// One repository bound to a workspace.
///
/// The target (and so the host) is fixed when the binding is created. Exactly
/// one authentication method is active at a time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryBinding {
    target: RepositoryTarget,
    method: AuthenticationMethod,
}

impl RepositoryBinding {
    /// Binds `target` with `method` as the active method.
    pub fn new(target: RepositoryTarget, method: AuthenticationMethod) -> Self {
        Self { target, method }
    }

    /// The bound repository.
    pub fn target(&self) -> &RepositoryTarget {
        &self.target
    }

    /// The active authentication method.
    pub fn method(&self) -> &AuthenticationMethod {
        &self.method
    }

    /// Rotation obligation of the active method at `now`.
    pub fn rotation(&self, now: Timestamp, grace: GracePeriod) -> Option<RotationObligation> {
        self.method
            .token_secret()
            .map(|secret| RotationObligation::for_secret(secret, now, grace))
    }

    /// Lifecycle state of the active token at `now`; `None` for OAuth.
    pub fn lifecycle_state(&self, now: Timestamp, grace: GracePeriod) -> Option<TokenLifecycleState> {
        self.rotation(now, grace).map(|o| o.status.into())
    }

    /// Replaces the active token with `replacement`, returning the binding to
    /// [`TokenLifecycleState::Active`].
    ///
    /// Fails on `field = "method"` when the binding uses OAuth, and on
    /// `field = "expires_at"` when `replacement` would not start out active at
    /// `now`. Deleting the old secret is left to the operator and reported in
    /// [`RotationOutcome::follow_up`].
    pub fn rotate(
        &mut self,
        replacement: TokenSecret,
        now: Timestamp,
        grace: GracePeriod,
    ) -> Result<RotationOutcome, AdvisorError> {
        let Some(current) = self.method.token_secret() else {
            return Err(AdvisorError::invalid_input(
                "method",
                "only token secrets can be rotated",
            ));
        };
        if replacement.secret_identifier() == current.secret_identifier() {
            return Err(AdvisorError::invalid_input(
                "secret_identifier",
                "replacement must be stored under a new secret",
            ));
        }
        let state: TokenLifecycleState =
            RotationObligation::for_secret(&replacement, now, grace).status.into();
        if state != TokenLifecycleState::Active {
            return Err(AdvisorError::invalid_input(
                "expires_at",
                format!(
                    "replacement expiring at {} is already within the {grace} grace period",
                    replacement.expires_at()
                ),
            ));
        }

        info!(
            host = %self.target.host,
            old = %current.secret_identifier(),
            new = %replacement.secret_identifier(),
            "rotated token secret"
        );
        Ok(self.replace(AuthenticationMethod::TokenSecret(replacement)))
    }

    /// Makes `method` the active method, e.g. when moving from a token to OAuth.
    pub fn switch_method(&mut self, method: AuthenticationMethod) -> RotationOutcome {
        info!(
            host = %self.target.host,
            from = %self.method.kind(),
            to = %method.kind(),
            "switched authentication method"
        );
        self.replace(method)
    }

    fn replace(&mut self, method: AuthenticationMethod) -> RotationOutcome {
        let previous = std::mem::replace(&mut self.method, method);
        let follow_up = match previous.token_secret() {
            Some(old) => vec![ExternalAction::DeleteSecret {
                secret_identifier: old.secret_identifier().clone(),
            }],
            None => Vec::new(),
        };
        RotationOutcome {
            previous,
            follow_up,
        }
    }

    /// Returns `true` if the active method matches `kind`.
    pub fn uses(&self, kind: MethodKind) -> bool {
        self.method.kind() == kind
    }
}
