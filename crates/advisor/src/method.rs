//! Authentication methods a workspace can use to reach its repository.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{AdvisorError, Scope, SecretIdentifier, Timestamp};

/// Payload-free discriminant of [`AuthenticationMethod`].
///
/// This is what the recommender returns: it advises on a kind of method, the
/// operator then creates the concrete credential on the external platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MethodKind {
    /// Delegated, auto-refreshing authentication; no secret is stored.
    #[serde(rename = "oauth")]
    OAuth,
    /// A long-lived token stored as an opaque secret.
    TokenSecret,
}

impl std::fmt::Display for MethodKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OAuth => f.write_str("oauth"),
            Self::TokenSecret => f.write_str("token_secret"),
        }
    }
}

/// The method a repository binding authenticates with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AuthenticationMethod {
    /// References an externally issued, auto-refreshed credential whose
    /// lifetime is managed entirely by the platform.
    #[serde(rename = "oauth")]
    OAuth,
    /// References a stored token secret.
    TokenSecret(TokenSecret),
}

impl AuthenticationMethod {
    /// Returns the kind of this method.
    pub fn kind(&self) -> MethodKind {
        match self {
            Self::OAuth => MethodKind::OAuth,
            Self::TokenSecret(_) => MethodKind::TokenSecret,
        }
    }

    /// Returns the token secret, if this method stores one.
    pub fn token_secret(&self) -> Option<&TokenSecret> {
        match self {
            Self::OAuth => None,
            Self::TokenSecret(secret) => Some(secret),
        }
    }
}

/// Metadata about a token stored in the external secret store.
///
/// Holds a reference to the credential, never the credential itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawTokenSecret")]
pub struct TokenSecret {
    secret_identifier: SecretIdentifier,
    #[serde(default)]
    scopes: BTreeSet<Scope>,
    created_at: Timestamp,
    expires_at: Timestamp,
}

impl TokenSecret {
    /// Creates a [`TokenSecret`].
    ///
    /// Fails with [`AdvisorError::InvalidInput`] on `field = "expires_at"` if
    /// the token would expire at or before its creation time.
    pub fn new(
        secret_identifier: SecretIdentifier,
        scopes: impl IntoIterator<Item = Scope>,
        created_at: Timestamp,
        expires_at: Timestamp,
    ) -> Result<Self, AdvisorError> {
        if expires_at <= created_at {
            return Err(AdvisorError::invalid_input(
                "expires_at",
                format!("{expires_at} is not after created_at {created_at}"),
            ));
        }
        Ok(Self {
            secret_identifier,
            scopes: scopes.into_iter().collect(),
            created_at,
            expires_at,
        })
    }

    /// Reference to the credential material in the external secret store.
    pub fn secret_identifier(&self) -> &SecretIdentifier {
        &self.secret_identifier
    }

    /// Permissions granted to the token.
    pub fn scopes(&self) -> &BTreeSet<Scope> {
        &self.scopes
    }

    /// When the token was issued.
    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    /// When the token stops working.
    pub fn expires_at(&self) -> Timestamp {
        self.expires_at
    }
}

// Deserialisation goes through `TokenSecret::new` so the expiry invariant
// holds for values read from JSON as well.
#[derive(Deserialize)]
struct RawTokenSecret {
    secret_identifier: SecretIdentifier,
    #[serde(default)]
    scopes: BTreeSet<Scope>,
    created_at: Timestamp,
    expires_at: Timestamp,
}

impl TryFrom<RawTokenSecret> for TokenSecret {
    type Error = AdvisorError;

    fn try_from(raw: RawTokenSecret) -> Result<Self, Self::Error> {
        Self::new(raw.secret_identifier, raw.scopes, raw.created_at, raw.expires_at)
    }
}
