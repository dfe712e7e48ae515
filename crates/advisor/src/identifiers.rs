//! Newtype domain identifiers.
//!
//! Every value with an identity is a distinct newtype so that, for example, a
//! [`SecretIdentifier`] can never be passed where a [`Scope`] is expected even
//! though both are strings under the hood.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AdvisorError;

// ---------------------------------------------------------------------------
// Macro for String-wrapped newtypes.
// Generates: struct, new() rejecting empty values, as_str(), Display.
// ---------------------------------------------------------------------------
macro_rules! string_id {
    (
        $(#[$attr:meta])*
        $name:ident, $field:literal
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier, failing with
            /// [`AdvisorError::InvalidInput`] if the value is blank.
            pub fn new(value: impl Into<String>) -> Result<Self, AdvisorError> {
                let v = value.into();
                if v.trim().is_empty() {
                    Err(AdvisorError::invalid_input($field, "must not be empty"))
                } else {
                    Ok(Self(v))
                }
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl FromStr for $name {
            type Err = AdvisorError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl TryFrom<String> for $name {
            type Error = AdvisorError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> String {
                value.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Identifiers — String-backed
// ---------------------------------------------------------------------------

string_id! {
    /// Opaque reference to credential material held by the external secret
    /// store (e.g. `"git_workspace_pat"`).
    ///
    /// This is a name, never the raw token. Nothing in this crate reads or
    /// writes the bytes behind it.
    SecretIdentifier, "secret_identifier"
}

string_id! {
    /// A permission granted to a token (e.g. `"contents:write"`).
    Scope, "scope"
}

impl Scope {
    /// Builds a scope from a non-blank compile-time constant.
    pub(crate) fn from_static(value: &'static str) -> Self {
        debug_assert!(!value.trim().is_empty(), "built-in scope must not be blank");
        Self(value.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Host names
// ---------------------------------------------------------------------------

/// DNS host of a Git repository (e.g. `"github.com"`).
///
/// Normalised on construction: surrounding whitespace is trimmed, the value is
/// lower-cased and a single trailing `.` is dropped, so `"GitHub.com."` and
/// `"github.com"` compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HostName(String);

impl HostName {
    /// The only host for which OAuth is offered by the platform.
    pub const GITHUB_DOT_COM: &'static str = "github.com";

    /// Creates a [`HostName`], failing with [`AdvisorError::InvalidInput`] on
    /// `field = "host"` when the value is empty or is not a bare host.
    pub fn new(value: impl AsRef<str>) -> Result<Self, AdvisorError> {
        let trimmed = value.as_ref().trim();
        let trimmed = trimmed.strip_suffix('.').unwrap_or(trimmed);
        if trimmed.is_empty() {
            return Err(AdvisorError::invalid_input("host", "must not be empty"));
        }
        if let Some(bad) = trimmed
            .chars()
            .find(|c| c.is_whitespace() || matches!(c, '/' | ':' | '@'))
        {
            return Err(AdvisorError::invalid_input(
                "host",
                format!("must be a bare host name, found {bad:?}"),
            ));
        }
        Ok(Self(trimmed.to_ascii_lowercase()))
    }

    /// Returns the normalised host as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` only for `github.com` itself. Subdomains and GitHub
    /// Enterprise hosts are not `github.com`.
    pub fn is_github_dot_com(&self) -> bool {
        self.0 == Self::GITHUB_DOT_COM
    }
}

impl FromStr for HostName {
    type Err = AdvisorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for HostName {
    type Error = AdvisorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<HostName> for String {
    fn from(value: HostName) -> String {
        value.0
    }
}

impl std::fmt::Display for HostName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Identifiers — UUID-backed (internally generated)
// ---------------------------------------------------------------------------

/// Identifies a single advisory evaluation.
///
/// Generated fresh for every request; recorded on the request span and in the
/// response so log lines and output can be correlated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AdvisoryId(Uuid);

impl AdvisoryId {
    /// Generates a new random advisory identifier.
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an [`AdvisoryId`] from an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Returns the underlying [`Uuid`].
    pub fn as_uuid(self) -> Uuid {
        self.0
    }
}

impl std::fmt::Display for AdvisoryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
