//! Repository targets: the Git repository a workspace is to be connected to.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::{AdvisorError, HostName};

/// One Git repository to be connected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryTarget {
    /// Host the repository lives on.
    pub host: HostName,

    /// Whether the repository is private.
    #[serde(default)]
    pub is_private: bool,

    /// Whether the hosting organisation enforces SAML single sign-on.
    ///
    /// Tokens issued for SSO-enforcing organisations must be authorised for
    /// the organisation before they can reach private repositories.
    #[serde(default)]
    pub requires_sso: bool,
}

impl RepositoryTarget {
    /// Creates a public, non-SSO target on `host`.
    pub fn new(host: HostName) -> Self {
        Self {
            host,
            is_private: false,
            requires_sso: false,
        }
    }

    /// Marks the target as private.
    #[must_use]
    pub fn private(mut self, is_private: bool) -> Self {
        self.is_private = is_private;
        self
    }

    /// Marks the target as requiring SSO.
    #[must_use]
    pub fn with_sso(mut self, requires_sso: bool) -> Self {
        self.requires_sso = requires_sso;
        self
    }

    /// Builds a target from a clone URL.
    ///
    /// Accepts `https://`, `http://`, `ssh://` and `git://` URLs as well as the
    /// scp-like `user@host:owner/repo.git` form. Fails with
    /// [`AdvisorError::InvalidInput`] on `field = "url"` when no host can be
    /// extracted.
    pub fn from_url(clone_url: &str) -> Result<Self, AdvisorError> {
        let clone_url = clone_url.trim();
        let host = if clone_url.contains("://") {
            let parsed = Url::parse(clone_url)
                .map_err(|e| AdvisorError::invalid_input("url", e.to_string()))?;
            if !matches!(parsed.scheme(), "https" | "http" | "ssh" | "git") {
                return Err(AdvisorError::invalid_input(
                    "url",
                    format!("unsupported scheme '{}'", parsed.scheme()),
                ));
            }
            parsed
                .host_str()
                .map(str::to_owned)
                .ok_or_else(|| AdvisorError::invalid_input("url", "URL has no host"))?
        } else {
            scp_like_host(clone_url)
                .ok_or_else(|| AdvisorError::invalid_input("url", "not a recognised clone URL"))?
                .to_owned()
        };

        let host = HostName::new(host)
            .map_err(|e| AdvisorError::invalid_input("url", e.to_string()))?;
        Ok(Self::new(host))
    }

    /// Returns `true` when the target is hosted on `github.com`.
    pub fn is_github_dot_com(&self) -> bool {
        self.host.is_github_dot_com()
    }
}

/// Extracts the host from `user@host:path`.
fn scp_like_host(value: &str) -> Option<&str> {
    let (_, rest) = value.split_once('@')?;
    let (host, path) = rest.split_once(':')?;
    if host.is_empty() || path.is_empty() {
        None
    } else {
        Some(host)
    }
}
