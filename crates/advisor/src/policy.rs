//! Authentication-method selection.
//!
//! [`recommend_method`] is a total, side-effect-free decision over a
//! [`RepositoryTarget`] and the organisation's [`PolicyFlags`]. Rules are
//! evaluated in a fixed order and the first match wins:
//!
//! | # | Condition | Recommendation |
//! |---|-----------|----------------|
//! | 1 | host is not `github.com` | token secret |
//! | 2 | organisation forbids stored secrets | OAuth |
//! | 3 | automated, non-interactive consumer | token secret |
//! | 4 | otherwise | OAuth |
//!
//! Combinations of flags that no method can satisfy are reported as
//! [`PolicyConflict`]s next to the recommendation; they never change it.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{AdvisorError, MethodKind, RepositoryTarget};

/// Organisational constraints that influence the recommendation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyFlags {
    /// The organisation forbids storing any secret material on the platform.
    pub secrets_forbidden: bool,

    /// The consumer is an automated process with no human present to
    /// complete an interactive login, so a single shared credential is needed.
    pub is_automated_process: bool,
}

/// The rule of the decision table that produced a recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionRule {
    /// Rule 1: OAuth is only offered for `github.com`.
    NonGithubHost,
    /// Rule 2: no secret may be stored.
    SecretsForbidden,
    /// Rule 3: an automated consumer needs a shared credential.
    AutomatedProcess,
    /// Rule 4: fallback for interactive users on `github.com`.
    InteractiveDefault,
}

impl DecisionRule {
    /// The method this rule selects.
    pub fn kind(self) -> MethodKind {
        match self {
            Self::NonGithubHost | Self::AutomatedProcess => MethodKind::TokenSecret,
            Self::SecretsForbidden | Self::InteractiveDefault => MethodKind::OAuth,
        }
    }

    /// One-line explanation shown to the operator.
    pub fn rationale(self) -> &'static str {
        match self {
            Self::NonGithubHost => "non-github.com host requires token-based authentication.",
            Self::SecretsForbidden => {
                "organization policy forbids storing secret material; OAuth stores no long-lived credential."
            }
            Self::AutomatedProcess => {
                "automated non-interactive process needs a shared credential that does not require interactive login."
            }
            Self::InteractiveDefault => {
                "OAuth is the lower-operational-burden default for interactive users on github.com."
            }
        }
    }
}

/// Constraints that cannot all be honoured by any available method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyConflict {
    /// A token secret is the only option off `github.com`, but storing
    /// secrets is forbidden.
    SecretsForbiddenOnNonGithubHost,
    /// On `github.com` OAuth is chosen because secrets are forbidden, but the
    /// consumer is automated and cannot complete an interactive login.
    SecretsForbiddenForAutomation,
}

impl PolicyConflict {
    /// Human-readable description of the conflict.
    pub fn description(self) -> &'static str {
        match self {
            Self::SecretsForbiddenOnNonGithubHost => {
                "secrets are forbidden but the host only supports token-based authentication"
            }
            Self::SecretsForbiddenForAutomation => {
                "secrets are forbidden but an automated process cannot complete an interactive OAuth login"
            }
        }
    }
}

impl std::fmt::Display for PolicyConflict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.description())
    }
}

/// Result of [`recommend_method`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    /// The recommended method.
    pub kind: MethodKind,
    /// The rule that matched.
    pub rule: DecisionRule,
    /// One-line explanation for the operator.
    pub rationale: String,
    /// Constraints the recommendation could not honour. Empty in the normal case.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conflicts: Vec<PolicyConflict>,
}

impl Recommendation {
    /// Returns `true` if any policy conflict was detected.
    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }

    /// Turns a conflicted recommendation into [`AdvisorError::PolicyConflict`].
    pub fn into_strict(self) -> Result<Self, AdvisorError> {
        if self.has_conflicts() {
            Err(AdvisorError::PolicyConflict {
                conflicts: self.conflicts,
            })
        } else {
            Ok(self)
        }
    }
}

/// Selects the authentication method for `target` under `flags`.
pub fn recommend_method(target: &RepositoryTarget, flags: PolicyFlags) -> Recommendation {
    let rule = if !target.is_github_dot_com() {
        DecisionRule::NonGithubHost
    } else if flags.secrets_forbidden {
        DecisionRule::SecretsForbidden
    } else if flags.is_automated_process {
        DecisionRule::AutomatedProcess
    } else {
        DecisionRule::InteractiveDefault
    };

    let conflicts = detect_conflicts(target, flags);

    debug!(
        host = %target.host,
        secrets_forbidden = flags.secrets_forbidden,
        automated = flags.is_automated_process,
        rule = ?rule,
        conflicts = conflicts.len(),
        "selected authentication method"
    );

    Recommendation {
        kind: rule.kind(),
        rule,
        rationale: rule.rationale().to_owned(),
        conflicts,
    }
}

fn detect_conflicts(target: &RepositoryTarget, flags: PolicyFlags) -> Vec<PolicyConflict> {
    let mut conflicts = Vec::new();
    if flags.secrets_forbidden {
        if !target.is_github_dot_com() {
            conflicts.push(PolicyConflict::SecretsForbiddenOnNonGithubHost);
        } else if flags.is_automated_process {
            conflicts.push(PolicyConflict::SecretsForbiddenForAutomation);
        }
    }
    conflicts
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::HostName;

    fn target(host: &str) -> RepositoryTarget {
        RepositoryTarget::new(HostName::new(host).unwrap())
    }

    fn flags(secrets_forbidden: bool, is_automated_process: bool) -> PolicyFlags {
        PolicyFlags {
            secrets_forbidden,
            is_automated_process,
        }
    }

    #[rstest]
    fn non_github_hosts_always_get_a_token_secret(
        #[values("gitlab.com", "github.internal.example.com", "www.github.com", "bitbucket.org")]
        host: &str,
        #[values(false, true)] secrets_forbidden: bool,
        #[values(false, true)] automated: bool,
        #[values(false, true)] private: bool,
    ) {
        let t = target(host).private(private);
        let rec = recommend_method(&t, flags(secrets_forbidden, automated));
        assert_eq!(rec.kind, MethodKind::TokenSecret);
        assert_eq!(rec.rule, DecisionRule::NonGithubHost);
    }

    #[rstest]
    #[case(flags(true, false), MethodKind::OAuth, DecisionRule::SecretsForbidden)]
    #[case(flags(true, true), MethodKind::OAuth, DecisionRule::SecretsForbidden)]
    #[case(flags(false, true), MethodKind::TokenSecret, DecisionRule::AutomatedProcess)]
    #[case(flags(false, false), MethodKind::OAuth, DecisionRule::InteractiveDefault)]
    fn github_dot_com_follows_rule_precedence(
        #[case] flags: PolicyFlags,
        #[case] kind: MethodKind,
        #[case] rule: DecisionRule,
    ) {
        let rec = recommend_method(&target("github.com"), flags);
        assert_eq!(rec.kind, kind);
        assert_eq!(rec.rule, rule);
        assert_eq!(rec.rationale, rule.rationale());
    }

    #[test]
    fn private_internal_host_gets_token_secret_with_host_rationale() {
        let t = target("github.internal.example.com").private(true);
        let rec = recommend_method(&t, flags(false, false));
        assert_eq!(rec.kind, MethodKind::TokenSecret);
        assert_eq!(
            rec.rationale,
            "non-github.com host requires token-based authentication."
        );
        assert!(!rec.has_conflicts());
    }

    #[test]
    fn forbidden_secrets_off_github_is_a_conflict_but_still_recommends_token() {
        let rec = recommend_method(&target("gitlab.com"), flags(true, true));
        assert_eq!(rec.kind, MethodKind::TokenSecret);
        assert_eq!(
            rec.conflicts,
            vec![PolicyConflict::SecretsForbiddenOnNonGithubHost]
        );
    }

    #[test]
    fn forbidden_secrets_with_automation_on_github_is_a_conflict() {
        let rec = recommend_method(&target("github.com"), flags(true, true));
        assert_eq!(rec.kind, MethodKind::OAuth);
        assert_eq!(
            rec.conflicts,
            vec![PolicyConflict::SecretsForbiddenForAutomation]
        );
    }

    #[test]
    fn strict_mode_rejects_conflicts_only() {
        let ok = recommend_method(&target("github.com"), flags(false, true));
        assert!(ok.into_strict().is_ok());

        let conflicted = recommend_method(&target("gitlab.com"), flags(true, false));
        match conflicted.into_strict() {
            Err(AdvisorError::PolicyConflict { conflicts }) => {
                assert_eq!(conflicts, vec![PolicyConflict::SecretsForbiddenOnNonGithubHost]);
            }
            other => panic!("expected a policy conflict, got {other:?}"),
        }
    }
}
