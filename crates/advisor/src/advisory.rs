//! Operator-facing advisory: one request in, one structured response out.
//!
//! [`Advisor::advise`] combines the recommendation, the obligations of the
//! recommended method and, when the caller already has a method in place, the
//! rotation status and scope check of that method. It is stateless; any
//! number of requests may be evaluated concurrently against one [`Advisor`].

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::{
    check_scopes, derive_obligations, evaluate_rotation, exceeds_cadence, recommend_method,
    AdvisorError, AdvisoryId, AuthenticationMethod, DecisionRule, ExternalAction, GracePeriod,
    MethodKind, Obligations, PolicyConflict, PolicyFlags, RepositoryTarget, RotationCadence,
    RotationObligation, RotationStatus, Scope, ScopeReport, Timestamp, TokenLifecycleState,
};

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

/// Validated advisor settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvisorPolicy {
    /// Lead time before expiry at which rotation becomes due.
    pub grace_period: GracePeriod,
    /// Longest lifetime a token should be issued with.
    pub max_token_lifetime: RotationCadence,
    /// Scopes every token secret must carry.
    pub required_scopes: BTreeSet<Scope>,
    /// Organisation-wide default for [`PolicyFlags::secrets_forbidden`].
    /// A request can tighten but not relax it.
    pub secrets_forbidden: bool,
    /// Fail requests with [`AdvisorError::PolicyConflict`] instead of
    /// reporting conflicts in the response.
    pub strict_conflicts: bool,
}

impl AdvisorPolicy {
    /// Scopes required when nothing else is configured.
    pub const DEFAULT_SCOPES: [&'static str; 2] = ["contents:write", "metadata:read"];
}

impl Default for AdvisorPolicy {
    fn default() -> Self {
        Self {
            grace_period: GracePeriod::default(),
            max_token_lifetime: RotationCadence::default(),
            required_scopes: Self::DEFAULT_SCOPES
                .into_iter()
                .map(Scope::from_static)
                .collect(),
            secrets_forbidden: false,
            strict_conflicts: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Request / response
// ---------------------------------------------------------------------------

/// An advisory request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvisoryRequest {
    /// The repository to connect.
    pub target: RepositoryTarget,
    /// Constraints for this request.
    #[serde(default)]
    pub flags: PolicyFlags,
    /// Method already configured for the repository, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_method: Option<AuthenticationMethod>,
}

impl AdvisoryRequest {
    /// Creates a request without a current method.
    pub fn new(target: RepositoryTarget, flags: PolicyFlags) -> Self {
        Self {
            target,
            flags,
            current_method: None,
        }
    }

    /// Attaches the method already in place.
    #[must_use]
    pub fn with_current_method(mut self, method: AuthenticationMethod) -> Self {
        self.current_method = Some(method);
        self
    }
}

/// How much attention a [`Finding`] needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingSeverity {
    /// Context only.
    Informational,
    /// Should be addressed.
    Warning,
}

/// A remark about the request, for display to the operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    /// How much attention the finding needs.
    pub severity: FindingSeverity,
    /// Human-readable description.
    pub message: String,
}

impl Finding {
    fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: FindingSeverity::Warning,
            message: message.into(),
        }
    }

    fn info(message: impl Into<String>) -> Self {
        Self {
            severity: FindingSeverity::Informational,
            message: message.into(),
        }
    }
}

/// An advisory response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvisoryResponse {
    /// Correlates this response with log output.
    pub advisory_id: AdvisoryId,
    /// Time the response was evaluated at.
    pub evaluated_at: Timestamp,
    /// The recommended method.
    pub recommended: MethodKind,
    /// The rule that produced the recommendation.
    pub rule: DecisionRule,
    /// One-line explanation.
    pub rationale: String,
    /// Constraints the recommendation could not honour.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conflicts: Vec<PolicyConflict>,
    /// Grants, scopes and cadence for the recommended method.
    pub obligations: Obligations,
    /// Rotation obligation of the current method, if it is a token secret.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<RotationObligation>,
    /// Lifecycle state of the current token, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lifecycle_state: Option<TokenLifecycleState>,
    /// Scope check of the current token, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope_report: Option<ScopeReport>,
    /// Remarks for the operator.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub findings: Vec<Finding>,
    /// External follow-up work, in the order it should be done.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<ExternalAction>,
}

// ---------------------------------------------------------------------------
// Advisor
// ---------------------------------------------------------------------------

/// Evaluates advisory requests against a fixed [`AdvisorPolicy`].
#[derive(Debug, Clone, Default)]
pub struct Advisor {
    policy: AdvisorPolicy,
}

impl Advisor {
    /// Creates an advisor for `policy`.
    pub fn new(policy: AdvisorPolicy) -> Self {
        Self { policy }
    }

    /// The policy in use.
    pub fn policy(&self) -> &AdvisorPolicy {
        &self.policy
    }

    /// Rotation obligation of `method` at `now` under this advisor's grace period.
    pub fn evaluate_rotation(
        &self,
        method: &AuthenticationMethod,
        now: Timestamp,
    ) -> Option<RotationObligation> {
        evaluate_rotation(method, now, self.policy.grace_period)
    }

    /// Evaluates `request` at `now`.
    ///
    /// Fails only when the policy has `strict_conflicts` set and the request's
    /// constraints conflict.
    #[instrument(
        skip(self, request),
        fields(advisory_id = tracing::field::Empty, host = %request.target.host)
    )]
    pub fn advise(
        &self,
        request: &AdvisoryRequest,
        now: Timestamp,
    ) -> Result<AdvisoryResponse, AdvisorError> {
        let advisory_id = AdvisoryId::new_random();
        tracing::Span::current().record("advisory_id", tracing::field::display(advisory_id));

        let flags = PolicyFlags {
            secrets_forbidden: request.flags.secrets_forbidden || self.policy.secrets_forbidden,
            ..request.flags
        };

        let mut recommendation = recommend_method(&request.target, flags);
        if self.policy.strict_conflicts {
            recommendation = recommendation.into_strict()?;
        }
        for conflict in &recommendation.conflicts {
            warn!(conflict = %conflict, "policy conflict");
        }

        let obligations = derive_obligations(
            recommendation.kind,
            &self.policy.required_scopes,
            self.policy.max_token_lifetime,
        );

        let mut findings = Vec::new();
        let mut actions = Vec::new();
        let mut rotation = None;
        let mut scope_report = None;

        if request.target.requires_sso && recommendation.kind == MethodKind::TokenSecret {
            findings.push(Finding::info(
                "the organization enforces SSO; authorize the token for the organization after creating it",
            ));
        }

        match &request.current_method {
            None => actions.push(setup_action(recommendation.kind)),
            Some(current) => {
                if current.kind() != recommendation.kind {
                    findings.push(Finding::warning(format!(
                        "current method is {} but {} is recommended",
                        current.kind(),
                        recommendation.kind
                    )));
                    actions.push(setup_action(recommendation.kind));
                }

                if let Some(secret) = current.token_secret() {
                    let obligation = self.evaluate_rotation(current, now);
                    if let Some(o) = obligation.filter(|o| o.requires_action()) {
                        findings.push(Finding::warning(match o.status {
                            RotationStatus::Overdue => {
                                format!("token expired at {}", o.expires_at)
                            }
                            _ => format!("token expires at {}; rotate it now", o.expires_at),
                        }));
                        if current.kind() == recommendation.kind {
                            actions.push(ExternalAction::RotateSecret {
                                secret_identifier: secret.secret_identifier().clone(),
                                expires_at: o.expires_at,
                            });
                        }
                    }
                    rotation = obligation;

                    let report = check_scopes(secret, &self.policy.required_scopes);
                    if !report.is_sufficient() {
                        findings.push(Finding::warning(format!(
                            "token is missing required scopes: {}",
                            join(&report.missing)
                        )));
                    }
                    scope_report = Some(report);

                    if exceeds_cadence(secret, self.policy.max_token_lifetime) {
                        findings.push(Finding::warning(format!(
                            "token lifetime exceeds the {} rotation cadence",
                            self.policy.max_token_lifetime
                        )));
                    }

                    if current.kind() != recommendation.kind {
                        actions.push(ExternalAction::DeleteSecret {
                            secret_identifier: secret.secret_identifier().clone(),
                        });
                    }
                }
            }
        }

        info!(
            recommended = %recommendation.kind,
            rule = ?recommendation.rule,
            findings = findings.len(),
            "advisory evaluated"
        );

        Ok(AdvisoryResponse {
            advisory_id,
            evaluated_at: now,
            recommended: recommendation.kind,
            rule: recommendation.rule,
            rationale: recommendation.rationale,
            conflicts: recommendation.conflicts,
            obligations,
            lifecycle_state: rotation.map(|o| o.status.into()),
            rotation,
            scope_report,
            findings,
            actions,
        })
    }
}

fn setup_action(kind: MethodKind) -> ExternalAction {
    match kind {
        MethodKind::OAuth => ExternalAction::ConfigureOAuth,
        MethodKind::TokenSecret => ExternalAction::CreateSecret,
    }
}

fn join(scopes: &BTreeSet<Scope>) -> String {
    scopes.iter().map(Scope::as_str).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use chrono::{TimeDelta, TimeZone, Utc};
    use rstest::rstest;

    use super::*;
    use crate::{HostName, SecretIdentifier, TokenSecret};

    fn now() -> Timestamp {
        Timestamp::from_utc(Utc.with_ymd_and_hms(2026, 10, 16, 9, 0, 0).unwrap())
    }

    fn target(host: &str) -> RepositoryTarget {
        RepositoryTarget::new(HostName::new(host).unwrap())
    }

    fn token(days_left: i64, scopes: &[&str]) -> AuthenticationMethod {
        let expires = now().saturating_add(TimeDelta::days(days_left));
        AuthenticationMethod::TokenSecret(
            TokenSecret::new(
                SecretIdentifier::new("analytics_pat").unwrap(),
                scopes.iter().map(|s| Scope::new(*s).unwrap()),
                expires.saturating_sub(TimeDelta::days(60)),
                expires,
            )
            .unwrap(),
        )
    }

    #[test]
    fn internal_host_gets_token_secret_and_setup_action() {
        let request = AdvisoryRequest::new(
            target("github.internal.example.com").private(true),
            PolicyFlags::default(),
        );
        let response = Advisor::default().advise(&request, now()).unwrap();
        assert_eq!(response.recommended, MethodKind::TokenSecret);
        assert_eq!(
            response.rationale,
            "non-github.com host requires token-based authentication."
        );
        assert_eq!(response.actions, vec![ExternalAction::CreateSecret]);
        assert_eq!(response.rotation, None);
        assert!(response.obligations.max_token_lifetime.is_some());
    }

    #[test]
    fn due_token_produces_rotation_action() {
        let request = AdvisoryRequest::new(target("gitlab.com"), PolicyFlags::default())
            .with_current_method(token(5, &AdvisorPolicy::DEFAULT_SCOPES));
        let response = Advisor::default().advise(&request, now()).unwrap();

        assert_eq!(response.rotation.map(|o| o.status), Some(RotationStatus::Due));
        assert_eq!(
            response.lifecycle_state,
            Some(TokenLifecycleState::DueForRotation)
        );
        assert!(matches!(
            response.actions.as_slice(),
            [ExternalAction::RotateSecret { .. }]
        ));
        assert!(response.scope_report.unwrap().is_sufficient());
    }

    #[test]
    fn healthy_token_has_no_findings() {
        let request = AdvisoryRequest::new(target("gitlab.com"), PolicyFlags::default())
            .with_current_method(token(40, &AdvisorPolicy::DEFAULT_SCOPES));
        let response = Advisor::default().advise(&request, now()).unwrap();
        assert!(response.findings.is_empty(), "{:?}", response.findings);
        assert!(response.actions.is_empty());
        assert_eq!(response.lifecycle_state, Some(TokenLifecycleState::Active));
    }

    #[test]
    fn missing_scopes_are_reported() {
        let request = AdvisoryRequest::new(target("gitlab.com"), PolicyFlags::default())
            .with_current_method(token(40, &["contents:write"]));
        let response = Advisor::default().advise(&request, now()).unwrap();
        assert!(response
            .findings
            .iter()
            .any(|f| f.message.contains("metadata:read")));
    }

    #[test]
    fn moving_from_token_to_oauth_deletes_the_old_secret() {
        let request = AdvisoryRequest::new(target("github.com"), PolicyFlags::default())
            .with_current_method(token(40, &AdvisorPolicy::DEFAULT_SCOPES));
        let response = Advisor::default().advise(&request, now()).unwrap();
        assert_eq!(response.recommended, MethodKind::OAuth);
        assert_eq!(
            response.actions,
            vec![
                ExternalAction::ConfigureOAuth,
                ExternalAction::DeleteSecret {
                    secret_identifier: SecretIdentifier::new("analytics_pat").unwrap()
                },
            ]
        );
        assert_eq!(response.findings[0].severity, FindingSeverity::Warning);
    }

    #[rstest]
    #[case(5, RotationStatus::Due)]
    #[case(-1, RotationStatus::Overdue)]
    fn expiring_token_replaced_by_oauth_is_deleted_not_rotated(
        #[case] days_left: i64,
        #[case] status: RotationStatus,
    ) {
        let request = AdvisoryRequest::new(target("github.com"), PolicyFlags::default())
            .with_current_method(token(days_left, &AdvisorPolicy::DEFAULT_SCOPES));
        let response = Advisor::default().advise(&request, now()).unwrap();

        assert_eq!(response.recommended, MethodKind::OAuth);
        assert_eq!(response.rotation.map(|o| o.status), Some(status));
        assert_eq!(
            response.actions,
            vec![
                ExternalAction::ConfigureOAuth,
                ExternalAction::DeleteSecret {
                    secret_identifier: SecretIdentifier::new("analytics_pat").unwrap()
                },
            ]
        );
        assert!(!response
            .actions
            .iter()
            .any(|a| matches!(a, ExternalAction::RotateSecret { .. })));
        assert!(response
            .findings
            .iter()
            .any(|f| f.message.contains("expire")));
    }

    #[test]
    fn sso_target_with_token_recommendation_gets_informational_finding() {
        let request = AdvisoryRequest::new(
            target("gitlab.com").with_sso(true),
            PolicyFlags::default(),
        );
        let response = Advisor::default().advise(&request, now()).unwrap();

        assert_eq!(response.recommended, MethodKind::TokenSecret);
        assert_eq!(response.findings.len(), 1);
        assert_eq!(response.findings[0].severity, FindingSeverity::Informational);
        assert!(response.findings[0].message.contains("SSO"));
        assert_eq!(response.actions, vec![ExternalAction::CreateSecret]);
    }

    #[test]
    fn sso_target_with_oauth_recommendation_has_no_sso_finding() {
        let request = AdvisoryRequest::new(
            target("github.com").with_sso(true),
            PolicyFlags::default(),
        );
        let response = Advisor::default().advise(&request, now()).unwrap();
        assert_eq!(response.recommended, MethodKind::OAuth);
        assert!(response.findings.is_empty(), "{:?}", response.findings);
    }

    #[test]
    fn default_policy_keeps_every_built_in_scope() {
        let policy = AdvisorPolicy::default();
        assert_eq!(
            policy.required_scopes.len(),
            AdvisorPolicy::DEFAULT_SCOPES.len()
        );
        for scope in AdvisorPolicy::DEFAULT_SCOPES {
            assert!(policy.required_scopes.contains(&Scope::new(scope).unwrap()));
        }
    }

    #[test]
    fn organisation_policy_forbids_secrets_even_if_request_does_not() {
        let advisor = Advisor::new(AdvisorPolicy {
            secrets_forbidden: true,
            ..AdvisorPolicy::default()
        });
        let request = AdvisoryRequest::new(
            target("github.com"),
            PolicyFlags {
                secrets_forbidden: false,
                is_automated_process: false,
            },
        );
        let response = advisor.advise(&request, now()).unwrap();
        assert_eq!(response.rule, DecisionRule::SecretsForbidden);
    }

    #[test]
    fn conflicts_are_reported_or_rejected_depending_on_policy() {
        let request = AdvisoryRequest::new(
            target("gitlab.com"),
            PolicyFlags {
                secrets_forbidden: true,
                is_automated_process: true,
            },
        );

        let lenient = Advisor::default().advise(&request, now()).unwrap();
        assert_eq!(lenient.recommended, MethodKind::TokenSecret);
        assert_eq!(
            lenient.conflicts,
            vec![PolicyConflict::SecretsForbiddenOnNonGithubHost]
        );

        let strict = Advisor::new(AdvisorPolicy {
            strict_conflicts: true,
            ..AdvisorPolicy::default()
        });
        assert!(matches!(
            strict.advise(&request, now()),
            Err(AdvisorError::PolicyConflict { .. })
        ));
    }

    #[test]
    fn response_serialises_with_snake_case_tags() {
        let request = AdvisoryRequest::new(target("github.com"), PolicyFlags::default());
        let response = Advisor::default().advise(&request, now()).unwrap();
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["recommended"], "oauth");
        assert_eq!(json["rule"], "interactive_default");
        assert_eq!(json["actions"][0]["action"], "configure_oauth");
    }

    #[test]
    fn request_deserialises_with_defaults() {
        let request: AdvisoryRequest =
            serde_json::from_str(r#"{"target": {"host": "github.com"}}"#).unwrap();
        assert_eq!(request.flags, PolicyFlags::default());
        assert_eq!(request.current_method, None);
    }
}
