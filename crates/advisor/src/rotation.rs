//! Rotation projection for token secrets.
//!
//! A [`RotationObligation`] is never stored. It is recomputed from the token's
//! expiry, the configured [`GracePeriod`] and the caller's notion of "now",
//! which makes the status a monotone function of time: once a token is
//! [`RotationStatus::Overdue`] it stays overdue until it is replaced.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{AuthenticationMethod, GracePeriod, TokenSecret, Timestamp};

/// How urgently a token secret needs replacing.
///
/// Ordered: `Pending < Due < Overdue`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RotationStatus {
    /// Rotation is not yet due.
    Pending,
    /// Inside the grace period; the token still works.
    Due,
    /// The token has expired.
    Overdue,
}

/// The derived fact that a stored credential approaches or has passed expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotationObligation {
    /// When rotation becomes due (`expires_at - grace_period`).
    pub due_at: Timestamp,
    /// When the token stops working.
    pub expires_at: Timestamp,
    /// Status at the evaluation time.
    pub status: RotationStatus,
}

impl RotationObligation {
    /// Projects the obligation for `secret` at `now`.
    pub fn for_secret(secret: &TokenSecret, now: Timestamp, grace: GracePeriod) -> Self {
        let expires_at = secret.expires_at();
        let due_at = expires_at.saturating_sub(grace.as_delta());
        let status = if now >= expires_at {
            RotationStatus::Overdue
        } else if now >= due_at {
            RotationStatus::Due
        } else {
            RotationStatus::Pending
        };
        Self {
            due_at,
            expires_at,
            status,
        }
    }

    /// Returns `true` when the operator has to act (due or overdue).
    pub fn requires_action(&self) -> bool {
        self.status >= RotationStatus::Due
    }
}

/// Evaluates the rotation obligation of `method` at `now`.
///
/// Returns `None` for OAuth: the platform refreshes those credentials itself.
pub fn evaluate_rotation(
    method: &AuthenticationMethod,
    now: Timestamp,
    grace: GracePeriod,
) -> Option<RotationObligation> {
    let secret = method.token_secret()?;
    let obligation = RotationObligation::for_secret(secret, now, grace);
    debug!(
        secret = %secret.secret_identifier(),
        status = ?obligation.status,
        due_at = %obligation.due_at,
        "evaluated rotation obligation"
    );
    Some(obligation)
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

/// Where a token secret is in its rotation cycle.
///
/// `Active -> DueForRotation -> Overdue`, and back to `Active` when the binding
/// is rotated onto a new token (see [`crate::RepositoryBinding::rotate`]).
/// The cycle has no terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenLifecycleState {
    /// Usable, rotation not yet due.
    Active,
    /// Inside the grace period.
    DueForRotation,
    /// Expired.
    Overdue,
}

impl From<RotationStatus> for TokenLifecycleState {
    fn from(status: RotationStatus) -> Self {
        match status {
            RotationStatus::Pending => Self::Active,
            RotationStatus::Due => Self::DueForRotation,
            RotationStatus::Overdue => Self::Overdue,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeDelta, TimeZone, Utc};
    use rstest::rstest;

    use super::*;
    use crate::SecretIdentifier;

    fn expiry() -> Timestamp {
        Timestamp::from_utc(Utc.with_ymd_and_hms(2026, 6, 30, 12, 0, 0).unwrap())
    }

    fn token() -> AuthenticationMethod {
        let expires = expiry();
        let secret = TokenSecret::new(
            SecretIdentifier::new("analytics_repo_pat").unwrap(),
            [],
            expires.saturating_sub(TimeDelta::days(90)),
            expires,
        )
        .unwrap();
        AuthenticationMethod::TokenSecret(secret)
    }

    #[rstest]
    #[case(TimeDelta::days(-10_000))]
    #[case(TimeDelta::zero())]
    #[case(TimeDelta::days(10_000))]
    fn oauth_has_no_obligation(#[case] offset: TimeDelta) {
        let now = expiry().saturating_add(offset);
        assert_eq!(
            evaluate_rotation(&AuthenticationMethod::OAuth, now, GracePeriod::default()),
            None
        );
    }

    #[rstest]
    #[case(TimeDelta::days(-20), RotationStatus::Pending)]
    #[case(TimeDelta::days(-14) - TimeDelta::seconds(1), RotationStatus::Pending)]
    #[case(TimeDelta::days(-14), RotationStatus::Due)]
    #[case(TimeDelta::days(-10), RotationStatus::Due)]
    #[case(TimeDelta::seconds(-1), RotationStatus::Due)]
    #[case(TimeDelta::zero(), RotationStatus::Overdue)]
    #[case(TimeDelta::days(1), RotationStatus::Overdue)]
    fn status_follows_grace_period(#[case] offset: TimeDelta, #[case] expected: RotationStatus) {
        let now = expiry().saturating_add(offset);
        let obligation = evaluate_rotation(&token(), now, GracePeriod::default()).unwrap();
        assert_eq!(obligation.status, expected);
        assert_eq!(obligation.expires_at, expiry());
        assert_eq!(obligation.due_at, expiry().saturating_sub(TimeDelta::days(14)));
    }

    #[test]
    fn status_never_regresses_as_time_advances() {
        let method = token();
        let grace = GracePeriod::from_days(30).unwrap();
        let start = expiry().saturating_sub(TimeDelta::days(60));
        let mut previous = RotationStatus::Pending;
        for hour in 0..(24 * 90) {
            let now = start.saturating_add(TimeDelta::hours(hour));
            let status = evaluate_rotation(&method, now, grace).unwrap().status;
            assert!(status >= previous, "regressed from {previous:?} to {status:?} at {now}");
            previous = status;
        }
        assert_eq!(previous, RotationStatus::Overdue);
    }

    #[test]
    fn zero_grace_period_skips_due() {
        let grace = GracePeriod::from_days(0).unwrap();
        let before = expiry().saturating_sub(TimeDelta::seconds(1));
        assert_eq!(
            evaluate_rotation(&token(), before, grace).unwrap().status,
            RotationStatus::Pending
        );
        assert_eq!(
            evaluate_rotation(&token(), expiry(), grace).unwrap().status,
            RotationStatus::Overdue
        );
    }

    #[test]
    fn grace_period_longer_than_lifetime_is_due_immediately() {
        let grace = GracePeriod::from_days(365).unwrap();
        let just_created = expiry().saturating_sub(TimeDelta::days(90));
        let obligation = evaluate_rotation(&token(), just_created, grace).unwrap();
        assert_eq!(obligation.status, RotationStatus::Due);
        assert!(obligation.requires_action());
    }

    #[test]
    fn lifecycle_state_mirrors_status() {
        assert_eq!(
            TokenLifecycleState::from(RotationStatus::Pending),
            TokenLifecycleState::Active
        );
        assert_eq!(
            TokenLifecycleState::from(RotationStatus::Due),
            TokenLifecycleState::DueForRotation
        );
        assert_eq!(
            TokenLifecycleState::from(RotationStatus::Overdue),
            TokenLifecycleState::Overdue
        );
    }
}
