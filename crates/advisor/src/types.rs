//! Shared value types for the credential-policy domain.
//!
//! Unlike the newtype identifiers in [`crate::identifiers`], these types carry
//! meaningful values with invariants (a grace period is never negative, a
//! timestamp is always UTC) and participate in the rotation computation.

use std::str::FromStr;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::AdvisorError;

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// A UTC wall-clock timestamp.
///
/// Wraps [`chrono::DateTime<Utc>`] so callers never depend on `chrono` types
/// directly; the underlying representation can change without affecting the
/// domain API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Returns the current UTC time as a [`Timestamp`].
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Creates a [`Timestamp`] from a [`DateTime<Utc>`].
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Returns the underlying [`DateTime<Utc>`].
    pub fn as_datetime(self) -> DateTime<Utc> {
        self.0
    }

    /// Parses an RFC 3339 timestamp (any offset), converting it to UTC.
    pub fn parse_rfc3339(value: &str) -> Result<Self, AdvisorError> {
        DateTime::parse_from_rfc3339(value.trim())
            .map(|dt| Self(dt.with_timezone(&Utc)))
            .map_err(|e| AdvisorError::invalid_input("timestamp", e.to_string()))
    }

    /// Moves this timestamp back by `delta`, saturating at the earliest
    /// representable instant.
    pub fn saturating_sub(self, delta: TimeDelta) -> Self {
        Self(self.0.checked_sub_signed(delta).unwrap_or(DateTime::<Utc>::MIN_UTC))
    }

    /// Moves this timestamp forward by `delta`, saturating at the latest
    /// representable instant.
    pub fn saturating_add(self, delta: TimeDelta) -> Self {
        Self(self.0.checked_add_signed(delta).unwrap_or(DateTime::<Utc>::MAX_UTC))
    }

    /// Signed distance from `earlier` to `self`.
    pub fn since(self, earlier: Timestamp) -> TimeDelta {
        self.0.signed_duration_since(earlier.0)
    }
}

impl FromStr for Timestamp {
    type Err = AdvisorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_rfc3339(s)
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

// ---------------------------------------------------------------------------
// Durations
// ---------------------------------------------------------------------------

/// Builds a non-negative [`TimeDelta`] of `days` days, failing on `field`.
fn days_to_delta(days: i64, field: &str) -> Result<TimeDelta, AdvisorError> {
    if days < 0 {
        return Err(AdvisorError::invalid_input(field, "must not be negative"));
    }
    TimeDelta::try_days(days)
        .ok_or_else(|| AdvisorError::invalid_input(field, format!("{days} days is out of range")))
}

fn write_delta(delta: TimeDelta, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let secs = delta.num_seconds();
    if secs % 86_400 == 0 {
        write!(f, "{}d", secs / 86_400)
    } else {
        write!(f, "{secs}s")
    }
}

/// Lead time before a token's expiry at which rotation becomes due.
///
/// Never negative. Serialised as whole seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct GracePeriod(TimeDelta);

impl GracePeriod {
    /// Days of lead time used when nothing else is configured.
    pub const DEFAULT_DAYS: i64 = 14;

    /// Creates a [`GracePeriod`], rejecting negative durations.
    pub fn new(delta: TimeDelta) -> Result<Self, AdvisorError> {
        if delta < TimeDelta::zero() {
            Err(AdvisorError::invalid_input("grace_period", "must not be negative"))
        } else {
            Ok(Self(delta))
        }
    }

    /// Creates a [`GracePeriod`] of `days` whole days.
    pub fn from_days(days: i64) -> Result<Self, AdvisorError> {
        days_to_delta(days, "grace_period").map(Self)
    }

    /// Returns the underlying [`TimeDelta`].
    pub fn as_delta(self) -> TimeDelta {
        self.0
    }
}

impl Default for GracePeriod {
    fn default() -> Self {
        Self(TimeDelta::days(Self::DEFAULT_DAYS))
    }
}

impl TryFrom<i64> for GracePeriod {
    type Error = AdvisorError;

    fn try_from(secs: i64) -> Result<Self, Self::Error> {
        let delta = TimeDelta::try_seconds(secs)
            .ok_or_else(|| AdvisorError::invalid_input("grace_period", "out of range"))?;
        Self::new(delta)
    }
}

impl From<GracePeriod> for i64 {
    fn from(value: GracePeriod) -> i64 {
        value.0.num_seconds()
    }
}

impl std::fmt::Display for GracePeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write_delta(self.0, f)
    }
}

// ---------------------------------------------------------------------------

/// Longest lifetime a token secret should be issued with before it has to be
/// replaced. Drives the rotation cadence reported to operators.
///
/// Strictly positive. Serialised as whole seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct RotationCadence(TimeDelta);

impl RotationCadence {
    /// Days used when nothing else is configured.
    pub const DEFAULT_DAYS: i64 = 90;

    /// Creates a [`RotationCadence`] of `days` whole days; zero is rejected.
    pub fn from_days(days: i64) -> Result<Self, AdvisorError> {
        if days == 0 {
            return Err(AdvisorError::invalid_input(
                "max_token_lifetime",
                "must be at least one day",
            ));
        }
        days_to_delta(days, "max_token_lifetime").map(Self)
    }

    /// Returns the underlying [`TimeDelta`].
    pub fn as_delta(self) -> TimeDelta {
        self.0
    }
}

impl Default for RotationCadence {
    fn default() -> Self {
        Self(TimeDelta::days(Self::DEFAULT_DAYS))
    }
}

impl TryFrom<i64> for RotationCadence {
    type Error = AdvisorError;

    fn try_from(secs: i64) -> Result<Self, Self::Error> {
        match TimeDelta::try_seconds(secs) {
            Some(delta) if delta > TimeDelta::zero() => Ok(Self(delta)),
            _ => Err(AdvisorError::invalid_input(
                "max_token_lifetime",
                "must be a positive number of seconds",
            )),
        }
    }
}

impl From<RotationCadence> for i64 {
    fn from(value: RotationCadence) -> i64 {
        value.0.num_seconds()
    }
}

impl std::fmt::Display for RotationCadence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write_delta(self.0, f)
    }
}
