//! `.credadvisor/config.toml` loading.
//!
//! The file is optional when the default path is used: a missing default file
//! yields the built-in policy. A path given explicitly must exist.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use advisor::{AdvisorError, AdvisorPolicy, GracePeriod, RotationCadence, Scope};
use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::debug;

/// Path used when neither `--config` nor `CREDADVISOR_CONFIG` is set.
pub const DEFAULT_CONFIG_PATH: &str = ".credadvisor/config.toml";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CliConfig {
    #[serde(default)]
    pub policy: PolicySection,
    #[serde(default)]
    pub rotation: RotationSection,
    #[serde(default)]
    pub telemetry: TelemetrySection,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicySection {
    /// Organisation forbids storing any secret material.
    #[serde(default)]
    pub secrets_forbidden: bool,
    /// Fail on policy conflicts instead of reporting them.
    #[serde(default)]
    pub strict_conflicts: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RotationSection {
    #[serde(default = "default_grace_period_days")]
    pub grace_period_days: i64,
    #[serde(default = "default_max_token_lifetime_days")]
    pub max_token_lifetime_days: i64,
    #[serde(default = "default_required_scopes")]
    pub required_scopes: Vec<String>,
}

impl Default for RotationSection {
    fn default() -> Self {
        Self {
            grace_period_days: default_grace_period_days(),
            max_token_lifetime_days: default_max_token_lifetime_days(),
            required_scopes: default_required_scopes(),
        }
    }
}

fn default_grace_period_days() -> i64 {
    GracePeriod::DEFAULT_DAYS
}

fn default_max_token_lifetime_days() -> i64 {
    RotationCadence::DEFAULT_DAYS
}

fn default_required_scopes() -> Vec<String> {
    AdvisorPolicy::DEFAULT_SCOPES
        .iter()
        .map(|s| (*s).to_string())
        .collect()
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TelemetrySection {
    /// OTLP gRPC endpoint (e.g. `http://localhost:4317`). Spans are only
    /// exported when this is set.
    pub otlp_endpoint: Option<String>,
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl CliConfig {
    /// Loads the configuration from `explicit`, or from
    /// [`DEFAULT_CONFIG_PATH`] when `explicit` is `None`.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let path = PathBuf::from(DEFAULT_CONFIG_PATH);
                if !path.exists() {
                    return Ok(Self::default());
                }
                path
            }
        };

        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config = Self::parse(&raw)
            .with_context(|| format!("invalid config file {}", path.display()))?;
        debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Parses TOML configuration text.
    pub fn parse(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Validates the configuration into an [`AdvisorPolicy`].
    pub fn policy(&self) -> Result<AdvisorPolicy, AdvisorError> {
        let required_scopes = self
            .rotation
            .required_scopes
            .iter()
            .map(Scope::new)
            .collect::<Result<BTreeSet<_>, _>>()
            .map_err(config_error)?;

        Ok(AdvisorPolicy {
            grace_period: GracePeriod::from_days(self.rotation.grace_period_days)
                .map_err(config_error)?,
            max_token_lifetime: RotationCadence::from_days(self.rotation.max_token_lifetime_days)
                .map_err(config_error)?,
            required_scopes,
            secrets_forbidden: self.policy.secrets_forbidden,
            strict_conflicts: self.policy.strict_conflicts,
        })
    }
}

fn config_error(err: AdvisorError) -> AdvisorError {
    AdvisorError::ConfigurationError {
        message: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn empty_file_yields_default_policy() {
        let config = CliConfig::parse("").unwrap();
        assert_eq!(config.policy().unwrap(), AdvisorPolicy::default());
        assert!(config.telemetry.otlp_endpoint.is_none());
    }

    #[test]
    fn sections_override_defaults() {
        let config = CliConfig::parse(
            r#"
            [policy]
            secrets_forbidden = true
            strict_conflicts = true

            [rotation]
            grace_period_days = 7
            max_token_lifetime_days = 30
            required_scopes = ["repo"]

            [telemetry]
            otlp_endpoint = "http://collector:4317"
            "#,
        )
        .unwrap();

        let policy = config.policy().unwrap();
        assert!(policy.secrets_forbidden);
        assert!(policy.strict_conflicts);
        assert_eq!(policy.grace_period, GracePeriod::from_days(7).unwrap());
        assert_eq!(policy.max_token_lifetime, RotationCadence::from_days(30).unwrap());
        assert_eq!(policy.required_scopes.len(), 1);
        assert_eq!(
            config.telemetry.otlp_endpoint.as_deref(),
            Some("http://collector:4317")
        );
    }

    #[test]
    fn negative_grace_period_is_a_configuration_error() {
        let config = CliConfig::parse("[rotation]\ngrace_period_days = -1\n").unwrap();
        assert!(matches!(
            config.policy(),
            Err(AdvisorError::ConfigurationError { .. })
        ));
    }

    #[test]
    fn empty_scope_is_a_configuration_error() {
        let config = CliConfig::parse("[rotation]\nrequired_scopes = [\"\"]\n").unwrap();
        assert!(matches!(
            config.policy(),
            Err(AdvisorError::ConfigurationError { .. })
        ));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(CliConfig::parse("[policy]\nsecret_forbidden = true\n").is_err());
    }

    #[test]
    fn explicit_path_is_read_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[rotation]\ngrace_period_days = 3").unwrap();
        let config = CliConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.rotation.grace_period_days, 3);
    }

    #[test]
    fn missing_explicit_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(CliConfig::load(Some(missing.as_path())).is_err());
    }
}
