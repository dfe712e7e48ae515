//! credadvisor CLI entry point.
//!
//! This binary is the composition root. Responsibilities:
//!
//! 1. **Parse configuration** — load `.credadvisor/config.toml` (or the file
//!    named by `--config` / `CREDADVISOR_CONFIG`) and validate it into an
//!    [`advisor::AdvisorPolicy`].
//! 2. **Wire observability** — see [`telemetry`].
//! 3. **Run one command** — `recommend`, `rotation` or `advise`, printing a
//!    JSON document on stdout.
//!
//! The advisor itself is pure; this binary performs no network calls beyond
//! the optional span export.

mod config;
mod telemetry;

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use advisor::{
    Advisor, AdvisoryRequest, AuthenticationMethod, HostName, PolicyFlags, RepositoryTarget,
    RotationCadence, Scope, SecretIdentifier, Timestamp, TokenSecret,
};
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::{error, info_span};

use crate::config::CliConfig;
use crate::telemetry::LogFormat;

#[derive(Parser)]
#[command(
    name = "credadvisor",
    version,
    about = "Recommends and audits Git authentication for workspaces"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Configuration file (TOML).
    #[arg(long, global = true, env = "CREDADVISOR_CONFIG")]
    config: Option<PathBuf>,

    /// Log line format on stderr.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Json)]
    log_format: LogFormat,
}

#[derive(Subcommand)]
enum Command {
    /// Recommend an authentication method for a repository.
    Recommend {
        #[command(flatten)]
        target: TargetArgs,

        #[command(flatten)]
        flags: FlagArgs,
    },
    /// Evaluate the rotation status of a stored token.
    Rotation {
        #[command(flatten)]
        token: TokenArgs,

        /// Evaluation time (RFC 3339); defaults to the current time.
        #[arg(long)]
        now: Option<Timestamp>,
    },
    /// Evaluate a full advisory request read from a JSON file (`-` for stdin).
    Advise {
        #[arg(long)]
        request: PathBuf,

        /// Evaluation time (RFC 3339); defaults to the current time.
        #[arg(long)]
        now: Option<Timestamp>,
    },
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct TargetSelector {
    /// Repository host (e.g. `github.com`).
    #[arg(long)]
    host: Option<HostName>,

    /// Repository clone URL.
    #[arg(long)]
    url: Option<String>,
}

#[derive(Args)]
struct TargetArgs {
    #[command(flatten)]
    selector: TargetSelector,

    /// The repository is private.
    #[arg(long)]
    private: bool,

    /// The organisation enforces SSO.
    #[arg(long)]
    requires_sso: bool,
}

impl TargetArgs {
    fn to_target(&self) -> Result<RepositoryTarget> {
        let target = match (&self.selector.host, &self.selector.url) {
            (Some(host), _) => RepositoryTarget::new(host.clone()),
            (None, Some(url)) => RepositoryTarget::from_url(url)?,
            (None, None) => anyhow::bail!("either --host or --url is required"),
        };
        Ok(target.private(self.private).with_sso(self.requires_sso))
    }
}

#[derive(Args)]
struct FlagArgs {
    /// The organisation forbids storing secret material.
    #[arg(long)]
    secrets_forbidden: bool,

    /// The consumer is an automated, non-interactive process.
    #[arg(long)]
    automated: bool,
}

impl From<&FlagArgs> for PolicyFlags {
    fn from(args: &FlagArgs) -> Self {
        PolicyFlags {
            secrets_forbidden: args.secrets_forbidden,
            is_automated_process: args.automated,
        }
    }
}

#[derive(Args)]
struct TokenArgs {
    /// Name of the secret holding the token.
    #[arg(long)]
    secret_id: SecretIdentifier,

    /// When the token expires (RFC 3339).
    #[arg(long)]
    expires_at: Timestamp,

    /// When the token was issued (RFC 3339); defaults to the expiry minus the
    /// configured maximum token lifetime.
    #[arg(long)]
    created_at: Option<Timestamp>,

    /// Scope granted to the token; repeatable.
    #[arg(long = "scope")]
    scopes: Vec<Scope>,
}

impl TokenArgs {
    fn to_secret(&self, cadence: RotationCadence) -> Result<TokenSecret> {
        let created_at = self
            .created_at
            .unwrap_or_else(|| self.expires_at.saturating_sub(cadence.as_delta()));
        Ok(TokenSecret::new(
            self.secret_id.clone(),
            self.scopes.iter().cloned(),
            created_at,
            self.expires_at,
        )?)
    }
}

// ---------------------------------------------------------------------------
// Output documents
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct RecommendOutput {
    target: RepositoryTarget,
    #[serde(flatten)]
    recommendation: advisor::Recommendation,
    obligations: advisor::Obligations,
}

#[derive(Serialize)]
struct RotationOutput {
    secret_identifier: SecretIdentifier,
    evaluated_at: Timestamp,
    #[serde(skip_serializing_if = "Option::is_none")]
    rotation: Option<advisor::RotationObligation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    lifecycle_state: Option<advisor::TokenLifecycleState>,
    scope_report: advisor::ScopeReport,
    exceeds_cadence: bool,
}

fn print_json(value: &impl Serialize) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("failed to serialise output")?;
    println!("{json}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn run(command: &Command, advisor: &Advisor) -> Result<()> {
    match command {
        Command::Recommend { target, flags } => {
            let _span = info_span!("recommend").entered();
            let target = target.to_target()?;
            let mut flags = PolicyFlags::from(flags);
            flags.secrets_forbidden |= advisor.policy().secrets_forbidden;

            let recommendation = advisor::recommend_method(&target, flags);
            let recommendation = if advisor.policy().strict_conflicts {
                recommendation.into_strict()?
            } else {
                recommendation
            };
            let obligations = advisor::derive_obligations(
                recommendation.kind,
                &advisor.policy().required_scopes,
                advisor.policy().max_token_lifetime,
            );
            print_json(&RecommendOutput {
                target,
                recommendation,
                obligations,
            })
        }
        Command::Rotation { token, now } => {
            let _span = info_span!("rotation").entered();
            let secret = token.to_secret(advisor.policy().max_token_lifetime)?;
            let now = now.unwrap_or_else(Timestamp::now);
            let scope_report = advisor::check_scopes(&secret, &advisor.policy().required_scopes);
            let exceeds_cadence =
                advisor::exceeds_cadence(&secret, advisor.policy().max_token_lifetime);
            let secret_identifier = secret.secret_identifier().clone();

            let rotation =
                advisor.evaluate_rotation(&AuthenticationMethod::TokenSecret(secret), now);
            print_json(&RotationOutput {
                secret_identifier,
                evaluated_at: now,
                lifecycle_state: rotation.map(|o| o.status.into()),
                rotation,
                scope_report,
                exceeds_cadence,
            })
        }
        Command::Advise { request, now } => {
            let _span = info_span!("advise").entered();
            let raw = read_request(request)?;
            let request: AdvisoryRequest =
                serde_json::from_str(&raw).context("invalid advisory request")?;
            let response = advisor.advise(&request, now.unwrap_or_else(Timestamp::now))?;
            print_json(&response)
        }
    }
}

fn read_request(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut raw = String::new();
        std::io::stdin()
            .read_to_string(&mut raw)
            .context("failed to read advisory request from stdin")?;
        Ok(raw)
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("failed to read advisory request {}", path.display()))
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match CliConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    let guard = match telemetry::init(cli.log_format, config.telemetry.otlp_endpoint.as_deref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("error: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    let result = config
        .policy()
        .map_err(anyhow::Error::from)
        .and_then(|policy| run(&cli.command, &Advisor::new(policy)));

    let code = match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %format!("{e:#}"), "command failed");
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    };

    guard.shutdown();
    code
}
