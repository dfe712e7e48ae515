//! Credential-policy domain for Git-backed workspaces.
//!
//! Given facts about a repository and an organisation's constraints, this
//! crate selects an authentication method (OAuth or a stored token secret),
//! derives the obligations that come with it (grants, scopes, rotation
//! cadence) and projects where a stored token is in its rotation cycle.
//!
//! ## Architectural Layer
//!
//! **Business logic only.** Every operation is a pure, synchronous function of
//! its inputs. Secret storage, Git operations and notifications belong to
//! external systems; this crate only names the actions an operator should take
//! on them ([`ExternalAction`]).
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers (`HostName`, `SecretIdentifier`, `Scope`, `AdvisoryId`) |
//! | [`types`] | Value types (`Timestamp`, `GracePeriod`, `RotationCadence`) |
//! | [`errors`] | [`AdvisorError`] |
//! | [`target`] | [`RepositoryTarget`] |
//! | [`method`] | [`AuthenticationMethod`], [`TokenSecret`], [`MethodKind`] |
//! | [`policy`] | [`recommend_method`] and the decision table |
//! | [`rotation`] | [`evaluate_rotation`] and the token lifecycle |
//! | [`obligations`] | Grants, required scopes and cadence per method |
//! | [`binding`] | [`RepositoryBinding`]: one repository, one active method |
//! | [`advisory`] | [`Advisor`]: request/response facade for operators |

pub mod advisory;
pub mod binding;
pub mod errors;
pub mod identifiers;
pub mod method;
pub mod obligations;
pub mod policy;
pub mod rotation;
pub mod target;
pub mod types;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use advisory::{
    Advisor, AdvisorPolicy, AdvisoryRequest, AdvisoryResponse, Finding, FindingSeverity,
};
pub use binding::{ExternalAction, RepositoryBinding, RotationOutcome};
pub use errors::AdvisorError;
pub use identifiers::{AdvisoryId, HostName, Scope, SecretIdentifier};
pub use method::{AuthenticationMethod, MethodKind, TokenSecret};
pub use obligations::{
    check_scopes, derive_obligations, exceeds_cadence, Obligations, PermissionGrant, ScopeReport,
};
pub use policy::{recommend_method, DecisionRule, PolicyConflict, PolicyFlags, Recommendation};
pub use rotation::{evaluate_rotation, RotationObligation, RotationStatus, TokenLifecycleState};
pub use target::RepositoryTarget;
pub use types::{GracePeriod, RotationCadence, Timestamp};
