//! Error taxonomy for control resolution.

use crate::info::Version;
use crate::strategy::CapabilityId;
use thiserror::Error;

/// Failure while building a control from its declared constructor parameters.
#[derive(Debug, Error)]
pub enum ConstructionError {
    /// A service parameter had no registration in the service provider.
    #[error("Missing dependency: {0}")]
    MissingDependency(&'static str),

    /// A positional argument the constructor declared was not supplied.
    #[error("Missing constructor argument: {0}")]
    MissingArgument(&'static str),

    /// The constructor asked for an argument it never declared.
    #[error("Constructor argument not declared: {0}")]
    UndeclaredArgument(&'static str),

    /// The constructor itself failed.
    #[error(transparent)]
    Constructor(#[from] anyhow::Error),
}

/// Errors surfaced by the resolution engine.
///
/// Only [`ResolveError::NotReady`] is transient. Everything else is fatal for
/// the request and is never retried internally.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// A component needed for resolution has not finished initializing.
    #[error("{component} is not ready yet")]
    NotReady { component: &'static str },

    /// No registered variant applies under the current environment.
    #[error("Unresolved capability {capability} (effective version {version})")]
    UnresolvedCapability {
        capability: CapabilityId,
        version: Version,
    },

    /// More than one redirector claims the same capability.
    #[error("Ambiguous redirection for {capability}: claimed by {}", .claimants.join(", "))]
    AmbiguousRedirection {
        capability: CapabilityId,
        claimants: Vec<String>,
    },

    /// Redirection returned to a capability already visited.
    #[error("Redirection cycle: {}", format_chain(.chain))]
    RedirectionCycle { chain: Vec<CapabilityId> },

    /// Redirection requires a runtime feature that is disabled.
    #[error("{capability} requires '{feature}', which is disabled in this environment")]
    FeaturePrecondition {
        capability: CapabilityId,
        feature: &'static str,
    },

    /// The chosen variant could not be constructed.
    #[error("Failed to construct {variant} for {capability}")]
    ConstructionFailure {
        capability: CapabilityId,
        variant: &'static str,
        #[source]
        source: ConstructionError,
    },
}

impl ResolveError {
    /// Returns true when the caller may retry once readiness is signalled.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ResolveError::NotReady { .. })
    }
}

fn format_chain(chain: &[CapabilityId]) -> String {
    chain
        .iter()
        .map(|c| c.as_str())
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Result alias for resolution operations.
pub type ResolveResult<T> = Result<T, ResolveError>;
