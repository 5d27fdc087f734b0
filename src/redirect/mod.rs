//! Redirection: mapping a requested capability to the narrower capability
//! that applies under the current configuration.
//!
//! Redirectors are pure functions of a [`RedirectionInfo`] and the control's
//! metadata. The [`RedirectorRegistry`] applies them repeatedly until it
//! reaches a capability nobody redirects.
//!
//! # Example
//!
//! ```rust
//! use ki_page_controls::controls::capabilities::{FIELD, FIELD_SECTION_ITEM_UNIFIED};
//! use ki_page_controls::info::{AppSettings, ChannelSetting, RedirectionInfo, Version};
//! use ki_page_controls::redirect::{ControlMetadata, RedirectorRegistry};
//!
//! let info = RedirectionInfo::new(Version::new(9, 2, 24000, 0)).with_app(AppSettings {
//!     new_look_always_on: true,
//!     app_channel: ChannelSetting::Monthly,
//!     ..Default::default()
//! });
//!
//! let registry = RedirectorRegistry::builtin();
//! let chain = registry
//!     .resolve_target(FIELD, Some(&info), &ControlMetadata::named("name"))
//!     .unwrap();
//! assert_eq!(chain.target(), FIELD_SECTION_ITEM_UNIFIED);
//! ```

pub mod builtin;

use crate::error::{ResolveError, ResolveResult};
use crate::info::RedirectionInfo;
use crate::strategy::CapabilityId;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

pub use builtin::{FieldRedirector, FieldSectionItemRedirector, NavigationRedirector, SearchRedirector};

/// What a redirector may know about the control being requested.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControlMetadata {
    /// Logical name, e.g. a field's schema name.
    pub name: Option<String>,

    /// Logical location, i.e. the name of the parent control.
    pub location: Option<String>,
}

impl ControlMetadata {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }
}

/// Decides which narrower capability to request instead of [`source`](Self::source).
///
/// Implementations must be pure: the same inputs always give the same
/// answer, and nothing is cached or mutated.
pub trait Redirector: Send + Sync {
    /// Name reported when redirectors conflict.
    fn name(&self) -> &str;

    /// The capability this redirector has authority over.
    fn source(&self) -> CapabilityId;

    /// The capability to request instead.
    ///
    /// Fails with [`ResolveError::FeaturePrecondition`] when the decision
    /// needs a feature the environment has disabled.
    fn target(
        &self,
        info: &RedirectionInfo,
        control: &ControlMetadata,
    ) -> ResolveResult<CapabilityId>;
}

/// Capabilities visited while redirecting, requested first, final last.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectionChain {
    hops: Vec<CapabilityId>,
}

impl RedirectionChain {
    /// The capability originally requested.
    pub fn requested(&self) -> CapabilityId {
        self.hops[0]
    }

    /// The fixed point: the capability to resolve a strategy for.
    pub fn target(&self) -> CapabilityId {
        self.hops[self.hops.len() - 1]
    }

    pub fn hops(&self) -> &[CapabilityId] {
        &self.hops
    }

    /// True when no redirector applied.
    pub fn is_direct(&self) -> bool {
        self.hops.len() == 1
    }
}

impl std::fmt::Display for RedirectionChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (index, hop) in self.hops.iter().enumerate() {
            if index > 0 {
                write!(f, " -> ")?;
            }
            write!(f, "{}", hop)?;
        }
        Ok(())
    }
}

/// The set of known redirectors.
#[derive(Default, Clone)]
pub struct RedirectorRegistry {
    redirectors: Vec<Arc<dyn Redirector>>,
}

impl RedirectorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in field, search and navigation redirectors.
    pub fn builtin() -> Self {
        Self::new()
            .with(FieldRedirector)
            .with(FieldSectionItemRedirector)
            .with(SearchRedirector)
            .with(NavigationRedirector)
    }

    /// Adds a redirector. Conflicts are reported at resolution time.
    pub fn register(&mut self, redirector: Arc<dyn Redirector>) {
        self.redirectors.push(redirector);
    }

    pub fn with<R: Redirector + 'static>(mut self, redirector: R) -> Self {
        self.register(Arc::new(redirector));
        self
    }

    pub fn len(&self) -> usize {
        self.redirectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.redirectors.is_empty()
    }

    /// The redirector for `capability`, if exactly one claims it.
    pub fn redirector_for(
        &self,
        capability: CapabilityId,
    ) -> ResolveResult<Option<&Arc<dyn Redirector>>> {
        let mut claimants = self
            .redirectors
            .iter()
            .filter(|redirector| redirector.source() == capability);

        let first = claimants.next();
        let rest: Vec<_> = claimants.collect();
        if rest.is_empty() {
            return Ok(first);
        }

        Err(ResolveError::AmbiguousRedirection {
            capability,
            claimants: first
                .into_iter()
                .chain(rest)
                .map(|redirector| redirector.name().to_string())
                .collect(),
        })
    }

    pub fn is_redirectable(&self, capability: CapabilityId) -> bool {
        self.redirectors
            .iter()
            .any(|redirector| redirector.source() == capability)
    }

    /// Applies redirection until a capability without a redirector is reached.
    ///
    /// `info` may be `None` while the redirection snapshot is unknown; that
    /// only fails (with `NotReady`) if a redirector actually has to run.
    pub fn resolve_target(
        &self,
        requested: CapabilityId,
        info: Option<&RedirectionInfo>,
        control: &ControlMetadata,
    ) -> ResolveResult<RedirectionChain> {
        let mut hops = vec![requested];
        let mut visited = HashSet::from([requested]);
        let mut current = requested;

        while let Some(redirector) = self.redirector_for(current)? {
            let info = info.ok_or(ResolveError::NotReady {
                component: "redirection info",
            })?;
            let next = redirector.target(info, control)?;
            debug!(
                from = %current,
                to = %next,
                redirector = redirector.name(),
                "Redirected capability"
            );

            hops.push(next);
            if !visited.insert(next) {
                return Err(ResolveError::RedirectionCycle { chain: hops });
            }
            current = next;
        }

        Ok(RedirectionChain { hops })
    }
}

impl std::fmt::Debug for RedirectorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.redirectors.iter().map(|r| r.name().to_string()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::info::Version;

    const A: CapabilityId = CapabilityId::new("A");
    const B: CapabilityId = CapabilityId::new("B");
    const C: CapabilityId = CapabilityId::new("C");

    struct Fixed {
        name: &'static str,
        from: CapabilityId,
        to: CapabilityId,
    }

    impl Redirector for Fixed {
        fn name(&self) -> &str {
            self.name
        }

        fn source(&self) -> CapabilityId {
            self.from
        }

        fn target(&self, _: &RedirectionInfo, _: &ControlMetadata) -> ResolveResult<CapabilityId> {
            Ok(self.to)
        }
    }

    fn fixed(name: &'static str, from: CapabilityId, to: CapabilityId) -> Fixed {
        Fixed { name, from, to }
    }

    fn info() -> RedirectionInfo {
        RedirectionInfo::new(Version::new(9, 2, 0, 0))
    }

    #[test]
    fn test_no_redirector_is_fixed_point() {
        let registry = RedirectorRegistry::new();
        let chain = registry
            .resolve_target(A, None, &ControlMetadata::default())
            .unwrap();
        assert!(chain.is_direct());
        assert_eq!(chain.target(), A);
    }

    #[test]
    fn test_multi_hop() {
        let registry = RedirectorRegistry::new()
            .with(fixed("a-to-b", A, B))
            .with(fixed("b-to-c", B, C));

        let chain = registry
            .resolve_target(A, Some(&info()), &ControlMetadata::default())
            .unwrap();
        assert_eq!(chain.hops(), &[A, B, C]);
        assert_eq!(chain.requested(), A);
        assert_eq!(chain.target(), C);
        assert_eq!(chain.to_string(), "A -> B -> C");
    }

    #[test]
    fn test_ambiguous_redirection() {
        let registry = RedirectorRegistry::new()
            .with(fixed("first", A, B))
            .with(fixed("second", A, C));

        let err = registry
            .resolve_target(A, Some(&info()), &ControlMetadata::default())
            .unwrap_err();
        match err {
            ResolveError::AmbiguousRedirection {
                capability,
                claimants,
            } => {
                assert_eq!(capability, A);
                assert_eq!(claimants, vec!["first", "second"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_cycle_detected() {
        let registry = RedirectorRegistry::new()
            .with(fixed("a-to-b", A, B))
            .with(fixed("b-to-a", B, A));

        let err = registry
            .resolve_target(A, Some(&info()), &ControlMetadata::default())
            .unwrap_err();
        assert!(matches!(err, ResolveError::RedirectionCycle { ref chain } if chain == &[A, B, A]));
    }

    #[test]
    fn test_unknown_info_only_matters_when_redirecting() {
        let registry = RedirectorRegistry::new().with(fixed("a-to-b", A, B));

        let err = registry
            .resolve_target(A, None, &ControlMetadata::default())
            .unwrap_err();
        assert!(err.is_retryable());

        let direct = registry
            .resolve_target(C, None, &ControlMetadata::default())
            .unwrap();
        assert_eq!(direct.target(), C);
    }

    const D: CapabilityId = CapabilityId::new("D");

    /// Routes on the control's location.
    struct ByLocation {
        from: CapabilityId,
    }

    impl Redirector for ByLocation {
        fn name(&self) -> &str {
            "by-location"
        }

        fn source(&self) -> CapabilityId {
            self.from
        }

        fn target(
            &self,
            _: &RedirectionInfo,
            control: &ControlMetadata,
        ) -> ResolveResult<CapabilityId> {
            match control.location.as_deref() {
                Some("header") => Ok(C),
                _ => Ok(D),
            }
        }
    }

    #[test]
    fn test_every_hop_sees_caller_metadata() {
        let registry = RedirectorRegistry::new()
            .with(fixed("a-to-b", A, B))
            .with(ByLocation { from: B });
        let metadata = ControlMetadata::named("title").with_location("header");

        let chain = registry.resolve_target(A, Some(&info()), &metadata).unwrap();
        assert_eq!(chain.hops(), &[A, B, C]);

        let body = registry
            .resolve_target(A, Some(&info()), &ControlMetadata::named("title"))
            .unwrap();
        assert_eq!(body.hops(), &[A, B, D]);
    }
}
