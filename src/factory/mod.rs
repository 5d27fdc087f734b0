//! Control factory: the orchestrator of redirection, strategy resolution,
//! construction and caching.
//!
//! # Example
//!
//! ```rust,no_run
//! use ki_page_controls::browser::{DomAccessor, MockDomAccessor};
//! use ki_page_controls::controls::{builtin::BuiltinSource, capabilities::FIELD};
//! use ki_page_controls::factory::{ControlFactory, ServiceCollection};
//! use ki_page_controls::info::{EnvironmentInfo, RedirectionInfo, SessionSnapshot, Version};
//! use ki_page_controls::redirect::RedirectorRegistry;
//! use ki_page_controls::strategy::{CandidateSource, StrategyResolver};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let resolver = StrategyResolver::spawn_load(vec![Arc::new(BuiltinSource) as Arc<dyn CandidateSource>]);
//!     let version = Version::new(9, 2, 24000, 0);
//!     let dom: Arc<dyn DomAccessor> = Arc::new(MockDomAccessor::new());
//!
//!     let factory = ControlFactory::new(resolver)
//!         .with_redirectors(RedirectorRegistry::builtin())
//!         .with_environment(Arc::new(SessionSnapshot::with_value("environment", EnvironmentInfo::new(version))))
//!         .with_redirection(Arc::new(SessionSnapshot::with_value("redirection", RedirectionInfo::new(version))))
//!         .with_services(Arc::new(ServiceCollection::new().with(dom)));
//!
//!     let field = factory.create_cached_instance_when_ready(FIELD, Some("name"), None).await?;
//!     println!("{} resolved to {}", field.identity(), field.variant());
//!     Ok(())
//! }
//! ```

mod cache;
pub mod identity;
pub mod services;

pub use identity::{ControlHandle, ControlIdentity};
pub use services::{ConstructorArgs, ParamSpec, ServiceCollection, ServiceProvider};

use crate::browser::PageContext;
use crate::error::{ConstructionError, ResolveError, ResolveResult};
use crate::info::{EnvironmentInfo, RedirectionInfo, SessionSnapshot};
use crate::redirect::{ControlMetadata, RedirectionChain, RedirectorRegistry};
use crate::strategy::{CapabilityId, StrategyEntry, StrategyResolver};
use cache::InstanceCache;
use std::sync::Arc;
use tracing::debug;

/// Outcome of redirection and strategy resolution, before construction.
#[derive(Debug, Clone)]
pub struct ResolutionPlan {
    pub chain: RedirectionChain,
    pub entry: StrategyEntry,
}

/// Builds controls for capabilities.
///
/// One factory corresponds to one session (and optionally one owning page).
/// Its cache lives exactly as long as the factory.
pub struct ControlFactory {
    resolver: Arc<StrategyResolver>,
    redirectors: Arc<RedirectorRegistry>,
    environment: Arc<SessionSnapshot<EnvironmentInfo>>,
    redirection: Arc<SessionSnapshot<RedirectionInfo>>,
    services: Arc<dyn ServiceProvider>,
    page: Option<Arc<PageContext>>,
    cache: InstanceCache,
}

impl ControlFactory {
    /// Creates a factory with no redirectors, unknown snapshots and no services.
    pub fn new(resolver: Arc<StrategyResolver>) -> Self {
        Self {
            resolver,
            redirectors: Arc::new(RedirectorRegistry::new()),
            environment: Arc::new(SessionSnapshot::new("environment info")),
            redirection: Arc::new(SessionSnapshot::new("redirection info")),
            services: Arc::new(ServiceCollection::new()),
            page: None,
            cache: InstanceCache::new(),
        }
    }

    pub fn with_redirectors(mut self, redirectors: RedirectorRegistry) -> Self {
        self.redirectors = Arc::new(redirectors);
        self
    }

    pub fn with_environment(mut self, environment: Arc<SessionSnapshot<EnvironmentInfo>>) -> Self {
        self.environment = environment;
        self
    }

    pub fn with_redirection(mut self, redirection: Arc<SessionSnapshot<RedirectionInfo>>) -> Self {
        self.redirection = redirection;
        self
    }

    pub fn with_services(mut self, services: Arc<dyn ServiceProvider>) -> Self {
        self.services = services;
        self
    }

    pub fn with_page(mut self, page: Arc<PageContext>) -> Self {
        self.page = Some(page);
        self
    }

    pub fn resolver(&self) -> &Arc<StrategyResolver> {
        &self.resolver
    }

    pub fn page(&self) -> Option<&Arc<PageContext>> {
        self.page.as_ref()
    }

    /// Redirects `capability` to a fixed point and selects its variant.
    pub fn plan(
        &self,
        capability: CapabilityId,
        name: Option<&str>,
        parent: Option<&ControlHandle>,
    ) -> ResolveResult<ResolutionPlan> {
        if !self.resolver.is_ready() {
            return Err(ResolveError::NotReady {
                component: "strategy catalog",
            });
        }
        let env = self.environment.get().ok_or(ResolveError::NotReady {
            component: self.environment.label(),
        })?;

        let metadata = ControlMetadata {
            name: name.map(str::to_string),
            location: parent.and_then(|p| p.identity().name.clone()),
        };
        let chain =
            self.redirectors
                .resolve_target(capability, self.redirection.get(), &metadata)?;
        let entry = self.resolver.resolve(chain.target(), env)?;

        Ok(ResolutionPlan { chain, entry })
    }

    /// Builds a fresh control. Never consults or fills the cache.
    pub fn create_instance(
        &self,
        capability: CapabilityId,
        name: Option<&str>,
        parent: Option<&ControlHandle>,
    ) -> ResolveResult<ControlHandle> {
        let identity = self.identity(capability, name, parent);
        self.build(identity, name, parent)
    }

    /// Returns the control cached for `(capability, name, parent)`, building
    /// it on first request. Concurrent first requests construct it once.
    pub fn create_cached_instance(
        &self,
        capability: CapabilityId,
        name: Option<&str>,
        parent: Option<&ControlHandle>,
    ) -> ResolveResult<ControlHandle> {
        let identity = self.identity(capability, name, parent);
        self.cache.get_or_try_insert(&identity, || {
            self.build(identity.clone(), name, parent)
        })
    }

    /// Waits for the strategy catalog, then behaves like [`create_instance`](Self::create_instance).
    pub async fn create_instance_when_ready(
        &self,
        capability: CapabilityId,
        name: Option<&str>,
        parent: Option<&ControlHandle>,
    ) -> ResolveResult<ControlHandle> {
        self.resolver.wait_ready().await;
        self.create_instance(capability, name, parent)
    }

    /// Waits for the strategy catalog, then behaves like
    /// [`create_cached_instance`](Self::create_cached_instance).
    pub async fn create_cached_instance_when_ready(
        &self,
        capability: CapabilityId,
        name: Option<&str>,
        parent: Option<&ControlHandle>,
    ) -> ResolveResult<ControlHandle> {
        self.resolver.wait_ready().await;
        self.create_cached_instance(capability, name, parent)
    }

    /// The cached control for an identity, if one was built.
    pub fn cached(&self, identity: &ControlIdentity) -> Option<ControlHandle> {
        self.cache.get(identity)
    }

    /// Number of cached controls.
    pub fn cached_count(&self) -> usize {
        self.cache.len()
    }

    fn identity(
        &self,
        capability: CapabilityId,
        name: Option<&str>,
        parent: Option<&ControlHandle>,
    ) -> ControlIdentity {
        ControlIdentity::new(capability, name, parent.map(|p| Arc::clone(p.identity())))
    }

    fn build(
        &self,
        identity: ControlIdentity,
        name: Option<&str>,
        parent: Option<&ControlHandle>,
    ) -> ResolveResult<ControlHandle> {
        let ResolutionPlan { chain, entry } = self.plan(identity.capability, name, parent)?;
        let target = chain.target();
        let implementation = &entry.implementation;

        let failure = |source: ConstructionError| ResolveError::ConstructionFailure {
            capability: target,
            variant: implementation.name(),
            source,
        };

        let args = services::ConstructorArgs::resolve(
            target,
            implementation.params(),
            name,
            parent,
            self.page.as_ref(),
            self.services.as_ref(),
        )
        .map_err(failure)?;
        let control = implementation.construct(args).map_err(failure)?;

        debug!(
            identity = %identity,
            chain = %chain,
            variant = implementation.name(),
            "Constructed control"
        );

        Ok(ControlHandle::new(
            identity,
            target,
            implementation.name(),
            control,
        ))
    }
}

impl std::fmt::Debug for ControlFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlFactory")
            .field("resolver", &self.resolver)
            .field("redirectors", &self.redirectors)
            .field("cached", &self.cache.len())
            .finish_non_exhaustive()
    }
}
