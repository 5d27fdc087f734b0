//! # KI Page Controls
//!
//! Control resolution engine for a page-object layer that automates a
//! browser-rendered business application.
//!
//! Callers ask for a *capability* ("the control that edits a field") without
//! knowing which DOM structure renders it. The engine answers in two stages:
//!
//! 1. **Redirection**: the capability is narrowed to the variant family that
//!    applies under the session's configuration ([`info::RedirectionInfo`]).
//! 2. **Strategy resolution**: among competing implementations of that
//!    family, the one with the highest minimum version not exceeding the
//!    detected platform version wins ([`info::EnvironmentInfo`]).
//!
//! The [`factory::ControlFactory`] then resolves the variant's declared
//! constructor parameters, builds the control and optionally caches it by
//! identity.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ki_page_controls::prelude::*;
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
//!         .with_environment(Arc::new(SessionSnapshot::with_value("environment info", EnvironmentInfo::new(version))))
//!         .with_redirection(Arc::new(SessionSnapshot::with_value("redirection info", RedirectionInfo::new(version))))
//!         .with_services(Arc::new(ServiceCollection::new().with(dom)));
//!
//!     let field = factory
//!         .create_cached_instance_when_ready(capabilities::FIELD, Some("revenue"), None)
//!         .await?;
//!     field.set_value("1000").await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Module Overview
//!
//! - [`info`]: Session snapshots and the version type
//! - [`strategy`]: Strategy catalog and readiness-aware resolver
//! - [`redirect`]: Capability redirection
//! - [`factory`]: Control construction and caching
//! - [`controls`]: The control trait and built-in variants
//! - [`browser`]: DOM access and page lifecycle
//! - [`config`]: Configuration loading and management
//! - [`error`]: Resolution error taxonomy
//!
//! ## Architecture
//!
//! ```text
//!  EnvironmentInfo   RedirectionInfo
//!        │                 │
//!        │           ┌─────┴──────┐
//!        │           │ Redirector │  capability → variant family
//!        │           └─────┬──────┘
//!  ┌─────┴─────────────────┴─────┐
//!  │      StrategyResolver       │  family → concrete variant
//!  └──────────────┬──────────────┘
//!          ┌──────┴───────┐
//!          │ControlFactory│  parameters, construction, cache
//!          └──────┬───────┘
//!                 │
//!              caller
//! ```

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Full version string with name
pub const FULL_VERSION: &str = concat!(env!("CARGO_PKG_NAME"), " v", env!("CARGO_PKG_VERSION"));

// ============================================================================
// Module Exports
// ============================================================================

/// DOM access and owning page lifecycle.
pub mod browser;

/// Configuration management for loading settings from files, env, and CLI.
pub mod config;

/// Control trait, capability ids and built-in variants.
pub mod controls;

/// Resolution error taxonomy.
pub mod error;

/// Control construction, identity and caching.
pub mod factory;

/// Session snapshots consumed by resolution.
pub mod info;

/// Capability redirection.
pub mod redirect;

/// Strategy catalog and resolver.
pub mod strategy;

// ============================================================================
// Re-exports for Convenience
// ============================================================================

pub use browser::{DomAccessor, DomElement, JsValue, MockDomAccessor, PageContext, PageStatus};
pub use config::{load_snapshot, CliArgs, ConfigError, ResolverSettings};
pub use controls::{capabilities, BuiltinSource, Control, DomControl};
pub use error::{ConstructionError, ResolveError, ResolveResult};
pub use factory::{
    ConstructorArgs, ControlFactory, ControlHandle, ControlIdentity, ParamSpec,
    ResolutionPlan, ServiceCollection, ServiceProvider,
};
pub use info::{
    EnvironmentInfo, RedirectionInfo, ReleaseChannel, SessionSnapshot, SnapshotError, Version,
};
pub use redirect::{ControlMetadata, RedirectionChain, Redirector, RedirectorRegistry};
pub use strategy::{
    CandidateSource, CapabilityId, ReadinessState, StaticSource, StrategyCatalog, StrategyEntry,
    StrategyResolver, VariantRegistration,
};

// ============================================================================
// Prelude Module
// ============================================================================

/// Prelude module for convenient imports.
///
/// ```rust
/// use ki_page_controls::prelude::*;
/// ```
pub mod prelude {
    pub use crate::browser::{DomAccessor, MockDomAccessor, PageContext};
    pub use crate::controls::{capabilities, BuiltinSource, Control};
    pub use crate::error::{ResolveError, ResolveResult};
    pub use crate::factory::{ControlFactory, ControlHandle, ParamSpec, ServiceCollection};
    pub use crate::info::{EnvironmentInfo, RedirectionInfo, SessionSnapshot, Version};
    pub use crate::redirect::RedirectorRegistry;
    pub use crate::strategy::{CandidateSource, CapabilityId, StrategyResolver, VariantRegistration};
    pub use crate::{FULL_VERSION, NAME, VERSION};
}
