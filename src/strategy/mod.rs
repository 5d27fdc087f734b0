//! Strategy resolution: choosing the concrete variant for a capability.
//!
//! - [`catalog`] - Variant registrations grouped by capability
//! - [`resolver`] - Readiness-aware front end used by the factory

pub mod catalog;
pub mod resolver;

pub use catalog::{
    CandidateSource, CapabilityId, Implementation, StaticSource, StrategyCatalog, StrategyEntry,
    VariantRegistration,
};
pub use resolver::{ReadinessState, StrategyResolver};
