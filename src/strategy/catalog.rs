//! Strategy catalog: the registration table of control variants, grouped by
//! capability and ordered by minimum platform version.

use crate::controls::Control;
use crate::error::{ConstructionError, ResolveError, ResolveResult};
use crate::factory::services::{ConstructorArgs, ParamSpec};
use crate::info::{EnvironmentInfo, Version};
use async_trait::async_trait;
use futures::future::join_all;
use futures::FutureExt;
use serde::{Serialize, Serializer};
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, warn};

/// Identifier of an abstract capability ("a settable field", "global search").
///
/// Capabilities are never instantiated; a registered variant satisfies them.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CapabilityId(&'static str);

impl CapabilityId {
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    pub const fn as_str(&self) -> &'static str {
        self.0
    }
}

impl fmt::Debug for CapabilityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CapabilityId({})", self.0)
    }
}

impl fmt::Display for CapabilityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

impl Serialize for CapabilityId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.0)
    }
}

type ConstructorFn =
    dyn Fn(ConstructorArgs) -> Result<Arc<dyn Control>, ConstructionError> + Send + Sync;

/// A concrete control variant: its name, the parameters its constructor
/// declares, and the constructor itself.
pub struct Implementation {
    name: &'static str,
    params: Vec<ParamSpec>,
    constructor: Arc<ConstructorFn>,
}

impl Implementation {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Declared constructor parameters, in positional order.
    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    /// Runs the constructor with already-resolved arguments.
    pub fn construct(&self, args: ConstructorArgs) -> Result<Arc<dyn Control>, ConstructionError> {
        (self.constructor)(args)
    }
}

impl fmt::Debug for Implementation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Implementation")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// `(capability, minimum version, implementation)`; immutable once loaded.
#[derive(Debug, Clone)]
pub struct StrategyEntry {
    pub capability: CapabilityId,
    pub min_version: Version,
    pub implementation: Arc<Implementation>,
}

impl StrategyEntry {
    pub fn variant(&self) -> &'static str {
        self.implementation.name()
    }
}

/// Declaration that a variant satisfies a capability from a minimum version on.
///
/// # Example
///
/// ```rust,ignore
/// let registration = VariantRegistration::new(FIELD_SECTION_ITEM_UNIFIED, "UnifiedField", Version::new(9, 1, 0, 0), |args| {
///     Ok(Arc::new(MyField::new(args.name()?, args.service::<Arc<dyn DomAccessor>>()?)))
/// })
/// .param(ParamSpec::Name)
/// .param(ParamSpec::service::<Arc<dyn DomAccessor>>());
/// ```
#[derive(Clone)]
pub struct VariantRegistration {
    capability: CapabilityId,
    min_version: Version,
    versioned_by: Option<&'static str>,
    variant: &'static str,
    params: Vec<ParamSpec>,
    constructor: Arc<ConstructorFn>,
}

impl VariantRegistration {
    pub fn new<F>(
        capability: CapabilityId,
        variant: &'static str,
        min_version: Version,
        constructor: F,
    ) -> Self
    where
        F: Fn(ConstructorArgs) -> Result<Arc<dyn Control>, ConstructionError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            capability,
            min_version,
            versioned_by: None,
            variant,
            params: Vec::new(),
            constructor: Arc::new(constructor),
        }
    }

    /// Appends a declared constructor parameter.
    pub fn param(mut self, param: ParamSpec) -> Self {
        self.params.push(param);
        self
    }

    /// Selects this capability against the recorded version of `control`
    /// instead of the platform version, when the environment records one.
    pub fn versioned_by(mut self, control: &'static str) -> Self {
        self.versioned_by = Some(control);
        self
    }

    pub fn capability(&self) -> CapabilityId {
        self.capability
    }

    pub fn min_version(&self) -> Version {
        self.min_version
    }

    pub fn variant(&self) -> &'static str {
        self.variant
    }
}

impl fmt::Debug for VariantRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VariantRegistration")
            .field("capability", &self.capability)
            .field("min_version", &self.min_version)
            .field("versioned_by", &self.versioned_by)
            .field("variant", &self.variant)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// A source of candidate variants, such as an installed bundle or a
/// compiled-in table. The catalog does not care how it was obtained.
#[async_trait]
pub trait CandidateSource: Send + Sync {
    /// Name used in diagnostics.
    fn name(&self) -> &str;

    /// Enumerates the variants this source exports.
    async fn exported_variants(&self) -> anyhow::Result<Vec<VariantRegistration>>;
}

/// In-memory candidate source backed by a fixed registration list.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    name: String,
    variants: Vec<VariantRegistration>,
}

impl StaticSource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            variants: Vec::new(),
        }
    }

    pub fn register(mut self, registration: VariantRegistration) -> Self {
        self.variants.push(registration);
        self
    }
}

#[async_trait]
impl CandidateSource for StaticSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn exported_variants(&self) -> anyhow::Result<Vec<VariantRegistration>> {
        Ok(self.variants.clone())
    }
}

/// Per-capability entry lists, sorted ascending by minimum version.
#[derive(Debug, Default)]
pub struct StrategyCatalog {
    entries: HashMap<CapabilityId, Vec<StrategyEntry>>,
    version_keys: HashMap<CapabilityId, &'static str>,
}

impl StrategyCatalog {
    /// Builds a catalog from registrations.
    ///
    /// Entries with equal minimum versions keep registration order, so the
    /// later registration is the one selected.
    pub fn from_registrations<I>(registrations: I) -> Self
    where
        I: IntoIterator<Item = VariantRegistration>,
    {
        let mut catalog = Self::default();

        for registration in registrations {
            if let Some(control) = registration.versioned_by {
                if let Some(previous) = catalog
                    .version_keys
                    .insert(registration.capability, control)
                {
                    if previous != control {
                        warn!(
                            capability = %registration.capability,
                            previous,
                            current = control,
                            "Conflicting control version keys; using the later one"
                        );
                    }
                }
            }

            catalog
                .entries
                .entry(registration.capability)
                .or_default()
                .push(StrategyEntry {
                    capability: registration.capability,
                    min_version: registration.min_version,
                    implementation: Arc::new(Implementation {
                        name: registration.variant,
                        params: registration.params,
                        constructor: registration.constructor,
                    }),
                });
        }

        for (capability, entries) in catalog.entries.iter_mut() {
            entries.sort_by_key(|entry| entry.min_version);
            debug!(%capability, count = entries.len(), "Catalogued strategies");
        }

        catalog
    }

    /// Enumerates every source concurrently and builds the catalog.
    ///
    /// A source that fails or panics while enumerating is skipped.
    pub async fn load(sources: &[Arc<dyn CandidateSource>]) -> Self {
        let results = join_all(sources.iter().map(|source| async move {
            let result = AssertUnwindSafe(source.exported_variants())
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| {
                    Err(anyhow::anyhow!(
                        "source panicked: {}",
                        panic_message(panic.as_ref())
                    ))
                });
            (source.name().to_string(), result)
        }))
        .await;

        let mut registrations = Vec::new();
        for (name, result) in results {
            match result {
                Ok(variants) => {
                    debug!(source = %name, count = variants.len(), "Scanned candidate source");
                    registrations.extend(variants);
                }
                Err(e) => warn!(source = %name, "Skipping candidate source: {:#}", e),
            }
        }

        Self::from_registrations(registrations)
    }

    /// Entries for a capability, ascending by minimum version.
    pub fn entries(&self, capability: CapabilityId) -> &[StrategyEntry] {
        self.entries
            .get(&capability)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// All catalogued capabilities, sorted by name.
    pub fn capabilities(&self) -> Vec<CapabilityId> {
        let mut capabilities: Vec<_> = self.entries.keys().copied().collect();
        capabilities.sort();
        capabilities
    }

    /// Looks up a catalogued capability by its name.
    pub fn capability_named(&self, name: &str) -> Option<CapabilityId> {
        self.entries.keys().copied().find(|c| c.as_str() == name)
    }

    pub fn is_resolvable(&self, capability: CapabilityId) -> bool {
        self.entries.contains_key(&capability)
    }

    /// Total number of entries across all capabilities.
    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Version the capability is selected against in `env`.
    pub fn effective_version(&self, capability: CapabilityId, env: &EnvironmentInfo) -> Version {
        self.version_keys
            .get(&capability)
            .and_then(|control| env.control_version(control))
            .unwrap_or(env.platform_version)
    }

    /// Picks the entry with the highest minimum version not exceeding the
    /// effective version.
    pub fn select(
        &self,
        capability: CapabilityId,
        env: &EnvironmentInfo,
    ) -> ResolveResult<&StrategyEntry> {
        let version = self.effective_version(capability, env);
        self.entries(capability)
            .iter()
            .rev()
            .find(|entry| entry.min_version <= version)
            .ok_or(ResolveError::UnresolvedCapability {
                capability,
                version,
            })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string payload")
}
