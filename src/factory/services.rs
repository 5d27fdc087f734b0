//! Constructor-parameter resolution.
//!
//! Each variant declares its constructor parameters as a list of
//! [`ParamSpec`]s. Name and parent are positional, the page comes from the
//! factory, and every service parameter is looked up by type in a
//! [`ServiceProvider`]. The factory resolves the whole list into
//! [`ConstructorArgs`] before the constructor runs, so a missing dependency
//! is reported without partially building anything.

use crate::browser::PageContext;
use crate::error::ConstructionError;
use crate::factory::identity::ControlHandle;
use crate::strategy::CapabilityId;
use parking_lot::RwLock;
use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

type ServiceValue = Arc<dyn Any + Send + Sync>;

/// General dependency provider consulted for service parameters.
pub trait ServiceProvider: Send + Sync {
    /// Returns the service registered for `type_id`, if any.
    fn get_service(&self, type_id: TypeId) -> Option<ServiceValue>;
}

/// Type-keyed service registry.
///
/// ```rust
/// use ki_page_controls::browser::{DomAccessor, MockDomAccessor};
/// use ki_page_controls::factory::ServiceCollection;
/// use std::sync::Arc;
///
/// let dom: Arc<dyn DomAccessor> = Arc::new(MockDomAccessor::new());
/// let services = ServiceCollection::new().with(dom);
/// assert!(services.contains::<Arc<dyn DomAccessor>>());
/// ```
#[derive(Default)]
pub struct ServiceCollection {
    services: RwLock<HashMap<TypeId, ServiceValue>>,
}

impl ServiceCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `value` as the service of type `T`, replacing any previous one.
    pub fn insert<T: Any + Send + Sync>(&self, value: T) {
        self.services
            .write()
            .insert(TypeId::of::<T>(), Arc::new(value));
    }

    pub fn with<T: Any + Send + Sync>(self, value: T) -> Self {
        self.insert(value);
        self
    }

    pub fn contains<T: Any + Send + Sync>(&self) -> bool {
        self.services.read().contains_key(&TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.services.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.read().is_empty()
    }
}

impl ServiceProvider for ServiceCollection {
    fn get_service(&self, type_id: TypeId) -> Option<ServiceValue> {
        self.services.read().get(&type_id).cloned()
    }
}

impl std::fmt::Debug for ServiceCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceCollection")
            .field("services", &self.len())
            .finish()
    }
}

/// One declared constructor parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamSpec {
    /// The logical control name, passed positionally.
    Name,
    /// The parent control, passed positionally.
    Parent,
    /// The owning page.
    Page,
    /// A dependency resolved from the service provider.
    Service {
        type_id: TypeId,
        type_name: &'static str,
    },
}

impl ParamSpec {
    /// Service parameter of type `T`.
    pub fn service<T: Any + Send + Sync>() -> Self {
        ParamSpec::Service {
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
        }
    }
}

/// Resolved constructor arguments handed to a variant's constructor.
///
/// Accessors fail with [`ConstructionError::UndeclaredArgument`] when the
/// constructor reaches for a parameter it did not declare.
pub struct ConstructorArgs {
    capability: CapabilityId,
    declared: Vec<ParamSpec>,
    name: Option<String>,
    parent: Option<ControlHandle>,
    page: Option<Arc<PageContext>>,
    services: HashMap<TypeId, ServiceValue>,
}

impl ConstructorArgs {
    /// Resolves `declared` against the request and the service provider.
    pub(crate) fn resolve(
        capability: CapabilityId,
        declared: &[ParamSpec],
        name: Option<&str>,
        parent: Option<&ControlHandle>,
        page: Option<&Arc<PageContext>>,
        provider: &dyn ServiceProvider,
    ) -> Result<Self, ConstructionError> {
        let mut args = Self {
            capability,
            declared: declared.to_vec(),
            name: None,
            parent: None,
            page: None,
            services: HashMap::new(),
        };

        for param in declared {
            match *param {
                ParamSpec::Name => args.name = name.map(str::to_string),
                ParamSpec::Parent => args.parent = parent.cloned(),
                ParamSpec::Page => {
                    let page = page.ok_or(ConstructionError::MissingArgument("page"))?;
                    args.page = Some(Arc::clone(page));
                }
                ParamSpec::Service { type_id, type_name } => {
                    let service = provider
                        .get_service(type_id)
                        .ok_or(ConstructionError::MissingDependency(type_name))?;
                    args.services.insert(type_id, service);
                }
            }
        }

        Ok(args)
    }

    /// Capability the variant is being built for.
    pub fn capability(&self) -> CapabilityId {
        self.capability
    }

    fn declares(&self, param: ParamSpec) -> bool {
        self.declared.contains(&param)
    }

    /// The logical name. Fails if the caller supplied none.
    pub fn name(&self) -> Result<&str, ConstructionError> {
        if !self.declares(ParamSpec::Name) {
            return Err(ConstructionError::UndeclaredArgument("name"));
        }
        self.name
            .as_deref()
            .ok_or(ConstructionError::MissingArgument("name"))
    }

    /// The parent control, if the caller supplied one.
    pub fn parent(&self) -> Result<Option<&ControlHandle>, ConstructionError> {
        if !self.declares(ParamSpec::Parent) {
            return Err(ConstructionError::UndeclaredArgument("parent"));
        }
        Ok(self.parent.as_ref())
    }

    /// The owning page.
    pub fn page(&self) -> Result<Arc<PageContext>, ConstructionError> {
        if !self.declares(ParamSpec::Page) {
            return Err(ConstructionError::UndeclaredArgument("page"));
        }
        self.page
            .clone()
            .ok_or(ConstructionError::MissingArgument("page"))
    }

    /// The service of type `T`.
    pub fn service<T: Any + Send + Sync + Clone>(&self) -> Result<T, ConstructionError> {
        let value = self
            .services
            .get(&TypeId::of::<T>())
            .ok_or(ConstructionError::UndeclaredArgument(type_name::<T>()))?;
        value
            .downcast_ref::<T>()
            .cloned()
            .ok_or(ConstructionError::MissingDependency(type_name::<T>()))
    }
}

impl std::fmt::Debug for ConstructorArgs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConstructorArgs")
            .field("capability", &self.capability)
            .field("declared", &self.declared)
            .field("name", &self.name)
            .field("has_parent", &self.parent.is_some())
            .field("has_page", &self.page.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Timeouts(u64);

    const X: CapabilityId = CapabilityId::new("X");

    #[test]
    fn test_service_collection() {
        let services = ServiceCollection::new().with(Timeouts(500));
        assert!(services.contains::<Timeouts>());
        assert!(!services.contains::<String>());
        assert_eq!(services.len(), 1);
        assert!(services.get_service(TypeId::of::<Timeouts>()).is_some());
    }

    #[test]
    fn test_resolve_declared_params() {
        let services = ServiceCollection::new().with(Timeouts(500));
        let declared = [ParamSpec::Name, ParamSpec::service::<Timeouts>()];

        let args =
            ConstructorArgs::resolve(X, &declared, Some("revenue"), None, None, &services).unwrap();

        assert_eq!(args.capability(), X);
        assert_eq!(args.name().unwrap(), "revenue");
        assert_eq!(args.service::<Timeouts>().unwrap(), Timeouts(500));
        assert!(matches!(
            args.parent(),
            Err(ConstructionError::UndeclaredArgument("parent"))
        ));
    }

    #[test]
    fn test_missing_dependency() {
        let services = ServiceCollection::new();
        let declared = [ParamSpec::service::<Timeouts>()];

        let err = ConstructorArgs::resolve(X, &declared, None, None, None, &services).unwrap_err();
        assert!(matches!(err, ConstructionError::MissingDependency(name) if name.ends_with("Timeouts")));
    }

    #[test]
    fn test_missing_page_and_name() {
        let services = ServiceCollection::new();

        let err =
            ConstructorArgs::resolve(X, &[ParamSpec::Page], None, None, None, &services).unwrap_err();
        assert!(matches!(err, ConstructionError::MissingArgument("page")));

        let args =
            ConstructorArgs::resolve(X, &[ParamSpec::Name], None, None, None, &services).unwrap();
        assert!(matches!(
            args.name(),
            Err(ConstructionError::MissingArgument("name"))
        ));
    }
}
