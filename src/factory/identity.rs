//! Control identity and the handle the factory hands back.

use crate::controls::Control;
use crate::strategy::CapabilityId;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// Cache key for instantiated controls: the capability the caller asked
/// for, the logical name, and the parent's identity.
///
/// Two requests with equal identities share one instance within a factory.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ControlIdentity {
    pub capability: CapabilityId,
    pub name: Option<String>,
    pub parent: Option<Arc<ControlIdentity>>,
}

impl ControlIdentity {
    pub fn new(
        capability: CapabilityId,
        name: Option<&str>,
        parent: Option<Arc<ControlIdentity>>,
    ) -> Self {
        Self {
            capability,
            name: name.map(str::to_string),
            parent,
        }
    }
}

impl fmt::Display for ControlIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(parent) = &self.parent {
            write!(f, "{}/", parent)?;
        }
        write!(f, "{}", self.capability)?;
        if let Some(name) = &self.name {
            write!(f, "[{}]", name)?;
        }
        Ok(())
    }
}

/// A constructed control together with how it was resolved.
///
/// Cloning is cheap and shares the underlying control.
#[derive(Clone)]
pub struct ControlHandle {
    identity: Arc<ControlIdentity>,
    resolved: CapabilityId,
    variant: &'static str,
    control: Arc<dyn Control>,
}

impl ControlHandle {
    pub(crate) fn new(
        identity: ControlIdentity,
        resolved: CapabilityId,
        variant: &'static str,
        control: Arc<dyn Control>,
    ) -> Self {
        Self {
            identity: Arc::new(identity),
            resolved,
            variant,
            control,
        }
    }

    pub fn identity(&self) -> &Arc<ControlIdentity> {
        &self.identity
    }

    /// The capability the request was redirected to.
    pub fn resolved_capability(&self) -> CapabilityId {
        self.resolved
    }

    /// Name of the variant that was constructed.
    pub fn variant(&self) -> &'static str {
        self.variant
    }

    pub fn control(&self) -> &Arc<dyn Control> {
        &self.control
    }

    /// Downcasts to the concrete variant type.
    pub fn downcast_ref<T: Control>(&self) -> Option<&T> {
        self.control.as_any().downcast_ref::<T>()
    }

    /// True when both handles share the same control instance.
    pub fn ptr_eq(&self, other: &ControlHandle) -> bool {
        Arc::ptr_eq(&self.control, &other.control)
    }
}

impl Deref for ControlHandle {
    type Target = dyn Control;

    fn deref(&self) -> &Self::Target {
        self.control.as_ref()
    }
}

impl fmt::Debug for ControlHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControlHandle")
            .field("identity", &self.identity.to_string())
            .field("resolved", &self.resolved)
            .field("variant", &self.variant)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    const FORM: CapabilityId = CapabilityId::new("Form");
    const FIELD: CapabilityId = CapabilityId::new("Field");

    #[test]
    fn test_identity_value_equality() {
        let parent = Arc::new(ControlIdentity::new(FORM, Some("account"), None));
        let a = ControlIdentity::new(FIELD, Some("name"), Some(Arc::clone(&parent)));
        let b = ControlIdentity::new(
            FIELD,
            Some("name"),
            Some(Arc::new(ControlIdentity::new(FORM, Some("account"), None))),
        );
        let c = ControlIdentity::new(FIELD, Some("name"), None);

        assert_eq!(a, b);
        assert_ne!(a, c);

        let set: HashSet<_> = [a, b, c].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_identity_display() {
        let parent = Arc::new(ControlIdentity::new(FORM, Some("account"), None));
        let id = ControlIdentity::new(FIELD, Some("name"), Some(parent));
        assert_eq!(id.to_string(), "Form[account]/Field[name]");
        assert_eq!(ControlIdentity::new(FIELD, None, None).to_string(), "Field");
    }
}
