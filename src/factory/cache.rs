//! Session-scoped instance table with at-most-one construction per identity.

use crate::error::ResolveResult;
use crate::factory::identity::{ControlHandle, ControlIdentity};
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Append-only map from identity to control.
///
/// The map lock is held only long enough to find or create an identity's
/// slot. Construction runs inside the slot's `OnceCell`, so racers for the
/// same identity wait for the winner and receive its instance, while other
/// identities are not blocked. A failed construction drops its slot unless
/// another caller is still waiting on it.
#[derive(Default)]
pub(crate) struct InstanceCache {
    slots: Mutex<HashMap<ControlIdentity, Arc<OnceCell<ControlHandle>>>>,
}

impl InstanceCache {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn slot(&self, identity: &ControlIdentity) -> Arc<OnceCell<ControlHandle>> {
        let mut slots = self.slots.lock();
        Arc::clone(slots.entry(identity.clone()).or_default())
    }

    /// Returns the cached control, building it with `build` if absent.
    pub(crate) fn get_or_try_insert<F>(
        &self,
        identity: &ControlIdentity,
        build: F,
    ) -> ResolveResult<ControlHandle>
    where
        F: FnOnce() -> ResolveResult<ControlHandle>,
    {
        let slot = self.slot(identity);
        let result = slot.get_or_try_init(build).cloned();
        if result.is_err() {
            self.release_empty(identity, &slot);
        }
        result
    }

    /// Removes an empty slot held by nobody but the map and the caller.
    /// Clones are only taken under the map lock, so the count is stable here.
    fn release_empty(&self, identity: &ControlIdentity, slot: &Arc<OnceCell<ControlHandle>>) {
        let mut slots = self.slots.lock();
        let unused = slots.get(identity).is_some_and(|current| {
            Arc::ptr_eq(current, slot) && current.get().is_none() && Arc::strong_count(slot) == 2
        });
        if unused {
            slots.remove(identity);
        }
    }

    pub(crate) fn get(&self, identity: &ControlIdentity) -> Option<ControlHandle> {
        self.slots
            .lock()
            .get(identity)
            .and_then(|slot| slot.get().cloned())
    }

    /// Number of constructed entries.
    pub(crate) fn len(&self) -> usize {
        self.slots
            .lock()
            .values()
            .filter(|slot| slot.get().is_some())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controls::testing::NullControl;
    use crate::error::ResolveError;
    use crate::strategy::CapabilityId;

    const X: CapabilityId = CapabilityId::new("X");

    fn handle(identity: &ControlIdentity) -> ControlHandle {
        ControlHandle::new(
            identity.clone(),
            X,
            "Null",
            Arc::new(NullControl::new("Null")),
        )
    }

    #[test]
    fn test_builds_once() {
        let cache = InstanceCache::new();
        let identity = ControlIdentity::new(X, Some("a"), None);

        let first = cache
            .get_or_try_insert(&identity, || Ok(handle(&identity)))
            .unwrap();
        let second = cache
            .get_or_try_insert(&identity, || panic!("must not rebuild"))
            .unwrap();

        assert!(first.ptr_eq(&second));
        assert_eq!(cache.len(), 1);
        assert!(cache.get(&identity).is_some());
    }

    #[test]
    fn test_failed_build_is_not_cached() {
        let cache = InstanceCache::new();
        let identity = ControlIdentity::new(X, Some("a"), None);

        let err = cache
            .get_or_try_insert(&identity, || {
                Err(ResolveError::NotReady {
                    component: "strategy catalog",
                })
            })
            .unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(cache.len(), 0);
        assert!(cache.get(&identity).is_none());
        assert!(cache.slots.lock().is_empty());

        let built = cache.get_or_try_insert(&identity, || Ok(handle(&identity)));
        assert!(built.is_ok());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_failed_identities_do_not_accumulate() {
        let cache = InstanceCache::new();

        for name in ["a", "b", "c"] {
            let identity = ControlIdentity::new(X, Some(name), None);
            let result = cache.get_or_try_insert(&identity, || {
                Err(ResolveError::NotReady {
                    component: "environment info",
                })
            });
            assert!(result.is_err());
        }
        assert!(cache.slots.lock().is_empty());

        let identity = ControlIdentity::new(X, Some("a"), None);
        cache
            .get_or_try_insert(&identity, || Ok(handle(&identity)))
            .unwrap();
        assert_eq!(cache.slots.lock().len(), 1);
    }
}
