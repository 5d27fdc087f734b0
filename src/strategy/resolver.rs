//! Strategy resolver: wraps the catalog with a one-way readiness state.
//!
//! The catalog is built in the background. Until it is installed the
//! resolver reports [`ReadinessState::Loading`] and every resolution fails
//! fast with [`ResolveError::NotReady`]. Callers either retry after
//! [`StrategyResolver::on_ready`] fires or await
//! [`StrategyResolver::wait_ready`].

use crate::error::{ResolveError, ResolveResult};
use crate::info::EnvironmentInfo;
use crate::strategy::catalog::{CandidateSource, CapabilityId, StrategyCatalog, StrategyEntry};
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

type ReadyCallback = Box<dyn FnOnce() + Send + 'static>;

/// Readiness of the strategy catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadinessState {
    /// The catalog is still being built.
    Loading,
    /// The catalog is installed and queryable.
    Ready,
}

impl std::fmt::Display for ReadinessState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReadinessState::Loading => write!(f, "Loading"),
            ReadinessState::Ready => write!(f, "Ready"),
        }
    }
}

/// Selects the concrete variant for a capability.
pub struct StrategyResolver {
    catalog: OnceCell<StrategyCatalog>,
    ready_tx: watch::Sender<bool>,
    /// Pending callbacks; `None` once they have been fired.
    callbacks: Mutex<Option<Vec<ReadyCallback>>>,
}

impl Default for StrategyResolver {
    fn default() -> Self {
        Self::pending()
    }
}

impl StrategyResolver {
    /// Creates a resolver in the `Loading` state.
    pub fn pending() -> Self {
        let (ready_tx, _) = watch::channel(false);
        Self {
            catalog: OnceCell::new(),
            ready_tx,
            callbacks: Mutex::new(Some(Vec::new())),
        }
    }

    /// Creates a resolver that is ready immediately.
    pub fn from_catalog(catalog: StrategyCatalog) -> Self {
        let resolver = Self::pending();
        resolver.complete(catalog);
        resolver
    }

    /// Starts building the catalog from `sources` on the tokio runtime and
    /// returns the still-loading resolver.
    pub fn spawn_load(sources: Vec<Arc<dyn CandidateSource>>) -> Arc<Self> {
        let resolver = Arc::new(Self::pending());
        let loader = Arc::clone(&resolver);

        tokio::spawn(async move {
            let catalog = StrategyCatalog::load(&sources).await;
            loader.complete(catalog);
        });

        resolver
    }

    /// Installs the catalog and moves to `Ready`. Only the first call has
    /// any effect.
    pub fn complete(&self, catalog: StrategyCatalog) {
        let entries = catalog.len();
        if self.catalog.set(catalog).is_err() {
            warn!("Strategy catalog already installed; ignoring second catalog");
            return;
        }

        let callbacks = self.callbacks.lock().take().unwrap_or_default();
        self.ready_tx.send_replace(true);
        info!(entries, "Strategy catalog ready");

        for callback in callbacks {
            callback();
        }
    }

    pub fn state(&self) -> ReadinessState {
        if self.catalog.get().is_some() {
            ReadinessState::Ready
        } else {
            ReadinessState::Loading
        }
    }

    pub fn is_ready(&self) -> bool {
        self.state() == ReadinessState::Ready
    }

    /// Registers a callback for the `Loading -> Ready` transition.
    ///
    /// Fires exactly once. Subscribing after the transition runs the
    /// callback immediately on the calling thread.
    pub fn on_ready<F>(&self, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut pending = self.callbacks.lock();
        match pending.as_mut() {
            Some(callbacks) => callbacks.push(Box::new(callback)),
            None => {
                drop(pending);
                callback();
            }
        }
    }

    /// Completes once the catalog is ready.
    pub async fn wait_ready(&self) {
        let mut rx = self.ready_tx.subscribe();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = rx.wait_for(|ready| *ready).await;
    }

    /// The installed catalog, or `NotReady` while loading.
    pub fn catalog(&self) -> ResolveResult<&StrategyCatalog> {
        self.catalog.get().ok_or(ResolveError::NotReady {
            component: "strategy catalog",
        })
    }

    /// Whether any variant is registered for `capability`. False while loading.
    pub fn is_resolvable(&self, capability: CapabilityId) -> bool {
        self.catalog
            .get()
            .map(|catalog| catalog.is_resolvable(capability))
            .unwrap_or(false)
    }

    /// Selects the variant for `capability` under `env`.
    pub fn resolve(
        &self,
        capability: CapabilityId,
        env: &EnvironmentInfo,
    ) -> ResolveResult<StrategyEntry> {
        let entry = self.catalog()?.select(capability, env)?;
        debug!(
            %capability,
            variant = entry.variant(),
            min_version = %entry.min_version,
            platform_version = %env.platform_version,
            "Resolved strategy"
        );
        Ok(entry.clone())
    }
}

impl std::fmt::Debug for StrategyResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StrategyResolver")
            .field("state", &self.state())
            .field("entries", &self.catalog.get().map(StrategyCatalog::len))
            .finish()
    }
}
