//! Environment snapshot and the write-once holder shared by all session snapshots.

use crate::info::version::Version;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, warn};

/// Facts about the running environment, produced once by an external probe.
///
/// `control_versions` maps a control implementation key (for example
/// `"PowerAppsGrid"`) to the version the environment ships for it. Strategies
/// registered as versioned by such a key are selected against that version
/// instead of the platform version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentInfo {
    /// Platform version reported by the environment.
    pub platform_version: Version,

    /// Per-control implementation versions.
    #[serde(default)]
    pub control_versions: HashMap<String, Version>,
}

impl EnvironmentInfo {
    /// Creates an environment snapshot with no per-control versions.
    pub fn new(platform_version: Version) -> Self {
        Self {
            platform_version,
            control_versions: HashMap::new(),
        }
    }

    /// Records the version shipped for a specific control implementation.
    pub fn with_control_version(mut self, control: impl Into<String>, version: Version) -> Self {
        self.control_versions.insert(control.into(), version);
        self
    }

    /// Returns the recorded version of a control implementation, if any.
    pub fn control_version(&self, control: &str) -> Option<Version> {
        self.control_versions.get(control).copied()
    }
}

/// Errors raised by [`SessionSnapshot`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnapshotError {
    /// The snapshot was already set for this session.
    #[error("{0} snapshot is already initialized for this session")]
    AlreadyInitialized(&'static str),
}

/// Write-once, read-many holder for a per-session snapshot.
///
/// Before [`set`](Self::set) is called the snapshot is unknown and
/// [`get`](Self::get) returns `None`. Once set it is never replaced.
#[derive(Debug)]
pub struct SessionSnapshot<T> {
    label: &'static str,
    cell: OnceCell<T>,
}

impl<T> SessionSnapshot<T> {
    /// Creates an empty snapshot holder. `label` is used in log lines and errors.
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            cell: OnceCell::new(),
        }
    }

    /// Creates a holder that is already initialized.
    pub fn with_value(label: &'static str, value: T) -> Self {
        Self {
            label,
            cell: OnceCell::with_value(value),
        }
    }

    /// Stores the snapshot. Fails if a value is already present.
    pub fn set(&self, value: T) -> Result<(), SnapshotError> {
        match self.cell.set(value) {
            Ok(()) => {
                debug!(snapshot = self.label, "Session snapshot initialized");
                Ok(())
            }
            Err(_) => {
                warn!(snapshot = self.label, "Rejected attempt to replace session snapshot");
                Err(SnapshotError::AlreadyInitialized(self.label))
            }
        }
    }

    /// Returns the snapshot, or `None` while it is still unknown.
    pub fn get(&self) -> Option<&T> {
        self.cell.get()
    }

    /// Returns true once the snapshot has been set.
    pub fn is_known(&self) -> bool {
        self.cell.get().is_some()
    }

    /// Label given at construction.
    pub fn label(&self) -> &'static str {
        self.label
    }
}

impl SessionSnapshot<EnvironmentInfo> {
    /// Platform version, or `None` while the environment is unknown.
    pub fn platform_version(&self) -> Option<Version> {
        self.get().map(|env| env.platform_version)
    }

    /// Recorded control version, or `None` when unknown or not recorded.
    pub fn control_version(&self, control: &str) -> Option<Version> {
        self.get().and_then(|env| env.control_version(control))
    }
}
