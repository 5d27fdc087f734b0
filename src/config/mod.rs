//! Configuration for resolution sessions.
//!
//! This module provides:
//! - Loading settings from files (TOML/JSON)
//! - `KI_CONTROLS_*` environment variable overrides
//! - CLI argument overrides
//! - Session snapshot loading
//!
//! # Example
//!
//! ```rust,no_run
//! use ki_page_controls::config::ResolverSettings;
//!
//! let settings = ResolverSettings::from_file("controls.toml")
//!     .unwrap()
//!     .merge_with_env();
//! let environment = settings.load_environment().unwrap();
//! ```

mod settings;

pub use settings::{load_snapshot, CliArgs, ConfigError, ResolverSettings};
