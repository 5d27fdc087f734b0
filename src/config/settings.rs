//! Resolver settings and snapshot file loading.
//!
//! Settings come from several sources with the usual precedence, and the
//! session snapshots they point at are plain TOML or JSON documents.

use crate::info::{EnvironmentInfo, RedirectionInfo};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

const MIN_READY_TIMEOUT_MS: u64 = 100;
const MAX_READY_TIMEOUT_MS: u64 = 300_000;

/// Errors that can occur during configuration loading or validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read a configuration or snapshot file.
    #[error("Failed to read {path}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse TOML.
    #[error("Failed to parse TOML: {0}")]
    TomlParseError(#[from] toml::de::Error),

    /// Failed to serialize TOML.
    #[error("Failed to serialize TOML: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),

    /// Failed to parse or serialize JSON.
    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Invalid configuration value.
    #[error("Invalid configuration: {0}")]
    ValidationError(String),

    /// Unsupported file format.
    #[error("Unsupported configuration file format: {0}")]
    UnsupportedFormat(String),
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

fn read(path: &Path) -> Result<String, ConfigError> {
    fs::read_to_string(path).map_err(|source| ConfigError::IoError {
        path: path.to_path_buf(),
        source,
    })
}

/// Loads a serde document from a TOML or JSON file, chosen by extension.
///
/// ```rust,no_run
/// use ki_page_controls::config::load_snapshot;
/// use ki_page_controls::info::EnvironmentInfo;
///
/// let env: EnvironmentInfo = load_snapshot("environment.toml").unwrap();
/// ```
pub fn load_snapshot<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T, ConfigError> {
    let path = path.as_ref();
    let content = read(path)?;

    match extension_of(path).as_str() {
        "toml" => Ok(toml::from_str(&content)?),
        "json" => Ok(serde_json::from_str(&content)?),
        ext => Err(ConfigError::UnsupportedFormat(ext.to_string())),
    }
}

/// Settings for a resolution session.
///
/// # Configuration Precedence
///
/// Settings are applied in the following order (later sources override earlier):
/// 1. Default values
/// 2. Configuration file (TOML or JSON)
/// 3. `KI_CONTROLS_*` environment variables
/// 4. CLI arguments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolverSettings {
    /// Environment snapshot file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment_path: Option<PathBuf>,

    /// Redirection snapshot file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirection_path: Option<PathBuf>,

    /// Await catalog readiness instead of failing fast.
    #[serde(default = "default_wait_for_ready")]
    pub wait_for_ready: bool,

    /// Upper bound on the readiness wait, in milliseconds.
    #[serde(default = "default_ready_timeout_ms")]
    pub ready_timeout_ms: u64,

    /// URL of the owning page, if controls are bound to one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_url: Option<String>,
}

fn default_wait_for_ready() -> bool {
    true
}

fn default_ready_timeout_ms() -> u64 {
    30_000
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            environment_path: None,
            redirection_path: None,
            wait_for_ready: default_wait_for_ready(),
            ready_timeout_ms: default_ready_timeout_ms(),
            page_url: None,
        }
    }
}

impl ResolverSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads settings from a TOML or JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        load_snapshot(path)
    }

    /// Saves settings, choosing the format by extension.
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = match extension_of(path).as_str() {
            "toml" => toml::to_string_pretty(self)?,
            "json" => serde_json::to_string_pretty(self)?,
            ext => return Err(ConfigError::UnsupportedFormat(ext.to_string())),
        };

        fs::write(path, content).map_err(|source| ConfigError::IoError {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Default settings with environment overrides applied.
    pub fn from_env() -> Self {
        Self::default().merge_with_env()
    }

    /// Applies `KI_CONTROLS_*` environment overrides.
    ///
    /// - `KI_CONTROLS_ENVIRONMENT`
    /// - `KI_CONTROLS_REDIRECTION`
    /// - `KI_CONTROLS_WAIT_FOR_READY`
    /// - `KI_CONTROLS_READY_TIMEOUT_MS`
    /// - `KI_CONTROLS_PAGE_URL`
    pub fn merge_with_env(mut self) -> Self {
        if let Ok(val) = env::var("KI_CONTROLS_ENVIRONMENT") {
            self.environment_path = Some(PathBuf::from(val));
        }

        if let Ok(val) = env::var("KI_CONTROLS_REDIRECTION") {
            self.redirection_path = Some(PathBuf::from(val));
        }

        if let Ok(val) = env::var("KI_CONTROLS_WAIT_FOR_READY") {
            self.wait_for_ready = val.to_lowercase() == "true" || val == "1";
        }

        if let Ok(val) = env::var("KI_CONTROLS_READY_TIMEOUT_MS") {
            if let Ok(timeout) = val.parse() {
                self.ready_timeout_ms = timeout;
            }
        }

        if let Ok(val) = env::var("KI_CONTROLS_PAGE_URL") {
            self.page_url = Some(val);
        }

        self
    }

    /// Applies CLI overrides.
    pub fn merge_with_args(mut self, args: &CliArgs) -> Self {
        if let Some(ref path) = args.environment_path {
            self.environment_path = Some(path.clone());
        }
        if let Some(ref path) = args.redirection_path {
            self.redirection_path = Some(path.clone());
        }
        if let Some(wait) = args.wait_for_ready {
            self.wait_for_ready = wait;
        }
        if let Some(timeout) = args.timeout_ms {
            self.ready_timeout_ms = timeout;
        }
        if let Some(ref url) = args.page_url {
            self.page_url = Some(url.clone());
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_READY_TIMEOUT_MS..=MAX_READY_TIMEOUT_MS).contains(&self.ready_timeout_ms) {
            return Err(ConfigError::ValidationError(format!(
                "Ready timeout must be between {}ms and {}ms, got {}ms",
                MIN_READY_TIMEOUT_MS, MAX_READY_TIMEOUT_MS, self.ready_timeout_ms
            )));
        }

        if let Some(ref url) = self.page_url {
            if url.trim().is_empty() {
                return Err(ConfigError::ValidationError(
                    "Page URL cannot be empty".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Loads the environment snapshot, if a path is configured.
    pub fn load_environment(&self) -> Result<Option<EnvironmentInfo>, ConfigError> {
        self.environment_path
            .as_ref()
            .map(load_snapshot)
            .transpose()
    }

    /// Loads the redirection snapshot, if a path is configured.
    pub fn load_redirection(&self) -> Result<Option<RedirectionInfo>, ConfigError> {
        self.redirection_path
            .as_ref()
            .map(load_snapshot)
            .transpose()
    }

    pub fn ready_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.ready_timeout_ms)
    }

    pub fn with_environment_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.environment_path = Some(path.into());
        self
    }

    pub fn with_redirection_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.redirection_path = Some(path.into());
        self
    }

    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.ready_timeout_ms = timeout_ms;
        self
    }
}

/// Parsed CLI overrides. All fields are optional to allow partial overrides.
#[derive(Debug, Default, Clone)]
pub struct CliArgs {
    pub environment_path: Option<PathBuf>,
    pub redirection_path: Option<PathBuf>,
    pub wait_for_ready: Option<bool>,
    pub timeout_ms: Option<u64>,
    pub page_url: Option<String>,
    /// Configuration file path.
    pub config_file: Option<PathBuf>,
}

impl CliArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies the full chain: defaults, file, environment, then `self`.
    pub fn load_settings(&self) -> Result<ResolverSettings, ConfigError> {
        let settings = match self.config_file {
            Some(ref config_file) => ResolverSettings::from_file(config_file)?,
            None => ResolverSettings::default(),
        };

        let settings = settings.merge_with_env().merge_with_args(self);
        settings.validate()?;

        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::info::{ReleaseChannel, Version};
    use std::io::Write;

    fn write_temp(suffix: &str, content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_settings() {
        let settings = ResolverSettings::default();
        assert!(settings.wait_for_ready);
        assert_eq!(settings.ready_timeout_ms, 30_000);
        assert!(settings.environment_path.is_none());
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_validation_timeout_bounds() {
        assert!(ResolverSettings::default().with_timeout(99).validate().is_err());
        assert!(ResolverSettings::default().with_timeout(100).validate().is_ok());
        assert!(ResolverSettings::default().with_timeout(300_000).validate().is_ok());
        assert!(ResolverSettings::default().with_timeout(300_001).validate().is_err());
    }

    #[test]
    fn test_cli_args_merge() {
        let args = CliArgs {
            timeout_ms: Some(5000),
            environment_path: Some("env.json".into()),
            ..Default::default()
        };

        let settings = ResolverSettings::default().merge_with_args(&args);
        assert_eq!(settings.ready_timeout_ms, 5000);
        assert_eq!(settings.environment_path, Some(PathBuf::from("env.json")));
        assert!(settings.wait_for_ready);
    }

    #[test]
    fn test_settings_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("controls.toml");
        let settings = ResolverSettings::default()
            .with_redirection_path("redirection.json")
            .with_timeout(2000);

        settings.to_file(&path).unwrap();
        assert_eq!(ResolverSettings::from_file(&path).unwrap(), settings);
    }

    #[test]
    fn test_load_snapshots_by_extension() {
        let env = write_temp(
            ".toml",
            r#"
            platform_version = "9.2.24000.0"

            [control_versions]
            UnifiedFieldControl = "9.1"
            "#,
        );
        let redirection = write_temp(
            ".json",
            r#"{
                "version": "9.2.24000.0",
                "org": { "release_channel": "monthly" },
                "app": {},
                "user": {}
            }"#,
        );

        let settings = ResolverSettings::default()
            .with_environment_path(env.path())
            .with_redirection_path(redirection.path());

        let env = settings.load_environment().unwrap().unwrap();
        assert_eq!(env.platform_version, Version::new(9, 2, 24000, 0));
        assert_eq!(
            env.control_version("UnifiedFieldControl"),
            Some(Version::new(9, 1, 0, 0))
        );

        let redirection = settings.load_redirection().unwrap().unwrap();
        assert_eq!(redirection.active_release_channel(), ReleaseChannel::Monthly);
    }

    #[test]
    fn test_unconfigured_snapshot_is_none() {
        let settings = ResolverSettings::default();
        assert!(settings.load_environment().unwrap().is_none());
    }

    #[test]
    fn test_unsupported_format() {
        let file = write_temp(".yaml", "platform_version: 1.0");
        let err = load_snapshot::<EnvironmentInfo>(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedFormat(ext) if ext == "yaml"));
    }

    #[test]
    fn test_missing_file() {
        let err = load_snapshot::<EnvironmentInfo>("/nonexistent/env.toml").unwrap_err();
        assert!(matches!(err, ConfigError::IoError { .. }));
    }
}
