//! Four-component platform version.
//!
//! Versions are written `major.minor.build.revision` and compared
//! component by component. Missing trailing components parse as zero, so
//! `9.2` and `9.2.0.0` are the same version.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error returned when a version string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionParseError {
    /// The input was empty.
    #[error("Version string is empty")]
    Empty,

    /// More than four components were given.
    #[error("Version '{0}' has more than four components")]
    TooManyComponents(String),

    /// A component was not a non-negative integer.
    #[error("Invalid version component '{component}' in '{input}'")]
    InvalidComponent { input: String, component: String },
}

/// An ordered `major.minor.build.revision` version.
///
/// The derived ordering compares fields in declaration order, which is the
/// lexicographic component-by-component comparison platform versions use.
///
/// # Example
///
/// ```rust
/// use ki_page_controls::info::Version;
///
/// let v: Version = "9.2.23105.0".parse().unwrap();
/// assert!(v > Version::new(9, 1, 0, 0));
/// assert_eq!(v.to_string(), "9.2.23105.0");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub build: u32,
    pub revision: u32,
}

impl Version {
    /// The lowest possible version. Variants tagged with it apply everywhere.
    pub const ZERO: Version = Version::new(0, 0, 0, 0);

    /// Creates a version from its four components.
    pub const fn new(major: u32, minor: u32, build: u32, revision: u32) -> Self {
        Self {
            major,
            minor,
            build,
            revision,
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.major, self.minor, self.build, self.revision
        )
    }
}

impl FromStr for Version {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(VersionParseError::Empty);
        }

        let mut parts = [0u32; 4];
        for (index, component) in trimmed.split('.').enumerate() {
            if index >= parts.len() {
                return Err(VersionParseError::TooManyComponents(trimmed.to_string()));
            }
            parts[index] = component
                .parse()
                .map_err(|_| VersionParseError::InvalidComponent {
                    input: trimmed.to_string(),
                    component: component.to_string(),
                })?;
        }

        Ok(Version::new(parts[0], parts[1], parts[2], parts[3]))
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
