//! Session snapshots consumed by the resolution engine.
//!
//! - [`version`] - Four-component platform version
//! - [`environment`] - Environment facts used for strategy resolution
//! - [`redirection`] - Configuration facts used for redirection
//!
//! Both snapshots are produced once per session by external probes and held
//! in a [`SessionSnapshot`], which rejects any attempt to replace them.

pub mod environment;
pub mod redirection;
pub mod version;

pub use environment::{EnvironmentInfo, SessionSnapshot, SnapshotError};
pub use redirection::{
    AppSettings, ChannelSetting, OrgSettings, RedirectionInfo, ReleaseChannel,
    UserChannelOverride, UserSettings, UserToggles, DEFAULT_RELEASE_CHANNEL,
    NEW_LOOK_TOGGLE_CUTOFF,
};
pub use version::{Version, VersionParseError};
