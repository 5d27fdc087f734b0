//! Redirection snapshot: configuration facts that decide which capability
//! variant applies, plus the values derived from them.

use crate::info::version::Version;
use serde::{Deserialize, Serialize};

/// Platform versions below this one let a user-level toggle decide the new
/// look for organizations that opted out of it.
pub const NEW_LOOK_TOGGLE_CUTOFF: Version = Version::new(9, 2, 23105, 0);

/// Channel used when nobody configured one explicitly.
pub const DEFAULT_RELEASE_CHANNEL: ReleaseChannel = ReleaseChannel::SemiAnnual;

/// Update cadence the environment is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReleaseChannel {
    /// Twice-yearly feature updates.
    SemiAnnual,
    /// Monthly feature updates.
    Monthly,
    /// Pre-release ring used by the product team.
    Inner,
}

impl std::fmt::Display for ReleaseChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReleaseChannel::SemiAnnual => write!(f, "semiannual"),
            ReleaseChannel::Monthly => write!(f, "monthly"),
            ReleaseChannel::Inner => write!(f, "inner"),
        }
    }
}

/// Organization or application channel setting. `Auto` defers to the next level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelSetting {
    #[default]
    Auto,
    SemiAnnual,
    Monthly,
    Inner,
}

impl ChannelSetting {
    /// The channel this setting pins, or `None` for `Auto`.
    pub fn explicit(self) -> Option<ReleaseChannel> {
        match self {
            ChannelSetting::Auto => None,
            ChannelSetting::SemiAnnual => Some(ReleaseChannel::SemiAnnual),
            ChannelSetting::Monthly => Some(ReleaseChannel::Monthly),
            ChannelSetting::Inner => Some(ReleaseChannel::Inner),
        }
    }
}

/// Per-user channel override. `None` means the user did not override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserChannelOverride {
    #[default]
    None,
    SemiAnnual,
    Monthly,
    Inner,
}

impl UserChannelOverride {
    /// The channel this override pins, or `None` when not overridden.
    pub fn explicit(self) -> Option<ReleaseChannel> {
        match self {
            UserChannelOverride::None => None,
            UserChannelOverride::SemiAnnual => Some(ReleaseChannel::SemiAnnual),
            UserChannelOverride::Monthly => Some(ReleaseChannel::Monthly),
            UserChannelOverride::Inner => Some(ReleaseChannel::Inner),
        }
    }
}

/// Organization-wide settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrgSettings {
    #[serde(default)]
    pub release_channel: ChannelSetting,

    /// Whether any global search is available.
    #[serde(default = "default_true")]
    pub search_enabled: bool,

    /// Whether the relevance (indexed) search replaces quick find.
    #[serde(default)]
    pub relevance_search_enabled: bool,
}

impl Default for OrgSettings {
    fn default() -> Self {
        Self {
            release_channel: ChannelSetting::Auto,
            search_enabled: true,
            relevance_search_enabled: false,
        }
    }
}

/// Application-wide settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppSettings {
    #[serde(default)]
    pub app_channel: ChannelSetting,

    /// Forces the new look on, whatever else is configured.
    #[serde(default)]
    pub new_look_always_on: bool,

    /// Set when the application opted out of forcing the new look.
    #[serde(default)]
    pub new_look_opt_out: bool,
}

/// User-level preview toggles.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserToggles {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_look: Option<bool>,
}

/// User-specific overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSettings {
    #[serde(default)]
    pub release_channel: UserChannelOverride,

    #[serde(default)]
    pub toggles: UserToggles,
}

/// Configuration facts that affect which capability variant applies.
///
/// Produced once per session by an external probe and consumed read-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedirectionInfo {
    pub version: Version,

    #[serde(default)]
    pub org: OrgSettings,

    #[serde(default)]
    pub app: AppSettings,

    #[serde(default)]
    pub user: UserSettings,
}

impl RedirectionInfo {
    /// Creates a snapshot with default settings in every section.
    pub fn new(version: Version) -> Self {
        Self {
            version,
            org: OrgSettings::default(),
            app: AppSettings::default(),
            user: UserSettings::default(),
        }
    }

    pub fn with_org(mut self, org: OrgSettings) -> Self {
        self.org = org;
        self
    }

    pub fn with_app(mut self, app: AppSettings) -> Self {
        self.app = app;
        self
    }

    pub fn with_user(mut self, user: UserSettings) -> Self {
        self.user = user;
        self
    }

    /// Whether the modernized UI is active.
    ///
    /// "Always on" wins. Without an opt-out the new look is off. An opt-out
    /// below [`NEW_LOOK_TOGGLE_CUTOFF`] lets the user toggle decide when the
    /// user set one; in every other opted-out case the new look is on.
    pub fn is_new_look_enabled(&self) -> bool {
        if self.app.new_look_always_on {
            return true;
        }
        if !self.app.new_look_opt_out {
            return false;
        }
        if self.version < NEW_LOOK_TOGGLE_CUTOFF {
            if let Some(toggle) = self.user.toggles.new_look {
                return toggle;
            }
        }
        true
    }

    /// Release channel in effect: user override, then application, then
    /// organization, then [`DEFAULT_RELEASE_CHANNEL`].
    pub fn active_release_channel(&self) -> ReleaseChannel {
        self.user
            .release_channel
            .explicit()
            .or_else(|| self.app.app_channel.explicit())
            .or_else(|| self.org.release_channel.explicit())
            .unwrap_or(DEFAULT_RELEASE_CHANNEL)
    }
}

fn default_true() -> bool {
    true
}
