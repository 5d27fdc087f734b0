//! Redirectors for the built-in capability families.

use super::{ControlMetadata, Redirector};
use crate::controls::capabilities::*;
use crate::error::{ResolveError, ResolveResult};
use crate::info::{RedirectionInfo, ReleaseChannel};
use crate::strategy::CapabilityId;

const STATUS_FIELD_NAME: &str = "statuscode";

/// True for `statuscode` and qualified names ending in `.statuscode`.
fn is_status_field(name: &str) -> bool {
    name == STATUS_FIELD_NAME
        || name
            .strip_suffix(STATUS_FIELD_NAME)
            .map(|prefix| prefix.ends_with('.'))
            .unwrap_or(false)
}

/// `Field` -> `StatusField` | `FieldSectionItem` | `LegacyField`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldRedirector;

impl Redirector for FieldRedirector {
    fn name(&self) -> &str {
        "FieldRedirector"
    }

    fn source(&self) -> CapabilityId {
        FIELD
    }

    fn target(
        &self,
        info: &RedirectionInfo,
        control: &ControlMetadata,
    ) -> ResolveResult<CapabilityId> {
        if control.name.as_deref().map(is_status_field).unwrap_or(false) {
            return Ok(STATUS_FIELD);
        }
        if info.is_new_look_enabled() {
            Ok(FIELD_SECTION_ITEM)
        } else {
            Ok(LEGACY_FIELD)
        }
    }
}

/// `FieldSectionItem` -> classic or unified rendering by release channel.
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldSectionItemRedirector;

impl Redirector for FieldSectionItemRedirector {
    fn name(&self) -> &str {
        "FieldSectionItemRedirector"
    }

    fn source(&self) -> CapabilityId {
        FIELD_SECTION_ITEM
    }

    fn target(&self, info: &RedirectionInfo, _: &ControlMetadata) -> ResolveResult<CapabilityId> {
        match info.active_release_channel() {
            ReleaseChannel::SemiAnnual => Ok(FIELD_SECTION_ITEM_CLASSIC),
            ReleaseChannel::Monthly | ReleaseChannel::Inner => Ok(FIELD_SECTION_ITEM_UNIFIED),
        }
    }
}

/// `Search` -> `RelevanceSearch` | `QuickFind`; fails when search is disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct SearchRedirector;

impl Redirector for SearchRedirector {
    fn name(&self) -> &str {
        "SearchRedirector"
    }

    fn source(&self) -> CapabilityId {
        SEARCH
    }

    fn target(&self, info: &RedirectionInfo, _: &ControlMetadata) -> ResolveResult<CapabilityId> {
        if !info.org.search_enabled {
            return Err(ResolveError::FeaturePrecondition {
                capability: SEARCH,
                feature: "search",
            });
        }
        if info.org.relevance_search_enabled {
            Ok(RELEVANCE_SEARCH)
        } else {
            Ok(QUICK_FIND)
        }
    }
}

/// `Navigation` -> modern or legacy site map.
#[derive(Debug, Clone, Copy, Default)]
pub struct NavigationRedirector;

impl Redirector for NavigationRedirector {
    fn name(&self) -> &str {
        "NavigationRedirector"
    }

    fn source(&self) -> CapabilityId {
        NAVIGATION
    }

    fn target(&self, info: &RedirectionInfo, _: &ControlMetadata) -> ResolveResult<CapabilityId> {
        if info.is_new_look_enabled() {
            Ok(MODERN_NAVIGATION)
        } else {
            Ok(LEGACY_NAVIGATION)
        }
    }
}
