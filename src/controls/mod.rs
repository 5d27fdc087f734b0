//! Interactable control wrappers.
//!
//! A control is the live object a caller receives for a capability. The
//! concrete type is chosen by redirection and strategy resolution; callers
//! only see the [`Control`] trait (or downcast through
//! [`ControlHandle::downcast_ref`](crate::factory::ControlHandle::downcast_ref)).
//!
//! # Submodules
//!
//! - [`capabilities`] - Built-in capability ids
//! - [`dom_control`] - Selector-driven controls backed by a [`DomAccessor`](crate::browser::DomAccessor)
//! - [`builtin`] - Registration table for the built-in variants
//! - [`testing`] - Inert controls for tests

pub mod builtin;
pub mod dom_control;
pub mod testing;

pub use builtin::{builtin_registrations, BuiltinSource};
pub use dom_control::DomControl;

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::any::Any;

/// Built-in capability ids.
pub mod capabilities {
    use crate::strategy::CapabilityId;

    /// Any form field. Redirected by name and look.
    pub const FIELD: CapabilityId = CapabilityId::new("Field");
    pub const LEGACY_FIELD: CapabilityId = CapabilityId::new("LegacyField");
    pub const STATUS_FIELD: CapabilityId = CapabilityId::new("StatusField");

    /// Field rendered inside a form section. Redirected by release channel.
    pub const FIELD_SECTION_ITEM: CapabilityId = CapabilityId::new("FieldSectionItem");
    pub const FIELD_SECTION_ITEM_CLASSIC: CapabilityId =
        CapabilityId::new("FieldSectionItemClassic");
    pub const FIELD_SECTION_ITEM_UNIFIED: CapabilityId =
        CapabilityId::new("FieldSectionItemUnified");

    /// Global search box. Requires org search to be enabled.
    pub const SEARCH: CapabilityId = CapabilityId::new("Search");
    pub const QUICK_FIND: CapabilityId = CapabilityId::new("QuickFind");
    pub const RELEVANCE_SEARCH: CapabilityId = CapabilityId::new("RelevanceSearch");

    pub const NAVIGATION: CapabilityId = CapabilityId::new("Navigation");
    pub const LEGACY_NAVIGATION: CapabilityId = CapabilityId::new("LegacyNavigation");
    pub const MODERN_NAVIGATION: CapabilityId = CapabilityId::new("ModernNavigation");

    /// Every built-in capability.
    pub const ALL: &[CapabilityId] = &[
        FIELD,
        LEGACY_FIELD,
        STATUS_FIELD,
        FIELD_SECTION_ITEM,
        FIELD_SECTION_ITEM_CLASSIC,
        FIELD_SECTION_ITEM_UNIFIED,
        SEARCH,
        QUICK_FIND,
        RELEVANCE_SEARCH,
        NAVIGATION,
        LEGACY_NAVIGATION,
        MODERN_NAVIGATION,
    ];
}

/// A live, interactable wrapper around one piece of the rendered page.
///
/// Construction never touches the page; every operation queries it lazily.
/// Interactions a variant does not support fail with an error rather than
/// silently doing nothing.
#[async_trait]
pub trait Control: Send + Sync + 'static {
    /// Logical name the control was requested with, if any.
    fn name(&self) -> Option<&str>;

    /// Name of the concrete variant.
    fn variant(&self) -> &'static str;

    fn as_any(&self) -> &dyn Any;

    /// Whether the control is currently rendered.
    async fn is_present(&self) -> Result<bool>;

    async fn get_value(&self) -> Result<Option<String>> {
        bail!("{} does not expose a value", self.variant())
    }

    async fn set_value(&self, _value: &str) -> Result<()> {
        bail!("{} does not accept input", self.variant())
    }

    async fn click(&self) -> Result<()> {
        bail!("{} is not clickable", self.variant())
    }
}
