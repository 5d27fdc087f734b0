//! Registration table for the built-in variants.

use super::capabilities::*;
use super::dom_control::DomTemplate;
use super::Control;
use crate::info::Version;
use crate::strategy::{CandidateSource, CapabilityId, VariantRegistration};
use async_trait::async_trait;
use std::sync::Arc;

/// Environment key carrying the unified field control's own version.
pub const UNIFIED_FIELD_CONTROL: &str = "UnifiedFieldControl";

fn dom_variant(capability: CapabilityId, min_version: Version, template: DomTemplate) -> VariantRegistration {
    let params = template.params();
    let registration = VariantRegistration::new(capability, template.variant, min_version, move |args| {
        let control: Arc<dyn Control> = Arc::new(template.build(&args)?);
        Ok(control)
    });
    params
        .into_iter()
        .fold(registration, |registration, param| registration.param(param))
}

/// Every built-in variant, in registration order.
pub fn builtin_registrations() -> Vec<VariantRegistration> {
    vec![
        dom_variant(
            LEGACY_FIELD,
            Version::ZERO,
            DomTemplate::new("LegacyField", r#"#{name}_d input"#),
        ),
        dom_variant(
            STATUS_FIELD,
            Version::ZERO,
            DomTemplate::new("StatusField", r#"[data-id="header_{name}"]"#),
        ),
        dom_variant(
            FIELD_SECTION_ITEM_CLASSIC,
            Version::ZERO,
            DomTemplate::new(
                "FieldSectionItemClassic",
                r#"[data-id="{name}"] [data-id$="fieldControl-text-box-text"]"#,
            ),
        ),
        dom_variant(
            FIELD_SECTION_ITEM_UNIFIED,
            Version::new(9, 0, 0, 0),
            DomTemplate::new(
                "FieldSectionItemUnified",
                r#"[data-id="{name}.fieldControl-text-box-text"]"#,
            ),
        )
        .versioned_by(UNIFIED_FIELD_CONTROL),
        dom_variant(
            FIELD_SECTION_ITEM_UNIFIED,
            Version::new(9, 2, 23000, 0),
            DomTemplate::new(
                "FieldSectionItemUnifiedInput",
                r#"[data-id="{name}.fieldControl-unified-input"]"#,
            ),
        )
        .versioned_by(UNIFIED_FIELD_CONTROL),
        dom_variant(
            QUICK_FIND,
            Version::ZERO,
            DomTemplate::new("QuickFind", "#quickFind_text_1"),
        ),
        dom_variant(
            RELEVANCE_SEARCH,
            Version::new(9, 0, 0, 0),
            DomTemplate::new("RelevanceSearch", "#searchLauncher input"),
        ),
        dom_variant(
            RELEVANCE_SEARCH,
            Version::new(9, 1, 0, 0),
            DomTemplate::new("RelevanceSearchBox", r#"[data-id="search-box"] input"#),
        ),
        dom_variant(
            LEGACY_NAVIGATION,
            Version::ZERO,
            DomTemplate::new("LegacyNavigation", "#navBar").with_page(),
        ),
        dom_variant(
            MODERN_NAVIGATION,
            Version::new(9, 0, 0, 0),
            DomTemplate::new("ModernNavigation", r#"[data-id="navbar-container"]"#).with_page(),
        ),
    ]
}

/// Candidate source exporting [`builtin_registrations`].
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinSource;

#[async_trait]
impl CandidateSource for BuiltinSource {
    fn name(&self) -> &str {
        "builtin"
    }

    async fn exported_variants(&self) -> anyhow::Result<Vec<VariantRegistration>> {
        Ok(builtin_registrations())
    }
}
