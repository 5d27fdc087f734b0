//! Selector-driven controls.
//!
//! Every built-in variant is a [`DomControl`]: a CSS selector template plus
//! the [`DomAccessor`] it queries. The template may contain a `{name}`
//! placeholder that is filled with the logical control name. When the
//! parent is itself a `DomControl`, the selector is scoped under the
//! parent's selector.

use super::Control;
use crate::browser::{DomAccessor, PageContext};
use crate::error::ConstructionError;
use crate::factory::{ConstructorArgs, ParamSpec};
use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use std::any::Any;
use std::sync::Arc;
use tracing::debug;

const NAME_PLACEHOLDER: &str = "{name}";

/// Static description of a selector-driven variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DomTemplate {
    pub variant: &'static str,
    pub selector: &'static str,
    /// Whether the variant is bound to the owning page.
    pub needs_page: bool,
}

impl DomTemplate {
    pub const fn new(variant: &'static str, selector: &'static str) -> Self {
        Self {
            variant,
            selector,
            needs_page: false,
        }
    }

    pub const fn with_page(mut self) -> Self {
        self.needs_page = true;
        self
    }

    /// True when the selector embeds the control name.
    pub fn is_named(&self) -> bool {
        self.selector.contains(NAME_PLACEHOLDER)
    }

    /// Constructor parameters this template needs.
    pub fn params(&self) -> Vec<ParamSpec> {
        let mut params = vec![
            ParamSpec::Name,
            ParamSpec::Parent,
            ParamSpec::service::<Arc<dyn DomAccessor>>(),
        ];
        if self.needs_page {
            params.push(ParamSpec::Page);
        }
        params
    }

    /// Builds a control from resolved constructor arguments.
    pub fn build(&self, args: &ConstructorArgs) -> Result<DomControl, ConstructionError> {
        let name = if self.is_named() {
            Some(args.name()?.to_string())
        } else {
            args.name().ok().map(str::to_string)
        };

        let mut selector = match &name {
            Some(name) => self
                .selector
                .replace(NAME_PLACEHOLDER, &escape_attribute(name)),
            None => self.selector.to_string(),
        };
        if let Some(parent) = args.parent()?.and_then(|p| p.downcast_ref::<DomControl>()) {
            selector = format!("{} {}", parent.selector(), selector);
        }

        let page = if self.needs_page {
            Some(args.page()?)
        } else {
            None
        };

        Ok(DomControl {
            variant: self.variant,
            name,
            selector,
            dom: args.service::<Arc<dyn DomAccessor>>()?,
            page,
        })
    }
}

/// Escapes a value for use inside a double-quoted attribute selector.
fn escape_attribute(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// A control located by a CSS selector.
pub struct DomControl {
    variant: &'static str,
    name: Option<String>,
    selector: String,
    dom: Arc<dyn DomAccessor>,
    page: Option<Arc<PageContext>>,
}

impl DomControl {
    /// The fully resolved selector, including any parent scope.
    pub fn selector(&self) -> &str {
        &self.selector
    }

    pub fn page(&self) -> Option<&Arc<PageContext>> {
        self.page.as_ref()
    }

    fn ensure_open(&self) -> Result<()> {
        match &self.page {
            Some(page) if page.is_closed() => {
                bail!("{} cannot act on closed page {}", self.variant, page.id())
            }
            _ => Ok(()),
        }
    }

    async fn run_script(&self, action: &str, body: &str) -> Result<()> {
        let script = format!(
            "(() => {{ const el = document.querySelector({}); if (!el) return false; {} return true; }})()",
            serde_json::to_string(&self.selector)?,
            body
        );
        debug!(variant = self.variant, selector = %self.selector, action, "Running control script");

        if self.dom.evaluate_js(&script).await?.as_bool() == Some(false) {
            bail!(
                "{}: element '{}' not found for {}",
                self.variant,
                self.selector,
                action
            );
        }
        Ok(())
    }
}

#[async_trait]
impl Control for DomControl {
    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn variant(&self) -> &'static str {
        self.variant
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    async fn is_present(&self) -> Result<bool> {
        if self.page.as_ref().map(|p| p.is_closed()).unwrap_or(false) {
            return Ok(false);
        }
        self.dom.element_exists(&self.selector).await
    }

    async fn get_value(&self) -> Result<Option<String>> {
        self.ensure_open()?;
        // Form inputs carry a value attribute; everything else reads as text.
        match self.dom.get_attribute(&self.selector, "value").await? {
            Some(value) => Ok(Some(value)),
            None => self.dom.get_text_content(&self.selector).await,
        }
    }

    async fn set_value(&self, value: &str) -> Result<()> {
        self.ensure_open()?;
        let element = self
            .dom
            .find_element(&self.selector)
            .await?
            .ok_or_else(|| anyhow!("{}: element '{}' not found", self.variant, self.selector))?;
        if !element.is_editable() || !element.is_enabled {
            bail!("{}: element '{}' is not editable", self.variant, self.selector);
        }

        let body = format!(
            "el.value = {}; el.dispatchEvent(new Event('change', {{ bubbles: true }}));",
            serde_json::to_string(value)?
        );
        self.run_script("set_value", &body).await
    }

    async fn click(&self) -> Result<()> {
        self.ensure_open()?;
        self.run_script("click", "el.click();").await
    }
}

impl std::fmt::Debug for DomControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DomControl")
            .field("variant", &self.variant)
            .field("name", &self.name)
            .field("selector", &self.selector)
            .field("page", &self.page.as_ref().map(|p| p.id()))
            .finish()
    }
}
