//! DOM access used by controls to reach their underlying elements.
//!
//! The resolution engine never touches the DOM. Controls receive a
//! [`DomAccessor`] as a dependency and query it lazily when an operation is
//! invoked.
//!
//! # Example
//!
//! ```rust,ignore
//! use ki_page_controls::browser::dom::{DomAccessor, MockDomAccessor};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let accessor = MockDomAccessor::new();
//!
//!     if let Some(el) = accessor.find_element("#quickFind_text_1").await? {
//!         println!("Found element: {}", el.tag_name);
//!     }
//!
//!     Ok(())
//! }
//! ```

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Snapshot of a DOM element's observable properties.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomElement {
    /// CSS selector the element was located with.
    pub selector: String,

    /// HTML tag name (e.g., "input", "select", "button").
    pub tag_name: String,

    /// Element attributes as key-value pairs.
    pub attributes: HashMap<String, String>,

    /// Text content of the element (may be empty).
    pub text_content: String,

    /// Whether the element is visible on the page.
    pub is_visible: bool,

    /// Whether the element is currently enabled (for form elements).
    pub is_enabled: bool,
}

impl DomElement {
    /// Creates a visible, enabled element with no attributes.
    pub fn new(selector: impl Into<String>, tag_name: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            tag_name: tag_name.into(),
            attributes: HashMap::new(),
            text_content: String::new(),
            is_visible: true,
            is_enabled: true,
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text_content = text.into();
        self
    }

    pub fn get_attribute(&self, name: &str) -> Option<&String> {
        self.attributes.get(name)
    }

    /// True for `input`, `textarea` and `select` elements.
    pub fn is_editable(&self) -> bool {
        matches!(
            self.tag_name.to_lowercase().as_str(),
            "input" | "textarea" | "select"
        )
    }
}

/// Result of evaluating a script in the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JsValue {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Undefined,
}

impl JsValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            JsValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

/// Browser-automation primitives a control needs.
#[async_trait]
pub trait DomAccessor: Send + Sync {
    /// Finds the first element matching a CSS selector.
    async fn find_element(&self, selector: &str) -> Result<Option<DomElement>>;

    /// Reads an attribute; `None` if the element or attribute is missing.
    async fn get_attribute(&self, selector: &str, attribute: &str) -> Result<Option<String>>;

    /// Reads text content; `None` if the element is missing.
    async fn get_text_content(&self, selector: &str) -> Result<Option<String>>;

    /// Evaluates JavaScript in the page.
    async fn evaluate_js(&self, script: &str) -> Result<JsValue>;

    /// Checks whether an element exists.
    async fn element_exists(&self, selector: &str) -> Result<bool> {
        Ok(self.find_element(selector).await?.is_some())
    }
}

/// In-memory DOM for tests.
///
/// Elements are looked up by exact selector string. Every evaluated script is
/// recorded so tests can assert on what a control tried to do.
#[derive(Default)]
pub struct MockDomAccessor {
    elements: RwLock<HashMap<String, DomElement>>,
    js_results: RwLock<HashMap<String, JsValue>>,
    scripts: RwLock<Vec<String>>,
}

impl MockDomAccessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) the element found by its selector.
    pub fn add_element(&self, element: DomElement) {
        self.elements
            .write()
            .insert(element.selector.clone(), element);
    }

    /// Sets the value returned when `script` is evaluated.
    pub fn set_js_result(&self, script: &str, result: JsValue) {
        self.js_results.write().insert(script.to_string(), result);
    }

    /// Scripts evaluated so far, oldest first.
    pub fn evaluated_scripts(&self) -> Vec<String> {
        self.scripts.read().clone()
    }
}

#[async_trait]
impl DomAccessor for MockDomAccessor {
    async fn find_element(&self, selector: &str) -> Result<Option<DomElement>> {
        Ok(self.elements.read().get(selector).cloned())
    }

    async fn get_attribute(&self, selector: &str, attribute: &str) -> Result<Option<String>> {
        let element = self.find_element(selector).await?;
        Ok(element.and_then(|e| e.get_attribute(attribute).cloned()))
    }

    async fn get_text_content(&self, selector: &str) -> Result<Option<String>> {
        let element = self.find_element(selector).await?;
        Ok(element.map(|e| e.text_content))
    }

    async fn evaluate_js(&self, script: &str) -> Result<JsValue> {
        self.scripts.write().push(script.to_string());
        let results = self.js_results.read();
        Ok(results.get(script).cloned().unwrap_or(JsValue::Undefined))
    }
}
