//! Browser-side collaborators of the control layer.
//!
//! The resolution engine never drives a browser itself. Controls talk to the
//! page through the [`DomAccessor`] trait and may be bound to an owning
//! [`PageContext`].
//!
//! # Submodules
//!
//! - [`dom`] - DOM element access and script evaluation
//! - [`page`] - Owning page lifecycle

pub mod dom;
pub mod page;

pub use dom::{DomAccessor, DomElement, JsValue, MockDomAccessor};
pub use page::{PageContext, PageStatus};
