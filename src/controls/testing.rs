//! Inert controls for tests and candidate sources without a page.

use super::Control;
use anyhow::Result;
use async_trait::async_trait;
use std::any::Any;

/// A control that is never present and supports no interaction.
#[derive(Debug, Clone)]
pub struct NullControl {
    variant: &'static str,
    name: Option<String>,
}

impl NullControl {
    pub fn new(variant: &'static str) -> Self {
        Self {
            variant,
            name: None,
        }
    }

    pub fn named(variant: &'static str, name: impl Into<String>) -> Self {
        Self {
            variant,
            name: Some(name.into()),
        }
    }
}

#[async_trait]
impl Control for NullControl {
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
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_null_control_rejects_interaction() {
        let control = NullControl::named("Null", "revenue");
        assert_eq!(control.name(), Some("revenue"));
        assert!(!control.is_present().await.unwrap());

        let err = control.set_value("1").await.unwrap_err();
        assert_eq!(err.to_string(), "Null does not accept input");
        assert!(control.click().await.is_err());
        assert!(control.get_value().await.is_err());
    }
}
