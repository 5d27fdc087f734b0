//! Owning page of a control.
//!
//! A [`PageContext`] identifies the page object a factory builds controls
//! for. Controls that declare a page parameter receive it and refuse to
//! interact once the page is closed.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use uuid::Uuid;

/// Lifecycle of the page a control lives on.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PageStatus {
    /// Page is still loading.
    #[default]
    Loading,
    /// Page is ready for interaction.
    Ready,
    /// Page has been closed or navigated away from.
    Closed,
}

impl std::fmt::Display for PageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PageStatus::Loading => write!(f, "Loading"),
            PageStatus::Ready => write!(f, "Ready"),
            PageStatus::Closed => write!(f, "Closed"),
        }
    }
}

/// The page object controls are created for.
#[derive(Debug)]
pub struct PageContext {
    id: Uuid,
    url: String,
    kind: String,
    created_at: DateTime<Utc>,
    status: RwLock<PageStatus>,
}

impl PageContext {
    /// Creates a loading page of the given kind (e.g. "EntityForm").
    pub fn new(url: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            url: url.into(),
            kind: kind.into(),
            created_at: Utc::now(),
            status: RwLock::new(PageStatus::Loading),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn status(&self) -> PageStatus {
        self.status.read().clone()
    }

    pub fn set_ready(&self) {
        *self.status.write() = PageStatus::Ready;
    }

    pub fn set_closed(&self) {
        *self.status.write() = PageStatus::Closed;
    }

    pub fn is_closed(&self) -> bool {
        matches!(*self.status.read(), PageStatus::Closed)
    }

    /// Time since the page object was created.
    pub fn age(&self) -> chrono::Duration {
        Utc::now() - self.created_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_status_transitions() {
        let page = PageContext::new("https://org.example.com/main.aspx", "EntityForm");
        assert_eq!(page.status(), PageStatus::Loading);
        assert_eq!(page.kind(), "EntityForm");

        page.set_ready();
        assert_eq!(page.status(), PageStatus::Ready);
        assert!(!page.is_closed());

        page.set_closed();
        assert!(page.is_closed());
        assert_eq!(page.status().to_string(), "Closed");
    }

    #[test]
    fn test_pages_have_distinct_ids() {
        let a = PageContext::new("https://a", "Dashboard");
        let b = PageContext::new("https://a", "Dashboard");
        assert_ne!(a.id(), b.id());
        assert!(a.age() >= chrono::Duration::zero());
    }
}
