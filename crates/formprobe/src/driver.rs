//! Driver and launcher traits for browser automation.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  Launcher ──launch()──► Box<dyn Driver> ──owned by──► Session │
//! ├──────────────────────────────────────────────────────────────┤
//! │  CdpDriver  (feature "browser", chromiumoxide over CDP)      │
//! │  MockDriver (in-memory page model for unit tests)            │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Reads take `&self`; anything that changes page state takes `&mut self`, so
//! a session can never be driven by two steps at once.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::locator::Selector;
use crate::result::ProbeResult;

/// Session-scoped reference to one located element.
///
/// The handle records which document it was found in. Using it once that
/// document is gone (navigation, closed session) fails with
/// [`crate::ProbeError::StaleSession`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementHandle {
    /// Index of the element within its document's registry
    pub id: u64,
    /// Identity of the document the element was found in
    pub document: String,
}

impl ElementHandle {
    /// Create a new element handle
    #[must_use]
    pub fn new(id: u64, document: impl Into<String>) -> Self {
        Self {
            id,
            document: document.into(),
        }
    }
}

/// Abstract browser automation driver.
///
/// # Implementations
///
/// - `CdpDriver` - real Chromium-family browser over CDP
/// - [`crate::mock::MockDriver`] - for unit testing
#[async_trait]
pub trait Driver: Send + Sync + std::fmt::Debug {
    /// Navigate to URL and wait for the load to finish
    async fn navigate(&mut self, url: &str) -> ProbeResult<()>;

    /// Get current URL
    async fn current_url(&self) -> ProbeResult<String>;

    /// Every element matching the selector in the current document
    async fn query_all(&self, selector: &Selector) -> ProbeResult<Vec<ElementHandle>>;

    /// Attribute value, `None` when the attribute is absent
    async fn attribute(&self, element: &ElementHandle, name: &str) -> ProbeResult<Option<String>>;

    /// Rendered text content
    async fn text(&self, element: &ElementHandle) -> ProbeResult<String>;

    /// Computed style property value
    async fn computed_style(&self, element: &ElementHandle, property: &str)
        -> ProbeResult<String>;

    /// Set an inline style property
    async fn set_style(
        &mut self,
        element: &ElementHandle,
        property: &str,
        value: &str,
    ) -> ProbeResult<()>;

    /// Scroll the element into the viewport
    async fn scroll_into_view(&mut self, element: &ElementHandle) -> ProbeResult<()>;

    /// Click element
    async fn click(&mut self, element: &ElementHandle) -> ProbeResult<()>;

    /// Move the pointer over the element
    async fn hover(&mut self, element: &ElementHandle) -> ProbeResult<()>;

    /// Type text into element, one keystroke per character
    async fn type_text(&mut self, element: &ElementHandle, text: &str) -> ProbeResult<()>;

    /// Close the browser
    async fn close(&mut self) -> ProbeResult<()>;
}

/// Starts a fresh browser instance for one session
#[async_trait]
pub trait Launcher: Send + Sync + std::fmt::Debug {
    /// Launch a new browser and return its driver
    async fn launch(&self) -> ProbeResult<Box<dyn Driver>>;

    /// Short description for logs and reports
    fn describe(&self) -> String;
}
