//! Locator abstraction for element selection.
//!
//! A locator is pure data: a query kind plus a query string, with an optional
//! wait override. It is re-evaluated against the live page on every use, so
//! DOM changes made by earlier steps are always observed.
//!
//! - **Auto-waiting**: [`Locator::find`] polls until the first match appears
//! - **No waiting**: [`Locator::find_all`] returns whatever matches right now

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::driver::ElementHandle;
use crate::result::{ProbeError, ProbeResult};
use crate::session::Session;
use crate::wait::{poll_until, WaitOptions};

/// Default timeout for auto-waiting (5 seconds)
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

/// Default polling interval for auto-waiting (50ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

/// Query kind and query string
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Selector {
    /// XPath expression evaluated against the document
    XPath(String),
    /// CSS selector (e.g., "button.primary")
    Css(String),
    /// Element id attribute
    Id(String),
}

impl Selector {
    /// Create an XPath selector
    #[must_use]
    pub fn xpath(expr: impl Into<String>) -> Self {
        Self::XPath(expr.into())
    }

    /// Create a CSS selector
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    /// Create an id selector
    #[must_use]
    pub fn id(id: impl Into<String>) -> Self {
        Self::Id(id.into())
    }

    /// Query kind name
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::XPath(_) => "xpath",
            Self::Css(_) => "css",
            Self::Id(_) => "id",
        }
    }

    /// Query string
    #[must_use]
    pub fn query(&self) -> &str {
        match self {
            Self::XPath(s) | Self::Css(s) | Self::Id(s) => s,
        }
    }

    /// JavaScript expression evaluating to an array of every matching element
    #[must_use]
    pub fn to_collect_js(&self) -> String {
        let literal = js_string(self.query());
        match self {
            Self::XPath(_) => format!(
                "(() => {{ const r = document.evaluate({literal}, document, null, \
                 XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null); \
                 const out = []; \
                 for (let i = 0; i < r.snapshotLength; i++) out.push(r.snapshotItem(i)); \
                 return out; }})()"
            ),
            Self::Css(_) => format!("Array.from(document.querySelectorAll({literal}))"),
            Self::Id(_) => format!(
                "(() => {{ const el = document.getElementById({literal}); \
                 return el ? [el] : []; }})()"
            ),
        }
    }
}

impl std::fmt::Display for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.kind(), self.query())
    }
}

/// Quote a string as a JavaScript string literal
pub(crate) fn js_string(value: &str) -> String {
    // A JSON string literal is a valid JavaScript string literal.
    serde_json::Value::String(value.to_string()).to_string()
}

/// A declarative element query with an optional wait override
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locator {
    /// The selector for finding elements
    #[serde(flatten)]
    selector: Selector,
    /// Wait bound override in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    timeout_ms: Option<u64>,
}

impl Locator {
    /// Create a locator from a selector
    #[must_use]
    pub const fn new(selector: Selector) -> Self {
        Self {
            selector,
            timeout_ms: None,
        }
    }

    /// XPath locator
    #[must_use]
    pub fn xpath(expr: impl Into<String>) -> Self {
        Self::new(Selector::xpath(expr))
    }

    /// CSS locator
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Self::new(Selector::css(selector))
    }

    /// Id locator
    #[must_use]
    pub fn id(id: impl Into<String>) -> Self {
        Self::new(Selector::id(id))
    }

    /// Set a custom wait bound
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    /// Get the selector
    #[must_use]
    pub const fn selector(&self) -> &Selector {
        &self.selector
    }

    /// Wait bound override, if any
    #[must_use]
    pub const fn timeout_ms(&self) -> Option<u64> {
        self.timeout_ms
    }

    /// Effective wait options given the session defaults
    #[must_use]
    pub fn wait_options(&self, defaults: &WaitOptions) -> WaitOptions {
        match self.timeout_ms {
            Some(ms) => defaults.clone().with_timeout(ms),
            None => defaults.clone(),
        }
    }

    /// Return the first matching element, polling until it appears.
    ///
    /// Only "element not yet present" is retried. A fatal driver error ends
    /// the wait immediately.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::NotFound`] when nothing matches within the bound.
    pub async fn find(&self, session: &Session) -> ProbeResult<ElementHandle> {
        let options = self.wait_options(session.wait_options());
        let driver = session.driver();
        let selector = &self.selector;
        let description = selector.to_string();

        let found = poll_until(&options, &description, move || async move {
            let matches = driver.query_all(selector).await?;
            Ok(matches.into_iter().next())
        })
        .await;

        match found {
            Ok(handle) => Ok(handle),
            Err(ProbeError::Timeout {
                timeout_ms,
                last_error,
                ..
            }) => Err(ProbeError::NotFound {
                locator: description,
                timeout_ms,
                last_error,
            }),
            Err(e) => Err(e),
        }
    }

    /// Return every element matching right now, possibly none.
    ///
    /// # Errors
    ///
    /// Returns error if the driver query fails
    pub async fn find_all(&self, session: &Session) -> ProbeResult<Vec<ElementHandle>> {
        session.driver().query_all(&self.selector).await
    }
}

impl From<Selector> for Locator {
    fn from(selector: Selector) -> Self {
        Self::new(selector)
    }
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.selector.fmt(f)
    }
}
