//! Browser control over the Chrome `DevTools` Protocol.
//!
//! With the `browser` feature, [`CdpLauncher`] starts a Chromium-family
//! browser through chromiumoxide and hands out a [`CdpDriver`] per session.
//! Without it, only the configuration and executable lookup are compiled.
//!
//! Element handles are indices into a per-document registry kept on
//! `window.__formprobe`. The registry carries a random token; a handle whose
//! token no longer matches (the document was replaced) is stale.

use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::driver::ElementHandle;
use crate::locator::{js_string, Selector};
use crate::result::{ProbeError, ProbeResult};

/// Supported browser engines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserEngine {
    /// Chromium
    #[default]
    Chromium,
    /// Google Chrome
    Chrome,
    /// Microsoft Edge
    Edge,
}

impl BrowserEngine {
    /// All engines
    pub const ALL: [Self; 3] = [Self::Chromium, Self::Chrome, Self::Edge];

    /// Engine name
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Chromium => "chromium",
            Self::Chrome => "chrome",
            Self::Edge => "edge",
        }
    }

    /// Executable names searched on `PATH`, in order
    #[must_use]
    pub const fn executable_names(self) -> &'static [&'static str] {
        match self {
            Self::Chromium => &["chromium", "chromium-browser"],
            Self::Chrome => &["google-chrome", "google-chrome-stable", "chrome"],
            Self::Edge => &["microsoft-edge", "microsoft-edge-stable", "msedge"],
        }
    }

    /// First executable for this engine found in `path_var`
    #[must_use]
    pub fn find_in(self, path_var: Option<OsString>) -> Option<PathBuf> {
        let path_var = path_var?;
        std::env::split_paths(&path_var).find_map(|dir| {
            self.executable_names().iter().find_map(|name| {
                let candidate = dir.join(format!("{name}{}", std::env::consts::EXE_SUFFIX));
                candidate.is_file().then_some(candidate)
            })
        })
    }
}

impl std::fmt::Display for BrowserEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BrowserEngine {
    type Err = ProbeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chromium" => Ok(Self::Chromium),
            "chrome" | "google-chrome" => Ok(Self::Chrome),
            "edge" | "msedge" => Ok(Self::Edge),
            other => Err(ProbeError::config(format!(
                "unsupported browser {other:?} (expected chromium, chrome or edge)"
            ))),
        }
    }
}

/// Browser configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Engine to launch
    pub engine: BrowserEngine,
    /// Run in headless mode
    pub headless: bool,
    /// Explicit browser executable (None = search `PATH`)
    pub executable_path: Option<PathBuf>,
    /// Sandbox mode (disable for containers)
    pub sandbox: bool,
    /// Viewport width
    pub viewport_width: u32,
    /// Viewport height
    pub viewport_height: u32,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            engine: BrowserEngine::Chromium,
            headless: true,
            executable_path: None,
            sandbox: true,
            viewport_width: 1280,
            viewport_height: 800,
        }
    }
}

impl BrowserConfig {
    /// Set the engine
    #[must_use]
    pub const fn with_engine(mut self, engine: BrowserEngine) -> Self {
        self.engine = engine;
        self
    }

    /// Set viewport dimensions
    #[must_use]
    pub const fn with_viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport_width = width;
        self.viewport_height = height;
        self
    }

    /// Set headless mode
    #[must_use]
    pub const fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Set the browser executable
    #[must_use]
    pub fn with_executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.executable_path = Some(path.into());
        self
    }

    /// Disable sandbox (for containers/CI)
    #[must_use]
    pub const fn with_no_sandbox(mut self) -> Self {
        self.sandbox = false;
        self
    }

    /// Executable to launch.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::Launch`] if the configured executable does not
    /// exist, or no executable for the engine is on `PATH`.
    pub fn resolve_executable(&self) -> ProbeResult<PathBuf> {
        self.resolve_executable_in(std::env::var_os("PATH"))
    }

    fn resolve_executable_in(&self, path_var: Option<OsString>) -> ProbeResult<PathBuf> {
        if let Some(path) = &self.executable_path {
            return if Path::new(path).is_file() {
                Ok(path.clone())
            } else {
                Err(ProbeError::launch(format!(
                    "browser executable {} does not exist",
                    path.display()
                )))
            };
        }
        self.engine.find_in(path_var).ok_or_else(|| {
            ProbeError::launch(format!(
                "no {} executable found on PATH (tried {})",
                self.engine,
                self.engine.executable_names().join(", ")
            ))
        })
    }
}

/// Script that registers every match of `selector` in the document registry
/// and evaluates to `{ token, ids }`.
#[cfg_attr(not(feature = "browser"), allow(dead_code))]
fn registry_query_js(selector: &Selector) -> String {
    format!(
        "(() => {{ \
         const reg = window.__formprobe || (window.__formprobe = {{ \
           token: Math.random().toString(36).slice(2) + Date.now().toString(36), els: [] }}); \
         const found = {collect}; \
         const ids = found.map(el => {{ \
           let i = reg.els.indexOf(el); \
           if (i < 0) {{ i = reg.els.length; reg.els.push(el); }} \
           return i; }}); \
         return {{ token: reg.token, ids }}; }})()",
        collect = selector.to_collect_js()
    )
}

/// Script applying the function `body` to the registered element, evaluating
/// to `{ stale, value }`.
#[cfg_attr(not(feature = "browser"), allow(dead_code))]
fn element_call_js(element: &ElementHandle, body: &str) -> String {
    format!(
        "(() => {{ \
         const reg = window.__formprobe; \
         if (!reg || reg.token !== {token}) return {{ stale: true, value: null }}; \
         const el = reg.els[{id}]; \
         if (!el || !el.isConnected) return {{ stale: true, value: null }}; \
         const value = ({body})(el); \
         return {{ stale: false, value: value === undefined ? null : value }}; }})()",
        token = js_string(&element.document),
        id = element.id,
    )
}

/// Reply of [`registry_query_js`]
#[cfg_attr(not(feature = "browser"), allow(dead_code))]
#[derive(Debug, Deserialize)]
struct QueryReply {
    token: String,
    ids: Vec<u64>,
}

#[cfg_attr(not(feature = "browser"), allow(dead_code))]
impl QueryReply {
    fn into_handles(self) -> Vec<ElementHandle> {
        self.ids
            .into_iter()
            .map(|id| ElementHandle::new(id, self.token.clone()))
            .collect()
    }
}

/// Reply of [`element_call_js`]
#[cfg_attr(not(feature = "browser"), allow(dead_code))]
#[derive(Debug, Deserialize)]
struct ElementReply {
    stale: bool,
    #[serde(default)]
    value: serde_json::Value,
}

/// Classify a CDP failure: a dead connection means the session is gone
#[cfg_attr(not(feature = "browser"), allow(dead_code))]
fn cdp_error(error: impl std::fmt::Display) -> ProbeError {
    let message = error.to_string();
    let lower = message.to_ascii_lowercase();
    let connection_lost = ["channel", "closed", "websocket", "no response"]
        .iter()
        .any(|marker| lower.contains(marker));
    if connection_lost {
        ProbeError::stale(message)
    } else {
        ProbeError::driver(message)
    }
}

#[cfg(feature = "browser")]
pub use cdp::{CdpDriver, CdpLauncher};

#[cfg(feature = "browser")]
mod cdp {
    use super::*;
    use async_trait::async_trait;
    use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig as CdpConfig};
    use chromiumoxide::cdp::browser_protocol::input::{
        DispatchKeyEventParams, DispatchKeyEventType, DispatchMouseEventParams,
        DispatchMouseEventType, MouseButton,
    };
    use chromiumoxide::page::Page as CdpPage;
    use futures::StreamExt;
    use serde::de::DeserializeOwned;
    use tokio::sync::Mutex;

    use crate::driver::{Driver, Launcher};

    const CENTER_JS: &str = "el => { el.scrollIntoView({ block: 'center', inline: 'center' }); \
                             const r = el.getBoundingClientRect(); \
                             return [r.left + r.width / 2, r.top + r.height / 2]; }";

    /// Launches Chromium-family browsers over CDP
    #[derive(Debug, Clone)]
    pub struct CdpLauncher {
        config: BrowserConfig,
    }

    impl CdpLauncher {
        /// Create a launcher
        #[must_use]
        pub const fn new(config: BrowserConfig) -> Self {
            Self { config }
        }
    }

    #[async_trait]
    impl Launcher for CdpLauncher {
        async fn launch(&self) -> ProbeResult<Box<dyn Driver>> {
            let config = &self.config;
            let executable = config.resolve_executable()?;
            tracing::debug!(engine = %config.engine, executable = %executable.display(), "launching browser");

            let mut builder = CdpConfig::builder()
                .chrome_executable(executable)
                .window_size(config.viewport_width, config.viewport_height);
            if !config.headless {
                builder = builder.with_head();
            }
            if !config.sandbox {
                builder = builder.no_sandbox();
            }
            let cdp_config = builder.build().map_err(ProbeError::launch)?;

            let (browser, mut handler) = CdpBrowser::launch(cdp_config)
                .await
                .map_err(|e| ProbeError::launch(e.to_string()))?;

            let handle = tokio::spawn(async move {
                while let Some(event) = handler.next().await {
                    if event.is_err() {
                        break;
                    }
                }
            });

            let page = match browser.new_page("about:blank").await {
                Ok(page) => page,
                Err(e) => {
                    handle.abort();
                    return Err(ProbeError::launch(format!("cannot open page: {e}")));
                }
            };

            Ok(Box::new(CdpDriver {
                browser: Mutex::new(browser),
                page,
                handler: handle,
                closed: false,
            }))
        }

        fn describe(&self) -> String {
            let mode = if self.config.headless { "headless" } else { "headed" };
            format!("{} ({mode})", self.config.engine)
        }
    }

    /// Driver for one CDP browser and its single page
    #[derive(Debug)]
    pub struct CdpDriver {
        browser: Mutex<CdpBrowser>,
        page: CdpPage,
        handler: tokio::task::JoinHandle<()>,
        closed: bool,
    }

    impl CdpDriver {
        fn ensure_open(&self) -> ProbeResult<()> {
            if self.closed {
                Err(ProbeError::stale("browser was closed"))
            } else {
                Ok(())
            }
        }

        async fn eval<T: DeserializeOwned>(&self, script: String) -> ProbeResult<T> {
            self.ensure_open()?;
            let result = self.page.evaluate(script).await.map_err(cdp_error)?;
            result
                .into_value()
                .map_err(|e| ProbeError::driver(format!("unexpected script result: {e}")))
        }

        async fn on_element(
            &self,
            element: &ElementHandle,
            body: &str,
        ) -> ProbeResult<serde_json::Value> {
            let reply: ElementReply = self.eval(element_call_js(element, body)).await?;
            if reply.stale {
                return Err(ProbeError::stale(format!(
                    "element {} is no longer attached to the page",
                    element.id
                )));
            }
            Ok(reply.value)
        }

        async fn center(&self, element: &ElementHandle) -> ProbeResult<(f64, f64)> {
            let value = self.on_element(element, CENTER_JS).await?;
            serde_json::from_value(value)
                .map_err(|e| ProbeError::driver(format!("cannot read element position: {e}")))
        }

        async fn mouse(
            &self,
            kind: DispatchMouseEventType,
            (x, y): (f64, f64),
            pressed: bool,
        ) -> ProbeResult<()> {
            let mut builder = DispatchMouseEventParams::builder().r#type(kind).x(x).y(y);
            if pressed {
                builder = builder.button(MouseButton::Left).click_count(1);
            }
            let params = builder.build().map_err(ProbeError::driver)?;
            self.page.execute(params).await.map_err(cdp_error)?;
            Ok(())
        }
    }

    #[async_trait]
    impl Driver for CdpDriver {
        async fn navigate(&mut self, url: &str) -> ProbeResult<()> {
            self.ensure_open()?;
            tracing::debug!(url, "navigating");
            self.page.goto(url).await.map_err(cdp_error)?;
            Ok(())
        }

        async fn current_url(&self) -> ProbeResult<String> {
            self.ensure_open()?;
            Ok(self.page.url().await.map_err(cdp_error)?.unwrap_or_default())
        }

        async fn query_all(&self, selector: &Selector) -> ProbeResult<Vec<ElementHandle>> {
            let reply: QueryReply = self.eval(registry_query_js(selector)).await?;
            Ok(reply.into_handles())
        }

        async fn attribute(
            &self,
            element: &ElementHandle,
            name: &str,
        ) -> ProbeResult<Option<String>> {
            let body = format!("el => el.getAttribute({})", js_string(name));
            match self.on_element(element, &body).await? {
                serde_json::Value::String(value) => Ok(Some(value)),
                serde_json::Value::Null => Ok(None),
                other => Ok(Some(other.to_string())),
            }
        }

        async fn text(&self, element: &ElementHandle) -> ProbeResult<String> {
            let value = self
                .on_element(element, "el => (el.innerText ?? el.textContent ?? '').trim()")
                .await?;
            Ok(value.as_str().unwrap_or_default().to_string())
        }

        async fn computed_style(
            &self,
            element: &ElementHandle,
            property: &str,
        ) -> ProbeResult<String> {
            let body = format!(
                "el => getComputedStyle(el).getPropertyValue({})",
                js_string(property)
            );
            let value = self.on_element(element, &body).await?;
            Ok(value.as_str().unwrap_or_default().to_string())
        }

        async fn set_style(
            &mut self,
            element: &ElementHandle,
            property: &str,
            value: &str,
        ) -> ProbeResult<()> {
            let body = format!(
                "el => {{ el.style.setProperty({}, {}); return null; }}",
                js_string(property),
                js_string(value)
            );
            self.on_element(element, &body).await.map(|_| ())
        }

        async fn scroll_into_view(&mut self, element: &ElementHandle) -> ProbeResult<()> {
            self.on_element(element, "el => { el.scrollIntoView(true); return null; }")
                .await
                .map(|_| ())
        }

        async fn click(&mut self, element: &ElementHandle) -> ProbeResult<()> {
            let at = self.center(element).await?;
            tracing::debug!(element = element.id, x = at.0, y = at.1, "click");
            self.mouse(DispatchMouseEventType::MouseMoved, at, false).await?;
            self.mouse(DispatchMouseEventType::MousePressed, at, true).await?;
            self.mouse(DispatchMouseEventType::MouseReleased, at, true).await
        }

        async fn hover(&mut self, element: &ElementHandle) -> ProbeResult<()> {
            let at = self.center(element).await?;
            self.mouse(DispatchMouseEventType::MouseMoved, at, false).await
        }

        async fn type_text(&mut self, element: &ElementHandle, text: &str) -> ProbeResult<()> {
            self.on_element(element, "el => { el.focus(); return null; }")
                .await?;
            for ch in text.chars() {
                let params = DispatchKeyEventParams::builder()
                    .r#type(DispatchKeyEventType::Char)
                    .text(ch.to_string())
                    .build()
                    .map_err(ProbeError::driver)?;
                self.page.execute(params).await.map_err(cdp_error)?;
            }
            Ok(())
        }

        async fn close(&mut self) -> ProbeResult<()> {
            if self.closed {
                return Ok(());
            }
            self.closed = true;
            let mut browser = self.browser.lock().await;
            let result = browser.close().await.map(|_| ());
            if result.is_ok() {
                // Reap the child process.
                if let Err(e) = browser.wait().await {
                    tracing::warn!(error = %e, "failed to reap browser process");
                }
            }
            self.handler.abort();
            result.map_err(|e| ProbeError::driver(format!("browser did not close cleanly: {e}")))
        }
    }
}
