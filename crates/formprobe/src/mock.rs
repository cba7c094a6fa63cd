//! In-memory driver for unit tests.
//!
//! [`MockDriver`] models one page as a flat list of [`MockElement`]s. An
//! element matches a selector when the selector was registered on it, or
//! when an id selector names its `id` attribute. Behaviour (a button that
//! enables itself, a form that navigates on submit) is attached with hooks
//! that run after clicks and keystrokes.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::driver::{Driver, ElementHandle, Launcher};
use crate::form::{self, FormContract};
use crate::locator::{Locator, Selector};
use crate::result::{ProbeError, ProbeResult};

/// One element of a mock page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MockElement {
    /// Tag name
    pub tag: String,
    /// Attributes (an empty value still counts as present)
    pub attributes: BTreeMap<String, String>,
    /// Text content
    pub text: String,
    /// Computed styles
    pub styles: BTreeMap<String, String>,
    /// Styles applied while the pointer is over the element
    pub hover_styles: BTreeMap<String, String>,
    /// Selectors this element answers to
    pub selectors: Vec<Selector>,
    /// Ignore inline style changes and hover styles
    pub inert_style: bool,
}

impl MockElement {
    /// Create an element with the given tag
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    /// Set an attribute
    #[must_use]
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Set the text content
    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Set a computed style
    #[must_use]
    pub fn style(mut self, property: impl Into<String>, value: impl Into<String>) -> Self {
        self.styles.insert(property.into(), value.into());
        self
    }

    /// Set a style applied on hover
    #[must_use]
    pub fn hover_style(mut self, property: impl Into<String>, value: impl Into<String>) -> Self {
        self.hover_styles.insert(property.into(), value.into());
        self
    }

    /// Answer to the locator's selector
    #[must_use]
    pub fn matching(mut self, locator: impl Into<Locator>) -> Self {
        self.selectors.push(locator.into().selector().clone());
        self
    }

    /// Refuse style changes
    #[must_use]
    pub const fn inert_style(mut self) -> Self {
        self.inert_style = true;
        self
    }

    /// Whether the element answers to `selector`
    #[must_use]
    pub fn matches(&self, selector: &Selector) -> bool {
        if self.selectors.contains(selector) {
            return true;
        }
        match selector {
            Selector::Id(id) => self.attributes.get("id") == Some(id),
            _ => false,
        }
    }

    fn apply_style(&mut self, property: &str, value: &str) {
        if !self.inert_style {
            self.styles.insert(property.to_string(), value.to_string());
        }
    }
}

/// Document state of a mock browser
#[derive(Debug, Clone, Default)]
pub struct MockDom {
    /// Current URL
    pub url: String,
    /// Bumped on every load; handles from older documents are stale
    pub generation: u64,
    /// Elements of the current document
    pub elements: Vec<MockElement>,
    /// Documents served by URL
    pub pages: BTreeMap<String, Vec<MockElement>>,
}

impl MockDom {
    /// Replace the current document
    pub fn load(&mut self, url: impl Into<String>, elements: Vec<MockElement>) {
        self.url = url.into();
        self.generation += 1;
        self.elements = elements;
    }

    /// Index of the first element matching `selector`
    #[must_use]
    pub fn position(&self, selector: &Selector) -> Option<usize> {
        self.elements.iter().position(|el| el.matches(selector))
    }

    /// First element matching `selector`
    pub fn find_mut(&mut self, selector: &Selector) -> Option<&mut MockElement> {
        self.elements.iter_mut().find(|el| el.matches(selector))
    }

    fn document(&self) -> String {
        self.generation.to_string()
    }
}

/// Event delivered to hooks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockEvent {
    /// Element at this index was clicked
    Clicked(usize),
    /// A character was typed into the element at this index
    Typed(usize),
}

/// Page behaviour run after each event
pub type MockHook = Arc<dyn Fn(&mut MockDom, &MockEvent) + Send + Sync>;

/// Mock driver for unit testing
pub struct MockDriver {
    dom: MockDom,
    hooks: Vec<MockHook>,
    unreachable: Vec<String>,
    query_error: Option<String>,
    history: Arc<Mutex<Vec<String>>>,
    closed: bool,
    close_count: Arc<AtomicUsize>,
}

impl std::fmt::Debug for MockDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockDriver")
            .field("url", &self.dom.url)
            .field("generation", &self.dom.generation)
            .field("elements", &self.dom.elements.len())
            .field("hooks", &self.hooks.len())
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

impl Default for MockDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDriver {
    /// Create a mock driver with no pages
    #[must_use]
    pub fn new() -> Self {
        Self {
            dom: MockDom::default(),
            hooks: Vec::new(),
            unreachable: Vec::new(),
            query_error: None,
            history: Arc::new(Mutex::new(Vec::new())),
            closed: false,
            close_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Serve `elements` at `url`
    #[must_use]
    pub fn with_page(mut self, url: impl Into<String>, elements: Vec<MockElement>) -> Self {
        self.dom.pages.insert(url.into(), elements);
        self
    }

    /// Run `hook` after every click and keystroke
    #[must_use]
    pub fn with_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut MockDom, &MockEvent) + Send + Sync + 'static,
    {
        self.hooks.push(Arc::new(hook));
        self
    }

    /// Fail navigation to `url`
    #[must_use]
    pub fn with_unreachable(mut self, url: impl Into<String>) -> Self {
        self.unreachable.push(url.into());
        self
    }

    /// Fail every element query with a driver error carrying `message`
    #[must_use]
    pub fn with_query_error(mut self, message: impl Into<String>) -> Self {
        self.query_error = Some(message.into());
        self
    }

    /// Recorded driver calls
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        lock(&self.history).clone()
    }

    /// Whether a call starting with `prefix` was recorded
    #[must_use]
    pub fn was_called(&self, prefix: &str) -> bool {
        lock(&self.history).iter().any(|c| c.starts_with(prefix))
    }

    fn record(&self, call: String) {
        lock(&self.history).push(call);
    }

    fn ensure_open(&self) -> ProbeResult<()> {
        if self.closed {
            Err(ProbeError::stale("browser was closed"))
        } else {
            Ok(())
        }
    }

    fn index(&self, element: &ElementHandle) -> ProbeResult<usize> {
        self.ensure_open()?;
        let index = usize::try_from(element.id).unwrap_or(usize::MAX);
        if element.document != self.dom.document() || index >= self.dom.elements.len() {
            return Err(ProbeError::stale(format!(
                "element {} belongs to a document that is no longer loaded",
                element.id
            )));
        }
        Ok(index)
    }

    fn element(&self, element: &ElementHandle) -> ProbeResult<&MockElement> {
        let index = self.index(element)?;
        Ok(&self.dom.elements[index])
    }

    fn element_mut(&mut self, element: &ElementHandle) -> ProbeResult<&mut MockElement> {
        let index = self.index(element)?;
        Ok(&mut self.dom.elements[index])
    }

    fn fire(&mut self, event: MockEvent) {
        for hook in self.hooks.clone() {
            hook(&mut self.dom, &event);
        }
    }
}

fn lock(history: &Mutex<Vec<String>>) -> std::sync::MutexGuard<'_, Vec<String>> {
    history
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

#[async_trait]
impl Driver for MockDriver {
    async fn navigate(&mut self, url: &str) -> ProbeResult<()> {
        self.ensure_open()?;
        self.record(format!("navigate {url}"));
        if self.unreachable.iter().any(|u| u == url) {
            return Err(ProbeError::driver(format!("net::ERR_NAME_NOT_RESOLVED at {url}")));
        }
        let elements = self.dom.pages.get(url).cloned().unwrap_or_default();
        self.dom.load(url, elements);
        Ok(())
    }

    async fn current_url(&self) -> ProbeResult<String> {
        self.ensure_open()?;
        Ok(self.dom.url.clone())
    }

    async fn query_all(&self, selector: &Selector) -> ProbeResult<Vec<ElementHandle>> {
        self.ensure_open()?;
        if let Some(message) = &self.query_error {
            return Err(ProbeError::driver(message.clone()));
        }
        let document = self.dom.document();
        Ok(self
            .dom
            .elements
            .iter()
            .enumerate()
            .filter(|(_, el)| el.matches(selector))
            .map(|(i, _)| ElementHandle::new(i as u64, document.clone()))
            .collect())
    }

    async fn attribute(&self, element: &ElementHandle, name: &str) -> ProbeResult<Option<String>> {
        Ok(self.element(element)?.attributes.get(name).cloned())
    }

    async fn text(&self, element: &ElementHandle) -> ProbeResult<String> {
        Ok(self.element(element)?.text.clone())
    }

    async fn computed_style(
        &self,
        element: &ElementHandle,
        property: &str,
    ) -> ProbeResult<String> {
        Ok(self
            .element(element)?
            .styles
            .get(property)
            .cloned()
            .unwrap_or_default())
    }

    async fn set_style(
        &mut self,
        element: &ElementHandle,
        property: &str,
        value: &str,
    ) -> ProbeResult<()> {
        self.record(format!("set_style {} {property}", element.id));
        self.element_mut(element)?.apply_style(property, value);
        Ok(())
    }

    async fn scroll_into_view(&mut self, element: &ElementHandle) -> ProbeResult<()> {
        self.index(element)?;
        self.record(format!("scroll {}", element.id));
        Ok(())
    }

    async fn click(&mut self, element: &ElementHandle) -> ProbeResult<()> {
        let index = self.index(element)?;
        self.record(format!("click {index}"));
        if self.dom.elements[index].attributes.contains_key("disabled") {
            return Ok(());
        }
        self.fire(MockEvent::Clicked(index));
        Ok(())
    }

    async fn hover(&mut self, element: &ElementHandle) -> ProbeResult<()> {
        let index = self.index(element)?;
        self.record(format!("hover {index}"));
        let el = &mut self.dom.elements[index];
        for (property, value) in el.hover_styles.clone() {
            el.apply_style(&property, &value);
        }
        Ok(())
    }

    async fn type_text(&mut self, element: &ElementHandle, text: &str) -> ProbeResult<()> {
        let index = self.index(element)?;
        self.record(format!("type {index} {text}"));
        for ch in text.chars() {
            // A hook may have replaced the document mid-sequence.
            let index = self.index(element)?;
            self.dom.elements[index]
                .attributes
                .entry("value".to_string())
                .or_default()
                .push(ch);
            self.fire(MockEvent::Typed(index));
        }
        Ok(())
    }

    async fn close(&mut self) -> ProbeResult<()> {
        if !self.closed {
            self.closed = true;
            self.close_count.fetch_add(1, Ordering::SeqCst);
            self.record("close".to_string());
        }
        Ok(())
    }
}

type Factory = Arc<dyn Fn() -> MockDriver + Send + Sync>;

/// Launcher handing out fresh mock drivers
#[derive(Clone)]
pub struct MockLauncher {
    factory: Factory,
    failure: Option<String>,
    launched: Arc<AtomicUsize>,
    closed: Arc<AtomicUsize>,
    history: Arc<Mutex<Vec<String>>>,
}

impl std::fmt::Debug for MockLauncher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockLauncher")
            .field("failure", &self.failure)
            .field("launched", &self.launched())
            .field("closed", &self.closed())
            .finish_non_exhaustive()
    }
}

impl MockLauncher {
    /// Launch a driver built by `factory` for every session
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> MockDriver + Send + Sync + 'static,
    {
        Self {
            factory: Arc::new(factory),
            failure: None,
            launched: Arc::new(AtomicUsize::new(0)),
            closed: Arc::new(AtomicUsize::new(0)),
            history: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Launcher whose every launch fails with `message`
    #[must_use]
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::new(MockDriver::new)
        }
    }

    /// Number of drivers launched
    #[must_use]
    pub fn launched(&self) -> usize {
        self.launched.load(Ordering::SeqCst)
    }

    /// Number of drivers closed
    #[must_use]
    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    /// Calls recorded by every driver this launcher created, in order
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        lock(&self.history).clone()
    }

    /// Whether any driver recorded a call starting with `prefix`
    #[must_use]
    pub fn was_called(&self, prefix: &str) -> bool {
        lock(&self.history).iter().any(|c| c.starts_with(prefix))
    }
}

#[async_trait]
impl Launcher for MockLauncher {
    async fn launch(&self) -> ProbeResult<Box<dyn Driver>> {
        if let Some(message) = &self.failure {
            return Err(ProbeError::launch(message.clone()));
        }
        let mut driver = (self.factory)();
        driver.close_count = Arc::clone(&self.closed);
        driver.history = Arc::clone(&self.history);
        self.launched.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(driver))
    }

    fn describe(&self) -> String {
        "mock browser".to_string()
    }
}

/// Mock of the web form page described by `contract`, served at `base_url`.
///
/// The submit button starts disabled and enables once both the name and
/// password inputs hold text. Clicking it loads the submission page with the
/// form values in the query and a `#message` paragraph.
#[must_use]
pub fn form_page(base_url: &str, contract: &FormContract) -> MockDriver {
    let base = form::normalize_base(base_url);

    let mut elements = vec![
        MockElement::new("input")
            .attr("name", "my-disabled")
            .attr("disabled", "")
            .matching(Locator::xpath(form::DISABLED_INPUT)),
        MockElement::new("input")
            .attr("name", "my-readonly")
            .attr("value", contract.readonly_value.as_str())
            .attr("readonly", "")
            .matching(Locator::xpath(form::READONLY_INPUT)),
        MockElement::new("select")
            .attr("name", "my-select")
            .matching(Locator::xpath(form::SELECT)),
    ];
    for i in 0..contract.option_count {
        let value = if i == 0 {
            contract.select_value.clone()
        } else {
            format!("option-{i}")
        };
        elements.push(
            MockElement::new("option")
                .attr("value", value)
                .style("background-color", "rgba(0, 0, 0, 0)")
                .hover_style("background-color", contract.hover_background.as_str())
                .matching(Locator::xpath(form::SELECT_OPTIONS)),
        );
    }
    elements.extend([
        MockElement::new("input")
            .attr("id", "my-name-id")
            .attr("name", "my-name")
            .matching(Locator::xpath(form::NAME_INPUT)),
        MockElement::new("input")
            .attr("id", "my-password-id")
            .attr("name", "my-password")
            .attr("type", "password")
            .matching(Locator::xpath(form::PASSWORD_INPUT)),
        MockElement::new("button")
            .attr("class", "btn btn-success mt-3 float-end")
            .attr("disabled", "")
            .text("Submit")
            .matching(Locator::xpath(form::SUBMIT_BUTTON)),
    ]);

    let received = contract.received_text.clone();
    MockDriver::new()
        .with_page(base.clone(), elements)
        .with_hook(|dom, event| {
            if !matches!(event, MockEvent::Typed(_)) {
                return;
            }
            let filled = |dom: &MockDom, sel: &str| {
                dom.position(&Selector::xpath(sel))
                    .and_then(|i| dom.elements[i].attributes.get("value"))
                    .is_some_and(|v| !v.is_empty())
            };
            let ready = filled(dom, form::NAME_INPUT) && filled(dom, form::PASSWORD_INPUT);
            if let Some(button) = dom.find_mut(&Selector::xpath(form::SUBMIT_BUTTON)) {
                if ready {
                    button.attributes.remove("disabled");
                } else {
                    button.attributes.insert("disabled".to_string(), String::new());
                }
            }
        })
        .with_hook(move |dom, event| {
            let MockEvent::Clicked(index) = *event else {
                return;
            };
            if dom.position(&Selector::xpath(form::SUBMIT_BUTTON)) != Some(index) {
                return;
            }
            let value = |sel: &str| {
                dom.position(&Selector::xpath(sel))
                    .and_then(|i| dom.elements[i].attributes.get("value").cloned())
                    .unwrap_or_default()
            };
            let select_value = dom
                .position(&Selector::xpath(form::SELECT_OPTIONS))
                .and_then(|i| dom.elements[i].attributes.get("value").cloned())
                .unwrap_or_default();
            let values = form::FormValues {
                name: value(form::NAME_INPUT),
                password: value(form::PASSWORD_INPUT),
                readonly: value(form::READONLY_INPUT),
                select: select_value,
            };
            let Ok(url) = form::submission_url(&base, &values) else {
                return;
            };
            dom.load(
                url,
                vec![MockElement::new("p")
                    .attr("id", "message")
                    .text(received.as_str())
                    .matching(Locator::xpath(form::RECEIVED_MESSAGE))],
            );
        })
}
