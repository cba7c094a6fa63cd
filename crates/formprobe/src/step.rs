//! Assertion steps.
//!
//! A [`Step`] is named data: actions performed in order, checks evaluated in
//! order (the first failing check ends the step), and `after` actions that
//! clean up once the checks are done. Steps (de)serialize to YAML so
//! scenarios can live outside the binary.
//!
//! ```yaml
//! name: submit_enabled_with_name_and_password
//! actions:
//!   - action: type
//!     target: { xpath: "//input[@id='my-password-id']" }
//!     text: Test Password
//! checks:
//!   - check: attribute_absent
//!     target: { xpath: "//button[@class='btn btn-success mt-3 float-end']" }
//!     attribute: disabled
//! ```

use serde::{Deserialize, Serialize};

use crate::locator::Locator;
use crate::result::{ProbeError, ProbeResult};
use crate::session::Session;
use crate::wait::{self, WaitOptions};

/// How an observed string is compared with the expected one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Match {
    /// Strings must be identical
    #[default]
    Exact,
    /// Observed string must contain the expected one
    Contains,
}

impl Match {
    /// Compare `actual` against `expected`
    #[must_use]
    pub fn matches(self, expected: &str, actual: &str) -> bool {
        match self {
            Self::Exact => actual == expected,
            Self::Contains => actual.contains(expected),
        }
    }

    const fn verb(self) -> &'static str {
        match self {
            Self::Exact => "equal",
            Self::Contains => "contain",
        }
    }
}

/// Interaction applied to each element before its style is read
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Interaction {
    /// Read the style as it is
    #[default]
    None,
    /// Set the inspected property inline to `value`
    SetStyle {
        /// Inline value to apply
        value: String,
    },
    /// Move the pointer over the element
    Hover,
}

/// Something a step does to the page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    /// Click an element
    Click {
        /// Element to click
        target: Locator,
    },
    /// Type text with one keystroke per character
    Type {
        /// Element to type into
        target: Locator,
        /// Text to type
        text: String,
    },
    /// Move the pointer over an element
    Hover {
        /// Element to hover
        target: Locator,
    },
    /// Scroll an element into view
    ScrollIntoView {
        /// Element to scroll to
        target: Locator,
    },
    /// Set an inline style property
    SetStyle {
        /// Element to style
        target: Locator,
        /// CSS property name
        property: String,
        /// CSS value
        value: String,
    },
    /// Wait until an element is present
    WaitForElement {
        /// Element to wait for
        target: Locator,
    },
    /// Wait until the URL contains a substring
    WaitForUrl {
        /// Substring to wait for
        contains: String,
        /// Wait bound override
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout_ms: Option<u64>,
    },
    /// Fixed settle delay
    Pause {
        /// Milliseconds to sleep
        ms: u64,
    },
}

impl Action {
    /// Perform the action against the session
    ///
    /// # Errors
    ///
    /// Returns the locator, wait or driver error that stopped the action
    pub async fn perform(&self, session: &mut Session) -> ProbeResult<()> {
        tracing::debug!(action = ?self, "performing action");
        match self {
            Self::Click { target } => {
                let element = target.find(session).await?;
                session.driver_mut().click(&element).await
            }
            Self::Type { target, text } => {
                let element = target.find(session).await?;
                session.driver_mut().type_text(&element, text).await
            }
            Self::Hover { target } => {
                let element = target.find(session).await?;
                session.driver_mut().hover(&element).await
            }
            Self::ScrollIntoView { target } => {
                let element = target.find(session).await?;
                session.driver_mut().scroll_into_view(&element).await
            }
            Self::SetStyle {
                target,
                property,
                value,
            } => {
                let element = target.find(session).await?;
                session
                    .driver_mut()
                    .set_style(&element, property, value)
                    .await
            }
            Self::WaitForElement { target } => target.find(session).await.map(|_| ()),
            Self::WaitForUrl {
                contains,
                timeout_ms,
            } => {
                let options = with_override(session.wait_options(), *timeout_ms);
                wait::wait_for_url_contains(session, contains, &options)
                    .await
                    .map(|_| ())
            }
            Self::Pause { ms } => {
                wait::settle(*ms).await;
                Ok(())
            }
        }
    }
}

/// Something a step asserts about the page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "check", rename_all = "snake_case")]
pub enum Check {
    /// Attribute is present (any value, including empty)
    AttributePresent {
        /// Element to inspect
        target: Locator,
        /// Attribute name
        attribute: String,
    },
    /// Attribute is absent
    AttributeAbsent {
        /// Element to inspect
        target: Locator,
        /// Attribute name
        attribute: String,
    },
    /// Attribute has exactly this value
    AttributeEquals {
        /// Element to inspect
        target: Locator,
        /// Attribute name
        attribute: String,
        /// Expected value
        value: String,
    },
    /// Number of matches right now
    Count {
        /// Elements to count
        target: Locator,
        /// Expected count
        expected: usize,
    },
    /// Element text
    Text {
        /// Element to read
        target: Locator,
        /// Expected text
        expected: String,
        /// Comparison
        #[serde(default)]
        matching: Match,
    },
    /// Current URL
    Url {
        /// Expected URL
        expected: String,
        /// Comparison
        #[serde(default)]
        matching: Match,
    },
    /// Every match shows the same computed style after the interaction
    UniformStyle {
        /// Elements to inspect
        target: Locator,
        /// CSS property to read
        property: String,
        /// Interaction applied to each element first
        #[serde(default)]
        interaction: Interaction,
        /// Delay between the interaction and the read
        #[serde(default)]
        settle_ms: u64,
    },
}

impl Check {
    /// Evaluate the check against the session
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::AssertionMismatch`] when the observed value
    /// differs, or the locator/driver error that prevented the read.
    pub async fn verify(&self, session: &mut Session) -> ProbeResult<()> {
        match self {
            Self::AttributePresent { target, attribute } => {
                let element = target.find(session).await?;
                match session.driver().attribute(&element, attribute).await? {
                    Some(_) => Ok(()),
                    None => Err(ProbeError::mismatch(
                        format!("{attribute} attribute on {target}"),
                        "present",
                        "absent",
                    )),
                }
            }
            Self::AttributeAbsent { target, attribute } => {
                let element = target.find(session).await?;
                match session.driver().attribute(&element, attribute).await? {
                    None => Ok(()),
                    Some(value) => Err(ProbeError::mismatch(
                        format!("{attribute} attribute on {target}"),
                        "absent",
                        format!("present ({value:?})"),
                    )),
                }
            }
            Self::AttributeEquals {
                target,
                attribute,
                value,
            } => {
                let element = target.find(session).await?;
                let actual = session.driver().attribute(&element, attribute).await?;
                if actual.as_deref() == Some(value.as_str()) {
                    Ok(())
                } else {
                    Err(ProbeError::mismatch(
                        format!("{attribute} attribute on {target}"),
                        value.clone(),
                        actual.unwrap_or_else(|| "<absent>".to_string()),
                    ))
                }
            }
            Self::Count { target, expected } => {
                let found = target.find_all(session).await?.len();
                if found == *expected {
                    Ok(())
                } else {
                    Err(ProbeError::mismatch(
                        format!("number of {target}"),
                        expected.to_string(),
                        found.to_string(),
                    ))
                }
            }
            Self::Text {
                target,
                expected,
                matching,
            } => {
                let element = target.find(session).await?;
                let text = session.driver().text(&element).await?;
                compare(&format!("text of {target}"), *matching, expected, &text)
            }
            Self::Url { expected, matching } => {
                let url = session.driver().current_url().await?;
                compare("current URL", *matching, expected, &url)
            }
            Self::UniformStyle {
                target,
                property,
                interaction,
                settle_ms,
            } => verify_uniform_style(session, target, property, interaction, *settle_ms).await,
        }
    }
}

fn compare(what: &str, matching: Match, expected: &str, actual: &str) -> ProbeResult<()> {
    if matching.matches(expected, actual) {
        Ok(())
    } else {
        Err(ProbeError::mismatch(
            format!("{what} should {} expected", matching.verb()),
            expected,
            actual,
        ))
    }
}

async fn verify_uniform_style(
    session: &mut Session,
    target: &Locator,
    property: &str,
    interaction: &Interaction,
    settle_ms: u64,
) -> ProbeResult<()> {
    // Wait for the first match, then take every match present at that point.
    target.find(session).await?;
    let elements = target.find_all(session).await?;

    let mut observed = Vec::with_capacity(elements.len());
    let mut hover_changed = false;
    for element in &elements {
        let driver = session.driver_mut();
        driver.scroll_into_view(element).await?;
        let baseline = match interaction {
            Interaction::None => None,
            Interaction::SetStyle { value } => {
                driver.set_style(element, property, value).await?;
                None
            }
            Interaction::Hover => {
                let before = driver.computed_style(element, property).await?;
                driver.hover(element).await?;
                Some(before)
            }
        };
        wait::settle(settle_ms).await;
        let value = session.driver().computed_style(element, property).await?;
        hover_changed |= baseline.is_some_and(|before| before != value);
        observed.push(value);
    }

    let Some(first) = observed.first() else {
        return Err(ProbeError::NotFound {
            locator: target.to_string(),
            timeout_ms: 0,
            last_error: None,
        });
    };
    tracing::debug!(property, values = ?observed, "collected computed styles");

    // A hover that changes nothing would make every match trivially equal.
    if matches!(interaction, Interaction::Hover) && !hover_changed {
        return Err(ProbeError::mismatch(
            format!("{property} of {target} after hover"),
            format!("a value other than {first}"),
            first.clone(),
        ));
    }

    match observed.iter().position(|value| value != first) {
        None => Ok(()),
        Some(index) => Err(ProbeError::mismatch(
            format!("{property} of match #{} of {target}", index + 1),
            first.clone(),
            observed[index].clone(),
        )),
    }
}

fn with_override(defaults: &WaitOptions, timeout_ms: Option<u64>) -> WaitOptions {
    match timeout_ms {
        Some(ms) => defaults.clone().with_timeout(ms),
        None => defaults.clone(),
    }
}

/// One named action+assertion unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    /// Step name, unique within a scenario
    pub name: String,
    /// Human-readable description
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Actions performed before the checks
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<Action>,
    /// Checks evaluated in order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub checks: Vec<Check>,
    /// Cleanup actions performed after the checks
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub after: Vec<Action>,
}

impl Step {
    /// Create an empty step
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            actions: Vec::new(),
            checks: Vec::new(),
            after: Vec::new(),
        }
    }

    /// Set the description
    #[must_use]
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Append an action
    #[must_use]
    pub fn action(mut self, action: Action) -> Self {
        self.actions.push(action);
        self
    }

    /// Append a check
    #[must_use]
    pub fn check(mut self, check: Check) -> Self {
        self.checks.push(check);
        self
    }

    /// Append a cleanup action
    #[must_use]
    pub fn after(mut self, action: Action) -> Self {
        self.after.push(action);
        self
    }

    /// Run the step.
    ///
    /// Cleanup actions run whether or not the body passed, unless the body
    /// left the session unusable. The body's failure takes precedence over a
    /// cleanup failure.
    ///
    /// # Errors
    ///
    /// Returns the first failure; [`ProbeError::is_fatal`] tells the runner
    /// whether to abort the group.
    pub async fn run(&self, session: &mut Session) -> ProbeResult<()> {
        let body = self.run_body(session).await;
        if matches!(&body, Err(e) if e.is_fatal()) {
            return body;
        }

        let mut cleanup = Ok(());
        for action in &self.after {
            if let Err(e) = action.perform(session).await {
                cleanup = Err(e);
                break;
            }
        }

        match (body, cleanup) {
            (Ok(()), cleanup) => cleanup,
            (Err(body), Err(cleanup)) if cleanup.is_fatal() => {
                tracing::debug!(error = %body, "step failure superseded by fatal cleanup error");
                Err(cleanup)
            }
            (Err(body), _) => Err(body),
        }
    }

    async fn run_body(&self, session: &mut Session) -> ProbeResult<()> {
        for action in &self.actions {
            action.perform(session).await?;
        }
        for check in &self.checks {
            check.verify(session).await?;
        }
        Ok(())
    }
}
