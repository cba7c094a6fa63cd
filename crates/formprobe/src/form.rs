//! The web form under test.
//!
//! Selectors and expected values for the form page, the submission URL it
//! produces, and the built-in scenario that checks it end to end.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::locator::Locator;
use crate::result::ProbeResult;
use crate::scenario::Scenario;
use crate::step::{Action, Check, Interaction, Match, Step};

/// Page under test
pub const DEFAULT_BASE_URL: &str = "https://d3pv22lioo8876.cloudfront.net/tiptop/";

/// Sibling path the form submits to
pub const SUBMITTED_PATH: &str = "submitted.html";

/// Disabled text input
pub const DISABLED_INPUT: &str = r#"//input[@name="my-disabled"]"#;
/// Readonly text input
pub const READONLY_INPUT: &str = r#"//input[@value="Readonly input"]"#;
/// Dropdown
pub const SELECT: &str = "//select[@name='my-select']";
/// Dropdown options
pub const SELECT_OPTIONS: &str = "//select[@name='my-select']/option";
/// Name input
pub const NAME_INPUT: &str = "//input[@id='my-name-id']";
/// Password input
pub const PASSWORD_INPUT: &str = "//input[@id='my-password-id']";
/// Submit button
pub const SUBMIT_BUTTON: &str = "//button[@class='btn btn-success mt-3 float-end']";
/// Confirmation paragraph shown after submission
pub const RECEIVED_MESSAGE: &str = "//p[@id='message' and contains(text(), 'Received!')]";

const BACKGROUND_COLOR: &str = "background-color";

/// How the option hover colour is produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HoverMode {
    /// Set the hover background inline on each option
    #[default]
    Inject,
    /// Move the pointer over each option and read what the page renders
    Pointer,
}

/// Values the form page is expected to accept and show
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormContract {
    /// Text typed into the name input
    pub name: String,
    /// Text typed into the password input
    pub password: String,
    /// Value of the readonly input
    pub readonly_value: String,
    /// Default dropdown selection
    pub select_value: String,
    /// Number of dropdown options
    pub option_count: usize,
    /// Confirmation text after submission
    pub received_text: String,
    /// Background colour applied to hovered options
    pub hover_background: String,
}

impl Default for FormContract {
    fn default() -> Self {
        Self {
            name: "Test Name".to_string(),
            password: "Test Password".to_string(),
            readonly_value: "Readonly input".to_string(),
            select_value: "white".to_string(),
            option_count: 8,
            received_text: "Received!".to_string(),
            hover_background: "rgba(0, 123, 255, 1)".to_string(),
        }
    }
}

impl FormContract {
    /// Values the form submits when filled in per this contract
    #[must_use]
    pub fn values(&self) -> FormValues {
        FormValues {
            name: self.name.clone(),
            password: self.password.clone(),
            readonly: self.readonly_value.clone(),
            select: self.select_value.clone(),
        }
    }
}

/// Submitted form fields
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FormValues {
    /// `my-name`
    pub name: String,
    /// `my-password`
    pub password: String,
    /// `my-readonly`
    pub readonly: String,
    /// `my-select`
    pub select: String,
}

/// Ensure a base URL ends with `/` so relative paths resolve beneath it
#[must_use]
pub fn normalize_base(base_url: &str) -> String {
    if base_url.ends_with('/') {
        base_url.to_string()
    } else {
        format!("{base_url}/")
    }
}

/// URL the form navigates to on submit.
///
/// Fields are encoded as `application/x-www-form-urlencoded` in the order
/// `my-name`, `my-password`, `my-readonly`, `my-select`.
///
/// # Errors
///
/// Returns [`crate::ProbeError::Url`] if `base_url` is not an absolute URL.
pub fn submission_url(base_url: &str, values: &FormValues) -> ProbeResult<String> {
    let mut url = Url::parse(&normalize_base(base_url))?.join(SUBMITTED_PATH)?;
    url.query_pairs_mut()
        .append_pair("my-name", &values.name)
        .append_pair("my-password", &values.password)
        .append_pair("my-readonly", &values.readonly)
        .append_pair("my-select", &values.select);
    Ok(url.to_string())
}

fn xpath(expr: &str) -> Locator {
    Locator::xpath(expr)
}

/// Built-in scenario for the form page.
///
/// `settle_ms` is the delay after typing and after each option interaction.
///
/// # Errors
///
/// Returns [`crate::ProbeError::Url`] if `base_url` is not an absolute URL.
pub fn web_form_scenario(
    base_url: &str,
    contract: &FormContract,
    hover: HoverMode,
    settle_ms: u64,
) -> ProbeResult<Scenario> {
    let base = normalize_base(base_url);
    let expected_url = submission_url(&base, &contract.values())?;

    let interaction = match hover {
        HoverMode::Inject => Interaction::SetStyle {
            value: contract.hover_background.clone(),
        },
        HoverMode::Pointer => Interaction::Hover,
    };

    let steps = vec![
        Step::new("input_is_disabled")
            .describe("The my-disabled input carries the disabled attribute")
            .check(Check::AttributePresent {
                target: xpath(DISABLED_INPUT),
                attribute: "disabled".to_string(),
            }),
        Step::new("input_is_readonly")
            .describe("The readonly input carries the readonly attribute")
            .check(Check::AttributePresent {
                target: xpath(READONLY_INPUT),
                attribute: "readonly".to_string(),
            }),
        Step::new("dropdown_has_expected_options")
            .describe("The my-select dropdown lists the expected number of options")
            .check(Check::Count {
                target: xpath(SELECT_OPTIONS),
                expected: contract.option_count,
            }),
        Step::new("dropdown_options_share_hover_color")
            .describe("Every dropdown option shows the same hover background")
            .action(Action::Click {
                target: xpath(SELECT),
            })
            .check(Check::UniformStyle {
                target: xpath(SELECT_OPTIONS),
                property: BACKGROUND_COLOR.to_string(),
                interaction,
                settle_ms,
            })
            .after(Action::Click {
                target: xpath(SELECT),
            }),
        Step::new("submit_disabled_when_required_empty")
            .describe("Submit is disabled while name and password are empty")
            .check(Check::AttributePresent {
                target: xpath(SUBMIT_BUTTON),
                attribute: "disabled".to_string(),
            }),
        Step::new("submit_disabled_with_name_only")
            .describe("Submit stays disabled with only the name filled in")
            .action(Action::Type {
                target: xpath(NAME_INPUT),
                text: contract.name.clone(),
            })
            .action(Action::Pause { ms: settle_ms })
            .check(Check::AttributePresent {
                target: xpath(SUBMIT_BUTTON),
                attribute: "disabled".to_string(),
            }),
        Step::new("submit_enabled_with_name_and_password")
            .describe("Submit is enabled once name and password are filled in")
            .action(Action::Type {
                target: xpath(PASSWORD_INPUT),
                text: contract.password.clone(),
            })
            .action(Action::Pause { ms: settle_ms })
            .check(Check::AttributeAbsent {
                target: xpath(SUBMIT_BUTTON),
                attribute: "disabled".to_string(),
            }),
        Step::new("submit_shows_received_message")
            .describe("Submitting shows the confirmation message")
            .action(Action::Click {
                target: xpath(SUBMIT_BUTTON),
            })
            .action(Action::WaitForElement {
                target: xpath(RECEIVED_MESSAGE),
            })
            .check(Check::Text {
                target: xpath(RECEIVED_MESSAGE),
                expected: contract.received_text.clone(),
                matching: Match::Exact,
            }),
        Step::new("submission_url_carries_form_data")
            .describe("The submission URL carries every form field in order")
            .action(Action::WaitForUrl {
                contains: SUBMITTED_PATH.to_string(),
                timeout_ms: None,
            })
            .check(Check::Url {
                expected: expected_url,
                matching: Match::Exact,
            }),
    ];

    Ok(Scenario {
        name: "web_form".to_string(),
        description: "Functional checks for the web form page".to_string(),
        target: Some(base),
        steps,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    mod url_tests {
        use super::*;

        #[test]
        fn test_normalize_base() {
            assert_eq!(normalize_base("https://a.test/x"), "https://a.test/x/");
            assert_eq!(normalize_base("https://a.test/x/"), "https://a.test/x/");
        }

        #[test]
        fn test_default_submission_url() {
            let url = submission_url(DEFAULT_BASE_URL, &FormContract::default().values()).unwrap();
            assert_eq!(
                url,
                "https://d3pv22lioo8876.cloudfront.net/tiptop/submitted.html\
                 ?my-name=Test+Name&my-password=Test+Password\
                 &my-readonly=Readonly+input&my-select=white"
            );
        }

        #[test]
        fn test_base_without_trailing_slash() {
            let with = submission_url("https://a.test/form/", &FormValues::default()).unwrap();
            let without = submission_url("https://a.test/form", &FormValues::default()).unwrap();
            assert_eq!(with, without);
            assert!(with.starts_with("https://a.test/form/submitted.html?my-name="));
        }

        #[test]
        fn test_relative_base_is_rejected() {
            assert!(submission_url("tiptop/", &FormValues::default()).is_err());
        }

        proptest! {
            #[test]
            fn prop_fields_decode_in_order(
                name in "[ -~]{0,24}",
                password in "[ -~]{0,24}",
            ) {
                let values = FormValues {
                    name: name.clone(),
                    password: password.clone(),
                    readonly: "Readonly input".to_string(),
                    select: "white".to_string(),
                };
                let url = submission_url("https://a.test/", &values).unwrap();
                let query = url.split_once('?').map(|(_, q)| q).unwrap_or_default();
                prop_assert!(!query.contains(' '));

                let parsed = Url::parse(&url).unwrap();
                let pairs: Vec<(String, String)> = parsed.query_pairs().into_owned().collect();
                let keys: Vec<&str> = pairs.iter().map(|(k, _)| k.as_str()).collect();
                prop_assert_eq!(keys, vec!["my-name", "my-password", "my-readonly", "my-select"]);
                prop_assert_eq!(&pairs[0].1, &name);
                prop_assert_eq!(&pairs[1].1, &password);
            }
        }
    }

    mod scenario_tests {
        use super::*;

        #[test]
        fn test_web_form_step_names_in_order() {
            let scenario =
                web_form_scenario(DEFAULT_BASE_URL, &FormContract::default(), HoverMode::Inject, 0)
                    .unwrap();
            let names: Vec<&str> = scenario.steps.iter().map(|s| s.name.as_str()).collect();
            assert_eq!(
                names,
                vec![
                    "input_is_disabled",
                    "input_is_readonly",
                    "dropdown_has_expected_options",
                    "dropdown_options_share_hover_color",
                    "submit_disabled_when_required_empty",
                    "submit_disabled_with_name_only",
                    "submit_enabled_with_name_and_password",
                    "submit_shows_received_message",
                    "submission_url_carries_form_data",
                ]
            );
            assert_eq!(scenario.target.as_deref(), Some(DEFAULT_BASE_URL));
        }

        #[test]
        fn test_hover_mode_selects_interaction() {
            let contract = FormContract::default();
            let interaction = |mode| {
                let scenario = web_form_scenario(DEFAULT_BASE_URL, &contract, mode, 0).unwrap();
                match &scenario.steps[3].checks[0] {
                    Check::UniformStyle { interaction, .. } => interaction.clone(),
                    other => panic!("unexpected check: {other:?}"),
                }
            };
            assert_eq!(
                interaction(HoverMode::Inject),
                Interaction::SetStyle {
                    value: "rgba(0, 123, 255, 1)".to_string()
                }
            );
            assert_eq!(interaction(HoverMode::Pointer), Interaction::Hover);
        }

        #[test]
        fn test_expected_url_follows_base() {
            let scenario = web_form_scenario(
                "http://localhost:8080/tiptop",
                &FormContract::default(),
                HoverMode::Inject,
                0,
            )
            .unwrap();
            let last = scenario.steps.last().unwrap();
            assert_eq!(
                last.checks[0],
                Check::Url {
                    expected: "http://localhost:8080/tiptop/submitted.html?my-name=Test+Name\
                               &my-password=Test+Password&my-readonly=Readonly+input\
                               &my-select=white"
                        .to_string(),
                    matching: Match::Exact,
                }
            );
        }

        #[test]
        fn test_contract_yaml_partial_override() {
            let contract: FormContract = serde_yaml_ng::from_str("option_count: 7\n").unwrap();
            assert_eq!(contract.option_count, 7);
            assert_eq!(contract.name, "Test Name");
        }
    }
}
