//! Test-case specifications and the sources that produce them.
//!
//! A specification is the intent of one test case before the generation
//! service expands it into full prose. Sources are pure: `produce` has no
//! failure path. Anything that can fail (reading a JSON file) happens when
//! the source is constructed.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::story::UserStory;

/// Structured description of one test case's intent.
///
/// Immutable once produced. The JSON field names follow the dictionaries the
/// catalogue was first written as (`type`, `steps`, `expected_result`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCaseSpecification {
    /// Category label, e.g. "Functional - Positive" or "Security - Brute Force"
    #[serde(rename = "type")]
    pub case_type: String,
    /// What the test case verifies
    pub description: String,
    /// State required before the test runs
    #[serde(default)]
    pub preconditions: String,
    /// Outline of the steps; expanded by the generator
    #[serde(rename = "steps", default)]
    pub steps_hint: String,
    /// Outline of the expected outcome
    #[serde(rename = "expected_result", default)]
    pub expected_result_hint: String,
}

impl TestCaseSpecification {
    /// Create a specification from its five fields.
    pub fn new(
        case_type: impl Into<String>,
        description: impl Into<String>,
        preconditions: impl Into<String>,
        steps_hint: impl Into<String>,
        expected_result_hint: impl Into<String>,
    ) -> Self {
        let spec = Self {
            case_type: case_type.into(),
            description: description.into(),
            preconditions: preconditions.into(),
            steps_hint: steps_hint.into(),
            expected_result_hint: expected_result_hint.into(),
        };
        debug_assert!(!spec.case_type.is_empty(), "Case type must not be empty");
        spec
    }
}

/// Produces an ordered sequence of specifications.
pub trait SpecificationSource {
    /// Produce the specifications, in the order they should be generated.
    fn produce(&self) -> Vec<TestCaseSpecification>;
}

/// Errors constructing a specification source.
#[derive(Debug, thiserror::Error)]
pub enum SpecError {
    #[error("failed to read specification file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid specification file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("specification file {0} contains no specifications")]
    Empty(String),
}

/// The built-in catalogue for the login feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoginCatalogue {
    extended: bool,
}

impl LoginCatalogue {
    /// The two functional specifications (positive and negative login).
    #[must_use]
    pub fn core() -> Self {
        Self { extended: false }
    }

    /// The full catalogue: functional, edge cases, cross-browser, security,
    /// performance and WCAG 2.1 accessibility.
    #[must_use]
    pub fn extended() -> Self {
        Self { extended: true }
    }
}

impl Default for LoginCatalogue {
    fn default() -> Self {
        Self::core()
    }
}

impl SpecificationSource for LoginCatalogue {
    fn produce(&self) -> Vec<TestCaseSpecification> {
        let mut specs = vec![
            TestCaseSpecification::new(
                "Functional - Positive",
                "Verify successful login with valid credentials.",
                "User account exists.",
                "Enter valid username and password. Click login button.",
                "User is logged in successfully.",
            ),
            TestCaseSpecification::new(
                "Functional - Negative",
                "Verify login failure with invalid credentials.",
                "None.",
                "Enter invalid username and password. Click login button.",
                "Error message is displayed.",
            ),
        ];

        if !self.extended {
            return specs;
        }

        specs.extend([
            TestCaseSpecification::new(
                "Edge Case",
                "Verify login with a very long username.",
                "None.",
                "Enter a username exceeding maximum length. Enter valid password. Click login button.",
                "Appropriate error message is displayed or username is truncated.",
            ),
            TestCaseSpecification::new(
                "Edge Case",
                "Verify login with special characters in the username.",
                "None.",
                "Enter a username containing special characters. Enter valid password. Click login button.",
                "Login is successful or appropriate error message is displayed.",
            ),
        ]);

        for browser in ["Chrome", "Firefox", "Edge"] {
            specs.push(TestCaseSpecification::new(
                format!("Cross-Browser - {browser}"),
                format!("Verify login functionality on {browser} browser."),
                format!("{browser} browser is installed."),
                format!(
                    "Open application in {browser}. Enter valid username and password. Click login button."
                ),
                format!("User is logged in successfully in {browser}."),
            ));
        }

        specs.extend([
            TestCaseSpecification::new(
                "Security - SQL Injection",
                "Attempt SQL injection in username field.",
                "None.",
                "Enter SQL injection string in username field. Enter valid password. Click login.",
                "Application is not vulnerable to SQL injection. Error message or secure handling.",
            ),
            TestCaseSpecification::new(
                "Security - Brute Force",
                "Attempt to brute force the login.",
                "None.",
                "Simulate multiple login attempts with incorrect passwords.",
                "Account lockout mechanism or rate limiting is in place.",
            ),
            TestCaseSpecification::new(
                "Performance - Response Time",
                "Measure login response time.",
                "Stable network connection.",
                "Enter valid credentials and click login. Measure time taken for login to complete.",
                "Login response time is within acceptable limits (e.g., < 2 seconds).",
            ),
            TestCaseSpecification::new(
                "Performance - Concurrent Users",
                "Verify login performance with concurrent users.",
                "Test environment that supports concurrent users.",
                "Simulate multiple users logging in simultaneously.",
                "Application handles concurrent logins without significant performance degradation.",
            ),
            TestCaseSpecification::new(
                "Accessibility - Perceivable",
                "Verify that all non-text content has text alternatives.",
                "Login page is displayed.",
                "Check if all images and icons on the login page have appropriate alt text.",
                "All non-text content has text alternatives.",
            ),
            TestCaseSpecification::new(
                "Accessibility - Operable",
                "Verify that all functionality is available from a keyboard.",
                "Login page is displayed.",
                "Navigate the login page using only the keyboard (Tab, Shift+Tab, Enter).",
                "All elements, including the login form and buttons, are accessible and operable via keyboard.",
            ),
            TestCaseSpecification::new(
                "Accessibility - Understandable",
                "Verify that the login page text is readable.",
                "Login page is displayed.",
                "Check the contrast ratio between text and background. Check font size and readability.",
                "Text is easily readable with sufficient contrast and appropriate font size.",
            ),
            TestCaseSpecification::new(
                "Accessibility - Robust",
                "Verify that the login page is compatible with assistive technologies.",
                "Login page is displayed. Screen reader software is installed and running.",
                "Use a screen reader to navigate the login page.",
                "Screen reader can correctly interpret and announce all elements on the page, including labels, form fields, and buttons.",
            ),
        ]);

        specs
    }
}

/// A fixed, caller-supplied list of specifications.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FixedSource {
    specs: Vec<TestCaseSpecification>,
}

impl FixedSource {
    pub fn new(specs: Vec<TestCaseSpecification>) -> Self {
        Self { specs }
    }

    /// Load a JSON array of specification objects.
    pub fn from_json_file(path: &Path) -> Result<Self, SpecError> {
        let display = path.display().to_string();
        let content = std::fs::read_to_string(path).map_err(|source| SpecError::Io {
            path: display.clone(),
            source,
        })?;
        Self::from_json_str(&content, &display)
    }

    fn from_json_str(content: &str, origin: &str) -> Result<Self, SpecError> {
        let specs: Vec<TestCaseSpecification> =
            serde_json::from_str(content).map_err(|source| SpecError::Parse {
                path: origin.to_string(),
                source,
            })?;

        if specs.is_empty() {
            return Err(SpecError::Empty(origin.to_string()));
        }
        Ok(Self { specs })
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

impl SpecificationSource for FixedSource {
    fn produce(&self) -> Vec<TestCaseSpecification> {
        self.specs.clone()
    }
}

/// Specifications derived from a parsed user story.
///
/// One "Scenario" specification per covered scenario, then one "Acceptance"
/// specification per acceptance criterion, both in document order.
#[derive(Debug, Clone)]
pub struct StorySource {
    story: UserStory,
}

impl StorySource {
    pub fn new(story: UserStory) -> Self {
        Self { story }
    }

    pub fn story(&self) -> &UserStory {
        &self.story
    }

    fn preconditions(&self) -> String {
        match &self.story.role {
            Some(role) => format!("Tester acts as {role}. Application is running."),
            None => "Application is running.".to_string(),
        }
    }
}

impl SpecificationSource for StorySource {
    fn produce(&self) -> Vec<TestCaseSpecification> {
        let preconditions = self.preconditions();
        let expected = match &self.story.benefit {
            Some(benefit) => format!("Outcome supports the story goal: {benefit}"),
            None => String::new(),
        };

        let scenarios = self.story.scenarios.iter().map(|scenario| {
            TestCaseSpecification::new(
                "Scenario",
                scenario.clone(),
                preconditions.clone(),
                scenario.clone(),
                expected.clone(),
            )
        });

        let criteria = self.story.acceptance_criteria.iter().map(|criterion| {
            TestCaseSpecification::new(
                "Acceptance",
                format!("Verify acceptance criterion: {criterion}"),
                preconditions.clone(),
                String::new(),
                criterion.clone(),
            )
        });

        scenarios.chain(criteria).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_catalogue() {
        let specs = LoginCatalogue::core().produce();
        assert_eq!(specs.len(), 2);
        assert_eq!(specs[0].case_type, "Functional - Positive");
        assert_eq!(specs[1].case_type, "Functional - Negative");
    }

    #[test]
    fn test_extended_catalogue() {
        let specs = LoginCatalogue::extended().produce();
        assert_eq!(specs.len(), 14);
        assert_eq!(specs[..2], LoginCatalogue::core().produce()[..]);
        assert_eq!(specs[4].case_type, "Cross-Browser - Chrome");
        assert_eq!(specs[13].case_type, "Accessibility - Robust");
    }

    #[test]
    fn test_catalogue_is_deterministic() {
        let catalogue = LoginCatalogue::extended();
        assert_eq!(catalogue.produce(), catalogue.produce());
    }

    #[test]
    fn test_fixed_source_from_json() {
        let json = r#"[
            {"type": "Smoke", "description": "App starts.", "preconditions": "None."},
            {"type": "Logout", "description": "User logs out.", "steps": "Click logout.", "expected_result": "Login page shown."}
        ]"#;
        let source = FixedSource::from_json_str(json, "inline").unwrap();
        let specs = source.produce();
        assert_eq!(specs.len(), 2);
        assert_eq!(specs[0].steps_hint, "");
        assert_eq!(specs[1].steps_hint, "Click logout.");
        assert_eq!(specs[1].expected_result_hint, "Login page shown.");
    }

    #[test]
    fn test_fixed_source_rejects_empty() {
        let err = FixedSource::from_json_str("[]", "inline").unwrap_err();
        assert!(matches!(err, SpecError::Empty(_)));
    }

    #[test]
    fn test_fixed_source_rejects_missing_type() {
        let err = FixedSource::from_json_str(r#"[{"description": "x"}]"#, "inline").unwrap_err();
        assert!(matches!(err, SpecError::Parse { .. }));
    }

    #[test]
    fn test_fixed_source_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = FixedSource::from_json_file(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, SpecError::Io { .. }));
    }

    #[test]
    fn test_spec_json_field_names() {
        let spec = TestCaseSpecification::new("T", "D", "P", "S", "E");
        let value = serde_json::to_value(&spec).unwrap();
        assert_eq!(value["type"], "T");
        assert_eq!(value["steps"], "S");
        assert_eq!(value["expected_result"], "E");
    }

    #[test]
    fn test_story_source_order() {
        let story = UserStory::parse(
            "As a QA engineer, I want to verify login So that access is safe.\n\
             Acceptance Criteria:\n1. Login redirects to dashboard.\n2. Logout returns to login page.\n\
             Scenarios Covered:\n1. Successful login and logout.\n2. Failed login.",
        );
        let specs = StorySource::new(story).produce();

        let types: Vec<&str> = specs.iter().map(|s| s.case_type.as_str()).collect();
        assert_eq!(types, ["Scenario", "Scenario", "Acceptance", "Acceptance"]);
        assert_eq!(specs[0].description, "Successful login and logout.");
        assert!(specs[0].preconditions.contains("QA engineer"));
        assert_eq!(specs[3].expected_result_hint, "Logout returns to login page.");
    }
}
