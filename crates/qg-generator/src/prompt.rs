//! Prompt construction.
//!
//! Prompts are pure functions of their inputs: the same specification and
//! feature name always produce the same prompt string.

use qg_core::TestCaseSpecification;

/// Builds prompts for the generation service.
pub struct PromptBuilder;

impl PromptBuilder {
    /// Prompt for expanding one specification into a full test case.
    ///
    /// Type, description and preconditions are embedded verbatim. The step
    /// and expected-result hints are appended as guidance when present.
    pub fn build_case_prompt(spec: &TestCaseSpecification, feature: &str) -> String {
        let guidance = Self::format_guidance(spec);

        format!(
            r#"You are a QA engineer who writes detailed, executable test cases.
Expand the test case specification below into one complete test case with exactly these sections:

*   **Test Case ID:** (a unique identifier such as {id_example})
*   **Test Case Type:** {case_type}
*   **Description:** {description}
*   **Feature:** {feature}
*   **Preconditions:** {preconditions}
*   **Test Data:** (concrete inputs where applicable, e.g. usernames, passwords, special characters)
*   **Steps:** (detailed, numbered steps)
*   **Expected Result:** (the expected outcome of each step)
*   **Postconditions:** (system state once the test has run)
*   **Pass/Fail Criteria:**
*   **Notes:** (assumptions, risks or anything else a tester should know)
{guidance}
Return only the test case, formatted with clear sections. No introduction or closing remarks.
Use markdown headings and tables where they help readability."#,
            id_example = Self::id_example(spec, feature),
            case_type = spec.case_type,
            description = spec.description,
            feature = feature,
            preconditions = spec.preconditions,
            guidance = guidance,
        )
    }

    /// Prompt for generating a broad test suite from a whole user story in
    /// one request.
    pub fn build_story_prompt(story: &str) -> String {
        format!(
            r#"You are a QA engineer. Generate test cases for the following user story:

{story}

The test cases must cover:
- **Functional scenarios**
- **Positive scenarios**
- **Negative scenarios**
- **Edge cases** (e.g. very long usernames, special characters)
- **Cross-browser testing** (e.g. Chrome, Firefox, Edge)
- **Security testing** (e.g. SQL injection, brute force attacks)
- **Performance testing** (e.g. response time, concurrent users)
- **Accessibility** across all four WCAG 2.1 principles:
    - **Perceivable** (text alternatives, adaptable content, distinguishable elements)
    - **Operable** (keyboard access, enough time, seizure safety, navigability)
    - **Understandable** (readable text, input assistance)
    - **Robust** (compatibility with assistive technologies)

Return the test cases as a structured, numbered list."#,
            story = story.trim(),
        )
    }

    fn id_example(spec: &TestCaseSpecification, feature: &str) -> String {
        let area = spec
            .case_type
            .split(" - ")
            .next()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(feature);
        format!("TC_{}_{}_001", id_token(feature), id_token(area))
    }

    fn format_guidance(spec: &TestCaseSpecification) -> String {
        let mut lines = Vec::new();
        if !spec.steps_hint.trim().is_empty() {
            lines.push(format!("- Suggested steps: {}", spec.steps_hint.trim()));
        }
        if !spec.expected_result_hint.trim().is_empty() {
            lines.push(format!(
                "- Expected outcome: {}",
                spec.expected_result_hint.trim()
            ));
        }

        if lines.is_empty() {
            String::new()
        } else {
            format!("\nBuild on this outline:\n{}\n", lines.join("\n"))
        }
    }
}

/// Upper-case alphanumeric token for identifiers ("Cross-Browser" -> "CROSS_BROWSER").
fn id_token(s: &str) -> String {
    let token: Vec<String> = s
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(str::to_ascii_uppercase)
        .collect();
    if token.is_empty() {
        "CASE".to_string()
    } else {
        token.join("_")
    }
}

/// Tidy a service response.
///
/// Trims surrounding whitespace and unwraps the response when the whole of
/// it is a single fenced block (```` ```markdown ... ``` ````).
pub fn tidy_response(response: &str) -> String {
    let trimmed = response.trim();

    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed.to_string();
    };
    let Some(body) = rest.strip_suffix("```") else {
        return trimmed.to_string();
    };
    // Drop the info string on the opening fence line
    let body = match body.find('\n') {
        Some(newline) => &body[newline + 1..],
        None => return trimmed.to_string(),
    };
    if body.contains("```") {
        return trimmed.to_string();
    }
    body.trim().to_string()
}
