//! Writing generated suites and test plans to disk.

use std::fmt::Write as _;
use std::path::Path;

use qg_core::{verify_suite, GenerationResult, UserStory};

/// Separator written after each test case.
const SEPARATOR_WIDTH: usize = 80;

/// Output errors. Never retried.
#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error("Refusing to write malformed suite: {0}")]
    Malformed(String),

    #[error("Failed to write {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Render results as the output document.
pub fn format_suite(results: &[GenerationResult]) -> String {
    let separator = "-".repeat(SEPARATOR_WIDTH);
    let mut out = String::new();
    for result in results {
        out.push_str(&format!("## Test Case {}\n\n", result.label()));
        out.push_str(&result.text);
        out.push_str("\n\n");
        out.push_str(&separator);
        out.push_str("\n\n");
    }
    out
}

/// Write a complete suite, replacing any existing file.
///
/// An empty or misordered suite is refused and the file is left alone.
pub fn write_suite(path: &Path, results: &[GenerationResult]) -> Result<(), WriteError> {
    if results.is_empty() {
        return Err(WriteError::Malformed("No test cases generated".to_string()));
    }
    verify_suite(results, results.len()).map_err(|check| WriteError::Malformed(check.format_status()))?;
    write_text(path, &format_suite(results))
}

const TEST_BROWSERS: &[&str] = &[
    "Chromium (latest stable version)",
    "Firefox (latest stable version)",
    "WebKit (latest version)",
];

const DELIVERABLES: &[&str] = &[
    "Automated test scripts",
    "Test reports",
    "Screenshots",
    "Test execution logs",
];

const ENTRY_CRITERIA: &[&str] = &[
    "Application is deployed.",
    "Test environment is set up.",
    "Test data is available.",
    "Test scripts are validated.",
];

const EXIT_CRITERIA: &[&str] = &[
    "All test cases executed.",
    "Test reports generated and analyzed.",
    "All critical defects resolved.",
    "Acceptance criteria met.",
];

/// Render a Markdown test plan for a user story.
///
/// `cases` fills the Test Cases section, in order; an empty slice leaves a
/// placeholder. Output depends only on the inputs.
pub fn format_test_plan(story: &UserStory, cases: &[GenerationResult]) -> String {
    let stated = |part: &Option<String>| part.clone().unwrap_or_else(|| "Not stated".to_string());
    let mut out = String::new();

    // Writing to a String cannot fail
    let _ = writeln!(out, "# Test Plan: {}\n", plan_title(story));

    out.push_str("## 1. Introduction\n\n");
    let _ = writeln!(
        out,
        "**Purpose:** This test plan outlines the strategy for verifying that a {} can {}.\n",
        stated(&story.role),
        stated(&story.goal)
    );
    out.push_str(
        "**Scope:** The acceptance criteria and scenarios below, across the supported browsers.\n\n",
    );

    out.push_str("## 2. User Story\n\n");
    let _ = writeln!(out, "- **As a:** {}", stated(&story.role));
    let _ = writeln!(out, "- **I want to:** {}", stated(&story.goal));
    let _ = writeln!(out, "- **So that:** {}\n", stated(&story.benefit));

    out.push_str("## 3. Acceptance Criteria\n\n");
    push_numbered(&mut out, &story.acceptance_criteria);

    out.push_str("## 4. Scenarios Covered\n\n");
    push_numbered(&mut out, &story.scenarios);

    out.push_str("## 5. Test Cases\n\n");
    if cases.is_empty() {
        out.push_str("No test cases generated.\n\n");
    }
    for case in cases {
        let _ = writeln!(out, "### Test Case {}\n\n{}\n", case.label(), case.text);
    }

    out.push_str("## 6. Test Environment\n\n");
    out.push_str("**Browsers:**\n\n");
    push_bullets(&mut out, TEST_BROWSERS);
    out.push_str("**Operating system:** Any platform that runs the browsers above (Windows, macOS, Linux).\n\n");
    out.push_str("**CI/CD:** Tests must be executable within a CI/CD pipeline.\n\n");

    out.push_str("## 7. Test Data\n\n");
    out.push_str("- **Valid users:** At least one user with valid credentials.\n");
    out.push_str("- **Invalid users:** Users with invalid credentials.\n");
    out.push_str("- **Base URL:** The application's entry page.\n\n");

    out.push_str("## 8. Test Deliverables\n\n");
    push_bullets(&mut out, DELIVERABLES);

    out.push_str("## 9. Entry and Exit Criteria\n\n");
    out.push_str("**Entry Criteria:**\n\n");
    push_bullets(&mut out, ENTRY_CRITERIA);
    out.push_str("**Exit Criteria:**\n\n");
    push_bullets(&mut out, EXIT_CRITERIA);

    out
}

/// Write a test plan, replacing any existing file.
pub fn write_test_plan(
    path: &Path,
    story: &UserStory,
    cases: &[GenerationResult],
) -> Result<(), WriteError> {
    if !cases.is_empty() {
        verify_suite(cases, cases.len())
            .map_err(|check| WriteError::Malformed(check.format_status()))?;
    }
    write_text(path, &format_test_plan(story, cases))
}

fn plan_title(story: &UserStory) -> String {
    match story.goal.as_deref() {
        Some(goal) => {
            let mut chars = goal.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => "User Story".to_string(),
            }
        }
        None => "User Story".to_string(),
    }
}

fn push_numbered(out: &mut String, items: &[String]) {
    if items.is_empty() {
        out.push_str("None stated.\n\n");
        return;
    }
    for (i, item) in items.iter().enumerate() {
        let _ = writeln!(out, "{}. {}", i + 1, item);
    }
    out.push('\n');
}

fn push_bullets(out: &mut String, items: &[&str]) {
    for item in items {
        let _ = writeln!(out, "- {item}");
    }
    out.push('\n');
}

/// Write `text` as the whole file, creating missing parent directories.
pub fn write_text(path: &Path, text: &str) -> Result<(), WriteError> {
    let io_error = |source: std::io::Error| WriteError::Io {
        path: path.display().to_string(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_error)?;
    }
    std::fs::write(path, text).map_err(io_error)?;

    tracing::info!(path = %path.display(), bytes = text.len(), "Wrote output");
    Ok(())
}
