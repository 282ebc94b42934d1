//! Structural checks on a generated suite.
//!
//! A suite is only worth writing out if it lines up with the
//! specifications it came from: one result per specification, in order,
//! none of them blank.

use crate::result::GenerationResult;

/// Result of checking one suite property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    /// Property name (e.g. "OrderPreserved")
    pub name: &'static str,

    /// Whether the property holds
    pub holds: bool,

    /// Description of the violation if it doesn't hold
    pub violation: Option<String>,
}

impl CheckResult {
    #[must_use]
    pub fn pass(name: &'static str) -> Self {
        debug_assert!(!name.is_empty(), "Property name must not be empty");
        Self {
            name,
            holds: true,
            violation: None,
        }
    }

    #[must_use]
    pub fn fail(name: &'static str, violation: String) -> Self {
        debug_assert!(!name.is_empty(), "Property name must not be empty");
        debug_assert!(!violation.is_empty(), "Violation description must not be empty");
        Self {
            name,
            holds: false,
            violation: Some(violation),
        }
    }

    /// Format as a single-line status for logging.
    #[must_use]
    pub fn format_status(&self) -> String {
        if self.holds {
            format!("[PASS] {}", self.name)
        } else {
            format!(
                "[FAIL] {}: {}",
                self.name,
                self.violation.as_deref().unwrap_or("unknown")
            )
        }
    }
}

/// Check every suite property. Passing properties are included.
pub fn check_suite(results: &[GenerationResult], expected_len: usize) -> Vec<CheckResult> {
    vec![
        check_complete(results, expected_len),
        check_order(results),
        check_non_empty(results),
    ]
}

/// Verify all suite properties, returning the first failure.
pub fn verify_suite(results: &[GenerationResult], expected_len: usize) -> Result<(), CheckResult> {
    for result in check_suite(results, expected_len) {
        if !result.holds {
            return Err(result);
        }
    }
    Ok(())
}

fn check_complete(results: &[GenerationResult], expected_len: usize) -> CheckResult {
    if results.len() == expected_len {
        CheckResult::pass("Complete")
    } else {
        CheckResult::fail(
            "Complete",
            format!("expected {} results, found {}", expected_len, results.len()),
        )
    }
}

fn check_order(results: &[GenerationResult]) -> CheckResult {
    match results.iter().enumerate().find(|(i, r)| r.index != *i) {
        None => CheckResult::pass("OrderPreserved"),
        Some((position, result)) => CheckResult::fail(
            "OrderPreserved",
            format!("position {} holds result for index {}", position, result.index),
        ),
    }
}

fn check_non_empty(results: &[GenerationResult]) -> CheckResult {
    match results.iter().find(|r| r.text.trim().is_empty()) {
        None => CheckResult::pass("NonEmpty"),
        Some(result) => CheckResult::fail(
            "NonEmpty",
            format!("result {} has no text", result.index),
        ),
    }
}
