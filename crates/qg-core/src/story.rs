//! Best-effort parsing of a user story document.
//!
//! Recognises the "As a ..., I want to ... So that ..." sentence and the
//! numbered lists under "Acceptance Criteria:" and "Scenarios Covered:" (or
//! "Test Scenarios:"). Missing parts are left empty; parsing never fails.

use std::sync::OnceLock;

use regex::Regex;

/// The parts of a user story the generator cares about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserStory {
    /// Text after "As a"
    pub role: Option<String>,
    /// Text after "I want to"
    pub goal: Option<String>,
    /// Text after "So that"
    pub benefit: Option<String>,
    pub acceptance_criteria: Vec<String>,
    pub scenarios: Vec<String>,
    /// The full story, as read
    pub text: String,
}

fn statement_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?is)\bAs an? (.+?),\s*I want to (.+?),?\s+So that ([^\n]+)")
            .expect("statement pattern is valid")
    })
}

fn criteria_header() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)Acceptance Criteria:").expect("criteria pattern is valid")
    })
}

fn scenarios_header() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)(Scenarios Covered:|Test Scenarios:)").expect("scenarios pattern is valid")
    })
}

fn list_marker() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?m)^\s*\d+[.)]\s+").expect("list marker pattern is valid"))
}

impl UserStory {
    /// Parse a user story from plain text.
    pub fn parse(text: &str) -> Self {
        let mut story = UserStory {
            text: text.to_string(),
            ..Default::default()
        };

        if let Some(caps) = statement_pattern().captures(text) {
            story.role = caps.get(1).map(|m| collapse_whitespace(m.as_str()));
            story.goal = caps.get(2).map(|m| collapse_whitespace(m.as_str()));
            story.benefit = caps.get(3).map(|m| collapse_whitespace(m.as_str()));
        }

        let criteria = criteria_header().find(text);
        let scenarios = scenarios_header().find(text);

        if let Some(header) = criteria {
            let end = match scenarios {
                Some(next) if next.start() > header.end() => next.start(),
                _ => text.len(),
            };
            story.acceptance_criteria = split_items(&text[header.end()..end]);
        }

        if let Some(header) = scenarios {
            let end = match criteria {
                Some(next) if next.start() > header.end() => next.start(),
                _ => text.len(),
            };
            story.scenarios = split_items(&text[header.end()..end]);
        }

        story
    }

    /// Whether the "As a / I want to / So that" sentence was found.
    pub fn has_statement(&self) -> bool {
        self.role.is_some() && self.goal.is_some()
    }
}

fn split_items(section: &str) -> Vec<String> {
    list_marker()
        .split(section)
        .map(collapse_whitespace)
        .filter(|item| !item.is_empty())
        .collect()
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
