//! Structural checks for requirements documents.
//!
//! Only requirements are checked; design and task documents are free-form.
//! Results are advisory and never gate approval.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Keywords of the EARS requirements syntax.
pub const EARS_KEYWORDS: [&str; 4] = ["WHEN", "THEN", "SHALL", "IF"];

/// Minimum number of distinct requirement entries before no suggestion is made.
pub const MIN_REQUIREMENTS: usize = 3;

static REQUIREMENT_HEADING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*###[ \t]+Requirement\b(.*)$").expect("valid requirement heading regex")
});

/// Result of validating a requirements document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// False when any required marker is missing
    pub valid: bool,

    /// Missing markers
    pub issues: Vec<String>,

    /// Non-blocking improvement hints
    pub suggestions: Vec<String>,
}

impl ValidationReport {
    /// Whether there is nothing to report at all.
    pub fn is_clean(&self) -> bool {
        self.valid && self.issues.is_empty() && self.suggestions.is_empty()
    }
}

/// Validator for requirements documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentValidator;

impl DocumentValidator {
    /// Create a new validator.
    pub fn new() -> Self {
        Self
    }

    /// Validate a requirements document.
    pub fn validate(&self, content: &str) -> ValidationReport {
        let mut issues = Vec::new();

        let markers = [
            ("# Requirements Document", "Missing main title '# Requirements Document'"),
            ("## Introduction", "Missing Introduction section"),
            ("## Requirements", "Missing Requirements section"),
            ("**User Story:**", "No user stories found"),
        ];
        for (marker, issue) in markers {
            if !content.contains(marker) {
                issues.push(issue.to_string());
            }
        }

        if !EARS_KEYWORDS.iter().any(|keyword| content.contains(keyword)) {
            issues.push("No EARS format criteria found (WHEN/THEN/SHALL/IF)".to_string());
        }

        let mut suggestions = Vec::new();

        let count = count_requirements(content);
        if count < MIN_REQUIREMENTS {
            suggestions.push(format!(
                "Consider adding more detailed requirements (found {count}, expected at least {MIN_REQUIREMENTS})"
            ));
        }

        let lower = content.to_lowercase();
        if !lower.contains("edge case") {
            suggestions.push("Consider adding edge case handling requirements".to_string());
        }
        if !lower.contains("error") {
            suggestions.push("Consider adding error handling requirements".to_string());
        }

        ValidationReport { valid: issues.is_empty(), issues, suggestions }
    }
}

/// Count distinct `### Requirement ...` headings.
pub fn count_requirements(content: &str) -> usize {
    REQUIREMENT_HEADING
        .captures_iter(content)
        .map(|caps| caps.get(1).map_or("", |m| m.as_str()).trim().to_string())
        .collect::<HashSet<_>>()
        .len()
}
