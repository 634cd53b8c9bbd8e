//! Structured task lists.
//!
//! The tasks document is stored exactly as generated. This module turns that raw
//! text into tasks when it is a JSON array, and renders them as Markdown for export.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

static FENCED_JSON: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```(?:json)?\s*(\[.*?\])\s*```").expect("valid fenced json regex"));

/// One implementation task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskItem {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,

    #[serde(default = "untitled")]
    pub title: String,

    #[serde(default)]
    pub description: String,

    /// implementation, testing or documentation
    #[serde(default, rename = "type")]
    pub kind: String,

    #[serde(default = "medium")]
    pub priority: String,

    #[serde(default)]
    pub estimated_hours: Option<f64>,

    #[serde(default, deserialize_with = "lenient_strings")]
    pub requirements_refs: Vec<String>,

    #[serde(default, deserialize_with = "lenient_strings")]
    pub dependencies: Vec<String>,

    #[serde(default, deserialize_with = "lenient_strings")]
    pub acceptance_criteria: Vec<String>,
}

fn untitled() -> String {
    "Untitled Task".to_string()
}

fn medium() -> String {
    "medium".to_string()
}

fn value_to_string(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Value::deserialize(deserializer).map(value_to_string)
}

fn lenient_strings<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    let values = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(values.into_iter().map(value_to_string).collect())
}

/// A parsed task list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskList {
    pub tasks: Vec<TaskItem>,

    /// False when the content was not a JSON task array and was wrapped as one task
    pub structured: bool,
}

impl TaskList {
    /// Parse generated tasks content.
    ///
    /// Accepts a bare JSON array, a fenced JSON block or an array embedded in
    /// surrounding prose. Anything else becomes a single catch-all task.
    pub fn parse(content: &str) -> Self {
        match Self::parse_json(content) {
            Some(tasks) => Self { tasks, structured: true },
            None => {
                tracing::debug!("Task content is not a JSON array, using a single task");
                Self { tasks: vec![Self::fallback_task(content)], structured: false }
            }
        }
    }

    fn parse_json(content: &str) -> Option<Vec<TaskItem>> {
        let trimmed = content.trim();

        if let Ok(tasks) = serde_json::from_str(trimmed) {
            return Some(tasks);
        }

        if let Some(block) = FENCED_JSON.captures(trimmed).and_then(|caps| caps.get(1)) {
            if let Ok(tasks) = serde_json::from_str(block.as_str()) {
                return Some(tasks);
            }
        }

        let start = trimmed.find('[')?;
        let end = trimmed.rfind(']')?;
        if end <= start {
            return None;
        }
        serde_json::from_str(&trimmed[start..=end]).ok()
    }

    fn fallback_task(content: &str) -> TaskItem {
        TaskItem {
            id: "1".to_string(),
            title: "Implementation Tasks".to_string(),
            description: content.trim().to_string(),
            kind: "implementation".to_string(),
            priority: "high".to_string(),
            estimated_hours: Some(8.0),
            requirements_refs: Vec::new(),
            dependencies: Vec::new(),
            acceptance_criteria: vec!["Complete implementation as described".to_string()],
        }
    }

    /// Total estimated hours across all tasks.
    pub fn total_hours(&self) -> f64 {
        self.tasks.iter().filter_map(|task| task.estimated_hours).sum()
    }

    /// Render as a Markdown document.
    pub fn to_markdown(&self) -> String {
        let mut md = String::from("# Implementation Tasks\n\n");

        for (i, task) in self.tasks.iter().enumerate() {
            md.push_str(&format!("## {}. {}\n\n", i + 1, task.title));

            let description =
                if task.description.is_empty() { "No description" } else { &task.description };
            md.push_str(&format!("**Description:** {description}\n\n"));
            md.push_str(&format!("**Priority:** {}\n\n", task.priority));

            let hours = task.estimated_hours.map_or_else(|| "TBD".to_string(), |h| h.to_string());
            md.push_str(&format!("**Estimated Hours:** {hours}\n\n"));

            if !task.requirements_refs.is_empty() {
                md.push_str(&format!("**Requirements:** {}\n\n", task.requirements_refs.join(", ")));
            }

            if !task.acceptance_criteria.is_empty() {
                md.push_str("**Acceptance Criteria:**\n");
                for criterion in &task.acceptance_criteria {
                    md.push_str(&format!("- {criterion}\n"));
                }
                md.push('\n');
            }

            md.push_str("---\n\n");
        }

        md
    }
}
