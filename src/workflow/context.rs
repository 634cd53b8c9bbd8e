//! Optional codebase context fed into generation prompts.
//!
//! Scans an existing project so requirements and design drafts can take the
//! current stack into account.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

/// Directories never descended into while scanning.
const IGNORED_DIRS: &[&str] =
    &[".git", "node_modules", "target", "dist", "build", "__pycache__", ".venv", ".specflow"];

/// Maximum characters of the summary included in a prompt.
pub const SUMMARY_PROMPT_CHARS: usize = 500;

/// Summary of an existing codebase.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodebaseContext {
    /// Detected languages, most common first
    pub languages: Vec<String>,

    /// Number of files scanned
    pub file_count: usize,

    /// Free-form architecture notes
    #[serde(default)]
    pub summary: String,
}

impl CodebaseContext {
    /// Scan a directory tree.
    pub fn scan(root: &Path) -> anyhow::Result<Self> {
        if !root.is_dir() {
            anyhow::bail!("Not a directory: {}", root.display());
        }

        let mut file_count = 0;
        let mut by_language: BTreeMap<&'static str, usize> = BTreeMap::new();

        let walker = WalkDir::new(root).into_iter().filter_entry(|entry| {
            entry.depth() == 0
                || !entry.file_type().is_dir()
                || !entry.file_name().to_str().is_some_and(|name| IGNORED_DIRS.contains(&name))
        });

        for entry in walker.filter_map(Result::ok) {
            if !entry.file_type().is_file() {
                continue;
            }
            file_count += 1;

            let language = entry
                .path()
                .extension()
                .and_then(|ext| ext.to_str())
                .and_then(|ext| language_for_extension(&ext.to_lowercase()));
            if let Some(language) = language {
                *by_language.entry(language).or_insert(0) += 1;
            }
        }

        let mut ranked: Vec<(&str, usize)> = by_language.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

        let languages: Vec<String> = ranked.iter().map(|(name, _)| (*name).to_string()).collect();
        let summary = ranked
            .iter()
            .map(|(name, count)| format!("{name}: {count} file(s)"))
            .collect::<Vec<_>>()
            .join(", ");

        tracing::debug!(root = %root.display(), file_count, languages = ?languages, "Scanned codebase");

        Ok(Self { languages, file_count, summary })
    }

    /// Attach free-form notes to the summary.
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    /// Render as a prompt section.
    pub fn to_prompt_section(&self, heading: &str) -> String {
        let languages =
            if self.languages.is_empty() { "unknown".to_string() } else { self.languages.join(", ") };
        let summary = if self.summary.is_empty() {
            "No analysis available".to_string()
        } else {
            truncate_chars(&self.summary, SUMMARY_PROMPT_CHARS)
        };

        format!(
            "{heading}:\n- Languages: {languages}\n- File Count: {}\n- Architecture Insights: {summary}\n",
            self.file_count
        )
    }
}

/// Map a lowercase file extension to a language name.
pub fn language_for_extension(ext: &str) -> Option<&'static str> {
    let language = match ext {
        "py" => "Python",
        "js" => "JavaScript",
        "ts" => "TypeScript",
        "java" => "Java",
        "cpp" => "C++",
        "c" => "C",
        "cs" => "C#",
        "go" => "Go",
        "rs" => "Rust",
        "php" => "PHP",
        "rb" => "Ruby",
        "html" => "HTML",
        "css" => "CSS",
        "sql" => "SQL",
        "json" => "JSON",
        "yaml" | "yml" => "YAML",
        "xml" => "XML",
        "md" => "Markdown",
        _ => return None,
    };
    Some(language)
}

/// Truncate to at most `max` characters, marking the cut with an ellipsis.
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
