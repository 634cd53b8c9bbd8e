//! Document storage with per-document versioning and approval flags.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::phase::DocType;

/// A drafted document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Which document this is
    pub doc_type: DocType,

    /// Raw text content
    pub content: String,

    /// Version, starting at 1 and incremented on every content change
    pub version: u32,

    /// When this version was created
    pub created_at: DateTime<Utc>,

    /// Version of the upstream document this content was generated from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub derived_from: Option<u32>,
}

/// Approval flags, one per document type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Approvals {
    pub requirements: bool,
    pub design: bool,
    pub tasks: bool,
}

impl Approvals {
    /// Get the flag for a document.
    pub fn get(&self, doc: DocType) -> bool {
        match doc {
            DocType::Requirements => self.requirements,
            DocType::Design => self.design,
            DocType::Tasks => self.tasks,
        }
    }

    fn set(&mut self, doc: DocType, value: bool) {
        match doc {
            DocType::Requirements => self.requirements = value,
            DocType::Design => self.design = value,
            DocType::Tasks => self.tasks = value,
        }
    }
}

/// Holds content, version and approval state for each document type.
///
/// Any content change bumps the version and clears that document's approval.
/// [`DocumentStore::approve`] is the only way to set a flag.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentStore {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    requirements: Option<Document>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    design: Option<Document>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    tasks: Option<Document>,

    #[serde(default)]
    approvals: Approvals,
}

impl DocumentStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a document if it exists.
    pub fn get(&self, doc: DocType) -> Option<&Document> {
        match doc {
            DocType::Requirements => self.requirements.as_ref(),
            DocType::Design => self.design.as_ref(),
            DocType::Tasks => self.tasks.as_ref(),
        }
    }

    fn slot(&mut self, doc: DocType) -> &mut Option<Document> {
        match doc {
            DocType::Requirements => &mut self.requirements,
            DocType::Design => &mut self.design,
            DocType::Tasks => &mut self.tasks,
        }
    }

    /// Current content of a document, empty if it has never been drafted.
    pub fn content(&self, doc: DocType) -> &str {
        self.get(doc).map_or("", |d| d.content.as_str())
    }

    /// Current version of a document, 0 if it has never been drafted.
    pub fn version(&self, doc: DocType) -> u32 {
        self.get(doc).map_or(0, |d| d.version)
    }

    /// Whether a document exists.
    pub fn contains(&self, doc: DocType) -> bool {
        self.get(doc).is_some()
    }

    /// Whether a document is approved.
    pub fn is_approved(&self, doc: DocType) -> bool {
        self.approvals.get(doc)
    }

    /// All approval flags.
    pub fn approvals(&self) -> Approvals {
        self.approvals
    }

    /// Whether `doc` exists and was generated from the current version of its upstream.
    pub fn is_current(&self, doc: DocType) -> bool {
        let Some(document) = self.get(doc) else {
            return false;
        };
        match doc.upstream() {
            Some(upstream) => document.derived_from == Some(self.version(upstream)),
            None => true,
        }
    }

    /// Store generated content as a new version of `doc`.
    pub fn put(&mut self, doc: DocType, content: String, derived_from: Option<u32>) -> &Document {
        let version = self.version(doc) + 1;
        self.approvals.set(doc, false);
        self.slot(doc).insert(Document {
            doc_type: doc,
            content,
            version,
            created_at: Utc::now(),
            derived_from,
        })
    }

    /// Replace the content of `doc` by hand, keeping its upstream link.
    pub fn edit(&mut self, doc: DocType, content: String) -> &Document {
        let derived_from = self.get(doc).and_then(|d| d.derived_from);
        self.put(doc, content, derived_from)
    }

    /// Set the approval flag of `doc`.
    pub fn approve(&mut self, doc: DocType) {
        self.approvals.set(doc, true);
    }

    /// Clear the approval flag of `doc`.
    pub fn revoke(&mut self, doc: DocType) {
        self.approvals.set(doc, false);
    }

    /// Clear the approval flag of every document downstream of `doc`.
    ///
    /// Returns the documents whose flag actually changed.
    pub fn invalidate_downstream(&mut self, doc: DocType) -> Vec<DocType> {
        let mut invalidated = Vec::new();
        for &downstream in doc.downstream() {
            if self.approvals.get(downstream) {
                invalidated.push(downstream);
            }
            self.approvals.set(downstream, false);
        }
        invalidated
    }

    /// Current content of every document, keyed by logical name.
    ///
    /// Missing documents export as empty strings.
    pub fn export(&self) -> BTreeMap<&'static str, String> {
        DocType::ALL.iter().map(|&doc| (doc.key(), self.content(doc).to_string())).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_increments_version() {
        let mut store = DocumentStore::new();
        assert_eq!(store.version(DocType::Requirements), 0);

        store.put(DocType::Requirements, "v1".to_string(), None);
        assert_eq!(store.version(DocType::Requirements), 1);

        store.put(DocType::Requirements, "v2".to_string(), None);
        assert_eq!(store.version(DocType::Requirements), 2);
        assert_eq!(store.content(DocType::Requirements), "v2");
    }

    #[test]
    fn test_content_change_resets_approval() {
        let mut store = DocumentStore::new();
        store.put(DocType::Design, "draft".to_string(), Some(1));
        store.approve(DocType::Design);
        assert!(store.is_approved(DocType::Design));

        store.edit(DocType::Design, "tweaked".to_string());
        assert!(!store.is_approved(DocType::Design));
        assert_eq!(store.version(DocType::Design), 2);
    }

    #[test]
    fn test_approve_does_not_touch_content() {
        let mut store = DocumentStore::new();
        store.put(DocType::Tasks, "tasks".to_string(), Some(1));
        let before = store.get(DocType::Tasks).cloned();

        store.approve(DocType::Tasks);

        assert_eq!(store.get(DocType::Tasks).cloned(), before);
    }

    #[test]
    fn test_edit_keeps_upstream_link() {
        let mut store = DocumentStore::new();
        store.put(DocType::Requirements, "reqs".to_string(), None);
        store.put(DocType::Design, "design".to_string(), Some(1));
        assert!(store.is_current(DocType::Design));

        store.edit(DocType::Design, "design, edited".to_string());
        assert!(store.is_current(DocType::Design));

        store.edit(DocType::Requirements, "reqs, edited".to_string());
        assert!(!store.is_current(DocType::Design));
    }

    #[test]
    fn test_invalidate_downstream() {
        let mut store = DocumentStore::new();
        for doc in DocType::ALL {
            store.put(doc, doc.key().to_string(), None);
            store.approve(doc);
        }

        let invalidated = store.invalidate_downstream(DocType::Requirements);

        assert_eq!(invalidated, vec![DocType::Design, DocType::Tasks]);
        assert!(store.is_approved(DocType::Requirements));
        assert!(!store.is_approved(DocType::Design));
        assert!(!store.is_approved(DocType::Tasks));
    }

    #[test]
    fn test_export_contains_all_keys() {
        let mut store = DocumentStore::new();
        store.put(DocType::Requirements, "# Requirements Document".to_string(), None);

        let export = store.export();

        assert_eq!(export.len(), 3);
        assert_eq!(export["requirements"], "# Requirements Document");
        assert_eq!(export["design"], "");
        assert_eq!(export["tasks"], "");
    }
}
