//! Workflow session state.
//!
//! The whole session is one plain value: the orchestrator takes it by value and
//! hands back the updated copy, and the host persists it between calls.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::context::CodebaseContext;
use super::documents::{Approvals, Document, DocumentStore};
use super::error::WorkflowError;
use super::phase::{DocType, Phase, Progress};
use super::validator::ValidationReport;

/// State of one workflow session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowState {
    pub(crate) session_id: Uuid,

    pub(crate) current_phase: Phase,

    #[serde(default)]
    pub(crate) feature_description: String,

    #[serde(default)]
    pub(crate) documents: DocumentStore,

    /// Latest validation of the requirements document
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) validation: Option<ValidationReport>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) codebase: Option<CodebaseContext>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) last_error: Option<WorkflowError>,
}

impl WorkflowState {
    /// Create a fresh session waiting for input.
    pub fn new() -> Self {
        Self {
            session_id: Uuid::new_v4(),
            current_phase: Phase::Input,
            feature_description: String::new(),
            documents: DocumentStore::new(),
            validation: None,
            codebase: None,
            last_error: None,
        }
    }

    /// Session identifier.
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Current phase.
    pub fn current_phase(&self) -> Phase {
        self.current_phase
    }

    /// The feature description, empty before submission.
    pub fn feature_description(&self) -> &str {
        &self.feature_description
    }

    /// Get a document.
    pub fn document(&self, doc: DocType) -> Option<&Document> {
        self.documents.get(doc)
    }

    /// All documents with their approval state.
    pub fn documents(&self) -> &DocumentStore {
        &self.documents
    }

    /// Current content of a document, empty if never drafted.
    pub fn content(&self, doc: DocType) -> &str {
        self.documents.content(doc)
    }

    /// Current version of a document, 0 if never drafted.
    pub fn version(&self, doc: DocType) -> u32 {
        self.documents.version(doc)
    }

    /// Whether a document is approved.
    pub fn is_approved(&self, doc: DocType) -> bool {
        self.documents.is_approved(doc)
    }

    /// All approval flags.
    pub fn approvals(&self) -> Approvals {
        self.documents.approvals()
    }

    /// Latest requirements validation report.
    pub fn validation(&self) -> Option<&ValidationReport> {
        self.validation.as_ref()
    }

    /// Codebase context attached at submission.
    pub fn codebase(&self) -> Option<&CodebaseContext> {
        self.codebase.as_ref()
    }

    /// Error from the most recent failed operation, cleared by the next success.
    pub fn last_error(&self) -> Option<&WorkflowError> {
        self.last_error.as_ref()
    }

    /// Progress indicator for the current phase.
    pub fn progress(&self) -> Progress {
        Progress::of(self.current_phase)
    }

    /// Whether every document has been approved.
    pub fn is_complete(&self) -> bool {
        self.current_phase == Phase::Complete
    }

    /// Current content of all documents keyed by logical name.
    pub fn export(&self) -> BTreeMap<&'static str, String> {
        self.documents.export()
    }
}

impl Default for WorkflowState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_is_empty() {
        let state = WorkflowState::new();
        assert_eq!(state.current_phase(), Phase::Input);
        assert!(state.feature_description().is_empty());
        assert_eq!(state.approvals(), Approvals::default());
        for doc in DocType::ALL {
            assert!(state.document(doc).is_none());
        }
        assert!(state.last_error().is_none());
    }

    #[test]
    fn test_sessions_get_distinct_ids() {
        assert_ne!(WorkflowState::new().session_id(), WorkflowState::new().session_id());
    }

    #[test]
    fn test_state_json_round_trip() {
        let mut state = WorkflowState::new();
        state.feature_description = "Add CSV export".to_string();
        state.current_phase = Phase::DesignReview;
        state.documents.put(DocType::Requirements, "# Requirements Document".to_string(), None);
        state.documents.approve(DocType::Requirements);
        state.documents.put(DocType::Design, "# Design Document".to_string(), Some(1));

        let json = serde_json::to_string_pretty(&state).unwrap();
        let restored: WorkflowState = serde_json::from_str(&json).unwrap();

        assert_eq!(restored, state);
        assert!(json.contains("\"current_phase\": \"design_review\""));
    }
}
