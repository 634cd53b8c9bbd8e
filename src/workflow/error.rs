//! Workflow error types.
//!
//! Every failure an orchestrator call can produce is one of these values. They are
//! serializable so the last error can travel with the persisted state.

use serde::{Deserialize, Serialize};

use super::phase::{DocType, Phase};
use super::validator::ValidationReport;
use crate::ai::GenerationError;

/// An operation requested against the workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "op", content = "doc")]
pub enum Operation {
    Submit,
    Approve(DocType),
    Regenerate(DocType),
    GoBack,
    Restart,
    Edit(DocType),
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::Submit => write!(f, "submit"),
            Operation::Approve(doc) => write!(f, "approve {doc}"),
            Operation::Regenerate(doc) => write!(f, "regenerate {doc}"),
            Operation::GoBack => write!(f, "back"),
            Operation::Restart => write!(f, "restart"),
            Operation::Edit(doc) => write!(f, "edit {doc}"),
        }
    }
}

/// An operation that is not legal in the current state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum TransitionError {
    #[error("cannot {operation} while in phase '{phase}'")]
    NotAllowed { operation: Operation, phase: Phase },

    #[error("nothing to go back to from phase '{phase}'")]
    NoPreviousPhase { phase: Phase },

    #[error("another operation is already in flight for this session")]
    SessionBusy,
}

/// Errors surfaced by the workflow orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowError {
    #[error("feature description must not be empty")]
    EmptyInput,

    #[error("invalid transition: {0}")]
    InvalidTransition(TransitionError),

    #[error("generation failed: {cause}")]
    GenerationFailure { cause: GenerationError },
}

impl WorkflowError {
    /// Whether re-issuing the same operation may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, WorkflowError::GenerationFailure { .. })
    }
}

impl From<TransitionError> for WorkflowError {
    fn from(err: TransitionError) -> Self {
        WorkflowError::InvalidTransition(err)
    }
}

impl From<GenerationError> for WorkflowError {
    fn from(cause: GenerationError) -> Self {
        WorkflowError::GenerationFailure { cause }
    }
}

/// Non-fatal notice that a requirements draft did not pass validation cleanly.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
#[error("requirements draft has {} issue(s) and {} suggestion(s)", .report.issues.len(), .report.suggestions.len())]
pub struct ValidationWarning {
    /// Version of the requirements document that was validated
    pub version: u32,

    /// The full validation report
    pub report: ValidationReport,
}
