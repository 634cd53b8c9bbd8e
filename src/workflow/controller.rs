//! The phase state machine.
//!
//! [`PhaseController`] owns every transition rule. It never talks to a text
//! generator itself: operations that need a draft return a [`GenerationRequest`]
//! and leave the state in the matching `*Generating` phase, and the caller feeds
//! the result back through [`PhaseController::apply_generation`].

use super::context::CodebaseContext;
use super::documents::DocumentStore;
use super::error::{Operation, TransitionError, WorkflowError};
use super::phase::{DocType, Phase};
use super::prompts::{self, Prompt};
use super::state::WorkflowState;
use super::validator::DocumentValidator;

/// A pending generation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    /// Document to draft
    pub doc: DocType,

    /// Prompt to send
    pub prompt: Prompt,

    /// Version of the upstream document used as input
    pub derived_from: Option<u32>,
}

/// What a transition needs before it is finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Next {
    /// The transition is complete.
    Done,
    /// A draft must be generated and applied.
    Generate(GenerationRequest),
}

/// Enforces the legal transitions between phases.
#[derive(Debug, Clone, Default)]
pub struct PhaseController {
    validator: DocumentValidator,
}

impl PhaseController {
    /// Create a new controller.
    pub fn new() -> Self {
        Self { validator: DocumentValidator::new() }
    }

    /// Start a workflow from a feature description.
    ///
    /// Legal only from [`Phase::Input`]. Any documents left over from back-navigation
    /// are dropped so versions start again at 1.
    pub fn submit(
        &self,
        state: &mut WorkflowState,
        description: &str,
        codebase: Option<CodebaseContext>,
    ) -> Result<GenerationRequest, WorkflowError> {
        if state.current_phase != Phase::Input {
            return Err(not_allowed(Operation::Submit, state.current_phase).into());
        }

        let description = description.trim();
        if description.is_empty() {
            return Err(WorkflowError::EmptyInput);
        }

        state.feature_description = description.to_string();
        state.documents = DocumentStore::new();
        state.validation = None;
        state.codebase = codebase;
        state.current_phase = Phase::RequirementsGenerating;

        Ok(self.request_for(state, DocType::Requirements))
    }

    /// Approve the document under review and move forward.
    ///
    /// When the next document already exists and was drafted from the version just
    /// approved, the workflow resumes at its review phase without generating.
    pub fn approve(&self, state: &mut WorkflowState, doc: DocType) -> Result<Next, TransitionError> {
        self.require_review(state, Operation::Approve(doc), doc)?;

        state.documents.approve(doc);

        let Some(next) = doc.next() else {
            state.current_phase = Phase::Complete;
            return Ok(Next::Done);
        };

        if state.documents.is_current(next) {
            tracing::debug!(doc = %next, "Resuming without regeneration");
            state.current_phase = next.review_phase();
            return Ok(Next::Done);
        }

        state.current_phase = next.generating_phase();
        Ok(Next::Generate(self.request_for(state, next)))
    }

    /// Discard the current draft's approval and ask for a new draft.
    pub fn regenerate(
        &self,
        state: &mut WorkflowState,
        doc: DocType,
    ) -> Result<GenerationRequest, TransitionError> {
        self.require_review(state, Operation::Regenerate(doc), doc)?;

        state.documents.revoke(doc);
        state.current_phase = doc.generating_phase();

        Ok(self.request_for(state, doc))
    }

    /// Replace a draft by hand.
    ///
    /// Clears the document's own approval and every downstream approval.
    pub fn edit(
        &self,
        state: &mut WorkflowState,
        doc: DocType,
        content: String,
    ) -> Result<(), TransitionError> {
        self.require_review(state, Operation::Edit(doc), doc)?;

        state.documents.edit(doc, content);
        state.documents.revoke(doc);
        self.after_content_change(state, doc);
        Ok(())
    }

    /// Move to the preceding review phase, keeping every document and flag.
    pub fn go_back(&self, state: &mut WorkflowState) -> Result<(), TransitionError> {
        let phase = state.current_phase;
        let previous = phase.previous().ok_or(TransitionError::NoPreviousPhase { phase })?;
        state.current_phase = previous;
        Ok(())
    }

    /// Discard the whole session and start over.
    pub fn restart(&self, state: &mut WorkflowState) {
        *state = WorkflowState::new();
    }

    /// Store a generated draft and enter its review phase.
    pub fn apply_generation(
        &self,
        state: &mut WorkflowState,
        request: &GenerationRequest,
        content: String,
    ) {
        state.documents.put(request.doc, content, request.derived_from);
        self.after_content_change(state, request.doc);
        state.current_phase = request.doc.review_phase();
    }

    fn after_content_change(&self, state: &mut WorkflowState, doc: DocType) {
        let invalidated = state.documents.invalidate_downstream(doc);
        if !invalidated.is_empty() {
            tracing::info!(doc = %doc, invalidated = ?invalidated, "Cleared downstream approvals");
        }

        if doc == DocType::Requirements {
            state.validation = Some(self.validator.validate(state.documents.content(doc)));
        }
    }

    fn require_review(
        &self,
        state: &WorkflowState,
        operation: Operation,
        doc: DocType,
    ) -> Result<(), TransitionError> {
        if state.current_phase == doc.review_phase() {
            Ok(())
        } else {
            Err(not_allowed(operation, state.current_phase))
        }
    }

    /// Build the request for drafting `doc` from the current upstream state.
    fn request_for(&self, state: &WorkflowState, doc: DocType) -> GenerationRequest {
        let store = &state.documents;
        let codebase = state.codebase.as_ref();

        let prompt = match doc {
            DocType::Requirements => prompts::requirements(&state.feature_description, codebase),
            DocType::Design => prompts::design(store.content(DocType::Requirements), codebase),
            DocType::Tasks => {
                let requirements = store
                    .is_approved(DocType::Requirements)
                    .then(|| store.content(DocType::Requirements));
                prompts::tasks(store.content(DocType::Design), requirements)
            }
        };

        let derived_from = doc.upstream().map(|upstream| store.version(upstream));
        GenerationRequest { doc, prompt, derived_from }
    }
}

fn not_allowed(operation: Operation, phase: Phase) -> TransitionError {
    TransitionError::NotAllowed { operation, phase }
}
