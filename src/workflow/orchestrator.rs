//! Public surface of the workflow engine.
//!
//! Every operation takes a [`WorkflowState`] by value and returns a [`Step`] with
//! the resulting state. Failures never escape as panics or `Err`: the step carries
//! the last consistent state together with the error, so a host can simply store
//! whatever comes back.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use uuid::Uuid;

use super::context::CodebaseContext;
use super::controller::{GenerationRequest, Next, PhaseController};
use super::error::{Operation, TransitionError, ValidationWarning, WorkflowError};
use super::phase::DocType;
use super::state::WorkflowState;
use crate::ai::{GenerationError, TextGenerator};
use crate::core::Config;

/// Default limit for a single generation call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Outcome of one orchestrator operation.
#[derive(Debug, Clone)]
#[must_use]
pub struct Step {
    /// State after the operation; unchanged apart from `last_error` on failure
    pub state: WorkflowState,

    /// Why the operation failed
    pub error: Option<WorkflowError>,

    /// Non-fatal notice about a requirements draft
    pub warning: Option<ValidationWarning>,
}

impl Step {
    /// Whether the operation succeeded.
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Convert into a `Result`, dropping any warning.
    pub fn into_result(self) -> Result<WorkflowState, WorkflowError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.state),
        }
    }
}

/// Runs workflow operations against a text generator.
pub struct WorkflowOrchestrator {
    generator: Arc<dyn TextGenerator>,
    controller: PhaseController,
    timeout: Duration,
    busy: Mutex<HashSet<Uuid>>,
}

impl WorkflowOrchestrator {
    /// Create an orchestrator with the default timeout.
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            generator,
            controller: PhaseController::new(),
            timeout: DEFAULT_TIMEOUT,
            busy: Mutex::new(HashSet::new()),
        }
    }

    /// Create an orchestrator using the configured timeout.
    pub fn from_config(generator: Arc<dyn TextGenerator>, config: &Config) -> Self {
        Self::new(generator).with_timeout(Duration::from_secs(config.generation.timeout_secs))
    }

    /// Set the limit for a single generation call.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Submit a feature description and draft requirements.
    pub async fn submit_description(&self, state: WorkflowState, text: &str) -> Step {
        self.submit_with_context(state, text, None).await
    }

    /// Submit a feature description together with codebase context.
    pub async fn submit_with_context(
        &self,
        state: WorkflowState,
        text: &str,
        codebase: Option<CodebaseContext>,
    ) -> Step {
        self.run(state, Operation::Submit, |controller, state| {
            controller.submit(state, text, codebase).map(Some)
        })
        .await
    }

    /// Approve the document under review.
    pub async fn approve(&self, state: WorkflowState, doc: DocType) -> Step {
        self.run(state, Operation::Approve(doc), |controller, state| {
            match controller.approve(state, doc)? {
                Next::Done => Ok(None),
                Next::Generate(request) => Ok(Some(request)),
            }
        })
        .await
    }

    /// Draft the document under review again.
    pub async fn regenerate(&self, state: WorkflowState, doc: DocType) -> Step {
        self.run(state, Operation::Regenerate(doc), |controller, state| {
            Ok(Some(controller.regenerate(state, doc)?))
        })
        .await
    }

    /// Go back to the previous review phase.
    pub async fn go_back(&self, state: WorkflowState) -> Step {
        self.run(state, Operation::GoBack, |controller, state| {
            controller.go_back(state)?;
            Ok(None)
        })
        .await
    }

    /// Discard the session and start over.
    pub async fn restart(&self, state: WorkflowState) -> Step {
        self.run(state, Operation::Restart, |controller, state| {
            controller.restart(state);
            Ok(None)
        })
        .await
    }

    /// Replace the document under review with hand-written content.
    pub async fn edit_document(
        &self,
        state: WorkflowState,
        doc: DocType,
        content: impl Into<String>,
    ) -> Step {
        let content = content.into();
        self.run(state, Operation::Edit(doc), |controller, state| {
            controller.edit(state, doc, content)?;
            Ok(None)
        })
        .await
    }

    /// Apply a transition and, if it asks for one, a generation call.
    ///
    /// Works on a copy; the copy is only returned if everything succeeded.
    async fn run<F>(&self, state: WorkflowState, operation: Operation, transition: F) -> Step
    where
        F: FnOnce(
            &PhaseController,
            &mut WorkflowState,
        ) -> Result<Option<GenerationRequest>, WorkflowError>,
    {
        let session = state.session_id;
        let Some(_lease) = self.lease(session) else {
            return self.fail(state, operation, TransitionError::SessionBusy.into());
        };

        let mut working = state.clone();
        working.last_error = None;

        let outcome = match transition(&self.controller, &mut working) {
            Ok(Some(request)) => {
                tracing::info!(
                    %session,
                    %operation,
                    phase = %working.current_phase,
                    doc = %request.doc,
                    "Generating"
                );
                match self.generate(&request).await {
                    Ok(content) => {
                        self.controller.apply_generation(&mut working, &request, content);
                        Ok(())
                    }
                    Err(cause) => Err(WorkflowError::from(cause)),
                }
            }
            Ok(None) => Ok(()),
            Err(err) => Err(err),
        };

        if let Err(err) = outcome {
            return self.fail(state, operation, err);
        }

        let warning = self.validation_warning(&state, &working);
        if let Some(warning) = &warning {
            tracing::warn!(%session, %warning, "Requirements draft needs attention");
        }

        tracing::info!(%session, %operation, phase = %working.current_phase, "Operation completed");
        Step { state: working, error: None, warning }
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        tracing::debug!(
            doc = %request.doc,
            prompt_chars = request.prompt.text.len(),
            provider = self.generator.name(),
            "Sending prompt"
        );

        let call = self.generator.generate(&request.prompt.text, &request.prompt.system);
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(GenerationError::Timeout(whole_seconds(self.timeout))),
        }
    }

    /// Warn when this operation produced a requirements draft that is not clean.
    fn validation_warning(
        &self,
        before: &WorkflowState,
        after: &WorkflowState,
    ) -> Option<ValidationWarning> {
        let drafted = after.document(DocType::Requirements)?;
        if before.document(DocType::Requirements) == Some(drafted) {
            return None;
        }

        let version = drafted.version;
        after
            .validation
            .as_ref()
            .filter(|report| !report.is_clean())
            .map(|report| ValidationWarning { version, report: report.clone() })
    }

    fn fail(&self, mut state: WorkflowState, operation: Operation, error: WorkflowError) -> Step {
        tracing::warn!(
            session = %state.session_id,
            %operation,
            phase = %state.current_phase,
            %error,
            "Operation failed"
        );
        state.last_error = Some(error.clone());
        Step { state, error: Some(error), warning: None }
    }

    fn lease(&self, session: Uuid) -> Option<SessionLease<'_>> {
        if self.busy.lock().insert(session) {
            Some(SessionLease { busy: &self.busy, session })
        } else {
            None
        }
    }
}

/// Marks a session busy until dropped.
struct SessionLease<'a> {
    busy: &'a Mutex<HashSet<Uuid>>,
    session: Uuid,
}

impl Drop for SessionLease<'_> {
    fn drop(&mut self) {
        self.busy.lock().remove(&self.session);
    }
}

/// Seconds, rounded up so a sub-second limit never reads as zero.
fn whole_seconds(duration: Duration) -> u64 {
    duration.as_secs() + u64::from(duration.subsec_nanos() > 0)
}
