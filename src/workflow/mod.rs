//! The drafting workflow engine.
//!
//! Turns a feature description into three drafted and approved documents:
//!
//! - `requirements` - EARS-style requirements, drafted from the description
//! - `design` - drafted from the approved requirements
//! - `tasks` - drafted from the approved design (plus approved requirements)
//!
//! ## Layers
//!
//! - [`DocumentStore`] - content, versions and approval flags
//! - [`DocumentValidator`] - advisory structural checks for requirements
//! - [`PhaseController`] - the state machine
//! - [`WorkflowOrchestrator`] - the public surface, including generation calls
//!
//! Any content change of a document clears the approval of every document
//! derived from it.

mod context;
mod controller;
mod documents;
mod error;
mod export;
mod orchestrator;
mod phase;
pub mod prompts;
mod state;
mod tasks;
mod validator;

pub use context::{truncate_chars, CodebaseContext};
pub use controller::{GenerationRequest, Next, PhaseController};
pub use documents::{Approvals, Document, DocumentStore};
pub use error::{Operation, TransitionError, ValidationWarning, WorkflowError};
pub use export::write_export;
pub use orchestrator::{Step, WorkflowOrchestrator, DEFAULT_TIMEOUT};
pub use phase::{DocType, Phase, Progress, Stage, UnknownDocType};
pub use prompts::Prompt;
pub use state::WorkflowState;
pub use tasks::{TaskItem, TaskList};
pub use validator::{count_requirements, DocumentValidator, ValidationReport, EARS_KEYWORDS};
