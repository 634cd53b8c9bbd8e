//! # Specflow
//!
//! Phased drafting of requirements, design and implementation tasks, with a
//! human approval gate after every document.
//!
//! A feature description goes in; a text generator drafts EARS-style
//! requirements, then a design from the approved requirements, then a task list
//! from the approved design. Every draft can be approved, regenerated or edited,
//! and the workflow can step back to an earlier document at any time.
//!
//! ## Features
//!
//! - **Approval gates**: nothing downstream is drafted before its input is approved
//! - **Cascading invalidation**: changing a document clears approvals derived from it
//! - **Resumption**: stepping back and re-approving never regenerates current drafts
//! - **Providers**: Claude or a local Ollama server, with retry on transient errors
//!
//! ## Quick Start
//!
//! ```bash
//! specflow submit "Add CSV export to the reports page"
//! specflow approve
//! specflow status
//! specflow export
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
// Allow common patterns that are intentional in this codebase
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::manual_let_else)]
#![allow(clippy::derivable_impls)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::significant_drop_tightening)]
#![allow(clippy::map_unwrap_or)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::unused_self)]
#![allow(clippy::format_push_string)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]

pub mod ai;
pub mod core;
pub mod workflow;

pub use ai::{GenerationError, TextGenerator};
pub use core::{Config, SessionStore};
pub use workflow::{
    DocType, Phase, Progress, Step, TransitionError, ValidationReport, ValidationWarning,
    WorkflowError, WorkflowOrchestrator, WorkflowState,
};
