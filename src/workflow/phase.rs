//! Workflow phases and document types.
//!
//! The phase set is closed: every transition the engine performs is a match over
//! [`Phase`], so adding a phase is a compile error until every table handles it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The three documents a workflow drafts, in dependency order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocType {
    /// EARS-style requirements drafted from the feature description
    Requirements,
    /// Design drafted from the approved requirements
    Design,
    /// Implementation task list drafted from the approved design
    Tasks,
}

impl DocType {
    /// All document types in dependency order.
    pub const ALL: [DocType; 3] = [DocType::Requirements, DocType::Design, DocType::Tasks];

    /// Logical key used for exports (`requirements`, `design`, `tasks`).
    pub fn key(self) -> &'static str {
        match self {
            DocType::Requirements => "requirements",
            DocType::Design => "design",
            DocType::Tasks => "tasks",
        }
    }

    /// Get the display name for this document.
    pub fn display_name(self) -> &'static str {
        match self {
            DocType::Requirements => "Requirements",
            DocType::Design => "Design",
            DocType::Tasks => "Tasks",
        }
    }

    /// The phase in which this document is reviewed.
    pub fn review_phase(self) -> Phase {
        match self {
            DocType::Requirements => Phase::RequirementsReview,
            DocType::Design => Phase::DesignReview,
            DocType::Tasks => Phase::TasksReview,
        }
    }

    /// The transient phase in which this document is being generated.
    pub fn generating_phase(self) -> Phase {
        match self {
            DocType::Requirements => Phase::RequirementsGenerating,
            DocType::Design => Phase::DesignGenerating,
            DocType::Tasks => Phase::TasksGenerating,
        }
    }

    /// The document this one is generated from, if any.
    pub fn upstream(self) -> Option<DocType> {
        match self {
            DocType::Requirements => None,
            DocType::Design => Some(DocType::Requirements),
            DocType::Tasks => Some(DocType::Design),
        }
    }

    /// The document generated from this one, if any.
    pub fn next(self) -> Option<DocType> {
        match self {
            DocType::Requirements => Some(DocType::Design),
            DocType::Design => Some(DocType::Tasks),
            DocType::Tasks => None,
        }
    }

    /// Every document that transitively depends on this one.
    pub fn downstream(self) -> &'static [DocType] {
        match self {
            DocType::Requirements => &[DocType::Design, DocType::Tasks],
            DocType::Design => &[DocType::Tasks],
            DocType::Tasks => &[],
        }
    }

    /// Default file name used when exporting this document.
    pub fn file_name(self) -> &'static str {
        match self {
            DocType::Requirements => "requirements.md",
            DocType::Design => "design.md",
            DocType::Tasks => "tasks.md",
        }
    }
}

impl fmt::Display for DocType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Error returned when parsing an unknown document name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown document type '{0}' (expected requirements, design or tasks)")]
pub struct UnknownDocType(pub String);

impl FromStr for DocType {
    type Err = UnknownDocType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "requirements" | "req" | "reqs" => Ok(DocType::Requirements),
            "design" => Ok(DocType::Design),
            "tasks" | "task" => Ok(DocType::Tasks),
            other => Err(UnknownDocType(other.to_string())),
        }
    }
}

/// A state of the workflow state machine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Waiting for a feature description
    #[default]
    Input,
    /// Requirements draft is being generated
    RequirementsGenerating,
    /// Requirements draft awaits approval
    RequirementsReview,
    /// Design draft is being generated
    DesignGenerating,
    /// Design draft awaits approval
    DesignReview,
    /// Task list is being generated
    TasksGenerating,
    /// Task list awaits approval
    TasksReview,
    /// All three documents approved
    Complete,
}

impl Phase {
    /// The document under review in this phase.
    pub fn review_doc(self) -> Option<DocType> {
        match self {
            Phase::RequirementsReview => Some(DocType::Requirements),
            Phase::DesignReview => Some(DocType::Design),
            Phase::TasksReview => Some(DocType::Tasks),
            _ => None,
        }
    }

    /// The document being generated in this phase.
    pub fn generating_doc(self) -> Option<DocType> {
        match self {
            Phase::RequirementsGenerating => Some(DocType::Requirements),
            Phase::DesignGenerating => Some(DocType::Design),
            Phase::TasksGenerating => Some(DocType::Tasks),
            _ => None,
        }
    }

    /// Whether this is one of the transient generating phases.
    pub fn is_generating(self) -> bool {
        self.generating_doc().is_some()
    }

    /// Target of back-navigation from this phase.
    ///
    /// Generating phases map to the phase a failed generation rolls back to.
    pub fn previous(self) -> Option<Phase> {
        match self {
            Phase::Input => None,
            Phase::RequirementsGenerating | Phase::RequirementsReview => Some(Phase::Input),
            Phase::DesignGenerating | Phase::DesignReview => Some(Phase::RequirementsReview),
            Phase::TasksGenerating | Phase::TasksReview => Some(Phase::DesignReview),
            Phase::Complete => Some(Phase::TasksReview),
        }
    }

    /// The logical stage this phase belongs to.
    pub fn stage(self) -> Stage {
        match self {
            Phase::Input => Stage::Input,
            Phase::RequirementsGenerating | Phase::RequirementsReview => Stage::Requirements,
            Phase::DesignGenerating | Phase::DesignReview => Stage::Design,
            Phase::TasksGenerating | Phase::TasksReview => Stage::Tasks,
            Phase::Complete => Stage::Complete,
        }
    }

    /// Get the display name for this phase.
    pub fn display_name(self) -> &'static str {
        match self {
            Phase::Input => "Input",
            Phase::RequirementsGenerating => "Generating requirements",
            Phase::RequirementsReview => "Requirements review",
            Phase::DesignGenerating => "Generating design",
            Phase::DesignReview => "Design review",
            Phase::TasksGenerating => "Generating tasks",
            Phase::TasksReview => "Tasks review",
            Phase::Complete => "Complete",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// The five logical stages shown to users as a progress indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Input,
    Requirements,
    Design,
    Tasks,
    Complete,
}

impl Stage {
    /// All stages in order.
    pub const ALL: [Stage; 5] =
        [Stage::Input, Stage::Requirements, Stage::Design, Stage::Tasks, Stage::Complete];

    /// Get the stage index (0-based).
    pub fn index(self) -> usize {
        match self {
            Stage::Input => 0,
            Stage::Requirements => 1,
            Stage::Design => 2,
            Stage::Tasks => 3,
            Stage::Complete => 4,
        }
    }

    /// Get the display name for this stage.
    pub fn display_name(self) -> &'static str {
        match self {
            Stage::Input => "Input",
            Stage::Requirements => "Requirements",
            Stage::Design => "Design",
            Stage::Tasks => "Tasks",
            Stage::Complete => "Complete",
        }
    }
}

/// Progress indicator derived purely from the current phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    /// Current stage
    pub stage: Stage,
    /// 1-based position among all stages
    pub position: usize,
    /// Total number of stages
    pub total: usize,
}

impl Progress {
    /// Compute progress for a phase.
    pub fn of(phase: Phase) -> Self {
        let stage = phase.stage();
        Self { stage, position: stage.index() + 1, total: Stage::ALL.len() }
    }

    /// Completion percentage (0-100).
    pub fn percent(&self) -> u8 {
        ((self.position - 1) * 100 / (self.total - 1)) as u8
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}/{}] {}", self.position, self.total, self.stage.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_review_and_generating_phases_round_trip() {
        for doc in DocType::ALL {
            assert_eq!(doc.review_phase().review_doc(), Some(doc));
            assert_eq!(doc.generating_phase().generating_doc(), Some(doc));
            assert!(doc.generating_phase().is_generating());
            assert!(!doc.review_phase().is_generating());
        }
    }

    #[test]
    fn test_back_navigation_targets() {
        assert_eq!(Phase::Input.previous(), None);
        assert_eq!(Phase::RequirementsReview.previous(), Some(Phase::Input));
        assert_eq!(Phase::DesignReview.previous(), Some(Phase::RequirementsReview));
        assert_eq!(Phase::TasksReview.previous(), Some(Phase::DesignReview));
        assert_eq!(Phase::Complete.previous(), Some(Phase::TasksReview));
    }

    #[test]
    fn test_generating_phases_roll_back_to_prior_review() {
        assert_eq!(Phase::RequirementsGenerating.previous(), Some(Phase::Input));
        assert_eq!(Phase::DesignGenerating.previous(), Some(Phase::RequirementsReview));
        assert_eq!(Phase::TasksGenerating.previous(), Some(Phase::DesignReview));
    }

    #[test]
    fn test_downstream_documents() {
        assert_eq!(DocType::Requirements.downstream(), &[DocType::Design, DocType::Tasks]);
        assert_eq!(DocType::Design.downstream(), &[DocType::Tasks]);
        assert!(DocType::Tasks.downstream().is_empty());
        assert_eq!(DocType::Design.upstream(), Some(DocType::Requirements));
    }

    #[test]
    fn test_doc_type_parsing() {
        assert_eq!("requirements".parse::<DocType>().unwrap(), DocType::Requirements);
        assert_eq!("Design".parse::<DocType>().unwrap(), DocType::Design);
        assert_eq!(" tasks ".parse::<DocType>().unwrap(), DocType::Tasks);
        assert!("roadmap".parse::<DocType>().is_err());
    }

    #[test]
    fn test_progress_positions() {
        assert_eq!(Progress::of(Phase::Input).position, 1);
        assert_eq!(Progress::of(Phase::RequirementsGenerating).position, 2);
        assert_eq!(Progress::of(Phase::DesignReview).position, 3);
        assert_eq!(Progress::of(Phase::TasksReview).position, 4);
        assert_eq!(Progress::of(Phase::Complete).position, 5);
        assert_eq!(Progress::of(Phase::Complete).percent(), 100);
        assert_eq!(Progress::of(Phase::Input).percent(), 0);
        assert_eq!(Progress::of(Phase::Complete).total, 5);
    }

    #[test]
    fn test_phase_serialization() {
        let json = serde_json::to_string(&Phase::RequirementsReview).unwrap();
        assert_eq!(json, "\"requirements_review\"");
        let phase: Phase = serde_json::from_str("\"tasks_generating\"").unwrap();
        assert_eq!(phase, Phase::TasksGenerating);
    }
}
