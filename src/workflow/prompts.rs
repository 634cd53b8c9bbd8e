//! Prompt composition for the three generation steps.
//!
//! Each builder only takes the upstream inputs its document may depend on, so a
//! draft can never see state that was not approved.

use super::context::{truncate_chars, CodebaseContext};

/// Maximum characters of approved requirements passed along with the design.
pub const TASKS_REQUIREMENTS_CHARS: usize = 1000;

/// System instructions for the requirements and design drafts.
pub const SYSTEM_INSTRUCTIONS: &str = r"You are Specflow, an assistant that drafts software specifications for developers.

Rules:
1. Output the document itself, starting with its top-level heading
2. Do not add commentary before or after the document
3. Be specific, testable and implementable
4. Use Markdown formatting";

/// System instructions for the task list, which is answered as JSON.
pub const TASKS_SYSTEM_INSTRUCTIONS: &str = r"You are Specflow, an assistant that breaks software designs into implementation tasks.

Rules:
1. Answer with a single JSON array and nothing else
2. Be specific, testable and implementable";

/// A prompt ready to be sent to a text generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    /// User-facing prompt text
    pub text: String,

    /// System instructions
    pub system: String,
}

impl Prompt {
    fn new(text: String) -> Self {
        Self { text, system: SYSTEM_INSTRUCTIONS.to_string() }
    }

    fn with_system(mut self, system: &str) -> Self {
        self.system = system.to_string();
        self
    }
}

/// Build the requirements prompt from the feature description.
pub fn requirements(description: &str, codebase: Option<&CodebaseContext>) -> Prompt {
    let context =
        codebase.map(|c| format!("\n{}", c.to_prompt_section("Codebase Context"))).unwrap_or_default();

    Prompt::new(format!(
        r"Write requirements in EARS format (Easy Approach to Requirements Syntax) for this feature:

Feature Description: {description}
{context}
Use exactly this structure:

# Requirements Document

## Introduction
[Short summary of the feature and its purpose]

## Requirements

### Requirement 1
**User Story:** As a [role], I want [feature], so that [benefit]

#### Acceptance Criteria
1. WHEN [event] THEN [system] SHALL [response]
2. IF [precondition] THEN [system] SHALL [response]

### Requirement 2
[More requirements in the same shape]

Cover user workflows, edge cases, error handling, security and performance constraints."
    ))
}

/// Build the design prompt from the approved requirements.
pub fn design(requirements: &str, codebase: Option<&CodebaseContext>) -> Prompt {
    let context = codebase
        .map(|c| format!("\n{}", c.to_prompt_section("Existing Codebase Context")))
        .unwrap_or_default();

    Prompt::new(format!(
        r"Write a design document for these approved requirements:

{requirements}
{context}
Use these sections:

# Design Document

## Overview
## Architecture
[Include Mermaid diagrams where they help]
## Components and Interfaces
## Data Models
## Error Handling
## Testing Strategy
## Security Considerations
## Performance Considerations

Keep components loosely coupled and reference the requirements they satisfy."
    ))
}

/// Build the task-list prompt from the approved design and, when approved, requirements.
pub fn tasks(design: &str, requirements: Option<&str>) -> Prompt {
    let requirements = requirements
        .filter(|r| !r.trim().is_empty())
        .map(|r| format!("\nRequirements Context:\n{}\n", truncate_chars(r, TASKS_REQUIREMENTS_CHARS)))
        .unwrap_or_default();

    Prompt::new(format!(
        r#"Turn this approved design into implementation tasks:

{design}
{requirements}
Answer with a JSON array only, one object per task:
[
  {{
    "id": "1",
    "title": "Task title",
    "description": "What to build",
    "type": "implementation|testing|documentation",
    "priority": "high|medium|low",
    "estimated_hours": 4,
    "requirements_refs": ["1.1"],
    "dependencies": [],
    "acceptance_criteria": ["Concrete completion criterion"]
  }}
]

Only include coding tasks a developer can execute without further clarification.
Leave out deployment, user research and process changes."#
    ))
    .with_system(TASKS_SYSTEM_INSTRUCTIONS)
}
