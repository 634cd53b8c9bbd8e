//! Writing the drafted documents to disk.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;

use super::phase::DocType;
use super::state::WorkflowState;
use super::tasks::TaskList;

/// Write every non-empty document into `dir`.
///
/// With `render_tasks`, a JSON task list is rendered as Markdown; otherwise all
/// documents are written exactly as stored. Returns the written paths.
pub fn write_export(
    state: &WorkflowState,
    dir: &Path,
    render_tasks: bool,
) -> anyhow::Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create export directory {}", dir.display()))?;

    let mut written = Vec::new();
    for doc in DocType::ALL {
        let content = state.content(doc);
        if content.trim().is_empty() {
            continue;
        }

        let rendered = match doc {
            DocType::Tasks if render_tasks => TaskList::parse(content).to_markdown(),
            _ => content.to_string(),
        };

        let path = dir.join(doc.file_name());
        fs::write(&path, rendered).with_context(|| format!("Failed to write {}", path.display()))?;
        written.push(path);
    }

    if !state.is_complete() {
        tracing::info!(phase = %state.current_phase(), "Exported a workflow that is not complete yet");
    }
    tracing::debug!(files = written.len(), dir = %dir.display(), "Exported documents");

    Ok(written)
}
