//! Session persistence.
//!
//! The workflow state is a plain value; between CLI invocations it lives in a
//! single JSON file. An advisory lock file next to it keeps two processes from
//! running operations on the same session at once.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use anyhow::Context;
use fs2::FileExt;

use crate::workflow::WorkflowState;

/// File name of the persisted session inside the session directory.
pub const SESSION_FILE: &str = "session.json";

/// File name of the lock held while an operation runs.
pub const LOCK_FILE: &str = "session.lock";

/// Loads and saves the workflow state of one working directory.
#[derive(Debug, Clone)]
pub struct SessionStore {
    dir: PathBuf,
    path: PathBuf,
}

impl SessionStore {
    /// Create a store rooted at `dir`.
    pub fn new(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref().to_path_buf();
        Self { path: dir.join(SESSION_FILE), dir }
    }

    /// Path of the session file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether a session has been saved.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Load the saved session, or a fresh one if none exists.
    pub fn load(&self) -> anyhow::Result<WorkflowState> {
        if !self.path.exists() {
            return Ok(WorkflowState::new());
        }

        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read session file {}", self.path.display()))?;
        let state: WorkflowState = serde_json::from_str(&content)
            .with_context(|| format!("Corrupt session file {}", self.path.display()))?;

        tracing::debug!(session = %state.session_id(), phase = ?state.current_phase(), "Loaded session");
        Ok(state)
    }

    /// Take the exclusive session lock without waiting.
    ///
    /// Returns `None` while another process holds it. The lock is released when
    /// the returned guard is dropped.
    pub fn try_lock(&self) -> anyhow::Result<Option<SessionLock>> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create session dir {}", self.dir.display()))?;

        let path = self.dir.join(LOCK_FILE);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .with_context(|| format!("Failed to open lock file {}", path.display()))?;

        match file.try_lock_exclusive() {
            Ok(()) => Ok(Some(SessionLock { file })),
            Err(e) if e.raw_os_error() == fs2::lock_contended_error().raw_os_error() => {
                tracing::debug!(lock = %path.display(), "Session lock is held elsewhere");
                Ok(None)
            }
            Err(e) => Err(e).with_context(|| format!("Failed to lock {}", path.display())),
        }
    }

    /// Save the session.
    pub fn save(&self, state: &WorkflowState) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(state)?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(&self.path, content)
            .with_context(|| format!("Failed to write session file {}", self.path.display()))?;
        Ok(())
    }
}

/// Exclusive hold on a session directory.
#[derive(Debug)]
pub struct SessionLock {
    file: File,
}

impl Drop for SessionLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}
