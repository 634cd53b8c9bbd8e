//! Application plumbing for Specflow.
//!
//! Configuration, retry policy and session persistence. Nothing in here knows
//! about phases or approvals.

mod config;
mod retry;
mod session;

pub use config::{
    Config, ExportConfig, GenerationConfig, OllamaConfig, Provider, RetryPolicyConfig,
    SessionConfig, LOCAL_CONFIG_FILE,
};
pub use retry::{retry_async, RetryConfig, RetryResult};
pub use session::{SessionLock, SessionStore, LOCK_FILE, SESSION_FILE};
