//! Bot-type workloads: the procedures executed while a bot is running.
//!
//! Each workload is cooperatively cancellable and reports its outcome
//! through `WorkloadError`, so the runner's completion handler can tell
//! cooperative shutdown apart from failure.

pub mod automation_extensions;
pub mod code_review;
pub mod codey;
pub mod heartbeat;

pub use automation_extensions::run_automation_extensions_bot;
pub use code_review::run_code_review_bot;
pub use codey::run_codey_bot;
pub use heartbeat::run_heartbeat_bot;

use std::fmt;

use crate::supervisor::error::SupervisorError;

#[derive(Debug)]
pub enum WorkloadError {
    /// The workload observed its cancellation token and unwound cleanly.
    /// Not a failure: no error event is emitted for it.
    Cancelled,
    /// Anything else - surfaces as `error` status plus an ERROR event
    Failed(String),
}

impl fmt::Display for WorkloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkloadError::Cancelled => write!(f, "cancelled"),
            WorkloadError::Failed(msg) => write!(f, "{}", msg),
        }
    }
}

impl From<SupervisorError> for WorkloadError {
    fn from(e: SupervisorError) -> Self {
        WorkloadError::Failed(e.to_string())
    }
}

impl From<rusqlite::Error> for WorkloadError {
    fn from(e: rusqlite::Error) -> Self {
        WorkloadError::Failed(format!("Database error: {}", e))
    }
}
