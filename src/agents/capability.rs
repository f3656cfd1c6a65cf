use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use super::{AgentProfile, GenerationError};

/// Identifies one submitted run on the generation service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunHandle {
    pub thread_id: String,
    pub run_id: String,
}

/// Lifecycle state of a run as reported by the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    Queued,
    InProgress,
    RequiresAction,
    Cancelling,
    Cancelled,
    Failed,
    Completed,
    Expired,
    Incomplete,
    Unknown(String),
}

impl RunStatus {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "queued" => Self::Queued,
            "in_progress" => Self::InProgress,
            "requires_action" => Self::RequiresAction,
            "cancelling" => Self::Cancelling,
            "cancelled" => Self::Cancelled,
            "failed" => Self::Failed,
            "completed" => Self::Completed,
            "expired" => Self::Expired,
            "incomplete" => Self::Incomplete,
            other => Self::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Queued => "queued",
            Self::InProgress => "in_progress",
            Self::RequiresAction => "requires_action",
            Self::Cancelling => "cancelling",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
            Self::Completed => "completed",
            Self::Expired => "expired",
            Self::Incomplete => "incomplete",
            Self::Unknown(other) => other,
        }
    }

    /// Unknown statuses count as terminal so a run never polls forever on them.
    pub fn is_terminal(&self) -> bool {
        !matches!(
            self,
            Self::Queued | Self::InProgress | Self::RequiresAction | Self::Cancelling
        )
    }

    pub fn is_success(&self) -> bool {
        *self == Self::Completed
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One poll result.
#[derive(Debug, Clone)]
pub struct RunState {
    pub status: RunStatus,
    pub last_error: Option<String>,
}

impl RunState {
    pub fn new(status: RunStatus) -> Self {
        Self {
            status,
            last_error: None,
        }
    }
}

/// Submit-poll-fetch access to a text generation service.
///
/// Submission is split in two so a retry can pick up where a failed attempt
/// stopped: the thread holding the message is created once, and a run whose
/// creation response was lost can be found again with [`find_run`].
///
/// [`find_run`]: GenerationCapability::find_run
#[async_trait]
pub trait GenerationCapability: Send + Sync {
    /// Create a thread holding `message` as its only user message.
    async fn create_thread(&self, message: &str) -> Result<String, GenerationError>;

    /// Start a run of `profile`'s agent on an existing thread.
    async fn start_run(&self, profile: &AgentProfile, thread_id: &str) -> Result<RunHandle, GenerationError>;

    /// Most recent run on `thread_id`, if the service knows of one.
    async fn find_run(&self, thread_id: &str) -> Result<Option<RunHandle>, GenerationError> {
        let _ = thread_id;
        Ok(None)
    }

    async fn poll_status(&self, run: &RunHandle) -> Result<RunState, GenerationError>;

    /// Assistant output of a completed run.
    async fn fetch_result(&self, run: &RunHandle) -> Result<String, GenerationError>;
}

/// Builds a ready capability, verifying credentials and agents on the way.
#[async_trait]
pub trait CapabilityFactory: Send + Sync {
    async fn connect(&self) -> Result<Arc<dyn GenerationCapability>, GenerationError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for raw in [
            "queued",
            "in_progress",
            "requires_action",
            "cancelling",
            "cancelled",
            "failed",
            "completed",
            "expired",
            "incomplete",
        ] {
            assert_eq!(RunStatus::parse(raw).as_str(), raw);
        }
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!RunStatus::Queued.is_terminal());
        assert!(!RunStatus::InProgress.is_terminal());
        assert!(RunStatus::Completed.is_terminal());
        assert!(RunStatus::Expired.is_terminal());
        assert!(RunStatus::parse("mystery").is_terminal());
        assert!(!RunStatus::Failed.is_success());
    }
}
