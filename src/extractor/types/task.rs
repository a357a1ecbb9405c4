use super::ExtractionResult;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of one scheduler task.
///
/// Transitions are monotonic: pending → processing → success | failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    #[default]
    Pending,
    Processing,
    Success,
    Failed,
}

impl TaskStatus {
    /// Whether this state may advance to `next`
    #[must_use]
    pub const fn can_advance_to(self, next: TaskStatus) -> bool {
        matches!(
            (self, next),
            (TaskStatus::Pending, TaskStatus::Processing)
                | (TaskStatus::Processing, TaskStatus::Success)
                | (TaskStatus::Processing, TaskStatus::Failed)
        )
    }

    /// Whether the task reached a terminal state
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Success | TaskStatus::Failed)
    }
}

/// One unit of scheduler work: a single input URL and its outcome
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainTask {
    pub id: Uuid,
    pub input_url: String,
    pub status: TaskStatus,
    pub result: Option<ExtractionResult>,
    pub error_message: Option<String>,
}

impl ChainTask {
    pub fn new(input_url: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            input_url: input_url.into(),
            status: TaskStatus::Pending,
            result: None,
            error_message: None,
        }
    }

    /// Copy with status advanced to `processing`; ignored if the transition
    /// would move backwards.
    #[must_use]
    pub fn into_processing(mut self) -> Self {
        if self.status.can_advance_to(TaskStatus::Processing) {
            self.status = TaskStatus::Processing;
        }
        self
    }

    /// Copy with the successful result attached
    #[must_use]
    pub fn into_success(mut self, result: ExtractionResult) -> Self {
        if self.status.can_advance_to(TaskStatus::Success) {
            self.status = TaskStatus::Success;
            self.result = Some(result);
        }
        self
    }

    /// Copy with the failure message attached
    #[must_use]
    pub fn into_failed(mut self, message: impl Into<String>) -> Self {
        if self.status.can_advance_to(TaskStatus::Failed) {
            self.status = TaskStatus::Failed;
            self.error_message = Some(message.into());
        }
        self
    }
}

/// Terminal state of one clone request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CloneStatus {
    Success,
    Failed,
    Skipped,
}

/// Result of cloning one link to the file-hosting service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloneOutcome {
    pub original_url: String,
    pub status: CloneStatus,
    /// File code assigned by the hosting service
    pub new_code: Option<String>,
    pub watch_url: Option<String>,
    pub download_url: Option<String>,
    /// Short localized message for the UI
    pub message: Option<String>,
}

impl CloneOutcome {
    pub fn failed(original_url: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            original_url: original_url.into(),
            status: CloneStatus::Failed,
            new_code: None,
            watch_url: None,
            download_url: None,
            message: Some(message.into()),
        }
    }

    pub fn skipped(original_url: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            original_url: original_url.into(),
            status: CloneStatus::Skipped,
            new_code: None,
            watch_url: None,
            download_url: None,
            message: Some(message.into()),
        }
    }
}
