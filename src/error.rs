// Domain errors for TaskForge
//
// These travel inside `eyre::Report`; callers recover them with
// `report.downcast_ref::<TaskError>()`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TaskError {
    /// Task text is empty after trimming
    #[error("Please add a task description")]
    EmptyText,

    /// Task text exceeds the maximum length after trimming
    #[error("Task description too long: {len} characters (max {max})")]
    TextTooLong { len: usize, max: usize },

    /// Stored snapshot could not be decoded
    #[error("Failed to parse saved tasks: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Unknown filter: {0} (expected all, active or completed)")]
    UnknownFilter(String),

    #[error("Unknown sort order: {0} (expected newest, oldest or completedAt)")]
    UnknownSort(String),

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Missing argument: usage is `{0}`")]
    MissingArgument(&'static str),
}

impl TaskError {
    /// True for errors that reject user input without touching state
    pub fn is_validation(&self) -> bool {
        matches!(self, TaskError::EmptyText | TaskError::TextTooLong { .. })
    }
}
