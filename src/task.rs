// Task data model

use serde::{Deserialize, Serialize};

/// Maximum task text length, in characters, after trimming
pub const MAX_TEXT_LEN: usize = 300;

/// A single tracked task
///
/// Field names on the wire are camelCase (`createdAt`, `completedAt`, ...) and
/// absent timestamps serialize as `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub text: String,
    pub created_at: i64,
    #[serde(default)]
    pub updated_at: Option<i64>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub completed_at: Option<i64>,
}

impl Task {
    /// Build a fresh, uncompleted task. `text` must already be normalized.
    pub fn new(id: impl Into<String>, text: impl Into<String>, now: i64) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            created_at: now,
            updated_at: None,
            completed: false,
            completed_at: None,
        }
    }

    /// Copy of this task carrying new text
    pub fn with_text(&self, text: impl Into<String>, now: i64) -> Self {
        Self {
            text: text.into(),
            updated_at: Some(now),
            ..self.clone()
        }
    }

    /// Copy of this task with the completion flag flipped
    pub fn toggled(&self, now: i64) -> Self {
        let completed = !self.completed;
        Self {
            completed,
            completed_at: completed.then_some(now),
            updated_at: Some(now),
            ..self.clone()
        }
    }
}

/// Current time in milliseconds since the Unix epoch
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
