// Collection mutations
//
// Every operation takes the current collection and returns the next one. The
// caller supplies the clock reading and, for `create`, the new id. `None`
// means the operation had no effect and nothing needs saving.

use crate::error::TaskError;
use crate::task::{MAX_TEXT_LEN, Task};
use uuid::Uuid;

/// Trim task text and check it against the length rules
pub fn normalize_text(text: &str) -> Result<String, TaskError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(TaskError::EmptyText);
    }

    let len = trimmed.chars().count();
    if len > MAX_TEXT_LEN {
        return Err(TaskError::TextTooLong { len, max: MAX_TEXT_LEN });
    }

    Ok(trimmed.to_string())
}

/// Generate a new task id
///
/// UUIDv7: millisecond timestamp prefix plus random bits. Collisions are not
/// checked.
pub fn new_id() -> String {
    Uuid::now_v7().to_string()
}

/// Prepend a new task
pub fn create(tasks: &[Task], id: impl Into<String>, text: &str, now: i64) -> Result<Vec<Task>, TaskError> {
    let text = normalize_text(text)?;

    let mut next = Vec::with_capacity(tasks.len() + 1);
    next.push(Task::new(id, text, now));
    next.extend_from_slice(tasks);
    Ok(next)
}

/// Replace the text of the task with `id`
pub fn update(tasks: &[Task], id: &str, text: &str, now: i64) -> Option<Vec<Task>> {
    let text = normalize_text(text).ok()?;
    replace(tasks, id, |task| task.with_text(text.as_str(), now))
}

/// Flip the completion state of the task with `id`
pub fn toggle_complete(tasks: &[Task], id: &str, now: i64) -> Option<Vec<Task>> {
    replace(tasks, id, |task| task.toggled(now))
}

/// Remove the task with `id`
pub fn delete(tasks: &[Task], id: &str) -> Option<Vec<Task>> {
    if !tasks.iter().any(|task| task.id == id) {
        return None;
    }
    Some(tasks.iter().filter(|task| task.id != id).cloned().collect())
}

/// Drop every task
pub fn clear_all() -> Vec<Task> {
    Vec::new()
}

fn replace(tasks: &[Task], id: &str, f: impl FnOnce(&Task) -> Task) -> Option<Vec<Task>> {
    let pos = tasks.iter().position(|task| task.id == id)?;

    let mut next = tasks.to_vec();
    next[pos] = f(&tasks[pos]);
    Some(next)
}
