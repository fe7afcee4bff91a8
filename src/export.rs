// CSV export

use crate::task::Task;
use chrono::{DateTime, SecondsFormat, Utc};
use eyre::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::info;

/// Default file name offered for exports
pub const EXPORT_FILE_NAME: &str = "tasks.csv";

const HEADER: [&str; 6] = ["id", "text", "createdAt", "updatedAt", "completedAt", "completed"];

/// Render tasks as CSV text
///
/// Only the `text` column is quoted (inner quotes doubled). Timestamps are
/// RFC 3339 UTC with millisecond precision; absent ones are empty. Rows are
/// joined with `\n` and there is no trailing newline.
pub fn to_csv<'a, I>(tasks: I) -> String
where
    I: IntoIterator<Item = &'a Task>,
{
    let mut lines = vec![HEADER.join(",")];

    for task in tasks {
        let row = [
            task.id.clone(),
            quote(&task.text),
            timestamp(Some(task.created_at)),
            timestamp(task.updated_at),
            timestamp(task.completed_at),
            task.completed.to_string(),
        ];
        lines.push(row.join(","));
    }

    lines.join("\n")
}

/// Write the CSV rendering of `tasks` to `path`
pub fn write_csv<'a, I>(path: &Path, tasks: I) -> Result<()>
where
    I: IntoIterator<Item = &'a Task>,
{
    let csv = to_csv(tasks);
    fs::write(path, &csv).with_context(|| format!("Failed to write CSV export to {}", path.display()))?;

    info!(file = ?path, bytes = csv.len(), "Exported tasks");
    Ok(())
}

fn quote(text: &str) -> String {
    format!("\"{}\"", text.replace('"', "\"\""))
}

fn timestamp(ms: Option<i64>) -> String {
    ms.and_then(DateTime::<Utc>::from_timestamp_millis)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_default()
}
