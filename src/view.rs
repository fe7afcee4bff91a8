// View projection: filter, search and sort over the canonical collection

use crate::error::TaskError;
use crate::task::Task;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Which tasks to show by completion state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Filter {
    #[default]
    All,
    Active,
    Completed,
}

impl Filter {
    fn keeps(self, task: &Task) -> bool {
        match self {
            Filter::All => true,
            Filter::Active => !task.completed,
            Filter::Completed => task.completed,
        }
    }
}

impl FromStr for Filter {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(Filter::All),
            "active" => Ok(Filter::Active),
            "completed" => Ok(Filter::Completed),
            other => Err(TaskError::UnknownFilter(other.to_string())),
        }
    }
}

impl std::fmt::Display for Filter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Filter::All => write!(f, "all"),
            Filter::Active => write!(f, "active"),
            Filter::Completed => write!(f, "completed"),
        }
    }
}

/// Display order
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortOrder {
    /// Most recently created first
    #[default]
    Newest,
    /// Oldest created first
    Oldest,
    /// Most recently completed first; never-completed tasks last
    #[serde(alias = "completed-at")]
    CompletedAt,
}

impl SortOrder {
    fn sort(self, tasks: &mut [&Task]) {
        // slice::sort_by is stable, so ties keep their filtered order
        match self {
            SortOrder::Newest => tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            SortOrder::Oldest => tasks.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
            // None orders below every Some
            SortOrder::CompletedAt => tasks.sort_by(|a, b| b.completed_at.cmp(&a.completed_at)),
        }
    }
}

impl FromStr for SortOrder {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "newest" => Ok(SortOrder::Newest),
            "oldest" => Ok(SortOrder::Oldest),
            "completedAt" | "completed-at" => Ok(SortOrder::CompletedAt),
            other => Err(TaskError::UnknownSort(other.to_string())),
        }
    }
}

impl std::fmt::Display for SortOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SortOrder::Newest => write!(f, "newest"),
            SortOrder::Oldest => write!(f, "oldest"),
            SortOrder::CompletedAt => write!(f, "completedAt"),
        }
    }
}

/// The user-controlled inputs of a projection
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewOptions {
    pub filter: Filter,
    pub query: String,
    pub sort: SortOrder,
}

impl ViewOptions {
    pub fn new(filter: Filter, query: impl Into<String>, sort: SortOrder) -> Self {
        Self {
            filter,
            query: query.into(),
            sort,
        }
    }
}

/// Derive the displayed sequence from the canonical collection
///
/// Stages run in a fixed order: completion filter, then case-insensitive
/// substring search on the trimmed query, then a stable sort.
pub fn project<'a>(tasks: &'a [Task], options: &ViewOptions) -> Vec<&'a Task> {
    let needle = options.query.trim().to_lowercase();

    let mut view: Vec<&Task> = tasks
        .iter()
        .filter(|task| options.filter.keeps(task))
        .filter(|task| needle.is_empty() || task.text.to_lowercase().contains(&needle))
        .collect();

    options.sort.sort(&mut view);
    view
}

/// Completion counters over a collection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
}

impl Stats {
    pub fn of(tasks: &[Task]) -> Self {
        let completed = tasks.iter().filter(|task| task.completed).count();
        Self {
            total: tasks.len(),
            completed,
            pending: tasks.len() - completed,
        }
    }
}
