// User commands and their dispatch against a TaskStore

use crate::confirm::Confirm;
use crate::error::TaskError;
use crate::store::{Submitted, TaskStore};
use crate::view::{Filter, SortOrder};
use eyre::Result;
use std::str::FromStr;
use tracing::debug;

/// One discrete user action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Create a task, or update the one being edited
    Submit(String),
    /// Clear the input and leave edit mode
    Reset,
    Toggle(String),
    /// Enter edit mode for a task
    Edit(String),
    Delete(String),
    ClearAll,
    SetFilter(Filter),
    SetQuery(String),
    SetSort(SortOrder),
    /// CSV of the full collection
    Export,
}

/// Result of dispatching a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Submitted(Submitted),
    /// Edit mode entered; `text` belongs in the input
    Editing { id: String, text: String },
    /// Whether a toggle, delete, clear or edit actually took effect
    Applied(bool),
    EditCancelled,
    ViewChanged,
    Exported(String),
}

impl FromStr for Command {
    type Err = TaskError;

    /// Parse a line such as `add Buy milk`, `toggle <id>` or `sort oldest`
    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (verb, rest) = match line.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (line, ""),
        };

        let arg = |usage: &'static str| -> Result<String, TaskError> {
            if rest.is_empty() {
                Err(TaskError::MissingArgument(usage))
            } else {
                Ok(rest.to_string())
            }
        };

        match verb {
            "submit" | "add" => Ok(Command::Submit(rest.to_string())),
            "reset" | "cancel" => Ok(Command::Reset),
            "toggle" | "done" => Ok(Command::Toggle(arg("toggle <id>")?)),
            "edit" => Ok(Command::Edit(arg("edit <id>")?)),
            "delete" | "rm" => Ok(Command::Delete(arg("delete <id>")?)),
            "clear" => Ok(Command::ClearAll),
            "filter" => Ok(Command::SetFilter(arg("filter <all|active|completed>")?.parse()?)),
            "search" => Ok(Command::SetQuery(rest.to_string())),
            "sort" => Ok(Command::SetSort(arg("sort <newest|oldest|completedAt>")?.parse()?)),
            "export" => Ok(Command::Export),
            _ => Err(TaskError::UnknownCommand(line.to_string())),
        }
    }
}

impl TaskStore {
    /// Apply one command
    ///
    /// Destructive commands ask `confirm` first. View commands only change the
    /// controls; call [`TaskStore::view`] afterwards to re-project.
    pub fn dispatch(&mut self, command: Command, confirm: &mut dyn Confirm) -> Result<Outcome> {
        debug!(?command, "Dispatching command");

        let outcome = match command {
            Command::Submit(text) => Outcome::Submitted(self.submit(&text)?),
            Command::Reset => {
                self.cancel_edit();
                Outcome::EditCancelled
            }
            Command::Toggle(id) => Outcome::Applied(self.toggle_complete(&id)?),
            Command::Edit(id) => match self.begin_edit(&id) {
                Some(text) => Outcome::Editing { id, text },
                None => Outcome::Applied(false),
            },
            Command::Delete(id) => Outcome::Applied(self.delete(&id, confirm)?),
            Command::ClearAll => Outcome::Applied(self.clear_all(confirm)?),
            Command::SetFilter(filter) => {
                self.set_filter(filter);
                Outcome::ViewChanged
            }
            Command::SetQuery(query) => {
                self.set_query(query);
                Outcome::ViewChanged
            }
            Command::SetSort(sort) => {
                self.set_sort(sort);
                Outcome::ViewChanged
            }
            Command::Export => Outcome::Exported(self.export_csv()),
        };

        Ok(outcome)
    }
}
