// Task store: owns the canonical collection and keeps the durable copy in sync

use crate::confirm::Confirm;
use crate::export;
use crate::mutation;
use crate::persist::{self, KvStore, MemoryStore};
use crate::task::{Task, now_ms};
use crate::view::{self, Filter, SortOrder, Stats, ViewOptions};
use eyre::Result;
use tracing::{debug, info};

pub const DELETE_PROMPT: &str = "Permanently delete this task?";
pub const CLEAR_ALL_PROMPT: &str = "Clear all tasks? This will remove everything permanently.";

/// What a submit did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submitted {
    Created(String),
    /// Edit mode was active; carries the edited id. The update itself is a
    /// no-op if that task has disappeared meanwhile.
    Updated(String),
}

/// Controller over the task collection
///
/// Every successful mutation writes a full snapshot through the backing
/// [`KvStore`] before the in-memory collection is replaced, so a failed save
/// leaves the collection as it was.
pub struct TaskStore {
    kv: Box<dyn KvStore>,
    tasks: Vec<Task>,
    editing: Option<String>,
    view: ViewOptions,
}

impl TaskStore {
    /// Open a store over `kv`, loading whatever collection it holds
    pub fn open(kv: Box<dyn KvStore>) -> Result<Self> {
        let tasks = persist::load(&*kv)?;
        info!(count = tasks.len(), "Opened task store");

        Ok(Self {
            kv,
            tasks,
            editing: None,
            view: ViewOptions::default(),
        })
    }

    /// An empty store backed by memory only
    pub fn in_memory() -> Self {
        Self {
            kv: Box::new(MemoryStore::new()),
            tasks: Vec::new(),
            editing: None,
            view: ViewOptions::default(),
        }
    }

    /// The canonical collection, newest-created first by convention
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    pub fn backend(&self) -> &dyn KvStore {
        &*self.kv
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Create a task and return its id
    ///
    /// Fails with [`TaskError::EmptyText`](crate::TaskError::EmptyText) or
    /// [`TaskError::TextTooLong`](crate::TaskError::TextTooLong) without
    /// touching state.
    pub fn create(&mut self, text: &str) -> Result<String> {
        let id = mutation::new_id();
        let next = mutation::create(&self.tasks, id.clone(), text, now_ms())?;
        self.commit(next)?;

        debug!(id = %id, "Created task");
        Ok(id)
    }

    /// Replace a task's text. Returns false if nothing changed.
    pub fn update(&mut self, id: &str, text: &str) -> Result<bool> {
        match mutation::update(&self.tasks, id, text, now_ms()) {
            Some(next) => {
                self.commit(next)?;
                debug!(id, "Updated task");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Flip a task's completion state. Returns false for an unknown id.
    pub fn toggle_complete(&mut self, id: &str) -> Result<bool> {
        match mutation::toggle_complete(&self.tasks, id, now_ms()) {
            Some(next) => {
                self.commit(next)?;
                debug!(id, "Toggled task");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Delete a task after confirmation
    ///
    /// Unknown ids return false without prompting. Deleting the task being
    /// edited leaves edit mode.
    pub fn delete(&mut self, id: &str, confirm: &mut dyn Confirm) -> Result<bool> {
        if self.get(id).is_none() {
            return Ok(false);
        }
        if !confirm.confirm(DELETE_PROMPT) {
            debug!(id, "Delete declined");
            return Ok(false);
        }

        let Some(next) = mutation::delete(&self.tasks, id) else {
            return Ok(false);
        };
        self.commit(next)?;

        if self.editing.as_deref() == Some(id) {
            self.editing = None;
        }

        debug!(id, "Deleted task");
        Ok(true)
    }

    /// Remove every task after confirmation. Returns false if declined.
    pub fn clear_all(&mut self, confirm: &mut dyn Confirm) -> Result<bool> {
        if !confirm.confirm(CLEAR_ALL_PROMPT) {
            debug!("Clear all declined");
            return Ok(false);
        }

        let removed = self.tasks.len();
        self.commit(mutation::clear_all())?;
        self.editing = None;

        info!(removed, "Cleared all tasks");
        Ok(true)
    }

    // ========================================================================
    // Edit mode
    // ========================================================================

    /// Submit input text: updates the task being edited, or creates a task
    ///
    /// Edit mode is left only once the update has been saved, so it survives
    /// both invalid text and a failed save.
    pub fn submit(&mut self, text: &str) -> Result<Submitted> {
        mutation::normalize_text(text)?;

        match self.editing.clone() {
            Some(id) => {
                self.update(&id, text)?;
                self.editing = None;
                Ok(Submitted::Updated(id))
            }
            None => self.create(text).map(Submitted::Created),
        }
    }

    /// Enter edit mode for `id`, returning the text to load into the input
    pub fn begin_edit(&mut self, id: &str) -> Option<String> {
        let text = self.get(id)?.text.clone();
        self.editing = Some(id.to_string());
        Some(text)
    }

    /// Leave edit mode
    pub fn cancel_edit(&mut self) {
        self.editing = None;
    }

    /// Id of the task being edited
    pub fn editing(&self) -> Option<&str> {
        self.editing.as_deref()
    }

    // ========================================================================
    // View controls
    // ========================================================================

    pub fn view_options(&self) -> &ViewOptions {
        &self.view
    }

    pub fn set_view_options(&mut self, options: ViewOptions) {
        self.view = options;
    }

    pub fn set_filter(&mut self, filter: Filter) {
        self.view.filter = filter;
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.view.query = query.into();
    }

    pub fn set_sort(&mut self, sort: SortOrder) {
        self.view.sort = sort;
    }

    /// Project the collection through the current view controls
    pub fn view(&self) -> Vec<&Task> {
        view::project(&self.tasks, &self.view)
    }

    pub fn stats(&self) -> Stats {
        Stats::of(&self.tasks)
    }

    /// CSV of the whole canonical collection
    pub fn export_csv(&self) -> String {
        export::to_csv(&self.tasks)
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    /// Write the current collection to the backing store
    pub fn save(&mut self) -> Result<()> {
        persist::save(&mut *self.kv, &self.tasks)
    }

    /// Replace the in-memory collection with what the backing store holds
    pub fn reload(&mut self) -> Result<()> {
        self.tasks = persist::load(&*self.kv)?;

        if self.editing.as_deref().is_some_and(|id| self.get(id).is_none()) {
            self.editing = None;
        }
        Ok(())
    }

    fn commit(&mut self, next: Vec<Task>) -> Result<()> {
        persist::save(&mut *self.kv, &next)?;
        self.tasks = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::confirm::AutoConfirm;
    use crate::error::TaskError;
    use crate::persist::{FileStore, SqliteStore};
    use tempfile::TempDir;

    /// Backend that accepts a fixed number of writes, then fails every one
    struct FlakyStore {
        inner: MemoryStore,
        writes_left: usize,
    }

    impl FlakyStore {
        fn new(writes_left: usize) -> Self {
            Self {
                inner: MemoryStore::new(),
                writes_left,
            }
        }
    }

    impl KvStore for FlakyStore {
        fn get(&self, key: &str) -> Result<Option<String>> {
            self.inner.get(key)
        }

        fn set(&mut self, key: &str, value: &str) -> Result<()> {
            if self.writes_left == 0 {
                return Err(eyre::eyre!("disk full"));
            }
            self.writes_left -= 1;
            self.inner.set(key, value)
        }
    }

    fn validation_error(err: &eyre::Report) -> bool {
        err.downcast_ref::<TaskError>().is_some_and(TaskError::is_validation)
    }

    #[test]
    fn test_create_adds_one_uncompleted_task() {
        let mut store = TaskStore::in_memory();

        let id = store.create("  Buy milk  ").unwrap();
        assert_eq!(store.tasks().len(), 1);

        let task = store.get(&id).unwrap();
        assert_eq!(task.text, "Buy milk");
        assert!(!task.completed);
        assert!(task.completed_at.is_none());
        assert!(task.updated_at.is_none());
    }

    #[test]
    fn test_create_prepends() {
        let mut store = TaskStore::in_memory();
        store.create("first").unwrap();
        let second = store.create("second").unwrap();
        assert_eq!(store.tasks()[0].id, second);
    }

    #[test]
    fn test_create_blank_is_validation_error() {
        let mut store = TaskStore::in_memory();
        store.create("keep").unwrap();

        for text in ["", "   "] {
            let err = store.create(text).unwrap_err();
            assert!(validation_error(&err));
        }
        assert_eq!(store.tasks().len(), 1);
    }

    #[test]
    fn test_create_saves_snapshot() {
        let mut store = TaskStore::in_memory();
        store.create("Buy milk").unwrap();

        let saved = persist::load(store.backend()).unwrap();
        assert_eq!(saved, store.tasks());
    }

    #[test]
    fn test_toggle_twice_restores_state() {
        let mut store = TaskStore::in_memory();
        let id = store.create("Buy milk").unwrap();

        assert!(store.toggle_complete(&id).unwrap());
        let task = store.get(&id).unwrap();
        assert!(task.completed);
        assert!(task.completed_at.is_some());
        assert!(task.updated_at.is_some());

        assert!(store.toggle_complete(&id).unwrap());
        let task = store.get(&id).unwrap();
        assert!(!task.completed);
        assert!(task.completed_at.is_none());
    }

    #[test]
    fn test_unknown_ids_are_silent_no_ops() {
        let mut store = TaskStore::in_memory();
        store.create("Buy milk").unwrap();
        let before = store.tasks().to_vec();

        assert!(!store.update("missing", "text").unwrap());
        assert!(!store.toggle_complete("missing").unwrap());
        assert!(!store.delete("missing", &mut AutoConfirm(true)).unwrap());
        assert_eq!(store.tasks(), before.as_slice());
    }

    #[test]
    fn test_update_changes_text() {
        let mut store = TaskStore::in_memory();
        let id = store.create("Buy milk").unwrap();

        assert!(store.update(&id, "Buy oat milk").unwrap());
        let task = store.get(&id).unwrap();
        assert_eq!(task.text, "Buy oat milk");
        assert!(task.updated_at.is_some());

        // Blank text is ignored by update
        assert!(!store.update(&id, "  ").unwrap());
        assert_eq!(store.get(&id).unwrap().text, "Buy oat milk");
    }

    #[test]
    fn test_delete_twice() {
        let mut store = TaskStore::in_memory();
        let id = store.create("Buy milk").unwrap();

        assert!(store.delete(&id, &mut AutoConfirm(true)).unwrap());
        assert!(store.tasks().is_empty());
        assert!(!store.delete(&id, &mut AutoConfirm(true)).unwrap());
    }

    #[test]
    fn test_delete_declined() {
        let mut store = TaskStore::in_memory();
        let id = store.create("Buy milk").unwrap();

        let mut prompts = Vec::new();
        let mut decline = |prompt: &str| {
            prompts.push(prompt.to_string());
            false
        };
        assert!(!store.delete(&id, &mut decline).unwrap());
        assert_eq!(prompts, vec![DELETE_PROMPT]);
        assert!(store.get(&id).is_some());
    }

    #[test]
    fn test_delete_unknown_does_not_prompt() {
        let mut store = TaskStore::in_memory();
        let mut asked = false;
        let mut confirm = |_: &str| {
            asked = true;
            true
        };
        assert!(!store.delete("missing", &mut confirm).unwrap());
        assert!(!asked);
    }

    #[test]
    fn test_delete_edited_task_clears_edit_mode() {
        let mut store = TaskStore::in_memory();
        let id = store.create("Buy milk").unwrap();

        store.begin_edit(&id).unwrap();
        assert!(store.delete(&id, &mut AutoConfirm(true)).unwrap());
        assert!(store.editing().is_none());

        // Next submit creates rather than updating a vanished task
        assert!(matches!(store.submit("Walk dog").unwrap(), Submitted::Created(_)));
    }

    #[test]
    fn test_clear_all() {
        let temp = TempDir::new().unwrap();
        let mut store = TaskStore::open(Box::new(FileStore::open(temp.path()).unwrap())).unwrap();
        store.create("Buy milk").unwrap();
        store.create("Pay bills").unwrap();

        assert!(!store.clear_all(&mut AutoConfirm(false)).unwrap());
        assert_eq!(store.tasks().len(), 2);

        assert!(store.clear_all(&mut AutoConfirm(true)).unwrap());
        assert!(store.tasks().is_empty());

        // Reopening sees the cleared snapshot
        let reopened = TaskStore::open(Box::new(FileStore::open(temp.path()).unwrap())).unwrap();
        assert!(reopened.tasks().is_empty());
    }

    #[test]
    fn test_submit_creates_outside_edit_mode() {
        let mut store = TaskStore::in_memory();
        let Submitted::Created(id) = store.submit("Buy milk").unwrap() else {
            panic!("expected a created task");
        };
        assert_eq!(store.get(&id).unwrap().text, "Buy milk");
    }

    #[test]
    fn test_submit_updates_in_edit_mode() {
        let mut store = TaskStore::in_memory();
        let id = store.create("Buy milk").unwrap();

        assert_eq!(store.begin_edit(&id).as_deref(), Some("Buy milk"));
        assert_eq!(store.editing(), Some(id.as_str()));

        assert_eq!(store.submit("Buy oat milk").unwrap(), Submitted::Updated(id.clone()));
        assert!(store.editing().is_none());
        assert_eq!(store.tasks().len(), 1);
        assert_eq!(store.get(&id).unwrap().text, "Buy oat milk");
    }

    #[test]
    fn test_failed_submit_keeps_edit_mode() {
        let mut store = TaskStore::in_memory();
        let id = store.create("Buy milk").unwrap();
        store.begin_edit(&id).unwrap();

        let err = store.submit("   ").unwrap_err();
        assert!(validation_error(&err));
        assert_eq!(store.editing(), Some(id.as_str()));
        assert_eq!(store.get(&id).unwrap().text, "Buy milk");
    }

    #[test]
    fn test_begin_edit_unknown_and_cancel() {
        let mut store = TaskStore::in_memory();
        let id = store.create("Buy milk").unwrap();

        assert!(store.begin_edit("missing").is_none());
        assert!(store.editing().is_none());

        store.begin_edit(&id).unwrap();
        store.cancel_edit();
        assert!(store.editing().is_none());
    }

    #[test]
    fn test_view_follows_controls() {
        let mut store = TaskStore::in_memory();
        store.create("Buy milk").unwrap();
        let bills = store.create("Pay bills").unwrap();
        store.toggle_complete(&bills).unwrap();

        store.set_filter(Filter::Active);
        let texts: Vec<&str> = store.view().iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["Buy milk"]);

        store.set_filter(Filter::All);
        store.set_query("BILL");
        let texts: Vec<&str> = store.view().iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["Pay bills"]);

        store.set_view_options(ViewOptions::new(Filter::All, "", SortOrder::CompletedAt));
        let texts: Vec<&str> = store.view().iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["Pay bills", "Buy milk"]);

        assert_eq!(
            store.stats(),
            Stats {
                total: 2,
                completed: 1,
                pending: 1
            }
        );
    }

    #[test]
    fn test_export_covers_full_collection() {
        let mut store = TaskStore::in_memory();
        store.create("Buy milk").unwrap();
        store.create("Pay bills").unwrap();
        store.set_query("milk");

        let csv = store.export_csv();
        assert_eq!(csv.lines().count(), 3);
    }

    #[test]
    fn test_reopen_round_trip_sqlite() {
        let temp = TempDir::new().unwrap();

        let tasks = {
            let mut store = TaskStore::open(Box::new(SqliteStore::open(temp.path()).unwrap())).unwrap();
            let id = store.create("Buy milk").unwrap();
            store.create("Pay bills").unwrap();
            store.toggle_complete(&id).unwrap();
            store.tasks().to_vec()
        };

        let store = TaskStore::open(Box::new(SqliteStore::open(temp.path()).unwrap())).unwrap();
        assert_eq!(store.tasks(), tasks.as_slice());
    }

    #[test]
    fn test_open_with_corrupt_snapshot_starts_empty() {
        let mut kv = MemoryStore::new();
        kv.set(persist::STORAGE_KEY, "not json").unwrap();

        let mut store = TaskStore::open(Box::new(kv)).unwrap();
        assert!(store.tasks().is_empty());

        // The next mutation overwrites the corrupt value
        store.create("Buy milk").unwrap();
        assert_eq!(persist::load(store.backend()).unwrap().len(), 1);
    }

    #[test]
    fn test_reload_drops_stale_edit() {
        let temp = TempDir::new().unwrap();
        let mut store = TaskStore::open(Box::new(FileStore::open(temp.path()).unwrap())).unwrap();
        let id = store.create("Buy milk").unwrap();
        store.begin_edit(&id).unwrap();

        // Another handle clears the same directory
        let mut other = FileStore::open(temp.path()).unwrap();
        persist::save(&mut other, &[]).unwrap();

        store.reload().unwrap();
        assert!(store.tasks().is_empty());
        assert!(store.editing().is_none());
    }

    #[test]
    fn test_failed_save_leaves_collection_unchanged() {
        // Two writes succeed: the create and the toggle below
        let mut store = TaskStore::open(Box::new(FlakyStore::new(2))).unwrap();
        let id = store.create("Buy milk").unwrap();
        store.toggle_complete(&id).unwrap();
        let before = store.tasks().to_vec();

        assert!(store.create("Pay bills").is_err());
        assert_eq!(store.tasks(), before.as_slice());

        assert!(store.toggle_complete(&id).is_err());
        assert_eq!(store.tasks(), before.as_slice());

        assert!(store.update(&id, "Buy oat milk").is_err());
        assert_eq!(store.tasks(), before.as_slice());

        assert!(store.delete(&id, &mut AutoConfirm(true)).is_err());
        assert_eq!(store.tasks(), before.as_slice());

        assert!(store.clear_all(&mut AutoConfirm(true)).is_err());
        assert_eq!(store.tasks(), before.as_slice());

        // The backend still holds the last good snapshot
        assert_eq!(persist::load(store.backend()).unwrap(), before);
    }

    #[test]
    fn test_failed_save_keeps_edit_mode() {
        let mut store = TaskStore::open(Box::new(FlakyStore::new(1))).unwrap();
        let id = store.create("Buy milk").unwrap();
        store.begin_edit(&id).unwrap();

        assert!(store.submit("Buy oat milk").is_err());
        assert_eq!(store.editing(), Some(id.as_str()));
        assert_eq!(store.get(&id).unwrap().text, "Buy milk");
    }

    #[test]
    fn test_failed_delete_keeps_edit_mode() {
        let mut store = TaskStore::open(Box::new(FlakyStore::new(1))).unwrap();
        let id = store.create("Buy milk").unwrap();
        store.begin_edit(&id).unwrap();

        assert!(store.delete(&id, &mut AutoConfirm(true)).is_err());
        assert_eq!(store.editing(), Some(id.as_str()));
        assert!(store.get(&id).is_some());
    }
}
