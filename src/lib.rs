// TaskForge - local task tracking with snapshot persistence

pub mod command;
pub mod config;
pub mod confirm;
pub mod error;
pub mod export;
pub mod mutation;
pub mod persist;
pub mod store;
pub mod task;
pub mod view;

// Re-export main types for convenience
pub use command::{Command, Outcome};
pub use config::{Backend, Config};
pub use confirm::{AutoConfirm, Confirm};
pub use error::TaskError;
pub use export::{EXPORT_FILE_NAME, to_csv};
pub use persist::{FileStore, KvStore, MemoryStore, STORAGE_KEY, SqliteStore};
pub use store::{Submitted, TaskStore};
pub use task::{MAX_TEXT_LEN, Task, now_ms};
pub use view::{Filter, SortOrder, Stats, ViewOptions, project};
