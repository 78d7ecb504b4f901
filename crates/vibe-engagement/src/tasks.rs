//! To-do list with JSON file persistence.
//!
//! The list is the book's chapter 3 task manager. It is stored as a JSON
//! array in a single file, which plays the role of the browser's local
//! storage `tasks` key.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Result, VibeError};

/// One to-do item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Creation time in milliseconds since the epoch, bumped to stay unique.
    pub id: u64,
    /// Task text.
    pub text: String,
    /// Whether the task is done.
    pub completed: bool,
    /// When the task was added.
    pub created_at: DateTime<Utc>,
}

/// Which tasks to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskFilter {
    /// Every task.
    #[default]
    All,
    /// Tasks not yet done.
    Active,
    /// Tasks that are done.
    Completed,
}

impl TaskFilter {
    /// Returns `true` if the task passes the filter.
    #[must_use]
    pub const fn matches(self, task: &Task) -> bool {
        match self {
            Self::All => true,
            Self::Active => !task.completed,
            Self::Completed => task.completed,
        }
    }
}

impl fmt::Display for TaskFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::Active => write!(f, "active"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

impl FromStr for TaskFilter {
    type Err = VibeError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(Self::All),
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            _ => Err(VibeError::invalid_input(format!(
                "Unknown task filter '{s}': expected one of all, active, completed"
            ))),
        }
    }
}

/// Task counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskStats {
    /// All tasks.
    pub total: usize,
    /// Tasks not yet done.
    pub active: usize,
    /// Tasks that are done.
    pub completed: usize,
}

/// Ordered list of tasks, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskList {
    tasks: Vec<Task>,
}

impl TaskList {
    /// Creates an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All tasks, oldest first.
    #[must_use]
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Looks up a task.
    ///
    /// # Errors
    ///
    /// Returns `VibeError::TaskNotFound` for an unknown id.
    pub fn get(&self, id: u64) -> Result<&Task> {
        self.tasks
            .iter()
            .find(|t| t.id == id)
            .ok_or_else(|| VibeError::task_not_found(id))
    }

    /// Appends a task with trimmed text.
    ///
    /// # Errors
    ///
    /// Returns `VibeError::InvalidInput` if the text is blank, or if the
    /// list already holds the largest representable id.
    pub fn add(&mut self, text: &str) -> Result<Task> {
        let text = validate_text(text)?;
        let created_at = Utc::now();
        let millis = u64::try_from(created_at.timestamp_millis()).unwrap_or(0);
        let id = match self.tasks.iter().map(|t| t.id).max() {
            None => millis,
            Some(last) => {
                let next = last.checked_add(1).ok_or_else(|| {
                    VibeError::invalid_input("Task ids are exhausted, no id follows the largest stored one")
                })?;
                millis.max(next)
            }
        };

        let task = Task {
            id,
            text,
            completed: false,
            created_at,
        };
        debug!(task = id, "Task added");
        self.tasks.push(task.clone());
        Ok(task)
    }

    /// Flips a task's completion state.
    ///
    /// # Errors
    ///
    /// Returns `VibeError::TaskNotFound` for an unknown id.
    pub fn toggle(&mut self, id: u64) -> Result<Task> {
        let task = self.find_mut(id)?;
        task.completed = !task.completed;
        Ok(task.clone())
    }

    /// Sets a task's completion state.
    ///
    /// # Errors
    ///
    /// Returns `VibeError::TaskNotFound` for an unknown id.
    pub fn set_completed(&mut self, id: u64, completed: bool) -> Result<Task> {
        let task = self.find_mut(id)?;
        task.completed = completed;
        Ok(task.clone())
    }

    /// Replaces a task's text.
    ///
    /// # Errors
    ///
    /// Returns `VibeError::InvalidInput` if the text is blank and
    /// `VibeError::TaskNotFound` for an unknown id.
    pub fn edit(&mut self, id: u64, text: &str) -> Result<Task> {
        let text = validate_text(text)?;
        let task = self.find_mut(id)?;
        task.text = text;
        Ok(task.clone())
    }

    /// Removes a task.
    ///
    /// # Errors
    ///
    /// Returns `VibeError::TaskNotFound` for an unknown id.
    pub fn delete(&mut self, id: u64) -> Result<Task> {
        let index = self
            .tasks
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| VibeError::task_not_found(id))?;
        Ok(self.tasks.remove(index))
    }

    /// Tasks passing the filter, oldest first.
    #[must_use]
    pub fn filtered(&self, filter: TaskFilter) -> Vec<Task> {
        self.tasks
            .iter()
            .filter(|t| filter.matches(t))
            .cloned()
            .collect()
    }

    /// Counts of all, active and completed tasks.
    #[must_use]
    pub fn stats(&self) -> TaskStats {
        let completed = self.tasks.iter().filter(|t| t.completed).count();
        TaskStats {
            total: self.tasks.len(),
            active: self.tasks.len() - completed,
            completed,
        }
    }

    /// Loads the list from a JSON file.
    ///
    /// A missing file yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns `VibeError::StorageCorrupted` if the file is not a JSON task
    /// array, or `VibeError::Io` if it cannot be read.
    pub async fn load(path: &Path) -> Result<Self> {
        let contents = match tokio::fs::read_to_string(path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No task file, starting empty");
                return Ok(Self::new());
            }
            Err(e) => return Err(VibeError::Io(e)),
        };

        let tasks: Vec<Task> = serde_json::from_str(&contents)
            .map_err(|e| VibeError::storage_corrupted(path, e.to_string()))?;
        info!(path = %path.display(), count = tasks.len(), "Loaded tasks");
        Ok(Self { tasks })
    }

    /// Writes the list to a JSON file.
    ///
    /// Writes a sibling temporary file first and renames it over the target,
    /// so readers never see a partial file. The temporary file is removed
    /// when either step fails.
    ///
    /// # Errors
    ///
    /// Returns `VibeError::Io` if the directory or file cannot be written.
    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_string_pretty(&self.tasks)?;
        let tmp_path = temp_path_for(path);
        let written = match tokio::fs::write(&tmp_path, json.as_bytes()).await {
            Ok(()) => tokio::fs::rename(&tmp_path, path).await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            tokio::fs::remove_file(&tmp_path).await.ok();
            return Err(VibeError::Io(e));
        }

        debug!(path = %path.display(), count = self.tasks.len(), "Saved tasks");
        Ok(())
    }

    fn find_mut(&mut self, id: u64) -> Result<&mut Task> {
        self.tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| VibeError::task_not_found(id))
    }
}

fn validate_text(text: &str) -> Result<String> {
    let text = text.trim();
    if text.is_empty() {
        return Err(VibeError::invalid_input("Task cannot be empty"));
    }
    Ok(text.to_string())
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(ToOwned::to_owned).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_add_trims_text() {
        let mut list = TaskList::new();
        let task = list.add("  Write chapter summary  ").unwrap();
        assert_eq!(task.text, "Write chapter summary");
        assert!(!task.completed);
        assert_eq!(list.tasks().len(), 1);
    }

    #[test]
    fn test_add_rejects_empty_text() {
        let mut list = TaskList::new();
        let err = list.add("   ").unwrap_err();
        assert_eq!(err.to_string(), "Task cannot be empty");
        assert!(list.tasks().is_empty());
    }

    #[test]
    fn test_ids_are_unique_and_increasing() {
        let mut list = TaskList::new();
        let a = list.add("one").unwrap();
        let b = list.add("two").unwrap();
        let c = list.add("three").unwrap();
        assert!(a.id < b.id);
        assert!(b.id < c.id);
    }

    #[test]
    fn test_add_after_largest_id_is_rejected() {
        let json = r#"[{"id":18446744073709551615,"text":"Last one","completed":false,"createdAt":"2026-01-01T00:00:00Z"}]"#;
        let tasks: Vec<Task> = serde_json::from_str(json).unwrap();
        let mut list = TaskList { tasks };

        let err = list.add("next").unwrap_err();
        assert!(matches!(err, VibeError::InvalidInput(_)));
        assert_eq!(list.tasks().len(), 1);
    }

    #[test]
    fn test_toggle_flips_completion() {
        let mut list = TaskList::new();
        let id = list.add("Review PR").unwrap().id;
        assert!(list.toggle(id).unwrap().completed);
        assert!(!list.toggle(id).unwrap().completed);
    }

    #[test]
    fn test_edit_replaces_text() {
        let mut list = TaskList::new();
        let id = list.add("Draft").unwrap().id;
        assert_eq!(list.edit(id, "Final").unwrap().text, "Final");
        assert!(list.edit(id, "").is_err());
        assert_eq!(list.get(id).unwrap().text, "Final");
    }

    #[test]
    fn test_unknown_id_is_not_found() {
        let mut list = TaskList::new();
        assert!(list.toggle(1).unwrap_err().is_not_found());
        assert!(list.edit(1, "x").unwrap_err().is_not_found());
        assert!(list.delete(1).unwrap_err().is_not_found());
    }

    #[test]
    fn test_delete_removes_task() {
        let mut list = TaskList::new();
        let id = list.add("Temporary").unwrap().id;
        list.add("Keep").unwrap();
        let removed = list.delete(id).unwrap();
        assert_eq!(removed.text, "Temporary");
        assert_eq!(list.tasks().len(), 1);
    }

    #[test]
    fn test_filter_and_stats() {
        let mut list = TaskList::new();
        let done = list.add("Done").unwrap().id;
        list.add("Open 1").unwrap();
        list.add("Open 2").unwrap();
        list.toggle(done).unwrap();

        assert_eq!(list.filtered(TaskFilter::All).len(), 3);
        assert_eq!(list.filtered(TaskFilter::Active).len(), 2);
        assert_eq!(list.filtered(TaskFilter::Completed)[0].text, "Done");
        assert_eq!(
            list.stats(),
            TaskStats {
                total: 3,
                active: 2,
                completed: 1
            }
        );
    }

    #[test]
    fn test_task_filter_parsing() {
        assert_eq!("Completed".parse::<TaskFilter>().unwrap(), TaskFilter::Completed);
        assert!("pending".parse::<TaskFilter>().is_err());
    }

    #[test]
    fn test_task_serialization_uses_camel_case() {
        let mut list = TaskList::new();
        let task = list.add("Ship it").unwrap();
        let json = serde_json::to_value(&task).unwrap();
        assert!(json.get("createdAt").is_some());
        assert_eq!(json["completed"], false);
    }

    // ------------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------------

    #[test]
    fn test_save_and_load() {
        tokio_test::block_on(async {
            let dir = std::env::temp_dir().join("test_vibe_tasks_roundtrip");
            let path = dir.join("nested").join("tasks.json");
            std::fs::remove_dir_all(&dir).ok();

            let mut list = TaskList::new();
            let id = list.add("Persist me").unwrap().id;
            list.toggle(id).unwrap();
            list.save(&path).await.unwrap();

            assert!(!temp_path_for(&path).exists());

            let loaded = TaskList::load(&path).await.unwrap();
            assert_eq!(loaded, list);

            std::fs::remove_dir_all(&dir).ok();
        });
    }

    #[tokio::test]
    async fn test_load_missing_file_is_empty() {
        let path = std::env::temp_dir().join("test_vibe_tasks_missing_never_created.json");
        let list = TaskList::load(&path).await.unwrap();
        assert!(list.tasks().is_empty());
    }

    #[tokio::test]
    async fn test_load_malformed_file_is_corrupted() {
        let path = std::env::temp_dir().join("test_vibe_tasks_corrupted.json");
        std::fs::write(&path, "{ not a list").unwrap();

        let err = TaskList::load(&path).await.unwrap_err();
        assert!(matches!(err, VibeError::StorageCorrupted { .. }));
        assert!(err.is_fatal());

        std::fs::remove_file(&path).ok();
    }

    #[tokio::test]
    async fn test_failed_save_removes_temp_file() {
        let dir = std::env::temp_dir().join(format!("test_vibe_tasks_blocked_{}", std::process::id()));
        std::fs::remove_dir_all(&dir).ok();
        // A directory at the target path makes the final rename fail
        let path = dir.join("tasks.json");
        std::fs::create_dir_all(path.join("occupied")).unwrap();

        let mut list = TaskList::new();
        list.add("Never lands").unwrap();
        let err = list.save(&path).await.unwrap_err();

        assert!(matches!(err, VibeError::Io(_)));
        assert!(!temp_path_for(&path).exists());
        assert!(path.is_dir());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_temp_path_is_sibling() {
        let tmp = temp_path_for(Path::new("/data/tasks.json"));
        assert_eq!(tmp, PathBuf::from("/data/tasks.json.tmp"));
    }
}
