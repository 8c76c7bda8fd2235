//! # Domain Model
//!
//! Task lists and tasks as stored by the [`DataStore`](crate::store::DataStore).
//!
//! ```text
//! TaskList 1 ──── * Task
//! ```
//!
//! Deleting a list deletes its tasks.

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

/// Maximum length of a task or list label, in characters.
pub const MAX_LABEL_LEN: usize = 50;
/// Maximum length of a task or list description, in characters.
pub const MAX_DESCRIPTION_LEN: usize = 500;

const DUE_DATE_DISPLAY_FORMAT: &str = "%b %e %-I:%M:%S%p";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskList {
    pub id: u64,
    pub label: String,
    #[serde(default)]
    pub description: String,
    pub date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TaskList {
    /// An unsaved list (id 0) dated now.
    pub fn draft(label: impl Into<String>, description: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            label: label.into(),
            description: description.into(),
            date: now,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_saved(&self) -> bool {
        self.id != 0
    }

    /// `"Label (id)"`, as shown in list pickers.
    pub fn choice_label(&self) -> String {
        format!("{} ({})", self.label, self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: u64,
    pub label: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub priority: TaskPriority,
    /// Store-assigned ordering number, unique across tasks.
    #[serde(default)]
    pub order: u64,
    pub due_date: Option<DateTime<Utc>>,
    pub task_list_id: Option<u64>,
    /// Filled only when the query preloads [`Relation::TaskList`](crate::store::Relation).
    #[serde(skip)]
    pub task_list: Option<TaskList>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// An unsaved task (id 0) in the given list.
    pub fn draft(label: impl Into<String>, task_list_id: Option<u64>) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            label: label.into(),
            description: String::new(),
            status: TaskStatus::default(),
            priority: TaskPriority::default(),
            order: 0,
            due_date: None,
            task_list_id,
            task_list: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_saved(&self) -> bool {
        self.id != 0
    }

    pub fn due_date_display(&self) -> String {
        self.due_date
            .map(format_due_date)
            .unwrap_or_else(|| "None".to_string())
    }
}

/// Formats a timestamp in local time, e.g. `"Mar  4 3:07:09PM"`.
pub fn format_due_date(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local)
        .format(DUE_DATE_DISPLAY_FORMAT)
        .to_string()
}

/// Truncates to at most `max` characters (not bytes).
pub fn clamp_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

// ============================================================================
// Status
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u32", from = "u32")]
pub enum TaskStatus {
    #[default]
    Todo,
    Done,
    Skip,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 3] = [TaskStatus::Todo, TaskStatus::Done, TaskStatus::Skip];

    pub fn number(self) -> u32 {
        match self {
            TaskStatus::Todo => 0,
            TaskStatus::Done => 10,
            TaskStatus::Skip => 20,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            TaskStatus::Todo => "Todo",
            TaskStatus::Done => "Done",
            TaskStatus::Skip => "Skip",
        }
    }

    /// Case-insensitive; anything unrecognised is `Todo`.
    pub fn from_title(title: &str) -> Self {
        match title.trim().to_lowercase().as_str() {
            "done" => TaskStatus::Done,
            "skip" => TaskStatus::Skip,
            _ => TaskStatus::Todo,
        }
    }

    /// Todo → Done → Skip → Todo
    pub fn next(self) -> Self {
        match self {
            TaskStatus::Todo => TaskStatus::Done,
            TaskStatus::Done => TaskStatus::Skip,
            TaskStatus::Skip => TaskStatus::Todo,
        }
    }

    /// Short glyph used in task rows.
    pub fn marker(self) -> &'static str {
        match self {
            TaskStatus::Todo => "[ ]",
            TaskStatus::Done => "[x]",
            TaskStatus::Skip => "[-]",
        }
    }
}

impl From<TaskStatus> for u32 {
    fn from(status: TaskStatus) -> Self {
        status.number()
    }
}

impl From<u32> for TaskStatus {
    fn from(n: u32) -> Self {
        match n {
            10 => TaskStatus::Done,
            20 => TaskStatus::Skip,
            _ => TaskStatus::Todo,
        }
    }
}

// ============================================================================
// Priority
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u32", from = "u32")]
pub enum TaskPriority {
    Lowest,
    Low,
    #[default]
    High,
    Highest,
}

impl TaskPriority {
    pub const ALL: [TaskPriority; 4] = [
        TaskPriority::Lowest,
        TaskPriority::Low,
        TaskPriority::High,
        TaskPriority::Highest,
    ];

    pub fn number(self) -> u32 {
        match self {
            TaskPriority::Lowest => 0,
            TaskPriority::Low => 10,
            TaskPriority::High => 20,
            TaskPriority::Highest => 30,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            TaskPriority::Lowest => "lowest",
            TaskPriority::Low => "low",
            TaskPriority::High => "high",
            TaskPriority::Highest => "highest",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            TaskPriority::Lowest => "Lowest",
            TaskPriority::Low => "Low",
            TaskPriority::High => "High",
            TaskPriority::Highest => "Highest",
        }
    }

    /// Case-insensitive; anything unrecognised is `High`.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "lowest" => TaskPriority::Lowest,
            "low" => TaskPriority::Low,
            "highest" => TaskPriority::Highest,
            _ => TaskPriority::High,
        }
    }

    /// Lowest → Low → High → Highest → Lowest
    pub fn next(self) -> Self {
        match self {
            TaskPriority::Lowest => TaskPriority::Low,
            TaskPriority::Low => TaskPriority::High,
            TaskPriority::High => TaskPriority::Highest,
            TaskPriority::Highest => TaskPriority::Lowest,
        }
    }

    pub fn marker(self) -> &'static str {
        match self {
            TaskPriority::Lowest => "v ",
            TaskPriority::Low => "- ",
            TaskPriority::High => "^ ",
            TaskPriority::Highest => "^^",
        }
    }
}

impl From<TaskPriority> for u32 {
    fn from(priority: TaskPriority) -> Self {
        priority.number()
    }
}

impl From<u32> for TaskPriority {
    fn from(n: u32) -> Self {
        match n {
            0 => TaskPriority::Lowest,
            10 => TaskPriority::Low,
            30 => TaskPriority::Highest,
            _ => TaskPriority::High,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_cycle_wraps() {
        let mut status = TaskStatus::Todo;
        for _ in 0..3 {
            status = status.next();
        }
        assert_eq!(status, TaskStatus::Todo);
        assert_eq!(TaskStatus::Todo.next(), TaskStatus::Done);
        assert_eq!(TaskStatus::Done.next(), TaskStatus::Skip);
    }

    #[test]
    fn test_status_from_title_defaults_to_todo() {
        assert_eq!(TaskStatus::from_title("DONE"), TaskStatus::Done);
        assert_eq!(TaskStatus::from_title("skip"), TaskStatus::Skip);
        assert_eq!(TaskStatus::from_title("whatever"), TaskStatus::Todo);
    }

    #[test]
    fn test_status_numbers_match_storage_values() {
        assert_eq!(u32::from(TaskStatus::Done), 10);
        assert_eq!(TaskStatus::from(20), TaskStatus::Skip);
        assert_eq!(TaskStatus::from(7), TaskStatus::Todo);
    }

    #[test]
    fn test_priority_defaults_to_high() {
        assert_eq!(TaskPriority::default(), TaskPriority::High);
        assert_eq!(TaskPriority::from_name("nonsense"), TaskPriority::High);
        assert_eq!(TaskPriority::from(25), TaskPriority::High);
    }

    #[test]
    fn test_priority_cycle() {
        assert_eq!(TaskPriority::Highest.next(), TaskPriority::Lowest);
        assert_eq!(TaskPriority::Lowest.next(), TaskPriority::Low);
        assert_eq!(TaskPriority::from_name("Lowest"), TaskPriority::Lowest);
    }

    #[test]
    fn test_task_serializes_enums_as_numbers() {
        let mut task = Task::draft("Write report", Some(1));
        task.status = TaskStatus::Done;
        task.priority = TaskPriority::Highest;
        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["status"], 10);
        assert_eq!(json["priority"], 30);
        assert!(json.get("task_list").is_none());
    }

    #[test]
    fn test_clamp_chars_counts_characters() {
        assert_eq!(clamp_chars("héllo", 2), "hé");
        assert_eq!(clamp_chars("ab", 50), "ab");
    }

    #[test]
    fn test_choice_label() {
        let mut list = TaskList::draft("Groceries", "");
        list.id = 4;
        assert_eq!(list.choice_label(), "Groceries (4)");
    }

    #[test]
    fn test_due_date_display_without_date() {
        let task = Task::draft("x", None);
        assert_eq!(task.due_date_display(), "None");
    }
}
