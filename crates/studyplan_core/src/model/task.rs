//! Study task domain model.
//!
//! # Responsibility
//! - Define `StudyTask`, its embedded `SubTask` checklist and the closed
//!   status/priority/difficulty vocabularies.
//!
//! # Invariants
//! - `title` is never blank for a stored task.
//! - `updated_at >= created_at`.
//! - Subtasks have no lifecycle outside their parent's `subtasks` list.

use super::{EntityId, ValidationError};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Kanban column a task currently belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TaskStatus {
    /// Planned, not started.
    #[default]
    ToStudy,
    /// Actively being worked on; the only state where timers usually run.
    InProgress,
    /// Studied once, waiting for review.
    Revision,
    /// Done.
    Completed,
}

impl TaskStatus {
    /// All statuses in board column order.
    pub const ALL: [TaskStatus; 4] = [
        TaskStatus::ToStudy,
        TaskStatus::InProgress,
        TaskStatus::Revision,
        TaskStatus::Completed,
    ];

    /// Stable wire id, also used as the kanban column identifier.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ToStudy => "toStudy",
            Self::InProgress => "inProgress",
            Self::Revision => "revision",
            Self::Completed => "completed",
        }
    }

    /// Parses an exact wire id. Returns `None` for anything else.
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_str() == value)
    }
}

impl Display for TaskStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for unknown status strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatus(pub String);

impl Display for UnknownStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "unknown task status `{}`; expected toStudy|inProgress|revision|completed",
            self.0
        )
    }
}

impl std::error::Error for UnknownStatus {}

impl FromStr for TaskStatus {
    type Err = UnknownStatus;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value.trim()).ok_or_else(|| UnknownStatus(value.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub const ALL: [Priority; 4] = [
        Priority::Low,
        Priority::Medium,
        Priority::High,
        Priority::Urgent,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }

    /// Parses an exact wire id such as `urgent`.
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|priority| priority.as_str() == value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|difficulty| difficulty.as_str() == value)
    }
}

/// Checklist item embedded in a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubTask {
    pub id: EntityId,
    pub title: String,
    #[serde(default)]
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

/// A unit of study work tracked on the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyTask {
    pub id: EntityId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Must name a subject declared in the user profile.
    pub subject: String,
    pub due: NaiveDate,
    /// Accumulated study time in whole seconds.
    #[serde(default)]
    pub time_spent: u64,
    pub status: TaskStatus,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub subtasks: Vec<SubTask>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StudyTask {
    /// Checks invariants that do not depend on the rest of the document.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        if self.updated_at < self.created_at {
            return Err(ValidationError::TimestampOrder);
        }
        Ok(())
    }

    pub fn subtask(&self, subtask_id: &str) -> Option<&SubTask> {
        self.subtasks.iter().find(|subtask| subtask.id == subtask_id)
    }

    /// Returns `(completed, total)` subtask counts.
    pub fn subtask_progress(&self) -> (usize, usize) {
        let completed = self
            .subtasks
            .iter()
            .filter(|subtask| subtask.completed)
            .count();
        (completed, self.subtasks.len())
    }
}

/// Caller input for `StudyStore::create_task`.
///
/// `due` is optional here only so a missing date can be rejected as a
/// validation error instead of being unrepresentable at the call site.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub subject: String,
    pub due: Option<NaiveDate>,
    /// Defaults to `toStudy`.
    pub status: Option<TaskStatus>,
    pub priority: Priority,
    pub difficulty: Difficulty,
    /// Initial tracked time in seconds, normally zero.
    pub time_spent: u64,
}

impl NewTask {
    pub fn new(title: impl Into<String>, subject: impl Into<String>, due: NaiveDate) -> Self {
        Self {
            title: title.into(),
            subject: subject.into(),
            due: Some(due),
            ..Self::default()
        }
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = difficulty;
        self
    }
}
