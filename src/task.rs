//! Task documents for duty.
//!
//! One task is one JSON document under `<deck>/tasks/`. Status is a derived
//! projection of progress and is recomputed inside every write path; no
//! caller supplies it directly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Workflow state, derived from progress
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    ToDo,
    InProgress,
    Completed,
}

impl TaskStatus {
    /// The one source of truth for the progress -> status projection
    pub fn from_progress(progress: u8) -> Self {
        match progress {
            0 => TaskStatus::ToDo,
            100.. => TaskStatus::Completed,
            _ => TaskStatus::InProgress,
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            TaskStatus::ToDo => "To Do",
            TaskStatus::InProgress => "In Progress",
            TaskStatus::Completed => "Completed",
        };
        f.write_str(label)
    }
}

/// Two kinds of feed entry, discriminated at creation time
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CommentBody {
    /// Free text from a member
    Text { text: String },
    /// A stored attachment record
    File { name: String, url: String },
}

/// One append-only feed entry on a task
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Comment {
    pub id: String,
    pub author_id: String,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub body: CommentBody,
}

impl Comment {
    pub fn text(author_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: Ulid::new().to_string().to_ascii_lowercase(),
            author_id: author_id.into(),
            created_at: Utc::now(),
            body: CommentBody::Text { text: text.into() },
        }
    }

    pub fn file(
        author_id: impl Into<String>,
        name: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            id: Ulid::new().to_string().to_ascii_lowercase(),
            author_id: author_id.into(),
            created_at: Utc::now(),
            body: CommentBody::File {
                name: name.into(),
                url: url.into(),
            },
        }
    }
}

/// A unit of work
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub description: String,
    pub assigner_id: String,
    /// Order-preserving; first assignee is shown first
    #[serde(default)]
    pub assignee_ids: Vec<String>,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub deadline: DateTime<Utc>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub progress: u8,
    /// Overwritten, never appended, on regeneration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl Task {
    pub fn is_assigner(&self, user_id: &str) -> bool {
        self.assigner_id == user_id
    }

    pub fn is_assignee(&self, user_id: &str) -> bool {
        self.assignee_ids.iter().any(|id| id == user_id)
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.deadline < now && self.status != TaskStatus::Completed
    }
}

/// Listing orders; none of them change the visibility set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskSort {
    /// Most recently created first (the default)
    #[default]
    Created,
    /// Nearest deadline first
    Deadline,
    /// Least progressed first
    Progress,
}

impl TaskSort {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "created" => Some(TaskSort::Created),
            "deadline" => Some(TaskSort::Deadline),
            "progress" => Some(TaskSort::Progress),
            _ => None,
        }
    }
}

/// Sort tasks in place; id is the stable tiebreak throughout
pub fn sort_tasks(tasks: &mut [Task], sort: TaskSort) {
    match sort {
        TaskSort::Created => tasks.sort_by(|left, right| {
            right
                .created_at
                .cmp(&left.created_at)
                .then_with(|| left.id.cmp(&right.id))
        }),
        TaskSort::Deadline => tasks.sort_by(|left, right| {
            left.deadline
                .cmp(&right.deadline)
                .then_with(|| left.id.cmp(&right.id))
        }),
        TaskSort::Progress => tasks.sort_by(|left, right| {
            left.progress
                .cmp(&right.progress)
                .then_with(|| left.id.cmp(&right.id))
        }),
    }
}
