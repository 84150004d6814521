//! Activity log storage for duty
//!
//! Stores append-only audit records in `<deck>/activity.jsonl`, one per task
//! mutation. Records carry a denormalized title snapshot so the trail stays
//! legible after a task is deleted. Nothing ever updates or deletes an entry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::directory::User;
use crate::error::Result;
use crate::storage::Storage;
use crate::task::Task;

/// One audit record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActivityRecord {
    pub id: Uuid,
    pub user_id: String,
    /// Free-text verb phrase, e.g. "created task"
    pub action: String,
    pub task_id: String,
    /// Title snapshot at mutation time
    pub task_title: String,
    pub timestamp: DateTime<Utc>,
}

/// Append-only audit trail manager
#[derive(Debug, Clone)]
pub struct ActivityLog {
    storage: Storage,
}

impl ActivityLog {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    /// Append one record for a task mutation.
    ///
    /// Logging must never block the mutation it describes: a missing actor
    /// or task downgrades to a warning and a no-op, and append failures are
    /// swallowed the same way.
    pub fn record(&self, actor: Option<&User>, verb: &str, task: Option<&Task>) {
        let (Some(actor), Some(task)) = (actor, task) else {
            tracing::warn!(verb, "activity record skipped: missing actor or task");
            return;
        };

        let record = ActivityRecord {
            id: Uuid::new_v4(),
            user_id: actor.id.clone(),
            action: format!("{verb} task"),
            task_id: task.id.clone(),
            task_title: task.title.clone(),
            timestamp: Utc::now(),
        };

        if let Err(err) = self
            .storage
            .append_jsonl(&self.storage.activity_file(), &record)
        {
            tracing::warn!(%err, task_id = %task.id, "failed to append activity record");
        }
    }

    /// Every record, oldest first
    pub fn all(&self) -> Result<Vec<ActivityRecord>> {
        self.storage.read_jsonl(&self.storage.activity_file())
    }

    /// The latest `limit` records, newest first
    pub fn recent(&self, limit: usize) -> Result<Vec<ActivityRecord>> {
        let mut records = self.all()?;
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| b.id.cmp(&a.id)));
        records.truncate(limit);
        Ok(records)
    }

    /// Records for one task, newest first
    pub fn for_task(&self, task_id: &str) -> Result<Vec<ActivityRecord>> {
        let mut records = self.all()?;
        records.retain(|record| record.task_id == task_id);
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| b.id.cmp(&a.id)));
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::{Credential, Domain};
    use crate::task::TaskStatus;
    use tempfile::TempDir;

    fn actor(id: &str) -> User {
        User {
            id: id.to_string(),
            name: id.to_string(),
            email: format!("{id}@club.test"),
            phone: None,
            position: "Member".to_string(),
            domain: Domain::Technical,
            subdomain: None,
            reports_to: None,
            level: 3,
            credential: Credential {
                salt: String::new(),
                hash: String::new(),
                iterations: 1,
            },
        }
    }

    fn sample_task(id: &str, title: &str) -> Task {
        Task {
            id: id.to_string(),
            title: title.to_string(),
            description: String::new(),
            assigner_id: "boss".to_string(),
            assignee_ids: vec!["worker".to_string()],
            status: TaskStatus::ToDo,
            created_at: Utc::now(),
            deadline: Utc::now(),
            comments: Vec::new(),
            progress: 0,
            summary: None,
        }
    }

    #[test]
    fn record_appends_snapshot() {
        let temp = TempDir::new().unwrap();
        let storage = Storage::new(temp.path().to_path_buf());
        storage.init().unwrap();

        let log = ActivityLog::new(storage);
        let user = actor("u1");
        let task = sample_task("t1", "Ship the poster");

        log.record(Some(&user), "created", Some(&task));
        log.record(Some(&user), "commented on", Some(&task));

        let records = log.all().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].action, "created task");
        assert_eq!(records[0].task_title, "Ship the poster");
        assert_eq!(records[1].action, "commented on task");
    }

    #[test]
    fn missing_actor_or_task_is_a_noop() {
        let temp = TempDir::new().unwrap();
        let storage = Storage::new(temp.path().to_path_buf());
        storage.init().unwrap();

        let log = ActivityLog::new(storage);
        let user = actor("u1");
        let task = sample_task("t1", "T");

        log.record(None, "created", Some(&task));
        log.record(Some(&user), "created", None);

        assert!(log.all().unwrap().is_empty());
    }

    #[test]
    fn for_task_filters_and_orders_newest_first() {
        let temp = TempDir::new().unwrap();
        let storage = Storage::new(temp.path().to_path_buf());
        storage.init().unwrap();

        let log = ActivityLog::new(storage);
        let user = actor("u1");
        let first = sample_task("t1", "One");
        let second = sample_task("t2", "Two");

        log.record(Some(&user), "created", Some(&first));
        log.record(Some(&user), "created", Some(&second));
        log.record(Some(&user), "updated", Some(&first));

        let records = log.for_task("t1").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].action, "updated task");

        let recent = log.recent(1).unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].task_id, "t1");
    }
}
