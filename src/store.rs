//! Task store adapter for duty.
//!
//! The one place that orchestrates persistence, policy, the activity log,
//! attachments, and notifications for every task mutation. Policy is
//! enforced here, not only in the CLI form: a caller that bypasses the form
//! and hits the store directly gets the same refusals.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use ulid::Ulid;

use crate::activity::ActivityLog;
use crate::attach::AttachmentStore;
use crate::directory::{User, UserDirectory};
use crate::error::{Error, Result};
use crate::notify::Dispatcher;
use crate::policy::{self, TaskAction};
use crate::storage::Storage;
use crate::task::{sort_tasks, Comment, Task, TaskSort, TaskStatus};

/// Input for task creation
#[derive(Debug, Clone)]
pub struct NewTaskInput {
    pub title: String,
    pub description: String,
    pub assignee_ids: Vec<String>,
    pub deadline: DateTime<Utc>,
    /// Local files uploaded alongside creation; failures skip the file
    pub attachments: Vec<PathBuf>,
}

/// Partial update of the assigner-owned fields; absent fields keep their
/// stored value (last-write-wins, no concurrency check)
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub assignee_ids: Option<Vec<String>>,
    pub deadline: Option<DateTime<Utc>>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.assignee_ids.is_none()
            && self.deadline.is_none()
    }
}

/// Orchestrates every task mutation
pub struct TaskStore {
    storage: Storage,
    directory: std::sync::Arc<UserDirectory>,
    activity: ActivityLog,
    attachments: AttachmentStore,
    dispatcher: Dispatcher,
}

impl TaskStore {
    pub fn new(
        storage: Storage,
        directory: std::sync::Arc<UserDirectory>,
        dispatcher: Dispatcher,
    ) -> Self {
        Self {
            activity: ActivityLog::new(storage.clone()),
            attachments: AttachmentStore::new(storage.clone()),
            storage,
            directory,
            dispatcher,
        }
    }

    pub fn activity(&self) -> &ActivityLog {
        &self.activity
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Direct lookup; absence is a value, not an error
    pub fn get_task(&self, id: &str) -> Result<Option<Task>> {
        self.storage.read_json_opt(&self.storage.task_file(id))
    }

    /// Every task `actor` may see, most recently created first.
    ///
    /// Degrades to an empty list on storage errors: a broken deck renders as
    /// "no tasks" rather than a crash.
    pub fn list_visible(&self, actor: &User) -> Vec<Task> {
        self.list_visible_sorted(actor, TaskSort::Created)
    }

    /// `list_visible` with a caller-chosen order; the visibility set is
    /// identical for every order
    pub fn list_visible_sorted(&self, actor: &User, sort: TaskSort) -> Vec<Task> {
        let all = match self.fetch_all() {
            Ok(tasks) => tasks,
            Err(err) => {
                tracing::warn!(%err, "task listing failed, showing nothing");
                return Vec::new();
            }
        };
        let mut visible = policy::visible_tasks(actor, all);
        sort_tasks(&mut visible, sort);
        visible
    }

    fn fetch_all(&self) -> Result<Vec<Task>> {
        let mut tasks = Vec::new();
        for id in self.storage.list_task_ids()? {
            let task: Task = self.storage.read_json(&self.storage.task_file(&id))?;
            tasks.push(task);
        }
        Ok(tasks)
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Create a task, upload its attachments, log it, notify assignees.
    ///
    /// Attachment uploads run after the task document exists; each failure
    /// is logged and skipped, so the task survives even if every upload
    /// fails. Creation, its attachment comments, and the notifications are
    /// separate non-atomic steps.
    pub fn create_task(&self, input: NewTaskInput, actor: &User) -> Result<Task> {
        let title = input.title.trim();
        if title.is_empty() {
            return Err(Error::InvalidArgument("task title cannot be empty".to_string()));
        }
        let assignees = self.validated_assignees(&input.assignee_ids, actor)?;

        let mut task = Task {
            id: Ulid::new().to_string().to_ascii_lowercase(),
            title: title.to_string(),
            description: input.description.clone(),
            assigner_id: actor.id.clone(),
            assignee_ids: assignees.iter().map(|user| user.id.clone()).collect(),
            status: TaskStatus::ToDo,
            created_at: Utc::now(),
            deadline: input.deadline,
            comments: Vec::new(),
            progress: 0,
            summary: None,
        };

        self.storage
            .write_json(&self.storage.task_file(&task.id), &task)?;

        for path in &input.attachments {
            match self.attachments.store_file(&task.id, path) {
                Ok(stored) => {
                    let comment = Comment::file(&actor.id, stored.name, stored.url);
                    task = self.append_comment_doc(&task.id, comment)?;
                }
                Err(err) => {
                    tracing::warn!(
                        task_id = %task.id,
                        path = %path.display(),
                        %err,
                        "attachment upload failed, skipping file"
                    );
                }
            }
        }

        self.activity.record(Some(actor), "created", Some(&task));
        self.dispatcher.notify_assignees(&task, &assignees);

        Ok(task)
    }

    /// Merge `patch` into the stored task. Assigner only; newly added
    /// assignees (and only those) get notified.
    pub fn update_task(&self, id: &str, patch: TaskPatch, actor: &User) -> Result<Task> {
        if patch.is_empty() {
            return Err(Error::InvalidArgument("nothing to update".to_string()));
        }

        let current = self
            .get_task(id)?
            .ok_or_else(|| Error::TaskNotFound(id.to_string()))?;
        self.check_mutation(actor, &current, TaskAction::EditDetails)?;

        let new_assignees = match &patch.assignee_ids {
            Some(ids) => Some(self.validated_assignees(ids, actor)?),
            None => None,
        };

        // Only genuinely new assignees are notified, in patch order.
        let added: Vec<User> = match &new_assignees {
            Some(users) => users
                .iter()
                .filter(|user| !current.is_assignee(&user.id))
                .cloned()
                .collect(),
            None => Vec::new(),
        };

        let updated = self.storage.update_json(
            &self.storage.task_file(id),
            || current.clone(),
            |task: &mut Task| {
                if let Some(title) = &patch.title {
                    let title = title.trim();
                    if title.is_empty() {
                        return Err(Error::InvalidArgument(
                            "task title cannot be empty".to_string(),
                        ));
                    }
                    task.title = title.to_string();
                }
                if let Some(description) = &patch.description {
                    task.description = description.clone();
                }
                if let Some(users) = &new_assignees {
                    task.assignee_ids = users.iter().map(|user| user.id.clone()).collect();
                }
                if let Some(deadline) = patch.deadline {
                    task.deadline = deadline;
                }
                Ok(task.clone())
            },
        )?;

        self.activity.record(Some(actor), "updated", Some(&updated));
        if !added.is_empty() {
            self.dispatcher.notify_assignees(&updated, &added);
        }

        Ok(updated)
    }

    /// Set progress; the stored status is always the derived projection
    pub fn update_progress(&self, id: &str, progress: u8, actor: &User) -> Result<Task> {
        if progress > 100 {
            return Err(Error::InvalidArgument(format!(
                "progress must be 0-100, got {progress}"
            )));
        }

        let current = self
            .get_task(id)?
            .ok_or_else(|| Error::TaskNotFound(id.to_string()))?;
        self.check_mutation(actor, &current, TaskAction::UpdateProgress)?;

        let updated = self.storage.update_json(
            &self.storage.task_file(id),
            || current.clone(),
            |task: &mut Task| {
                task.progress = progress;
                task.status = TaskStatus::from_progress(progress);
                Ok(task.clone())
            },
        )?;

        self.activity
            .record(Some(actor), "updated progress on", Some(&updated));
        Ok(updated)
    }

    /// Permanently remove a task. Assigner only; deleting a missing task is
    /// an error, not a silent success.
    pub fn delete_task(&self, id: &str, actor: &User) -> Result<Task> {
        // Fetch first: the activity record needs the title snapshot.
        let task = self
            .get_task(id)?
            .ok_or_else(|| Error::TaskNotFound(id.to_string()))?;
        self.check_mutation(actor, &task, TaskAction::Delete)?;

        if !self.storage.remove_file(&self.storage.task_file(id))? {
            return Err(Error::TaskNotFound(id.to_string()));
        }

        self.activity.record(Some(actor), "deleted", Some(&task));
        Ok(task)
    }

    /// Append a text comment. Assigner or assignee only.
    pub fn add_comment(&self, task_id: &str, text: &str, actor: &User) -> Result<Task> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::InvalidArgument("comment cannot be empty".to_string()));
        }

        let current = self
            .get_task(task_id)?
            .ok_or_else(|| Error::TaskNotFound(task_id.to_string()))?;
        self.check_mutation(actor, &current, TaskAction::Comment)?;

        let comment = Comment::text(&actor.id, text);
        let updated = self.append_comment_doc(task_id, comment)?;

        self.activity
            .record(Some(actor), "commented on", Some(&updated));
        Ok(updated)
    }

    /// Upload a file and append it to the feed as a file comment
    pub fn add_attachment(&self, task_id: &str, path: &std::path::Path, actor: &User) -> Result<Task> {
        let current = self
            .get_task(task_id)?
            .ok_or_else(|| Error::TaskNotFound(task_id.to_string()))?;
        self.check_mutation(actor, &current, TaskAction::Comment)?;

        let stored = self.attachments.store_file(task_id, path)?;
        let comment = Comment::file(&actor.id, stored.name, stored.url);
        let updated = self.append_comment_doc(task_id, comment)?;

        self.activity
            .record(Some(actor), "commented on", Some(&updated));
        Ok(updated)
    }

    /// Overwrite the stored summary; any viewer may regenerate it
    pub fn set_summary(&self, task_id: &str, summary: &str, actor: &User) -> Result<Task> {
        let current = self
            .get_task(task_id)?
            .ok_or_else(|| Error::TaskNotFound(task_id.to_string()))?;
        if !policy::can_view(actor, &current) {
            return Err(Error::NotVisible(task_id.to_string()));
        }

        self.storage.update_json(
            &self.storage.task_file(task_id),
            || current.clone(),
            |task: &mut Task| {
                task.summary = Some(summary.to_string());
                Ok(task.clone())
            },
        )
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Append a comment inside the document's locked critical section.
    ///
    /// Concurrent commenters serialize on the task's lock file; both
    /// comments land.
    fn append_comment_doc(&self, task_id: &str, comment: Comment) -> Result<Task> {
        let path = self.storage.task_file(task_id);
        if !path.exists() {
            return Err(Error::TaskNotFound(task_id.to_string()));
        }
        self.storage.update_json(
            &path,
            || unreachable!("existence checked above"),
            |task: &mut Task| {
                task.comments.push(comment.clone());
                Ok(task.clone())
            },
        )
    }

    /// Resolve assignee ids and enforce the assignment policy.
    ///
    /// Every id must name a member inside `actor`'s assignable set — also
    /// when the caller skipped the CLI form and invoked the store directly.
    fn validated_assignees(&self, assignee_ids: &[String], actor: &User) -> Result<Vec<User>> {
        if assignee_ids.is_empty() {
            return Err(Error::InvalidArgument(
                "a task needs at least one assignee".to_string(),
            ));
        }

        let mut seen = std::collections::HashSet::new();
        let mut assignees = Vec::with_capacity(assignee_ids.len());
        for id in assignee_ids {
            if !seen.insert(id.as_str()) {
                continue;
            }
            let target = self.directory.by_id(id)?;
            if !policy::is_assignable(actor, &target) {
                return Err(Error::NotAssignable {
                    actor: actor.name.clone(),
                    target: target.name.clone(),
                });
            }
            assignees.push(target);
        }
        Ok(assignees)
    }

    fn check_mutation(&self, actor: &User, task: &Task, action: TaskAction) -> Result<()> {
        if !policy::can_view(actor, task) {
            return Err(Error::NotVisible(task.id.clone()));
        }
        if !policy::can_mutate(actor, task, action) {
            let what = match action {
                TaskAction::EditDetails => "only the assigner can edit task details",
                TaskAction::Delete => "only the assigner can delete a task",
                TaskAction::UpdateProgress => "only an assignee can update progress",
                TaskAction::Comment => "only the assigner or an assignee can comment",
            };
            return Err(Error::MutationDenied(what.to_string()));
        }
        Ok(())
    }
}
