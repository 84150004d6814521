//! duty task command implementations.

use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, Utc};

use crate::assist::{HttpGenerator, TextGenerator};
use crate::cli::DeckContext;
use crate::directory::UserDirectory;
use crate::error::{Error, Result};
use crate::output::{emit_success, HumanOutput, OutputOptions};
use crate::store::{NewTaskInput, TaskPatch};
use crate::task::{CommentBody, Task, TaskSort};

pub struct NewOptions {
    pub title: String,
    pub description: String,
    pub assignees: Vec<String>,
    pub deadline: String,
    pub attachments: Vec<PathBuf>,
    pub token: Option<String>,
    pub deck: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

pub struct ListOptions {
    pub sort: String,
    pub token: Option<String>,
    pub deck: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

pub struct ShowOptions {
    pub id: String,
    pub token: Option<String>,
    pub deck: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

pub struct EditOptions {
    pub id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub assignees: Vec<String>,
    pub deadline: Option<String>,
    pub token: Option<String>,
    pub deck: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

pub struct ProgressOptions {
    pub id: String,
    pub percent: u8,
    pub token: Option<String>,
    pub deck: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

pub struct CommentOptions {
    pub id: String,
    pub text: String,
    pub token: Option<String>,
    pub deck: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

pub struct AttachOptions {
    pub id: String,
    pub file: PathBuf,
    pub token: Option<String>,
    pub deck: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

pub struct DeleteOptions {
    pub id: String,
    pub token: Option<String>,
    pub deck: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

pub struct DescribeOptions {
    pub title: String,
    pub deck: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

pub struct SummarizeOptions {
    pub id: String,
    pub token: Option<String>,
    pub deck: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

pub fn run_new(opts: NewOptions) -> Result<()> {
    let ctx = DeckContext::open(opts.deck)?;
    let actor = ctx
        .sessions
        .authenticate(&ctx.directory, opts.token.as_deref())?;
    let store = ctx.task_store();

    let assignee_ids = resolve_emails(&ctx.directory, &opts.assignees)?;
    let deadline = parse_deadline(&opts.deadline)?;

    let task = store.create_task(
        NewTaskInput {
            title: opts.title,
            description: opts.description,
            assignee_ids,
            deadline,
            attachments: opts.attachments,
        },
        &actor,
    )?;

    let human = task_human(&ctx.directory, &task, "Created task");
    emit_success(
        OutputOptions {
            json: opts.json,
            quiet: opts.quiet,
        },
        "task new",
        &task,
        Some(&human),
    )
}

pub fn run_list(opts: ListOptions) -> Result<()> {
    let ctx = DeckContext::open(opts.deck)?;
    let actor = ctx
        .sessions
        .authenticate(&ctx.directory, opts.token.as_deref())?;
    let store = ctx.task_store();

    let sort = TaskSort::parse(&opts.sort).ok_or_else(|| {
        Error::InvalidArgument(format!(
            "unknown sort '{}' (expected created, deadline, or progress)",
            opts.sort
        ))
    })?;

    let tasks = store.list_visible_sorted(&actor, sort);

    let now = Utc::now();
    let mut human = HumanOutput::new(format!("{} tasks", tasks.len()));
    for task in &tasks {
        let overdue = if task.is_overdue(now) { "  OVERDUE" } else { "" };
        human.push_detail(format!(
            "{}  [{}] {:>3}%  due {}  {}{}",
            task.id,
            task.status,
            task.progress,
            task.deadline.format("%Y-%m-%d"),
            task.title,
            overdue,
        ));
    }

    emit_success(
        OutputOptions {
            json: opts.json,
            quiet: opts.quiet,
        },
        "task list",
        &tasks,
        Some(&human),
    )
}

pub fn run_show(opts: ShowOptions) -> Result<()> {
    let ctx = DeckContext::open(opts.deck)?;
    let actor = ctx
        .sessions
        .authenticate(&ctx.directory, opts.token.as_deref())?;
    let store = ctx.task_store();

    // Absence and invisibility render the same "not found" page.
    let task = store
        .get_task(&opts.id)?
        .filter(|task| crate::policy::can_view(&actor, task))
        .ok_or_else(|| Error::TaskNotFound(opts.id.clone()))?;

    let human = task_human(&ctx.directory, &task, &task.title.clone());
    emit_success(
        OutputOptions {
            json: opts.json,
            quiet: opts.quiet,
        },
        "task show",
        &task,
        Some(&human),
    )
}

pub fn run_edit(opts: EditOptions) -> Result<()> {
    let ctx = DeckContext::open(opts.deck)?;
    let actor = ctx
        .sessions
        .authenticate(&ctx.directory, opts.token.as_deref())?;
    let store = ctx.task_store();

    let assignee_ids = if opts.assignees.is_empty() {
        None
    } else {
        Some(resolve_emails(&ctx.directory, &opts.assignees)?)
    };
    let deadline = opts.deadline.as_deref().map(parse_deadline).transpose()?;

    let task = store.update_task(
        &opts.id,
        TaskPatch {
            title: opts.title,
            description: opts.description,
            assignee_ids,
            deadline,
        },
        &actor,
    )?;

    let human = task_human(&ctx.directory, &task, "Updated task");
    emit_success(
        OutputOptions {
            json: opts.json,
            quiet: opts.quiet,
        },
        "task edit",
        &task,
        Some(&human),
    )
}

pub fn run_progress(opts: ProgressOptions) -> Result<()> {
    let ctx = DeckContext::open(opts.deck)?;
    let actor = ctx
        .sessions
        .authenticate(&ctx.directory, opts.token.as_deref())?;
    let store = ctx.task_store();

    let task = store.update_progress(&opts.id, opts.percent, &actor)?;

    let mut human = HumanOutput::new(format!("Progress set to {}%", task.progress));
    human.push_summary("task", task.title.clone());
    human.push_summary("status", task.status.to_string());

    emit_success(
        OutputOptions {
            json: opts.json,
            quiet: opts.quiet,
        },
        "task progress",
        &task,
        Some(&human),
    )
}

pub fn run_comment(opts: CommentOptions) -> Result<()> {
    let ctx = DeckContext::open(opts.deck)?;
    let actor = ctx
        .sessions
        .authenticate(&ctx.directory, opts.token.as_deref())?;
    let store = ctx.task_store();

    let task = store.add_comment(&opts.id, &opts.text, &actor)?;

    let mut human = HumanOutput::new("Comment added");
    human.push_summary("task", task.title.clone());
    human.push_summary("comments", task.comments.len().to_string());

    emit_success(
        OutputOptions {
            json: opts.json,
            quiet: opts.quiet,
        },
        "task comment",
        &task,
        Some(&human),
    )
}

pub fn run_attach(opts: AttachOptions) -> Result<()> {
    let ctx = DeckContext::open(opts.deck)?;
    let actor = ctx
        .sessions
        .authenticate(&ctx.directory, opts.token.as_deref())?;
    let store = ctx.task_store();

    let task = store.add_attachment(&opts.id, &opts.file, &actor)?;

    let mut human = HumanOutput::new("File attached");
    human.push_summary("task", task.title.clone());
    if let Some(CommentBody::File { name, url }) = task.comments.last().map(|c| &c.body) {
        human.push_summary("file", name.clone());
        human.push_summary("url", url.clone());
    }

    emit_success(
        OutputOptions {
            json: opts.json,
            quiet: opts.quiet,
        },
        "task attach",
        &task,
        Some(&human),
    )
}

pub fn run_delete(opts: DeleteOptions) -> Result<()> {
    let ctx = DeckContext::open(opts.deck)?;
    let actor = ctx
        .sessions
        .authenticate(&ctx.directory, opts.token.as_deref())?;
    let store = ctx.task_store();

    let task = store.delete_task(&opts.id, &actor)?;

    let mut human = HumanOutput::new("Deleted task");
    human.push_summary("title", task.title.clone());

    emit_success(
        OutputOptions {
            json: opts.json,
            quiet: opts.quiet,
        },
        "task delete",
        &task,
        Some(&human),
    )
}

pub fn run_describe(opts: DescribeOptions) -> Result<()> {
    let ctx = DeckContext::open(opts.deck)?;
    let generator = HttpGenerator::from_config(&ctx.config.assist)?;

    let description = generator.draft_description(&opts.title)?;

    let mut human = HumanOutput::new("Draft description");
    human.push_detail(description.clone());

    #[derive(serde::Serialize)]
    struct DescribeReport {
        title: String,
        description: String,
    }

    emit_success(
        OutputOptions {
            json: opts.json,
            quiet: opts.quiet,
        },
        "task describe",
        &DescribeReport {
            title: opts.title,
            description,
        },
        Some(&human),
    )
}

pub fn run_summarize(opts: SummarizeOptions) -> Result<()> {
    let ctx = DeckContext::open(opts.deck)?;
    let actor = ctx
        .sessions
        .authenticate(&ctx.directory, opts.token.as_deref())?;
    let store = ctx.task_store();
    let generator = HttpGenerator::from_config(&ctx.config.assist)?;

    // Visibility gates the generator call too: an invisible task's content
    // never leaves the deck.
    let task = store
        .get_task(&opts.id)?
        .filter(|task| crate::policy::can_view(&actor, task))
        .ok_or_else(|| Error::TaskNotFound(opts.id.clone()))?;

    let comments = comment_pairs(&ctx.directory, &task);
    let summary = generator.summarize(&task.title, &task.description, &comments)?;
    let task = store.set_summary(&opts.id, &summary, &actor)?;

    let mut human = HumanOutput::new("Summary updated");
    human.push_detail(summary);

    emit_success(
        OutputOptions {
            json: opts.json,
            quiet: opts.quiet,
        },
        "task summarize",
        &task,
        Some(&human),
    )
}

/// Resolve assignee emails into member ids, preserving order
fn resolve_emails(directory: &UserDirectory, emails: &[String]) -> Result<Vec<String>> {
    let mut ids = Vec::with_capacity(emails.len());
    for email in emails {
        let user = directory
            .by_email(email)?
            .ok_or_else(|| Error::UserNotFound(email.clone()))?;
        ids.push(user.id);
    }
    Ok(ids)
}

/// Accept RFC 3339 timestamps or bare dates (midnight UTC)
fn parse_deadline(raw: &str) -> Result<DateTime<Utc>> {
    let trimmed = raw.trim();
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(timestamp.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        let midnight = date.and_hms_opt(0, 0, 0).expect("midnight is valid");
        return Ok(DateTime::from_naive_utc_and_offset(midnight, Utc));
    }
    Err(Error::InvalidArgument(format!(
        "cannot parse deadline '{trimmed}' (expected RFC 3339 or YYYY-MM-DD)"
    )))
}

fn display_name(directory: &UserDirectory, user_id: &str) -> String {
    directory
        .by_id(user_id)
        .map(|user| user.name)
        .unwrap_or_else(|_| user_id.to_string())
}

/// The (author, text) feed the summarizer consumes
fn comment_pairs(directory: &UserDirectory, task: &Task) -> Vec<(String, String)> {
    task.comments
        .iter()
        .map(|comment| {
            let author = display_name(directory, &comment.author_id);
            let text = match &comment.body {
                CommentBody::Text { text } => text.clone(),
                CommentBody::File { name, .. } => format!("shared a file: {name}"),
            };
            (author, text)
        })
        .collect()
}

fn task_human(directory: &UserDirectory, task: &Task, header: &str) -> HumanOutput {
    let mut human = HumanOutput::new(header);
    human.push_summary("id", task.id.clone());
    human.push_summary("title", task.title.clone());
    human.push_summary("status", task.status.to_string());
    human.push_summary("progress", format!("{}%", task.progress));
    human.push_summary("deadline", task.deadline.format("%Y-%m-%d %H:%M UTC").to_string());
    human.push_summary("assigner", display_name(directory, &task.assigner_id));
    let assignees: Vec<String> = task
        .assignee_ids
        .iter()
        .map(|id| display_name(directory, id))
        .collect();
    human.push_summary("assignees", assignees.join(", "));

    if !task.description.is_empty() {
        human.push_detail(task.description.clone());
    }
    for comment in &task.comments {
        let author = display_name(directory, &comment.author_id);
        let when = comment.created_at.format("%Y-%m-%d %H:%M");
        match &comment.body {
            CommentBody::Text { text } => {
                human.push_detail(format!("[{when}] {author}: {text}"));
            }
            CommentBody::File { name, url } => {
                human.push_detail(format!("[{when}] {author} attached {name} ({url})"));
            }
        }
    }
    if let Some(summary) = &task.summary {
        human.push_detail(format!("Summary: {summary}"));
    }

    human
}
