//! duty log command implementation.

use std::path::PathBuf;

use crate::activity::ActivityLog;
use crate::cli::DeckContext;
use crate::error::Result;
use crate::output::{emit_success, HumanOutput, OutputOptions};

pub struct LogOptions {
    pub limit: usize,
    pub task: Option<String>,
    pub token: Option<String>,
    pub deck: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

pub fn run(opts: LogOptions) -> Result<()> {
    let ctx = DeckContext::open(opts.deck)?;
    // The trail is manager-facing; any logged-in member may read it.
    let _actor = ctx
        .sessions
        .authenticate(&ctx.directory, opts.token.as_deref())?;

    let log = ActivityLog::new(ctx.storage.clone());
    let mut records = match &opts.task {
        Some(task_id) => log.for_task(task_id)?,
        None => log.recent(opts.limit)?,
    };
    records.truncate(opts.limit);

    let mut human = HumanOutput::new(format!("{} activity records", records.len()));
    for record in &records {
        let who = ctx
            .directory
            .by_id(&record.user_id)
            .map(|user| user.name)
            .unwrap_or_else(|_| record.user_id.clone());
        human.push_detail(format!(
            "[{}] {} {} \"{}\"",
            record.timestamp.format("%Y-%m-%d %H:%M"),
            who,
            record.action,
            record.task_title,
        ));
    }

    emit_success(
        OutputOptions {
            json: opts.json,
            quiet: opts.quiet,
        },
        "log",
        &records,
        Some(&human),
    )
}
