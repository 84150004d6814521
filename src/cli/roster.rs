//! duty roster command implementations.

use std::path::PathBuf;

use serde::Serialize;

use crate::cli::DeckContext;
use crate::directory::{seed_roster, SeedMember, UserPublic};
use crate::error::{Error, Result};
use crate::output::{emit_success, HumanOutput, OutputOptions};
use crate::policy;

pub struct SeedOptions {
    pub file: PathBuf,
    pub deck: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

#[derive(Serialize)]
struct SeedReport {
    members: usize,
}

pub fn run_seed(opts: SeedOptions) -> Result<()> {
    let ctx = DeckContext::open(opts.deck)?;

    let raw = std::fs::read_to_string(&opts.file)?;
    let seeds: Vec<SeedMember> = serde_json::from_str(&raw).map_err(|err| {
        Error::InvalidArgument(format!("bad seed file {}: {err}", opts.file.display()))
    })?;

    let users = seed_roster(&ctx.storage, seeds, ctx.config.roster.hash_iterations)?;

    let mut human = HumanOutput::new("Roster seeded");
    human.push_summary("members", users.len().to_string());
    human.push_warning("existing sessions refer to the previous roster; members must log in again");

    emit_success(
        OutputOptions {
            json: opts.json,
            quiet: opts.quiet,
        },
        "roster seed",
        &SeedReport {
            members: users.len(),
        },
        Some(&human),
    )
}

pub struct ListOptions {
    pub deck: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

pub fn run_list(opts: ListOptions) -> Result<()> {
    let ctx = DeckContext::open(opts.deck)?;
    let members = ctx.directory.public_roster()?;

    let mut human = HumanOutput::new(format!("{} members", members.len()));
    for member in &members {
        human.push_detail(member_line(member));
    }

    emit_success(
        OutputOptions {
            json: opts.json,
            quiet: opts.quiet,
        },
        "roster list",
        &members,
        Some(&human),
    )
}

pub struct TargetsOptions {
    pub token: Option<String>,
    pub deck: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

pub fn run_targets(opts: TargetsOptions) -> Result<()> {
    let ctx = DeckContext::open(opts.deck)?;
    let actor = ctx
        .sessions
        .authenticate(&ctx.directory, opts.token.as_deref())?;

    let all = ctx.directory.all()?;
    let targets: Vec<UserPublic> = policy::assignable_targets(&actor, &all)
        .into_iter()
        .map(|user| user.public())
        .collect();

    let mut human = HumanOutput::new(format!("{} assignable members", targets.len()));
    for member in &targets {
        human.push_detail(member_line(member));
    }
    if targets.is_empty() {
        human.push_detail("you cannot assign tasks at your level".to_string());
    }

    emit_success(
        OutputOptions {
            json: opts.json,
            quiet: opts.quiet,
        },
        "roster targets",
        &targets,
        Some(&human),
    )
}

fn member_line(member: &UserPublic) -> String {
    format!(
        "L{} {} <{}> ({}, {})",
        member.level, member.name, member.email, member.position, member.domain
    )
}
