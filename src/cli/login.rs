//! duty login/logout/whoami command implementations.

use std::path::PathBuf;

use serde::Serialize;

use crate::cli::DeckContext;
use crate::directory::UserPublic;
use crate::error::Result;
use crate::output::{emit_success, HumanOutput, OutputOptions};

pub struct LoginOptions {
    pub email: String,
    pub password: String,
    pub deck: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

#[derive(Serialize)]
struct LoginReport {
    member: UserPublic,
    token: String,
}

pub fn run_login(opts: LoginOptions) -> Result<()> {
    let ctx = DeckContext::open(opts.deck)?;
    let (user, token) = ctx
        .sessions
        .login(&ctx.directory, &opts.email, &opts.password)?;

    let report = LoginReport {
        member: user.public(),
        token,
    };

    let mut human = HumanOutput::new(format!("Logged in as {}", user.name));
    human.push_summary("email", user.email.clone());
    human.push_summary("position", user.position.clone());
    human.push_summary("level", user.level.to_string());

    emit_success(
        OutputOptions {
            json: opts.json,
            quiet: opts.quiet,
        },
        "login",
        &report,
        Some(&human),
    )
}

#[derive(Serialize)]
struct LogoutReport {
    revoked: bool,
}

pub fn run_logout(deck: Option<PathBuf>, json: bool, quiet: bool) -> Result<()> {
    let ctx = DeckContext::open(deck)?;
    let revoked = ctx.sessions.logout()?;

    let human = HumanOutput::new(if revoked {
        "Logged out"
    } else {
        "No active session"
    });

    emit_success(
        OutputOptions { json, quiet },
        "logout",
        &LogoutReport { revoked },
        Some(&human),
    )
}

pub struct WhoamiOptions {
    pub token: Option<String>,
    pub deck: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

pub fn run_whoami(opts: WhoamiOptions) -> Result<()> {
    let ctx = DeckContext::open(opts.deck)?;
    let user = ctx
        .sessions
        .authenticate(&ctx.directory, opts.token.as_deref())?;

    let mut human = HumanOutput::new(user.name.clone());
    human.push_summary("email", user.email.clone());
    human.push_summary("position", user.position.clone());
    human.push_summary("domain", user.domain.to_string());
    human.push_summary("level", user.level.to_string());

    emit_success(
        OutputOptions {
            json: opts.json,
            quiet: opts.quiet,
        },
        "whoami",
        &user.public(),
        Some(&human),
    )
}
