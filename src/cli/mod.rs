//! Command-line interface for duty
//!
//! This module defines the CLI structure using clap derive macros.
//! Each subcommand is implemented in its own submodule.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::directory::UserDirectory;
use crate::error::{Error, Result};
use crate::notify::Dispatcher;
use crate::session::SessionManager;
use crate::storage::Storage;
use crate::store::TaskStore;

mod init;
mod log;
mod login;
mod roster;
mod task;

/// duty - task assignment and visibility for hierarchical crews
///
/// Members log in, receive tasks with deadlines, and post comments and
/// attachments; leads watch the activity trail and ask for summaries.
#[derive(Parser, Debug)]
#[command(name = "duty")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the deck (defaults to the user data directory)
    #[arg(long, global = true, env = "DUTY_DECK")]
    pub deck: Option<PathBuf>,

    /// Session token (defaults to the persisted login)
    #[arg(long, global = true, env = "DUTY_TOKEN")]
    pub token: Option<String>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a deck
    Init,

    /// Log in with email and password
    Login {
        /// Account email
        #[arg(long)]
        email: String,

        /// Account password
        #[arg(long)]
        password: String,
    },

    /// Revoke the current session
    Logout,

    /// Show the logged-in member
    Whoami,

    /// Roster management
    #[command(subcommand)]
    Roster(RosterCommands),

    /// Task management
    #[command(subcommand)]
    Task(TaskCommands),

    /// Show the activity trail
    Log {
        /// Maximum entries to show
        #[arg(long, default_value = "20")]
        limit: usize,

        /// Only entries for one task
        #[arg(long)]
        task: Option<String>,
    },
}

/// Roster subcommands
#[derive(Subcommand, Debug)]
pub enum RosterCommands {
    /// Replace the roster from a seed file (admin)
    Seed {
        /// JSON seed file with members and plaintext passwords
        #[arg(long)]
        file: PathBuf,
    },

    /// List members
    List,

    /// List the members you may assign tasks to
    Targets,
}

/// Task subcommands
#[derive(Subcommand, Debug)]
pub enum TaskCommands {
    /// Create a task
    New {
        /// Task title
        #[arg(long)]
        title: String,

        /// Task description
        #[arg(long, default_value = "")]
        description: String,

        /// Assignee emails (repeatable, at least one)
        #[arg(long = "assignee", required = true)]
        assignees: Vec<String>,

        /// Deadline (RFC 3339 or YYYY-MM-DD)
        #[arg(long)]
        deadline: String,

        /// Files to attach (repeatable)
        #[arg(long = "attach")]
        attachments: Vec<PathBuf>,
    },

    /// List tasks visible to you
    List {
        /// Sort order: created, deadline, or progress
        #[arg(long, default_value = "created")]
        sort: String,
    },

    /// Show one task
    Show {
        /// Task id
        id: String,
    },

    /// Edit task details (assigner only)
    Edit {
        /// Task id
        id: String,

        /// New title
        #[arg(long)]
        title: Option<String>,

        /// New description
        #[arg(long)]
        description: Option<String>,

        /// Replacement assignee emails (repeatable)
        #[arg(long = "assignee")]
        assignees: Vec<String>,

        /// New deadline (RFC 3339 or YYYY-MM-DD)
        #[arg(long)]
        deadline: Option<String>,
    },

    /// Update progress (assignee only)
    Progress {
        /// Task id
        id: String,

        /// Progress percentage, 0-100
        percent: u8,
    },

    /// Comment on a task
    Comment {
        /// Task id
        id: String,

        /// Comment text
        #[arg(long)]
        text: String,
    },

    /// Attach a file to a task
    Attach {
        /// Task id
        id: String,

        /// File to attach
        #[arg(long)]
        file: PathBuf,
    },

    /// Delete a task (assigner only)
    Delete {
        /// Task id
        id: String,
    },

    /// Draft a description from a title (assist)
    Describe {
        /// Task title to describe
        #[arg(long)]
        title: String,
    },

    /// Generate and store a status summary (assist)
    Summarize {
        /// Task id
        id: String,
    },
}

/// Everything a command needs from an opened deck
pub struct DeckContext {
    pub storage: Storage,
    pub config: Config,
    pub directory: Arc<UserDirectory>,
    pub sessions: SessionManager,
}

impl DeckContext {
    /// Open an existing deck; `duty init` is the only command that skips this
    pub fn open(deck: Option<PathBuf>) -> Result<Self> {
        let storage = Storage::new(resolve_deck(deck)?);
        storage.require_initialized()?;

        let config = Config::load_from_deck(storage.deck());
        let directory = Arc::new(UserDirectory::new(storage.clone()));
        let sessions = SessionManager::new(storage.clone());

        Ok(Self {
            storage,
            config,
            directory,
            sessions,
        })
    }

    /// Build the task store with the configured notification channel
    pub fn task_store(&self) -> TaskStore {
        let dispatcher = Dispatcher::new(&self.config, &self.storage);
        TaskStore::new(self.storage.clone(), Arc::clone(&self.directory), dispatcher)
    }
}

/// Resolve the deck path: --deck flag, DUTY_DECK env (both via clap), then
/// the platform data directory.
pub fn resolve_deck(deck: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(deck) = deck {
        return Ok(deck);
    }

    directories::ProjectDirs::from("", "", "duty")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| {
            Error::InvalidArgument("cannot determine a data directory; pass --deck".to_string())
        })
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Init => init::run(self.deck, self.json, self.quiet),
            Commands::Login { email, password } => login::run_login(login::LoginOptions {
                email,
                password,
                deck: self.deck,
                json: self.json,
                quiet: self.quiet,
            }),
            Commands::Logout => login::run_logout(self.deck, self.json, self.quiet),
            Commands::Whoami => login::run_whoami(login::WhoamiOptions {
                token: self.token,
                deck: self.deck,
                json: self.json,
                quiet: self.quiet,
            }),
            Commands::Roster(cmd) => match cmd {
                RosterCommands::Seed { file } => roster::run_seed(roster::SeedOptions {
                    file,
                    deck: self.deck,
                    json: self.json,
                    quiet: self.quiet,
                }),
                RosterCommands::List => roster::run_list(roster::ListOptions {
                    deck: self.deck,
                    json: self.json,
                    quiet: self.quiet,
                }),
                RosterCommands::Targets => roster::run_targets(roster::TargetsOptions {
                    token: self.token,
                    deck: self.deck,
                    json: self.json,
                    quiet: self.quiet,
                }),
            },
            Commands::Task(cmd) => match cmd {
                TaskCommands::New {
                    title,
                    description,
                    assignees,
                    deadline,
                    attachments,
                } => task::run_new(task::NewOptions {
                    title,
                    description,
                    assignees,
                    deadline,
                    attachments,
                    token: self.token,
                    deck: self.deck,
                    json: self.json,
                    quiet: self.quiet,
                }),
                TaskCommands::List { sort } => task::run_list(task::ListOptions {
                    sort,
                    token: self.token,
                    deck: self.deck,
                    json: self.json,
                    quiet: self.quiet,
                }),
                TaskCommands::Show { id } => task::run_show(task::ShowOptions {
                    id,
                    token: self.token,
                    deck: self.deck,
                    json: self.json,
                    quiet: self.quiet,
                }),
                TaskCommands::Edit {
                    id,
                    title,
                    description,
                    assignees,
                    deadline,
                } => task::run_edit(task::EditOptions {
                    id,
                    title,
                    description,
                    assignees,
                    deadline,
                    token: self.token,
                    deck: self.deck,
                    json: self.json,
                    quiet: self.quiet,
                }),
                TaskCommands::Progress { id, percent } => {
                    task::run_progress(task::ProgressOptions {
                        id,
                        percent,
                        token: self.token,
                        deck: self.deck,
                        json: self.json,
                        quiet: self.quiet,
                    })
                }
                TaskCommands::Comment { id, text } => task::run_comment(task::CommentOptions {
                    id,
                    text,
                    token: self.token,
                    deck: self.deck,
                    json: self.json,
                    quiet: self.quiet,
                }),
                TaskCommands::Attach { id, file } => task::run_attach(task::AttachOptions {
                    id,
                    file,
                    token: self.token,
                    deck: self.deck,
                    json: self.json,
                    quiet: self.quiet,
                }),
                TaskCommands::Delete { id } => task::run_delete(task::DeleteOptions {
                    id,
                    token: self.token,
                    deck: self.deck,
                    json: self.json,
                    quiet: self.quiet,
                }),
                TaskCommands::Describe { title } => task::run_describe(task::DescribeOptions {
                    title,
                    deck: self.deck,
                    json: self.json,
                    quiet: self.quiet,
                }),
                TaskCommands::Summarize { id } => task::run_summarize(task::SummarizeOptions {
                    id,
                    token: self.token,
                    deck: self.deck,
                    json: self.json,
                    quiet: self.quiet,
                }),
            },
            Commands::Log { limit, task } => log::run(log::LogOptions {
                limit,
                task,
                token: self.token,
                deck: self.deck,
                json: self.json,
                quiet: self.quiet,
            }),
        }
    }
}
