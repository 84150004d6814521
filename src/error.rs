//! Error types for duty
//!
//! Exit codes:
//! - 0: Success
//! - 2: User error (bad args, unknown task/user, not logged in)
//! - 3: Blocked by policy (visibility, assignment, or mutation refused)
//! - 4: Operation failed (storage, lock, external service)

use std::path::PathBuf;
use thiserror::Error;

/// Exit codes for the duty CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const USER_ERROR: i32 = 2;
    pub const POLICY_BLOCKED: i32 = 3;
    pub const OPERATION_FAILED: i32 = 4;
}

/// Main error type for duty operations
#[derive(Error, Debug)]
pub enum Error {
    // User errors (exit code 2)
    #[error("Deck not found at {0} (run `duty init`)")]
    DeckNotFound(PathBuf),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("No such member: {0}")]
    UserNotFound(String),

    #[error("Not logged in (run `duty login`)")]
    Unauthenticated,

    #[error("Login failed: unknown email or wrong password")]
    LoginFailed,

    // Policy blocks (exit code 3)
    #[error("{actor} may not assign tasks to {target}")]
    NotAssignable { actor: String, target: String },

    #[error("Task {0} is not visible to you")]
    NotVisible(String),

    #[error("Not permitted: {0}")]
    MutationDenied(String),

    // Operation failures (exit code 4)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Lock acquisition failed: {0}")]
    LockFailed(PathBuf),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Operation failed: {0}")]
    OperationFailed(String),
}

impl Error {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            // User errors
            Error::DeckNotFound(_)
            | Error::InvalidConfig(_)
            | Error::InvalidArgument(_)
            | Error::TaskNotFound(_)
            | Error::UserNotFound(_)
            | Error::Unauthenticated
            | Error::LoginFailed => exit_codes::USER_ERROR,

            // Policy blocks
            Error::NotAssignable { .. } | Error::NotVisible(_) | Error::MutationDenied(_) => {
                exit_codes::POLICY_BLOCKED
            }

            // Operation failures
            Error::Io(_)
            | Error::Json(_)
            | Error::TomlParse(_)
            | Error::TomlSerialize(_)
            | Error::LockFailed(_)
            | Error::Http(_)
            | Error::OperationFailed(_) => exit_codes::OPERATION_FAILED,
        }
    }

    /// Structured details for JSON error envelopes, when an error carries any.
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Error::NotAssignable { actor, target } => Some(serde_json::json!({
                "actor": actor,
                "target": target,
            })),
            _ => None,
        }
    }
}

/// Result type alias for duty operations
pub type Result<T> = std::result::Result<T, Error>;
