//! Storage layer for duty
//!
//! All persistent state lives under one directory, the "deck". The deck is
//! the document-store analog: one JSON document per task, JSONL append-only
//! logs, and small registry files, all written atomically under file locks.
//!
//! # Directory Structure
//!
//! ```text
//! <deck>/
//!   .duty.toml                  # Configuration
//!   roster.json                 # Member directory (seeded out-of-band)
//!   sessions.json               # Server-side session registry
//!   session                     # Current login token for this deck
//!   tasks/
//!     <task-id>.json            # One document per task
//!   activity.jsonl              # Append-only audit trail
//!   outbox.jsonl                # Outbox notification channel (dev)
//!   attachments/
//!     tasks/<task-id>/          # Uploaded files, fresh names
//! ```

use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};

use crate::error::{Error, Result};
use crate::lock::{self, lock_path_for, FileLock, DEFAULT_LOCK_TIMEOUT_MS};

/// Config filename at the deck root
pub const CONFIG_FILE: &str = ".duty.toml";

/// Storage manager for a deck
#[derive(Debug, Clone)]
pub struct Storage {
    /// Path to the deck root
    deck: PathBuf,
}

impl Storage {
    /// Create a storage manager rooted at the given deck directory
    pub fn new(deck: PathBuf) -> Self {
        Self { deck }
    }

    // =========================================================================
    // Path accessors
    // =========================================================================

    /// Path to the deck root directory
    pub fn deck(&self) -> &Path {
        &self.deck
    }

    /// Path to the configuration file
    pub fn config_file(&self) -> PathBuf {
        self.deck.join(CONFIG_FILE)
    }

    /// Path to the member roster
    pub fn roster_file(&self) -> PathBuf {
        self.deck.join("roster.json")
    }

    /// Path to the server-side session registry
    pub fn sessions_file(&self) -> PathBuf {
        self.deck.join("sessions.json")
    }

    /// Path to the current login token
    pub fn session_token_file(&self) -> PathBuf {
        self.deck.join("session")
    }

    /// Path to the task documents directory
    pub fn tasks_dir(&self) -> PathBuf {
        self.deck.join("tasks")
    }

    /// Path to a single task document
    pub fn task_file(&self, task_id: &str) -> PathBuf {
        self.tasks_dir().join(format!("{task_id}.json"))
    }

    /// Path to the activity log (JSONL format)
    pub fn activity_file(&self) -> PathBuf {
        self.deck.join("activity.jsonl")
    }

    /// Path to the notification outbox (JSONL format)
    pub fn outbox_file(&self) -> PathBuf {
        self.deck.join("outbox.jsonl")
    }

    /// Path to the attachments directory for a task
    pub fn attachments_dir(&self, task_id: &str) -> PathBuf {
        self.deck.join("attachments").join("tasks").join(task_id)
    }

    // =========================================================================
    // Initialization
    // =========================================================================

    /// Initialize the deck directory structure
    pub fn init(&self) -> Result<()> {
        fs::create_dir_all(&self.deck)?;
        fs::create_dir_all(self.tasks_dir())?;
        fs::create_dir_all(self.deck.join("attachments").join("tasks"))?;

        // Touch the activity log so tail-style tooling has a file to follow
        let activity = self.activity_file();
        if !activity.exists() {
            File::create(&activity)?;
        }

        Ok(())
    }

    /// Check if the deck has been initialized
    pub fn is_initialized(&self) -> bool {
        self.tasks_dir().exists()
    }

    /// Error unless the deck exists
    pub fn require_initialized(&self) -> Result<()> {
        if self.is_initialized() {
            Ok(())
        } else {
            Err(Error::DeckNotFound(self.deck.clone()))
        }
    }

    // =========================================================================
    // File I/O helpers (atomic writes for safety)
    // =========================================================================

    /// Write JSON data atomically (write to temp, then rename)
    ///
    /// This ensures that concurrent readers never see partial writes.
    pub fn write_json<T: Serialize>(&self, path: &Path, data: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(data)?;
        lock::write_atomic(path, json.as_bytes())
    }

    /// Read JSON data from a file
    pub fn read_json<T: DeserializeOwned>(&self, path: &Path) -> Result<T> {
        let content = fs::read_to_string(path)?;
        let data: T = serde_json::from_str(&content)?;
        Ok(data)
    }

    /// Read JSON data, mapping absence to `None`
    pub fn read_json_opt<T: DeserializeOwned>(&self, path: &Path) -> Result<Option<T>> {
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(self.read_json(path)?))
    }

    /// Read, mutate, and rewrite a JSON document inside one locked critical
    /// section.
    ///
    /// This is the append-to-array analog: two concurrent commenters both
    /// serialize on the document's lock file, so neither update is lost.
    pub fn update_json<T, R, F>(&self, path: &Path, default: impl FnOnce() -> T, f: F) -> Result<R>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(&mut T) -> Result<R>,
    {
        let _lock = FileLock::acquire(lock_path_for(path), DEFAULT_LOCK_TIMEOUT_MS)?;

        let mut value: T = if path.exists() {
            self.read_json(path)?
        } else {
            default()
        };

        let result = f(&mut value)?;

        let json = serde_json::to_string_pretty(&value)?;
        lock::write_atomic(path, json.as_bytes())?;

        Ok(result)
    }

    /// Append a record to a JSONL file under its lock
    pub fn append_jsonl<T: Serialize>(&self, path: &Path, record: &T) -> Result<()> {
        let _lock = FileLock::acquire(lock_path_for(path), DEFAULT_LOCK_TIMEOUT_MS)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string(record)?;
        let mut file = fs::OpenOptions::new().create(true).append(true).open(path)?;

        use std::io::Write;
        writeln!(file, "{}", json)?;
        file.sync_all()?;

        Ok(())
    }

    /// Read all records from a JSONL file
    pub fn read_jsonl<T: DeserializeOwned>(&self, path: &Path) -> Result<Vec<T>> {
        if !path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let mut records = Vec::new();

        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let record: T = serde_json::from_str(&line)?;
            records.push(record);
        }

        Ok(records)
    }

    /// Delete a file, reporting whether it existed
    pub fn remove_file(&self, path: &Path) -> Result<bool> {
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(path)?;
        Ok(true)
    }

    /// List the ids of every stored task document
    pub fn list_task_ids(&self) -> Result<Vec<String>> {
        let dir = self.tasks_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut ids = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                ids.push(stem.to_string());
            }
        }
        ids.sort();
        Ok(ids)
    }
}
