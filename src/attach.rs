//! Attachment storage for duty.
//!
//! The blob-store collaborator: bytes in, a deck-relative download URL out.
//! Files land under `attachments/tasks/{task-id}/` with a freshly generated
//! name (collisions impossible across uploads of the same filename) while
//! the original extension is preserved.

use std::fs;
use std::path::Path;

use base64::Engine;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::error::{Error, Result};
use crate::storage::Storage;

/// Result of a stored upload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredFile {
    /// Original filename, for display
    pub name: String,
    /// Deck-relative download URL
    pub url: String,
}

/// Writes uploads under the deck
#[derive(Debug, Clone)]
pub struct AttachmentStore {
    storage: Storage,
}

impl AttachmentStore {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    /// Store a local file as an attachment of `task_id`
    pub fn store_file(&self, task_id: &str, source: &Path) -> Result<StoredFile> {
        let bytes = fs::read(source)?;
        let name = source
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                Error::InvalidArgument(format!("not a file path: {}", source.display()))
            })?;
        self.write(task_id, name, &bytes)
    }

    /// Store a base64 data URL (`data:<mime>;base64,<payload>`) as an
    /// attachment of `task_id`, keeping `original_name` for display.
    pub fn store_data_url(
        &self,
        task_id: &str,
        original_name: &str,
        data_url: &str,
    ) -> Result<StoredFile> {
        let payload = data_url
            .split_once("base64,")
            .map(|(_, payload)| payload)
            .ok_or_else(|| Error::InvalidArgument("not a base64 data URL".to_string()))?;

        let bytes = base64::engine::general_purpose::STANDARD
            .decode(payload.trim())
            .map_err(|err| Error::InvalidArgument(format!("bad data URL payload: {err}")))?;

        self.write(task_id, original_name, &bytes)
    }

    fn write(&self, task_id: &str, original_name: &str, bytes: &[u8]) -> Result<StoredFile> {
        let dir = self.storage.attachments_dir(task_id);
        fs::create_dir_all(&dir)?;

        let generated = match extension_of(original_name) {
            Some(ext) => format!("{}.{ext}", Ulid::new().to_string().to_ascii_lowercase()),
            None => Ulid::new().to_string().to_ascii_lowercase(),
        };
        fs::write(dir.join(&generated), bytes)?;

        Ok(StoredFile {
            name: original_name.to_string(),
            url: format!("attachments/tasks/{task_id}/{generated}"),
        })
    }
}

fn extension_of(name: &str) -> Option<&str> {
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() || ext.contains('/') {
        return None;
    }
    Some(ext)
}
