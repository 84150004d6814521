//! duty init command implementation.

use std::path::PathBuf;

use serde::Serialize;

use crate::cli::resolve_deck;
use crate::error::Result;
use crate::output::{emit_success, HumanOutput, OutputOptions};
use crate::storage::Storage;

#[derive(Serialize)]
struct InitReport {
    deck: PathBuf,
    created: bool,
}

pub fn run(deck: Option<PathBuf>, json: bool, quiet: bool) -> Result<()> {
    let storage = Storage::new(resolve_deck(deck)?);
    let created = !storage.is_initialized();
    storage.init()?;

    let report = InitReport {
        deck: storage.deck().to_path_buf(),
        created,
    };

    let mut human = HumanOutput::new(if created {
        "Initialized deck"
    } else {
        "Deck already initialized"
    });
    human.push_summary("deck", storage.deck().display().to_string());
    if created {
        human.push_next_step("duty roster seed --file <members.json>".to_string());
        human.push_next_step("duty login --email <you> --password <pw>".to_string());
    }

    emit_success(OutputOptions { json, quiet }, "init", &report, Some(&human))
}
