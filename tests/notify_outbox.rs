//! Notification fan-out through the default outbox channel.

mod support;

use support::TestDeck;

fn outbox(deck: &TestDeck) -> Vec<serde_json::Value> {
    let path = deck.path().join("outbox.jsonl");
    if !path.exists() {
        return Vec::new();
    }
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

fn recipients(records: &[serde_json::Value]) -> Vec<String> {
    records
        .iter()
        .map(|r| r["to"].as_str().unwrap().to_string())
        .collect()
}

#[test]
fn creation_emails_every_assignee() {
    let deck = TestDeck::init();
    deck.seed_default_roster();
    let dana = deck.login("dana@club.test");

    deck.create_task(&dana, "Venue hunt", &["ana@club.test", "ben@club.test"]);

    let records = outbox(&deck);
    assert_eq!(
        recipients(&records),
        ["ana@club.test", "ben@club.test"]
    );
    assert!(records[0]["subject"]
        .as_str()
        .unwrap()
        .contains("Venue hunt"));
    assert!(records[0]["html"].as_str().unwrap().contains("Hi Ana,"));
}

#[test]
fn reassignment_emails_only_the_new_assignee() {
    let deck = TestDeck::init();
    deck.seed_default_roster();
    let dana = deck.login("dana@club.test");

    let id = deck.create_task(&dana, "Grow the team", &["ana@club.test", "ben@club.test"]);
    let before = outbox(&deck).len();

    // [A, B] -> [A, B, C]: only C hears about it.
    deck.run_json(
        &dana,
        &[
            "task",
            "edit",
            &id,
            "--assignee",
            "ana@club.test",
            "--assignee",
            "ben@club.test",
            "--assignee",
            "cal@club.test",
        ],
    );

    let records = outbox(&deck);
    assert_eq!(
        recipients(&records[before..]),
        ["cal@club.test"]
    );
}

#[test]
fn unchanged_assignees_email_nobody() {
    let deck = TestDeck::init();
    deck.seed_default_roster();
    let dana = deck.login("dana@club.test");

    let id = deck.create_task(&dana, "Quiet edit", &["ana@club.test"]);
    let before = outbox(&deck).len();

    deck.run_json(&dana, &["task", "edit", &id, "--title", "Quieter edit"]);

    assert_eq!(outbox(&deck).len(), before);
}
