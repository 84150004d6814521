use predicates::prelude::*;

mod support;

use support::TestDeck;

#[test]
fn init_is_idempotent() {
    let deck = TestDeck::init();

    deck.cmd()
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("already initialized"));
}

#[test]
fn login_whoami_logout_round_trip() {
    let deck = TestDeck::init();
    deck.seed_default_roster();

    let token = deck.login("dana@club.test");

    deck.cmd()
        .args(["--token", &token, "whoami"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Dana Director"));

    deck.cmd().arg("logout").assert().success();

    // The revoked token no longer authenticates.
    deck.cmd()
        .args(["--token", &token, "whoami"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("Not logged in"));
}

#[test]
fn wrong_password_fails_closed() {
    let deck = TestDeck::init();
    deck.seed_default_roster();

    deck.cmd()
        .args(["login", "--email", "dana@club.test", "--password", "nope"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("Login failed"));
}

#[test]
fn commands_require_an_initialized_deck() {
    let dir = tempfile::tempdir().unwrap();
    let mut cmd = assert_cmd::Command::cargo_bin("duty").unwrap();
    cmd.arg("--deck")
        .arg(dir.path().join("nowhere"))
        .args(["task", "list"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("duty init"));
}

#[test]
fn roster_list_never_ships_credentials() {
    let deck = TestDeck::init();
    deck.seed_default_roster();

    deck.cmd()
        .args(["roster", "list", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("pat@club.test"))
        .stdout(predicate::str::contains("credential").not())
        .stdout(predicate::str::contains("salt").not());
}

#[test]
fn roster_file_stores_no_plaintext() {
    let deck = TestDeck::init();
    deck.seed_default_roster();

    let roster = std::fs::read_to_string(deck.path().join("roster.json")).unwrap();
    assert!(!roster.contains("\"pw\""));
    assert!(roster.contains("\"hash\""));
}
