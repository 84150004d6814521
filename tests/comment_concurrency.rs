//! Concurrent commenters must both land: the feed append runs inside the
//! task document's locked critical section, so no update is lost.

use std::sync::{Arc, Barrier};
use std::thread;

use chrono::Utc;
use duty::directory::{seed_roster, Domain, SeedMember, UserDirectory};
use duty::notify::{DisabledChannel, Dispatcher};
use duty::storage::Storage;
use duty::store::{NewTaskInput, TaskStore};

fn seed(name: &str, email: &str, level: u8) -> SeedMember {
    SeedMember {
        name: name.to_string(),
        email: email.to_string(),
        phone: None,
        position: "Member".to_string(),
        domain: Domain::Technical,
        subdomain: None,
        reports_to: None,
        level,
        password: "pw".to_string(),
    }
}

fn open_store(deck: &std::path::Path) -> TaskStore {
    let storage = Storage::new(deck.to_path_buf());
    let directory = Arc::new(UserDirectory::new(storage.clone()));
    let dispatcher = Dispatcher::with_channel(
        Box::new(DisabledChannel),
        "club".to_string(),
        "https://club.test".to_string(),
    );
    TaskStore::new(storage, directory, dispatcher)
}

#[test]
fn concurrent_comments_are_all_preserved() {
    let temp = tempfile::tempdir().expect("tempdir");
    let storage = Storage::new(temp.path().to_path_buf());
    storage.init().expect("init deck");

    seed_roster(
        &storage,
        vec![
            seed("Dana Director", "dana@club.test", 3),
            seed("Ana Member", "ana@club.test", 5),
        ],
        64,
    )
    .expect("seed");

    let directory = UserDirectory::new(storage.clone());
    let dana = directory.by_email("dana@club.test").unwrap().unwrap();
    let ana = directory.by_email("ana@club.test").unwrap().unwrap();

    let store = open_store(temp.path());
    let task = store
        .create_task(
            NewTaskInput {
                title: "Busy thread".to_string(),
                description: String::new(),
                assignee_ids: vec![ana.id.clone()],
                deadline: Utc::now(),
                attachments: Vec::new(),
            },
            &dana,
        )
        .expect("create");

    // Each writer opens its own store over the same deck, like separate
    // processes would.
    let writers = 8;
    let comments_per_writer = 5;
    let barrier = Arc::new(Barrier::new(writers));
    let mut handles = Vec::with_capacity(writers);

    for writer in 0..writers {
        let barrier = Arc::clone(&barrier);
        let deck = temp.path().to_path_buf();
        let task_id = task.id.clone();
        let author = if writer % 2 == 0 { dana.clone() } else { ana.clone() };

        handles.push(thread::spawn(move || {
            let store = open_store(&deck);
            barrier.wait();
            for n in 0..comments_per_writer {
                store
                    .add_comment(&task_id, &format!("writer {writer} note {n}"), &author)
                    .expect("comment");
            }
        }));
    }

    for handle in handles {
        handle.join().expect("writer thread");
    }

    let final_task = store.get_task(&task.id).expect("get").expect("exists");
    assert_eq!(final_task.comments.len(), writers * comments_per_writer);

    // Every comment id is unique; nothing was overwritten.
    let mut ids: Vec<&str> = final_task
        .comments
        .iter()
        .map(|comment| comment.id.as_str())
        .collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), writers * comments_per_writer);
}
