//! Assignment notifications for duty.
//!
//! When members become assignees of a task, the dispatcher renders one email
//! per newly-affected member and hands it to the active channel. Delivery is
//! best-effort: each recipient is attempted in isolation, failures are
//! logged and never block the remaining recipients or the mutation that
//! triggered them. No retry, no queue.
//!
//! Exactly one channel implementation is active at a time, selected by
//! `[notify] channel` in `.duty.toml`:
//! - `http`: a JSON mail-provider API called with a bearer key
//! - `outbox`: JSONL records under the deck, for local/dev use
//! - `off`: deliveries are dropped with a warning

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::NotifyConfig;
use crate::directory::User;
use crate::error::{Error, Result};
use crate::storage::Storage;
use crate::task::Task;

/// One rendered email, ready for a channel
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutboundEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// Delivery capability; the dispatcher owns exactly one
pub trait NotificationChannel: Send + Sync {
    /// Attempt one delivery
    fn deliver(&self, email: &OutboundEmail) -> Result<()>;

    /// Short channel name for logs
    fn name(&self) -> &'static str;
}

/// JSON mail-provider API channel
pub struct HttpChannel {
    client: reqwest::blocking::Client,
    api_url: String,
    api_key: String,
    from: String,
}

impl HttpChannel {
    pub fn new(api_url: String, api_key: String, from: String) -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            api_url,
            api_key,
            from,
        }
    }
}

impl NotificationChannel for HttpChannel {
    fn deliver(&self, email: &OutboundEmail) -> Result<()> {
        #[derive(Serialize)]
        struct SendRequest<'a> {
            from: &'a str,
            to: &'a str,
            subject: &'a str,
            html: &'a str,
        }

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&SendRequest {
                from: &self.from,
                to: &email.to,
                subject: &email.subject,
                html: &email.html,
            })
            .send()?;

        response.error_for_status()?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

/// Record shape for the outbox channel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboxRecord {
    pub queued_at: DateTime<Utc>,
    #[serde(flatten)]
    pub email: OutboundEmail,
}

/// Deck-local JSONL outbox, the dev stand-in for a real provider
pub struct OutboxChannel {
    storage: Storage,
}

impl OutboxChannel {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }
}

impl NotificationChannel for OutboxChannel {
    fn deliver(&self, email: &OutboundEmail) -> Result<()> {
        let record = OutboxRecord {
            queued_at: Utc::now(),
            email: email.clone(),
        };
        self.storage
            .append_jsonl(&self.storage.outbox_file(), &record)
    }

    fn name(&self) -> &'static str {
        "outbox"
    }
}

/// Channel that drops everything with a warning
pub struct DisabledChannel;

impl NotificationChannel for DisabledChannel {
    fn deliver(&self, email: &OutboundEmail) -> Result<()> {
        tracing::warn!(to = %email.to, "notifications disabled, dropping email");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "off"
    }
}

/// Build the configured channel.
///
/// A misconfigured `http` channel (missing URL or key) degrades to the
/// disabled channel with a warning rather than failing the caller.
pub fn channel_from_config(
    config: &NotifyConfig,
    storage: &Storage,
) -> Box<dyn NotificationChannel> {
    match config.channel.as_str() {
        "http" => {
            let api_key = std::env::var(&config.api_key_env).ok().filter(|k| !k.is_empty());
            match (config.api_url.clone(), api_key) {
                (Some(api_url), Some(api_key)) => {
                    Box::new(HttpChannel::new(api_url, api_key, config.from.clone()))
                }
                _ => {
                    tracing::warn!(
                        key_env = %config.api_key_env,
                        "http notify channel not fully configured, disabling"
                    );
                    Box::new(DisabledChannel)
                }
            }
        }
        "outbox" => Box::new(OutboxChannel::new(storage.clone())),
        "off" => Box::new(DisabledChannel),
        other => {
            tracing::warn!(channel = other, "unknown notify channel, disabling");
            Box::new(DisabledChannel)
        }
    }
}

/// Renders and fans out assignment emails
pub struct Dispatcher {
    channel: Box<dyn NotificationChannel>,
    club: String,
    base_url: String,
}

impl Dispatcher {
    pub fn new(config: &crate::config::Config, storage: &Storage) -> Self {
        Self::with_channel(
            channel_from_config(&config.notify, storage),
            config.club.clone(),
            config.notify.base_url.clone(),
        )
    }

    /// Inject a channel directly; the constructor tests use
    pub fn with_channel(
        channel: Box<dyn NotificationChannel>,
        club: String,
        base_url: String,
    ) -> Self {
        Self {
            channel,
            club,
            base_url,
        }
    }

    /// Notify each recipient that `task` landed on their plate.
    ///
    /// One recipient's failure is logged and does not block the rest.
    pub fn notify_assignees(&self, task: &Task, recipients: &[User]) {
        for recipient in recipients {
            let email = self.render(task, recipient);
            if let Err(err) = self.channel.deliver(&email) {
                tracing::warn!(
                    channel = self.channel.name(),
                    to = %recipient.email,
                    task_id = %task.id,
                    %err,
                    "notification delivery failed"
                );
            }
        }
    }

    fn render(&self, task: &Task, recipient: &User) -> OutboundEmail {
        let link = format!("{}/tasks/{}", self.base_url.trim_end_matches('/'), task.id);
        let deadline = task.deadline.format("%Y-%m-%d %H:%M UTC");
        let html = format!(
            "<p>Hi {first_name},</p>\
             <p>You have been assigned a new task in {club}:</p>\
             <p><strong>{title}</strong></p>\
             <p>Deadline: {deadline}</p>\
             <p><a href=\"{link}\">Open the task</a></p>",
            first_name = recipient.first_name(),
            club = self.club,
            title = task.title,
        );

        OutboundEmail {
            to: recipient.email.clone(),
            subject: format!("[{}] New task: {}", self.club, task.title),
            html,
        }
    }
}

/// Deliveries captured in memory; test doubles only
#[derive(Default)]
pub struct RecordingChannel {
    delivered: std::sync::Mutex<Vec<OutboundEmail>>,
    fail_for: Option<String>,
}

impl RecordingChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every delivery addressed to `email`
    pub fn failing_for(email: impl Into<String>) -> Self {
        Self {
            delivered: std::sync::Mutex::new(Vec::new()),
            fail_for: Some(email.into()),
        }
    }

    pub fn delivered(&self) -> Vec<OutboundEmail> {
        self.delivered.lock().expect("recording channel poisoned").clone()
    }
}

impl NotificationChannel for RecordingChannel {
    fn deliver(&self, email: &OutboundEmail) -> Result<()> {
        if self.fail_for.as_deref() == Some(email.to.as_str()) {
            return Err(Error::OperationFailed(format!(
                "simulated delivery failure for {}",
                email.to
            )));
        }
        self.delivered
            .lock()
            .expect("recording channel poisoned")
            .push(email.clone());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::{Credential, Domain};
    use crate::task::TaskStatus;
    use std::sync::Arc;

    fn member(id: &str, email: &str) -> User {
        User {
            id: id.to_string(),
            name: format!("{id} Person"),
            email: email.to_string(),
            phone: None,
            position: "Member".to_string(),
            domain: Domain::Technical,
            subdomain: None,
            reports_to: None,
            level: 5,
            credential: Credential {
                salt: String::new(),
                hash: String::new(),
                iterations: 1,
            },
        }
    }

    fn sample_task() -> Task {
        Task {
            id: "t-1".to_string(),
            title: "Book the venue".to_string(),
            description: String::new(),
            assigner_id: "boss".to_string(),
            assignee_ids: vec!["a".to_string()],
            status: TaskStatus::ToDo,
            created_at: Utc::now(),
            deadline: Utc::now(),
            comments: Vec::new(),
            progress: 0,
            summary: None,
        }
    }

    struct SharedChannel(Arc<RecordingChannel>);

    impl NotificationChannel for SharedChannel {
        fn deliver(&self, email: &OutboundEmail) -> Result<()> {
            self.0.deliver(email)
        }
        fn name(&self) -> &'static str {
            self.0.name()
        }
    }

    #[test]
    fn renders_name_title_deadline_and_link() {
        let recording = Arc::new(RecordingChannel::new());
        let dispatcher = Dispatcher::with_channel(
            Box::new(SharedChannel(Arc::clone(&recording))),
            "robotics".to_string(),
            "https://club.test/".to_string(),
        );

        dispatcher.notify_assignees(&sample_task(), &[member("a", "a@club.test")]);

        let delivered = recording.delivered();
        assert_eq!(delivered.len(), 1);
        let email = &delivered[0];
        assert_eq!(email.to, "a@club.test");
        assert!(email.subject.contains("Book the venue"));
        assert!(email.html.contains("Hi a,"));
        assert!(email.html.contains("https://club.test/tasks/t-1"));
    }

    #[test]
    fn one_failure_does_not_block_the_rest() {
        let recording = Arc::new(RecordingChannel::failing_for("bad@club.test"));
        let dispatcher = Dispatcher::with_channel(
            Box::new(SharedChannel(Arc::clone(&recording))),
            "robotics".to_string(),
            "https://club.test".to_string(),
        );

        dispatcher.notify_assignees(
            &sample_task(),
            &[
                member("a", "a@club.test"),
                member("bad", "bad@club.test"),
                member("c", "c@club.test"),
            ],
        );

        let delivered = recording.delivered();
        let recipients: Vec<&str> = delivered.iter().map(|e| e.to.as_str()).collect();
        assert_eq!(recipients, ["a@club.test", "c@club.test"]);
    }

    #[test]
    fn outbox_channel_appends_records() {
        let temp = tempfile::TempDir::new().unwrap();
        let storage = Storage::new(temp.path().to_path_buf());
        storage.init().unwrap();

        let channel = OutboxChannel::new(storage.clone());
        channel
            .deliver(&OutboundEmail {
                to: "a@club.test".to_string(),
                subject: "s".to_string(),
                html: "<p>x</p>".to_string(),
            })
            .unwrap();

        let records: Vec<OutboxRecord> = storage.read_jsonl(&storage.outbox_file()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].email.to, "a@club.test");
    }

    #[test]
    fn misconfigured_http_degrades_to_disabled() {
        let temp = tempfile::TempDir::new().unwrap();
        let storage = Storage::new(temp.path().to_path_buf());

        let config = NotifyConfig {
            channel: "http".to_string(),
            api_url: None,
            api_key_env: "DUTY_TEST_UNSET_KEY".to_string(),
            ..NotifyConfig::default()
        };
        let channel = channel_from_config(&config, &storage);
        assert_eq!(channel.name(), "off");
    }
}
