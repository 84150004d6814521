use std::path::Path;

use assert_cmd::Command;
use tempfile::TempDir;

pub struct TestDeck {
    dir: TempDir,
}

impl TestDeck {
    /// Create and initialize a deck in a temp directory.
    pub fn init() -> Self {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let deck = Self { dir };
        deck.cmd().arg("init").assert().success();
        deck
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// A duty invocation scoped to this deck, isolated from ambient env.
    pub fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("duty").expect("duty binary");
        cmd.arg("--deck").arg(self.dir.path());
        cmd.env_remove("DUTY_DECK");
        cmd.env_remove("DUTY_TOKEN");
        cmd
    }

    /// Seed the standard test club:
    /// pat (L0 exec), eli (L2 exec), dana (L3 technical),
    /// ana (L4 technical/web), ben (L5 technical/web),
    /// cal (L5 technical/systems).
    /// Every password is "pw".
    pub fn seed_default_roster(&self) {
        let seed_path = self.dir.path().join("seed.json");
        std::fs::write(
            &seed_path,
            r#"[
  {"name": "Pat President", "email": "pat@club.test", "position": "President",
   "domain": "executive", "level": 0, "password": "pw"},
  {"name": "Eli Exec", "email": "eli@club.test", "position": "General Secretary",
   "domain": "executive", "level": 2, "password": "pw"},
  {"name": "Dana Director", "email": "dana@club.test", "position": "Technical Director",
   "domain": "technical", "level": 3, "password": "pw"},
  {"name": "Ana Lead", "email": "ana@club.test", "position": "Web Lead",
   "domain": "technical", "subdomain": "web", "reports_to": "dana@club.test",
   "level": 4, "password": "pw"},
  {"name": "Ben Member", "email": "ben@club.test", "position": "Web Member",
   "domain": "technical", "subdomain": "web", "reports_to": "ana@club.test",
   "level": 5, "password": "pw"},
  {"name": "Cal Member", "email": "cal@club.test", "position": "Systems Member",
   "domain": "technical", "subdomain": "systems", "reports_to": "dana@club.test",
   "level": 5, "password": "pw"}
]"#,
        )
        .expect("write seed file");

        self.cmd()
            .args(["roster", "seed", "--file"])
            .arg(&seed_path)
            .assert()
            .success();
    }

    /// Log in and return the session token from the JSON envelope.
    pub fn login(&self, email: &str) -> String {
        let output = self
            .cmd()
            .args(["login", "--email", email, "--password", "pw", "--json"])
            .output()
            .expect("run login");
        assert!(
            output.status.success(),
            "login failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );

        let envelope: serde_json::Value =
            serde_json::from_slice(&output.stdout).expect("login JSON");
        envelope["data"]["token"]
            .as_str()
            .expect("token in login output")
            .to_string()
    }

    /// Run a duty command as `token` and parse the JSON envelope's data.
    pub fn run_json(&self, token: &str, args: &[&str]) -> serde_json::Value {
        let output = self
            .cmd()
            .args(["--token", token, "--json"])
            .args(args)
            .output()
            .expect("run duty");
        assert!(
            output.status.success(),
            "duty {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );

        let envelope: serde_json::Value = serde_json::from_slice(&output.stdout).expect("JSON");
        envelope["data"].clone()
    }

    /// Create a task and return its id.
    pub fn create_task(&self, token: &str, title: &str, assignee_emails: &[&str]) -> String {
        let mut args = vec![
            "task".to_string(),
            "new".to_string(),
            "--title".to_string(),
            title.to_string(),
            "--deadline".to_string(),
            "2027-01-01".to_string(),
        ];
        for email in assignee_emails {
            args.push("--assignee".to_string());
            args.push((*email).to_string());
        }
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        let data = self.run_json(token, &args);
        data["id"].as_str().expect("task id").to_string()
    }
}
