//! Login sessions for duty.
//!
//! Credentials are salted, stretched SHA-256 digests produced at seed time;
//! plaintext never touches the deck. A login mints an opaque random token,
//! records it server-side in `sessions.json`, and persists it client-side in
//! `<deck>/session`. Every command resolves its actor by validating the
//! token against the registry — the token itself proves nothing.
//!
//! Token resolution order:
//! 1) CLI --token (explicit)
//! 2) DUTY_TOKEN environment variable
//! 3) Persisted value in `<deck>/session`

use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::directory::{Credential, User, UserDirectory};
use crate::error::{Error, Result};
use crate::lock;
use crate::storage::Storage;

const SALT_LEN: usize = 16;
const TOKEN_LEN: usize = 32;

/// Hash a plaintext password into a storable credential.
///
/// SHA-256 over salt+password, stretched `iterations` times.
pub fn hash_password(password: &str, iterations: u32) -> Credential {
    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);

    let hash = stretch(&salt, password, iterations);
    Credential {
        salt: hex::encode(salt),
        hash: hex::encode(hash),
        iterations: iterations.max(1),
    }
}

/// Check a plaintext password against a stored credential
pub fn verify_password(password: &str, credential: &Credential) -> bool {
    let Ok(salt) = hex::decode(&credential.salt) else {
        return false;
    };
    let digest = stretch(&salt, password, credential.iterations);
    hex::encode(digest) == credential.hash
}

fn stretch(salt: &[u8], password: &str, iterations: u32) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(password.as_bytes());
    let mut digest: [u8; 32] = hasher.finalize().into();

    for _ in 1..iterations.max(1) {
        digest = Sha256::digest(digest).into();
    }
    digest
}

/// One server-side session entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionRecord {
    pub token: String,
    pub user_id: String,
    pub issued_at: DateTime<Utc>,
}

/// Registry document at `<deck>/sessions.json`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionRegistry {
    pub sessions: Vec<SessionRecord>,
}

/// Login/logout and token validation over one deck
#[derive(Debug, Clone)]
pub struct SessionManager {
    storage: Storage,
}

impl SessionManager {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    /// Verify credentials and mint a session token.
    ///
    /// Unknown email and wrong password fail identically; callers learn
    /// nothing about which half was wrong.
    pub fn login(&self, directory: &UserDirectory, email: &str, password: &str) -> Result<(User, String)> {
        let user = directory.by_email(email)?.ok_or(Error::LoginFailed)?;
        if !verify_password(password, &user.credential) {
            return Err(Error::LoginFailed);
        }

        let token = fresh_token();
        self.storage.update_json(
            &self.storage.sessions_file(),
            SessionRegistry::default,
            |registry| {
                registry.sessions.push(SessionRecord {
                    token: token.clone(),
                    user_id: user.id.clone(),
                    issued_at: Utc::now(),
                });
                Ok(())
            },
        )?;

        lock::write_atomic(&self.storage.session_token_file(), token.as_bytes())?;
        Ok((user, token))
    }

    /// Revoke the current session. Returns false when nobody was logged in.
    pub fn logout(&self) -> Result<bool> {
        let Some(token) = self.persisted_token() else {
            return Ok(false);
        };

        let removed = self.storage.update_json(
            &self.storage.sessions_file(),
            SessionRegistry::default,
            |registry| {
                let before = registry.sessions.len();
                registry.sessions.retain(|session| session.token != token);
                Ok(before != registry.sessions.len())
            },
        )?;

        self.storage.remove_file(&self.storage.session_token_file())?;
        Ok(removed)
    }

    /// Resolve the logged-in user for this invocation.
    ///
    /// The token is only a handle: the registry lookup is what authenticates,
    /// so a revoked or fabricated token fails here regardless of its source.
    pub fn authenticate(&self, directory: &UserDirectory, cli_token: Option<&str>) -> Result<User> {
        let token = self.resolve_token(cli_token).ok_or(Error::Unauthenticated)?;

        let registry: SessionRegistry = self
            .storage
            .read_json_opt(&self.storage.sessions_file())?
            .unwrap_or_default();

        let session = registry
            .sessions
            .iter()
            .find(|session| session.token == token)
            .ok_or(Error::Unauthenticated)?;

        directory
            .by_id(&session.user_id)
            .map_err(|_| Error::Unauthenticated)
    }

    fn resolve_token(&self, cli_token: Option<&str>) -> Option<String> {
        if let Some(token) = non_empty(cli_token) {
            return Some(token.to_string());
        }

        if let Ok(env_token) = std::env::var("DUTY_TOKEN") {
            if let Some(token) = non_empty(Some(env_token.as_str())) {
                return Some(token.to_string());
            }
        }

        self.persisted_token()
    }

    fn persisted_token(&self) -> Option<String> {
        let raw = std::fs::read_to_string(self.storage.session_token_file()).ok()?;
        non_empty(Some(raw.as_str())).map(|token| token.to_string())
    }
}

fn fresh_token() -> String {
    let mut bytes = [0u8; TOKEN_LEN];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn non_empty(input: Option<&str>) -> Option<&str> {
    input.and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::{seed_roster, Domain, SeedMember};
    use tempfile::TempDir;

    fn seeded_deck() -> (TempDir, Storage, UserDirectory) {
        let temp = TempDir::new().unwrap();
        let storage = Storage::new(temp.path().to_path_buf());
        storage.init().unwrap();

        seed_roster(
            &storage,
            vec![SeedMember {
                name: "Ada Lovelace".to_string(),
                email: "ada@club.test".to_string(),
                phone: None,
                position: "Director".to_string(),
                domain: Domain::Technical,
                subdomain: None,
                reports_to: None,
                level: 3,
                password: "correct horse".to_string(),
            }],
            64,
        )
        .unwrap();

        let directory = UserDirectory::new(storage.clone());
        (temp, storage, directory)
    }

    #[test]
    fn hash_and_verify_round_trip() {
        let credential = hash_password("s3cret", 64);
        assert!(verify_password("s3cret", &credential));
        assert!(!verify_password("s3cret!", &credential));
        assert_ne!(credential.hash, hex::encode(Sha256::digest("s3cret")));
    }

    #[test]
    fn salts_differ_between_hashes() {
        let first = hash_password("same", 64);
        let second = hash_password("same", 64);
        assert_ne!(first.salt, second.salt);
        assert_ne!(first.hash, second.hash);
    }

    #[test]
    fn login_then_authenticate() {
        let (_temp, storage, directory) = seeded_deck();
        let sessions = SessionManager::new(storage);

        let (user, token) = sessions
            .login(&directory, "ADA@club.test", "correct horse")
            .unwrap();
        assert_eq!(user.email, "ada@club.test");

        let resolved = sessions.authenticate(&directory, Some(&token)).unwrap();
        assert_eq!(resolved.id, user.id);

        // The persisted token also works without an explicit one.
        let resolved = sessions.authenticate(&directory, None).unwrap();
        assert_eq!(resolved.id, user.id);
    }

    #[test]
    fn wrong_password_and_unknown_email_fail_alike() {
        let (_temp, storage, directory) = seeded_deck();
        let sessions = SessionManager::new(storage);

        let err = sessions
            .login(&directory, "ada@club.test", "wrong")
            .unwrap_err();
        assert!(matches!(err, Error::LoginFailed));

        let err = sessions
            .login(&directory, "ghost@club.test", "correct horse")
            .unwrap_err();
        assert!(matches!(err, Error::LoginFailed));
    }

    #[test]
    fn fabricated_token_is_rejected() {
        let (_temp, storage, directory) = seeded_deck();
        let sessions = SessionManager::new(storage);

        let err = sessions
            .authenticate(&directory, Some("not-a-real-token"))
            .unwrap_err();
        assert!(matches!(err, Error::Unauthenticated));
    }

    #[test]
    fn logout_revokes_server_side() {
        let (_temp, storage, directory) = seeded_deck();
        let sessions = SessionManager::new(storage);

        let (_user, token) = sessions
            .login(&directory, "ada@club.test", "correct horse")
            .unwrap();
        assert!(sessions.logout().unwrap());

        // Even the old token string no longer authenticates.
        let err = sessions.authenticate(&directory, Some(&token)).unwrap_err();
        assert!(matches!(err, Error::Unauthenticated));
        assert!(!sessions.logout().unwrap());
    }
}
