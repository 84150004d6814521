//! Member directory for duty.
//!
//! The roster is seeded out-of-band (`duty roster seed`) and read-only at
//! runtime. The directory memoizes the roster for the process lifetime; the
//! cache is an explicit component with a `refresh()` escape hatch so tests
//! and long-lived embedders can rebuild it.

use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::error::{Error, Result};
use crate::storage::Storage;

/// Broad organizational grouping
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Technical,
    Corporate,
    Creatives,
    Executive,
    Advisory,
}

impl std::fmt::Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Domain::Technical => "technical",
            Domain::Corporate => "corporate",
            Domain::Creatives => "creatives",
            Domain::Executive => "executive",
            Domain::Advisory => "advisory",
        };
        f.write_str(label)
    }
}

/// Narrower team inside a domain, meaningful for levels >= 4
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Subdomain {
    Web,
    Mobile,
    Systems,
    Design,
    Video,
    Events,
    Outreach,
    Finance,
}

/// Stored credential: salted hash, never the password itself
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Credential {
    /// Hex-encoded per-user random salt
    pub salt: String,
    /// Hex-encoded stretched SHA-256 digest
    pub hash: String,
    /// Stretch iteration count the hash was produced with
    pub iterations: u32,
}

/// A member record as stored in the roster
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub position: String,
    pub domain: Domain,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subdomain: Option<Subdomain>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reports_to: Option<String>,
    pub level: u8,
    pub credential: Credential,
}

impl User {
    /// First whitespace-separated token of the display name, for greetings
    pub fn first_name(&self) -> &str {
        self.name.split_whitespace().next().unwrap_or(&self.name)
    }

    /// The credential-free view safe to ship anywhere
    pub fn public(&self) -> UserPublic {
        UserPublic {
            id: self.id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            position: self.position.clone(),
            domain: self.domain,
            subdomain: self.subdomain,
            reports_to: self.reports_to.clone(),
            level: self.level,
        }
    }
}

/// Member view without credential material.
///
/// Every read that leaves the library (listings, JSON envelopes) uses this
/// shape; `User` itself never crosses the output boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPublic {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub position: String,
    pub domain: Domain,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subdomain: Option<Subdomain>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reports_to: Option<String>,
    pub level: u8,
}

/// Roster document at `<deck>/roster.json`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Roster {
    pub members: Vec<User>,
}

/// Seed input for one member; passwords arrive plaintext here and are hashed
/// before anything is persisted.
#[derive(Debug, Clone, Deserialize)]
pub struct SeedMember {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub position: String,
    pub domain: Domain,
    #[serde(default)]
    pub subdomain: Option<Subdomain>,
    #[serde(default)]
    pub reports_to: Option<String>,
    pub level: u8,
    pub password: String,
}

/// Queryable, memoizing view over the roster
#[derive(Debug)]
pub struct UserDirectory {
    storage: Storage,
    cache: RwLock<Option<Arc<Vec<User>>>>,
}

impl UserDirectory {
    pub fn new(storage: Storage) -> Self {
        Self {
            storage,
            cache: RwLock::new(None),
        }
    }

    /// All members, loaded once per directory instance
    pub fn all(&self) -> Result<Arc<Vec<User>>> {
        if let Some(users) = self.cache.read().expect("directory cache poisoned").as_ref() {
            return Ok(Arc::clone(users));
        }
        self.refresh()
    }

    /// Drop the memoized roster and reload it from disk
    pub fn refresh(&self) -> Result<Arc<Vec<User>>> {
        let roster: Roster = self
            .storage
            .read_json_opt(&self.storage.roster_file())?
            .unwrap_or_default();

        let mut members = roster.members;
        members.sort_by(|a, b| a.level.cmp(&b.level).then_with(|| a.name.cmp(&b.name)));

        let users = Arc::new(members);
        *self.cache.write().expect("directory cache poisoned") = Some(Arc::clone(&users));
        Ok(users)
    }

    /// Look up a member by id
    pub fn by_id(&self, id: &str) -> Result<User> {
        self.all()?
            .iter()
            .find(|user| user.id == id)
            .cloned()
            .ok_or_else(|| Error::UserNotFound(id.to_string()))
    }

    /// Look up a member by email, case-insensitively
    pub fn by_email(&self, email: &str) -> Result<Option<User>> {
        let needle = email.trim().to_ascii_lowercase();
        Ok(self
            .all()?
            .iter()
            .find(|user| user.email.to_ascii_lowercase() == needle)
            .cloned())
    }

    /// The credential-free roster for listings
    pub fn public_roster(&self) -> Result<Vec<UserPublic>> {
        Ok(self.all()?.iter().map(User::public).collect())
    }
}

/// Replace the roster with freshly seeded members.
///
/// Ids are generated here; emails must be unique and `reports_to` must name
/// a seeded email. Returns the stored members in roster order.
pub fn seed_roster(
    storage: &Storage,
    seeds: Vec<SeedMember>,
    hash_iterations: u32,
) -> Result<Vec<User>> {
    if seeds.is_empty() {
        return Err(Error::InvalidArgument("seed roster is empty".to_string()));
    }

    let mut seen_emails = std::collections::HashSet::new();
    for seed in &seeds {
        let email = seed.email.trim().to_ascii_lowercase();
        if email.is_empty() {
            return Err(Error::InvalidArgument(format!(
                "member '{}' has no email",
                seed.name
            )));
        }
        if !seen_emails.insert(email) {
            return Err(Error::InvalidArgument(format!(
                "duplicate email: {}",
                seed.email
            )));
        }
        if seed.level > 5 {
            return Err(Error::InvalidArgument(format!(
                "level {} out of range for {}",
                seed.level, seed.email
            )));
        }
    }

    // reports_to is given by email in seed files; resolve to generated ids
    let mut id_by_email = std::collections::HashMap::new();
    let mut members = Vec::with_capacity(seeds.len());
    for seed in &seeds {
        let id = Ulid::new().to_string().to_ascii_lowercase();
        id_by_email.insert(seed.email.trim().to_ascii_lowercase(), id.clone());
        members.push((id, seed));
    }

    let mut users = Vec::with_capacity(members.len());
    for (id, seed) in members {
        let reports_to = match seed.reports_to.as_deref() {
            Some(manager_email) => {
                let key = manager_email.trim().to_ascii_lowercase();
                Some(id_by_email.get(&key).cloned().ok_or_else(|| {
                    Error::InvalidArgument(format!(
                        "{} reports to unknown member {}",
                        seed.email, manager_email
                    ))
                })?)
            }
            None => None,
        };

        users.push(User {
            id,
            name: seed.name.clone(),
            email: seed.email.trim().to_string(),
            phone: seed.phone.clone(),
            position: seed.position.clone(),
            domain: seed.domain,
            subdomain: seed.subdomain,
            reports_to,
            level: seed.level,
            credential: crate::session::hash_password(&seed.password, hash_iterations),
        });
    }

    let roster = Roster {
        members: users.clone(),
    };
    storage.write_json(&storage.roster_file(), &roster)?;

    Ok(users)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

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

    fn test_storage() -> (TempDir, Storage) {
        let temp = TempDir::new().unwrap();
        let storage = Storage::new(temp.path().to_path_buf());
        storage.init().unwrap();
        (temp, storage)
    }

    #[test]
    fn seed_then_lookup() {
        let (_temp, storage) = test_storage();
        seed_roster(
            &storage,
            vec![seed("Ada Lovelace", "ada@club.test", 3), seed("Bo Chen", "bo@club.test", 5)],
            64,
        )
        .unwrap();

        let directory = UserDirectory::new(storage);
        let ada = directory.by_email("ADA@club.test").unwrap().unwrap();
        assert_eq!(ada.name, "Ada Lovelace");
        assert_eq!(ada.first_name(), "Ada");
        assert_eq!(directory.by_id(&ada.id).unwrap().email, "ada@club.test");
        assert!(directory.by_email("nobody@club.test").unwrap().is_none());
    }

    #[test]
    fn seed_resolves_reports_to_by_email() {
        let (_temp, storage) = test_storage();
        let mut junior = seed("Jo Junior", "jo@club.test", 5);
        junior.reports_to = Some("ada@club.test".to_string());

        let users =
            seed_roster(&storage, vec![seed("Ada Lovelace", "ada@club.test", 3), junior], 64)
                .unwrap();

        let ada_id = users.iter().find(|u| u.email == "ada@club.test").unwrap().id.clone();
        let jo = users.iter().find(|u| u.email == "jo@club.test").unwrap();
        assert_eq!(jo.reports_to.as_deref(), Some(ada_id.as_str()));
    }

    #[test]
    fn seed_rejects_duplicates_and_unknown_managers() {
        let (_temp, storage) = test_storage();

        let err = seed_roster(
            &storage,
            vec![seed("A", "x@club.test", 5), seed("B", "X@club.test", 5)],
            64,
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));

        let mut orphan = seed("C", "c@club.test", 5);
        orphan.reports_to = Some("ghost@club.test".to_string());
        let err = seed_roster(&storage, vec![orphan], 64).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn cache_survives_external_change_until_refresh() {
        let (_temp, storage) = test_storage();
        seed_roster(&storage, vec![seed("Ada Lovelace", "ada@club.test", 3)], 64).unwrap();

        let directory = UserDirectory::new(storage.clone());
        assert_eq!(directory.all().unwrap().len(), 1);

        // External reseed is invisible to the memoized view...
        seed_roster(
            &storage,
            vec![seed("Ada Lovelace", "ada@club.test", 3), seed("Bo Chen", "bo@club.test", 5)],
            64,
        )
        .unwrap();
        assert_eq!(directory.all().unwrap().len(), 1);

        // ...until an explicit refresh.
        directory.refresh().unwrap();
        assert_eq!(directory.all().unwrap().len(), 2);
    }

    #[test]
    fn public_view_has_no_credential_field() {
        let (_temp, storage) = test_storage();
        seed_roster(&storage, vec![seed("Ada Lovelace", "ada@club.test", 3)], 64).unwrap();

        let directory = UserDirectory::new(storage);
        let roster = directory.public_roster().unwrap();
        let json = serde_json::to_string(&roster).unwrap();
        assert!(!json.contains("credential"));
        assert!(!json.contains("hash"));
        assert!(!json.contains("salt"));
    }
}
