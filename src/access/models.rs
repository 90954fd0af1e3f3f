//! Domain entities for the role-to-element permission matrix.

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered account.
///
/// `role_ids` is the actor's role set; the single-role deployment is the
/// N=1 case. The password hash is a PHC string and is never serialized.
#[derive(Clone, Debug, Serialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_active: bool,
    pub role_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl User {
    #[must_use]
    pub fn full_name(&self) -> String {
        match &self.last_name {
            Some(last) => format!("{} {last}", self.first_name),
            None => self.first_name.clone(),
        }
    }
}

/// A named bucket of permissions. Users reference roles by id.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Role {
    pub id: Uuid,
    pub name: String,
    pub description: String,
}

/// A protected entity class, addressed by its unique `code`
/// (e.g. `"user"`, `"order"`, `"business_data"`).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BusinessElement {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub description: String,
}

/// The boolean grants carried by one permission rule.
///
/// The plain flags apply to records owned by the acting user; the `_all`
/// variants are required to act on someone else's record. `create` has no
/// `_all` variant because ownership is not established yet at create time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grants {
    pub read: bool,
    pub read_all: bool,
    pub create: bool,
    pub update: bool,
    pub update_all: bool,
    pub delete: bool,
    pub delete_all: bool,
}

impl Grants {
    /// Whether these grants permit `action`, given record ownership.
    #[must_use]
    pub const fn allows(&self, action: Action, is_own_record: bool) -> bool {
        match action {
            Action::Read => {
                if is_own_record {
                    self.read
                } else {
                    self.read_all
                }
            }
            Action::Create => self.create,
            Action::Update => {
                if is_own_record {
                    self.update
                } else {
                    self.update_all
                }
            }
            Action::Delete => {
                if is_own_record {
                    self.delete
                } else {
                    self.delete_all
                }
            }
        }
    }
}

/// The permission matrix edge: at most one rule exists per
/// `(role_id, element_id)` pair, and that rule is the sole source of truth
/// for the combination.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AccessRule {
    pub id: Uuid,
    pub role_id: Uuid,
    pub element_id: Uuid,
    #[serde(flatten)]
    pub grants: Grants,
}

/// A bearer session. Only the SHA-256 of the opaque token is stored.
///
/// A session is active iff `expires_at > now`. Logout and account
/// deactivation set `expires_at = now`; rows are never deleted.
#[derive(Clone, Debug)]
pub struct Session {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: Vec<u8>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    #[must_use]
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

/// Actions a rule can grant on a business element.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Read,
    Create,
    Update,
    Delete,
}

impl Action {
    pub const ALL: [Self; 4] = [Self::Read, Self::Create, Self::Update, Self::Delete];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

/// Outcome of an authorization check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

impl Decision {
    #[must_use]
    pub const fn is_allowed(self) -> bool {
        matches!(self, Self::Allow)
    }
}

/// Normalize an email for lookup/uniqueness checks.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Basic email format check on already-normalized input.
#[must_use]
pub fn valid_email(email_normalized: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|regex| regex.is_match(email_normalized))
}
