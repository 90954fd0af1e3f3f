//! Repository interface the engine consumes.
//!
//! Uniqueness (email, role name, element code, session token hash, and the
//! `(role, element)` rule pair) is enforced by the store's key constraints,
//! not by engine-side locking. The engine performs no retries; it bounds
//! every call with [`bounded`] and surfaces expiry as
//! [`StoreError::Timeout`].

pub mod memory;
pub mod postgres;

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use super::models::{AccessRule, BusinessElement, Grants, Role, Session, User};

#[derive(Debug, Error)]
pub enum StoreError {
    /// A key constraint rejected the write; the tag names the constraint.
    #[error("unique constraint violated on {0}")]
    UniqueViolation(&'static str),
    #[error("store operation timed out")]
    Timeout,
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Await a store call with an upper bound on how long it may run.
pub(crate) async fn bounded<T, F>(limit: Duration, fut: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::Timeout),
    }
}

/// Persistence operations the access core depends on.
///
/// Implementations must treat each method as one atomic unit of work:
/// either fully persisted or not at all.
#[async_trait]
pub trait Store: Send + Sync + 'static {
    /// Cheap liveness probe for health reporting.
    async fn ping(&self) -> Result<(), StoreError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;
    async fn insert_user(&self, user: &User) -> Result<(), StoreError>;
    async fn update_user(&self, user: &User) -> Result<(), StoreError>;

    async fn find_role_by_id(&self, id: Uuid) -> Result<Option<Role>, StoreError>;
    async fn insert_role(&self, role: &Role) -> Result<(), StoreError>;
    /// Remove a role, its rules, and every membership referencing it.
    /// Returns `false` when the role did not exist.
    async fn delete_role(&self, id: Uuid) -> Result<bool, StoreError>;
    async fn list_roles(&self) -> Result<Vec<Role>, StoreError>;

    async fn find_element_by_code(&self, code: &str)
    -> Result<Option<BusinessElement>, StoreError>;
    async fn find_element_by_id(&self, id: Uuid) -> Result<Option<BusinessElement>, StoreError>;
    async fn insert_element(&self, element: &BusinessElement) -> Result<(), StoreError>;
    async fn list_elements(&self) -> Result<Vec<BusinessElement>, StoreError>;

    async fn find_rule(
        &self,
        role_id: Uuid,
        element_id: Uuid,
    ) -> Result<Option<AccessRule>, StoreError>;
    async fn list_rules_for_role(&self, role_id: Uuid) -> Result<Vec<AccessRule>, StoreError>;
    /// Rules for any of `role_ids` on one element; the authorization hot path.
    async fn list_rules_for_roles(
        &self,
        role_ids: &[Uuid],
        element_id: Uuid,
    ) -> Result<Vec<AccessRule>, StoreError>;
    async fn insert_rule(&self, rule: &AccessRule) -> Result<(), StoreError>;
    async fn update_rule(
        &self,
        rule_id: Uuid,
        grants: Grants,
    ) -> Result<Option<AccessRule>, StoreError>;

    async fn insert_session(&self, session: &Session) -> Result<(), StoreError>;
    async fn find_session_by_token_hash(
        &self,
        token_hash: &[u8],
    ) -> Result<Option<Session>, StoreError>;
    /// Returns `false` when no session carries `token_hash`.
    async fn update_session_expiry(
        &self,
        token_hash: &[u8],
        expires_at: DateTime<Utc>,
    ) -> Result<bool, StoreError>;
}
