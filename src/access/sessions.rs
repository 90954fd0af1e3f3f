//! Session lifecycle: Active -> Expired, and nothing else.
//!
//! Expiry is monotonic: once a session has expired it is never reactivated,
//! and logout is modeled as an immediate transition to Expired
//! (`expires_at = now`) rather than a delete.

use std::future::Future;
use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::debug;
use uuid::Uuid;

use super::config::AccessConfig;
use super::error::Error;
use super::models::{Session, User};
use super::store::{self, Store, StoreError};
use super::token::{generate_session_token, hash_session_token};

/// Collisions on the token hash are a defensive code path, not assumed
/// impossible; after this many fresh tokens we give up.
const TOKEN_ATTEMPTS: usize = 3;

/// A freshly created session together with its raw bearer token.
///
/// The token exists only here; the store holds its hash. Hand it to the
/// caller and drop it.
#[derive(Debug)]
pub struct IssuedSession {
    pub token: String,
    pub session: Session,
}

pub struct SessionManager<S> {
    store: Arc<S>,
    config: AccessConfig,
}

impl<S> Clone for SessionManager<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            config: self.config.clone(),
        }
    }
}

impl<S: Store> SessionManager<S> {
    #[must_use]
    pub fn new(store: Arc<S>, config: AccessConfig) -> Self {
        Self { store, config }
    }

    async fn bounded<T, F>(&self, fut: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        store::bounded(self.config.store_timeout(), fut).await
    }

    /// Issue a session for `user` with `expires_at = now + TTL`.
    ///
    /// # Errors
    /// `Persistence` when the store rejects the write or every token attempt
    /// collides; `StoreTimeout` when the store does not answer in time.
    pub async fn create(&self, user: &User) -> Result<IssuedSession, Error> {
        for _ in 0..TOKEN_ATTEMPTS {
            let token = generate_session_token().map_err(Error::Persistence)?;
            let now = Utc::now();
            let session = Session {
                id: Uuid::new_v4(),
                user_id: user.id,
                token_hash: hash_session_token(&token),
                created_at: now,
                expires_at: now + Duration::seconds(self.config.session_ttl_seconds()),
            };

            match self.bounded(self.store.insert_session(&session)).await {
                Ok(()) => {
                    debug!(user_id = %user.id, session_id = %session.id, "session issued");
                    return Ok(IssuedSession { token, session });
                }
                // Token hash collision: try again with a fresh token.
                Err(StoreError::UniqueViolation(_)) => {}
                Err(err) => return Err(err.into()),
            }
        }

        Err(Error::Persistence(anyhow::anyhow!(
            "failed to generate unique session token"
        )))
    }

    /// Resolve a bearer token to its session and bound user.
    ///
    /// TTL is fixed at issuance; resolution does not extend expiry.
    ///
    /// # Errors
    /// `InvalidSession` for unknown tokens, `SessionExpired` once
    /// `expires_at <= now`.
    pub async fn resolve(&self, token: &str) -> Result<(Session, User), Error> {
        let token_hash = hash_session_token(token);
        let session = self
            .bounded(self.store.find_session_by_token_hash(&token_hash))
            .await?
            .ok_or(Error::InvalidSession)?;

        if !session.is_active_at(Utc::now()) {
            return Err(Error::SessionExpired);
        }

        let user = self
            .bounded(self.store.find_user_by_id(session.user_id))
            .await?
            .ok_or(Error::InvalidSession)?;

        Ok((session, user))
    }

    /// Expire the session for `token` immediately.
    ///
    /// Idempotent: invalidating an already-expired session is a no-op
    /// success. The row is kept for audit history.
    ///
    /// # Errors
    /// `InvalidSession` when no session carries the token.
    pub async fn invalidate(&self, token: &str) -> Result<(), Error> {
        let token_hash = hash_session_token(token);
        let session = self
            .bounded(self.store.find_session_by_token_hash(&token_hash))
            .await?
            .ok_or(Error::InvalidSession)?;

        let now = Utc::now();
        if session.is_active_at(now) {
            self.bounded(self.store.update_session_expiry(&token_hash, now))
                .await?;
            debug!(session_id = %session.id, "session invalidated");
        }
        Ok(())
    }
}
