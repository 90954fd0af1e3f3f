//! Account lifecycle: registration, login, profile update, deactivation.
//!
//! Every operation here is gated by the other components: credentials go
//! through [`crypto`], sessions through [`SessionManager`], persistence
//! through the store's key constraints.

use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;
use uuid::Uuid;

use super::config::AccessConfig;
use super::crypto;
use super::error::Error;
use super::models::{Role, User, normalize_email};
use super::sessions::{IssuedSession, SessionManager};
use super::store::{self, Store, StoreError};

/// Input for [`AccountService::register`].
pub struct NewAccount {
    pub email: String,
    pub password: SecretString,
    pub first_name: String,
    pub last_name: Option<String>,
    pub role_id: Option<Uuid>,
}

/// Input for [`AccountService::update_profile`]. Absent fields are left
/// untouched; a password change requires a matching repeat.
#[derive(Default)]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub password: Option<SecretString>,
    pub password_repeat: Option<SecretString>,
}

pub struct AccountService<S> {
    store: Arc<S>,
    sessions: SessionManager<S>,
    config: AccessConfig,
}

impl<S> Clone for AccountService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            sessions: self.sessions.clone(),
            config: self.config.clone(),
        }
    }
}

impl<S: Store> AccountService<S> {
    #[must_use]
    pub fn new(store: Arc<S>, sessions: SessionManager<S>, config: AccessConfig) -> Self {
        Self {
            store,
            sessions,
            config,
        }
    }

    async fn bounded<T, F>(&self, fut: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        store::bounded(self.config.store_timeout(), fut).await
    }

    /// Register a new account. The plaintext password is hashed before
    /// anything is persisted and is never stored, logged, or returned.
    ///
    /// # Errors
    /// `DuplicateEmail` when the address is taken (the store's unique key is
    /// authoritative, so a race loser gets the same error), `InvalidRole`
    /// when `role_id` names no role.
    pub async fn register(&self, new_account: NewAccount) -> Result<User, Error> {
        let email = normalize_email(&new_account.email);

        let mut role_ids = Vec::new();
        if let Some(role_id) = new_account.role_id {
            self.bounded(self.store.find_role_by_id(role_id))
                .await?
                .ok_or(Error::InvalidRole)?;
            role_ids.push(role_id);
        }

        if self
            .bounded(self.store.find_user_by_email(&email))
            .await?
            .is_some()
        {
            return Err(Error::DuplicateEmail);
        }

        let password_hash =
            crypto::hash_password(new_account.password.expose_secret()).map_err(Error::Persistence)?;

        let user = User {
            id: Uuid::new_v4(),
            email,
            first_name: new_account.first_name,
            last_name: new_account.last_name,
            password_hash,
            is_active: true,
            role_ids,
            created_at: Utc::now(),
            last_login: None,
        };

        match self.bounded(self.store.insert_user(&user)).await {
            Ok(()) => {
                debug!(user_id = %user.id, "account registered");
                Ok(user)
            }
            Err(StoreError::UniqueViolation(_)) => Err(Error::DuplicateEmail),
            Err(err) => Err(err.into()),
        }
    }

    /// Authenticate and issue a session.
    ///
    /// # Errors
    /// `InvalidCredentials` for unknown email AND wrong password; the two
    /// are indistinguishable by design. `InactiveAccount` only after the
    /// secret verified, so it never confirms an address to a stranger.
    pub async fn login(&self, email: &str, password: &SecretString) -> Result<IssuedSession, Error> {
        let email = normalize_email(email);
        let Some(mut user) = self.bounded(self.store.find_user_by_email(&email)).await? else {
            debug!("login rejected: unknown account");
            return Err(Error::InvalidCredentials);
        };

        if !crypto::verify_password(&user.password_hash, password.expose_secret()) {
            debug!(user_id = %user.id, "login rejected: bad credentials");
            return Err(Error::InvalidCredentials);
        }

        if !user.is_active {
            debug!(user_id = %user.id, "login rejected: inactive account");
            return Err(Error::InactiveAccount);
        }

        user.last_login = Some(Utc::now());
        self.bounded(self.store.update_user(&user)).await?;

        self.sessions.create(&user).await
    }

    /// Load a user together with the roles behind their role set.
    ///
    /// # Errors
    /// `InvalidSession` when the id no longer maps to an account.
    pub async fn profile(&self, user_id: Uuid) -> Result<(User, Vec<Role>), Error> {
        let user = self
            .bounded(self.store.find_user_by_id(user_id))
            .await?
            .ok_or(Error::InvalidSession)?;

        let mut roles = Vec::with_capacity(user.role_ids.len());
        for role_id in &user.role_ids {
            if let Some(role) = self.bounded(self.store.find_role_by_id(*role_id)).await? {
                roles.push(role);
            }
        }
        Ok((user, roles))
    }

    /// Apply a profile update.
    ///
    /// # Errors
    /// `PasswordMismatch` when a password change lacks a matching repeat.
    pub async fn update_profile(
        &self,
        user_id: Uuid,
        update: ProfileUpdate,
    ) -> Result<User, Error> {
        let mut user = self
            .bounded(self.store.find_user_by_id(user_id))
            .await?
            .ok_or(Error::InvalidSession)?;

        if let Some(first_name) = update.first_name {
            user.first_name = first_name;
        }
        if let Some(last_name) = update.last_name {
            user.last_name = Some(last_name);
        }

        if let Some(password) = update.password {
            let matches = update
                .password_repeat
                .as_ref()
                .is_some_and(|repeat| repeat.expose_secret() == password.expose_secret());
            if !matches {
                return Err(Error::PasswordMismatch);
            }
            user.password_hash =
                crypto::hash_password(password.expose_secret()).map_err(Error::Persistence)?;
        }

        self.bounded(self.store.update_user(&user)).await?;
        debug!(user_id = %user.id, "profile updated");
        Ok(user)
    }

    /// Deactivate the account and expire the presented session.
    ///
    /// The session dies first: if the user update fails the account stays
    /// active with a dead session, which is the recoverable direction; a
    /// disabled account must never be left with a live session.
    ///
    /// # Errors
    /// `InvalidSession` when the token or user id is unknown.
    pub async fn deactivate(&self, user_id: Uuid, token: &str) -> Result<(), Error> {
        self.sessions.invalidate(token).await?;

        let mut user = self
            .bounded(self.store.find_user_by_id(user_id))
            .await?
            .ok_or(Error::InvalidSession)?;
        user.is_active = false;
        self.bounded(self.store.update_user(&user)).await?;
        debug!(user_id = %user.id, "account deactivated");
        Ok(())
    }
}
