//! # Access core (RBAC engine)
//!
//! Everything that decides whether an authenticated actor may perform an
//! action on a protected business element lives here:
//!
//! - **Credential verification** ([`crypto`]): Argon2id hashing with a fresh
//!   salt per call, deterministic verification.
//! - **Session management** ([`sessions`]): opaque bearer tokens with a fixed
//!   TTL. Only the SHA-256 of a token is persisted; logout expires the row
//!   instead of deleting it so the audit trail survives.
//! - **Permission rules** ([`rules`]): one rule per `(role, element)` pair,
//!   seven boolean grants (`read`/`update`/`delete` with `_all` variants for
//!   records the actor does not own, plus `create`).
//! - **Authorization** ([`engine`]): default-deny, union over the actor's
//!   role set. Pure over a snapshot of rules, safe under arbitrary
//!   concurrency.
//! - **Account lifecycle** ([`accounts`]): registration, login, profile
//!   update, and deactivation, each built on the pieces above.
//!
//! Persistence is behind the [`store::Store`] trait; the engine performs no
//! retries and bounds every store call with a timeout surfaced as
//! [`error::Error::StoreTimeout`].

pub mod accounts;
pub mod config;
pub mod crypto;
pub mod engine;
pub mod error;
pub mod models;
pub mod rules;
pub mod sessions;
pub mod store;
pub mod token;

use std::sync::Arc;

use self::{
    accounts::AccountService, config::AccessConfig, engine::Authorizer, rules::RuleAdmin,
    sessions::SessionManager, store::Store,
};

/// Composition root bundling the engine services over a shared store.
///
/// The HTTP layer carries one of these in an `Extension`; tests build one
/// over [`store::memory::MemoryStore`].
pub struct AccessState<S> {
    store: Arc<S>,
    accounts: AccountService<S>,
    sessions: SessionManager<S>,
    authorizer: Authorizer<S>,
    rules: RuleAdmin<S>,
}

impl<S: Store> AccessState<S> {
    #[must_use]
    pub fn new(store: Arc<S>, config: AccessConfig) -> Self {
        let sessions = SessionManager::new(Arc::clone(&store), config.clone());
        let accounts = AccountService::new(Arc::clone(&store), sessions.clone(), config.clone());
        let authorizer = Authorizer::new(Arc::clone(&store), config.clone());
        let rules = RuleAdmin::new(Arc::clone(&store), config);

        Self {
            store,
            accounts,
            sessions,
            authorizer,
            rules,
        }
    }

    /// Direct store handle; health reporting pings through it.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    #[must_use]
    pub fn accounts(&self) -> &AccountService<S> {
        &self.accounts
    }

    #[must_use]
    pub fn sessions(&self) -> &SessionManager<S> {
        &self.sessions
    }

    #[must_use]
    pub fn authorizer(&self) -> &Authorizer<S> {
        &self.authorizer
    }

    #[must_use]
    pub fn rules(&self) -> &RuleAdmin<S> {
        &self.rules
    }
}
