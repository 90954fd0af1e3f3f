//! # Rajtigi (RBAC authorization core)
//!
//! `rajtigi` decides whether an authenticated actor may perform an action on
//! a protected business element. Permissions attach to roles, roles attach
//! to users, and one rule per `(role, element)` pair carries the boolean
//! grants.
//!
//! ## Data Model
//!
//! - **Users** carry a role set; the single-role deployment is the N=1 case.
//! - **Rules** distinguish acting on your own record from acting on anyone's
//!   (`read` vs `read_all`, and likewise for update/delete). `create` has no
//!   `_all` variant; ownership is not established yet.
//! - **Sessions** are opaque bearer tokens with a fixed TTL. Only the token
//!   hash is stored, and expired rows are kept for audit instead of deleted.
//!
//! ## Authorization
//!
//! Checks are default-deny with union semantics over the actor's role set:
//! an unknown element code, a missing rule, or an inactive account all deny.
//! Evaluation is pure over a snapshot of rules and safe under arbitrary
//! concurrency.
//!
//! ## Errors
//!
//! Domain outcomes (`InvalidCredentials`, `DuplicateEmail`, `SessionExpired`,
//! ...) are expected and recoverable by the caller; only `StoreTimeout` and
//! `Persistence` are infrastructure failures. Unknown email and wrong
//! password are deliberately indistinguishable.

pub mod access;
pub mod api;
pub mod cli;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
