//! Postgres-backed [`Store`] built on `sqlx`.
//!
//! Key constraints do the uniqueness work: `users.email`,
//! `user_sessions.token_hash`, `roles.name`, `business_elements.code`, and
//! the `(role_id, element_id)` pair on `access_rules`. SQLSTATE 23505 is
//! surfaced as [`StoreError::UniqueViolation`] so callers can map it to the
//! matching domain error.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Connection, Row};
use std::time::Duration;
use tracing::Instrument;
use uuid::Uuid;

use super::{Store, StoreError};
use crate::access::models::{AccessRule, BusinessElement, Grants, Role, Session, User};

const SCHEMA: &[&str] = &[
    r"
    CREATE TABLE IF NOT EXISTS users (
        id UUID PRIMARY KEY,
        email TEXT NOT NULL UNIQUE,
        first_name TEXT NOT NULL,
        last_name TEXT,
        password_hash TEXT NOT NULL,
        is_active BOOLEAN NOT NULL DEFAULT TRUE,
        created_at TIMESTAMPTZ NOT NULL,
        last_login TIMESTAMPTZ
    )",
    r"
    CREATE TABLE IF NOT EXISTS roles (
        id UUID PRIMARY KEY,
        name TEXT NOT NULL UNIQUE,
        description TEXT NOT NULL DEFAULT ''
    )",
    r"
    CREATE TABLE IF NOT EXISTS user_roles (
        user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        role_id UUID NOT NULL REFERENCES roles(id) ON DELETE CASCADE,
        PRIMARY KEY (user_id, role_id)
    )",
    r"
    CREATE TABLE IF NOT EXISTS business_elements (
        id UUID PRIMARY KEY,
        code TEXT NOT NULL UNIQUE,
        name TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT ''
    )",
    r"
    CREATE TABLE IF NOT EXISTS access_rules (
        id UUID PRIMARY KEY,
        role_id UUID NOT NULL REFERENCES roles(id) ON DELETE CASCADE,
        element_id UUID NOT NULL REFERENCES business_elements(id) ON DELETE CASCADE,
        read_permission BOOLEAN NOT NULL DEFAULT FALSE,
        read_all_permission BOOLEAN NOT NULL DEFAULT FALSE,
        create_permission BOOLEAN NOT NULL DEFAULT FALSE,
        update_permission BOOLEAN NOT NULL DEFAULT FALSE,
        update_all_permission BOOLEAN NOT NULL DEFAULT FALSE,
        delete_permission BOOLEAN NOT NULL DEFAULT FALSE,
        delete_all_permission BOOLEAN NOT NULL DEFAULT FALSE,
        UNIQUE (role_id, element_id)
    )",
    r"
    CREATE TABLE IF NOT EXISTS user_sessions (
        id UUID PRIMARY KEY,
        user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        token_hash BYTEA NOT NULL UNIQUE,
        created_at TIMESTAMPTZ NOT NULL,
        expires_at TIMESTAMPTZ NOT NULL
    )",
];

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect with the pool settings used across the service.
    ///
    /// # Errors
    /// Returns an error if the database is unreachable.
    pub async fn connect(dsn: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .min_connections(1)
            .max_connections(5)
            .max_lifetime(Duration::from_secs(60 * 2))
            .test_before_acquire(true)
            .connect(dsn)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Create the schema when it does not exist yet.
    ///
    /// # Errors
    /// Returns an error on any failed DDL statement.
    pub async fn migrate(&self) -> Result<()> {
        for statement in SCHEMA {
            let span = tracing::info_span!(
                "db.query",
                db.system = "postgresql",
                db.operation = "CREATE",
                db.statement = statement
            );
            sqlx::query(statement)
                .execute(&self.pool)
                .instrument(span)
                .await
                .context("failed to apply schema statement")?;
        }
        Ok(())
    }

    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn load_role_ids(&self, user_id: Uuid) -> Result<Vec<Uuid>, StoreError> {
        let query = "SELECT role_id FROM user_roles WHERE user_id = $1 ORDER BY role_id";
        let span = query_span("SELECT", query);
        let rows = sqlx::query(query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .instrument(span)
            .await
            .map_err(|err| backend(err, "failed to load role memberships"))?;
        Ok(rows.iter().map(|row| row.get("role_id")).collect())
    }
}

fn query_span(operation: &'static str, statement: &str) -> tracing::Span {
    tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = operation,
        db.statement = statement
    )
}

fn backend(err: sqlx::Error, context: &'static str) -> StoreError {
    StoreError::Backend(anyhow::Error::new(err).context(context))
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

fn user_from_row(row: &PgRow, role_ids: Vec<Uuid>) -> User {
    User {
        id: row.get("id"),
        email: row.get("email"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        password_hash: row.get("password_hash"),
        is_active: row.get("is_active"),
        role_ids,
        created_at: row.get("created_at"),
        last_login: row.get("last_login"),
    }
}

fn role_from_row(row: &PgRow) -> Role {
    Role {
        id: row.get("id"),
        name: row.get("name"),
        description: row.get("description"),
    }
}

fn element_from_row(row: &PgRow) -> BusinessElement {
    BusinessElement {
        id: row.get("id"),
        code: row.get("code"),
        name: row.get("name"),
        description: row.get("description"),
    }
}

fn rule_from_row(row: &PgRow) -> AccessRule {
    AccessRule {
        id: row.get("id"),
        role_id: row.get("role_id"),
        element_id: row.get("element_id"),
        grants: Grants {
            read: row.get("read_permission"),
            read_all: row.get("read_all_permission"),
            create: row.get("create_permission"),
            update: row.get("update_permission"),
            update_all: row.get("update_all_permission"),
            delete: row.get("delete_permission"),
            delete_all: row.get("delete_all_permission"),
        },
    }
}

fn session_from_row(row: &PgRow) -> Session {
    Session {
        id: row.get("id"),
        user_id: row.get("user_id"),
        token_hash: row.get("token_hash"),
        created_at: row.get("created_at"),
        expires_at: row.get("expires_at"),
    }
}

const RULE_COLUMNS: &str = "id, role_id, element_id, read_permission, read_all_permission, \
     create_permission, update_permission, update_all_permission, delete_permission, \
     delete_all_permission";

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<(), StoreError> {
        let span = tracing::info_span!("db.ping", db.system = "postgresql", db.operation = "PING");
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|err| backend(err, "failed to acquire database connection"))?;
        conn.ping()
            .instrument(span)
            .await
            .map_err(|err| backend(err, "failed to ping database"))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let query = "SELECT id, email, first_name, last_name, password_hash, is_active, \
             created_at, last_login FROM users WHERE email = $1";
        let span = query_span("SELECT", query);
        let row = sqlx::query(query)
            .bind(email)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .map_err(|err| backend(err, "failed to lookup user by email"))?;

        match row {
            Some(row) => {
                let role_ids = self.load_role_ids(row.get("id")).await?;
                Ok(Some(user_from_row(&row, role_ids)))
            }
            None => Ok(None),
        }
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let query = "SELECT id, email, first_name, last_name, password_hash, is_active, \
             created_at, last_login FROM users WHERE id = $1";
        let span = query_span("SELECT", query);
        let row = sqlx::query(query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .map_err(|err| backend(err, "failed to lookup user by id"))?;

        match row {
            Some(row) => {
                let role_ids = self.load_role_ids(id).await?;
                Ok(Some(user_from_row(&row, role_ids)))
            }
            None => Ok(None),
        }
    }

    async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        // User row and role memberships commit together or not at all.
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|err| backend(err, "failed to begin insert-user transaction"))?;

        let query = r"
            INSERT INTO users
                (id, email, first_name, last_name, password_hash, is_active, created_at, last_login)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ";
        let span = query_span("INSERT", query);
        let result = sqlx::query(query)
            .bind(user.id)
            .bind(&user.email)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(&user.password_hash)
            .bind(user.is_active)
            .bind(user.created_at)
            .bind(user.last_login)
            .execute(&mut *tx)
            .instrument(span)
            .await;

        if let Err(err) = result {
            let _ = tx.rollback().await;
            if is_unique_violation(&err) {
                return Err(StoreError::UniqueViolation("users.email"));
            }
            return Err(backend(err, "failed to insert user"));
        }

        for role_id in &user.role_ids {
            let query = "INSERT INTO user_roles (user_id, role_id) VALUES ($1, $2)";
            let span = query_span("INSERT", query);
            if let Err(err) = sqlx::query(query)
                .bind(user.id)
                .bind(role_id)
                .execute(&mut *tx)
                .instrument(span)
                .await
            {
                let _ = tx.rollback().await;
                return Err(backend(err, "failed to insert role membership"));
            }
        }

        tx.commit()
            .await
            .map_err(|err| backend(err, "failed to commit insert-user transaction"))
    }

    async fn update_user(&self, user: &User) -> Result<(), StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|err| backend(err, "failed to begin update-user transaction"))?;

        let query = r"
            UPDATE users
            SET email = $2,
                first_name = $3,
                last_name = $4,
                password_hash = $5,
                is_active = $6,
                last_login = $7
            WHERE id = $1
        ";
        let span = query_span("UPDATE", query);
        let result = sqlx::query(query)
            .bind(user.id)
            .bind(&user.email)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(&user.password_hash)
            .bind(user.is_active)
            .bind(user.last_login)
            .execute(&mut *tx)
            .instrument(span)
            .await;

        if let Err(err) = result {
            let _ = tx.rollback().await;
            if is_unique_violation(&err) {
                return Err(StoreError::UniqueViolation("users.email"));
            }
            return Err(backend(err, "failed to update user"));
        }

        // Memberships are replaced wholesale; the role set on the struct is
        // authoritative.
        let query = "DELETE FROM user_roles WHERE user_id = $1";
        let span = query_span("DELETE", query);
        if let Err(err) = sqlx::query(query)
            .bind(user.id)
            .execute(&mut *tx)
            .instrument(span)
            .await
        {
            let _ = tx.rollback().await;
            return Err(backend(err, "failed to clear role memberships"));
        }

        for role_id in &user.role_ids {
            let query = "INSERT INTO user_roles (user_id, role_id) VALUES ($1, $2)";
            let span = query_span("INSERT", query);
            if let Err(err) = sqlx::query(query)
                .bind(user.id)
                .bind(role_id)
                .execute(&mut *tx)
                .instrument(span)
                .await
            {
                let _ = tx.rollback().await;
                return Err(backend(err, "failed to insert role membership"));
            }
        }

        tx.commit()
            .await
            .map_err(|err| backend(err, "failed to commit update-user transaction"))
    }

    async fn find_role_by_id(&self, id: Uuid) -> Result<Option<Role>, StoreError> {
        let query = "SELECT id, name, description FROM roles WHERE id = $1";
        let span = query_span("SELECT", query);
        let row = sqlx::query(query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .map_err(|err| backend(err, "failed to lookup role by id"))?;
        Ok(row.as_ref().map(role_from_row))
    }

    async fn insert_role(&self, role: &Role) -> Result<(), StoreError> {
        let query = "INSERT INTO roles (id, name, description) VALUES ($1, $2, $3)";
        let span = query_span("INSERT", query);
        match sqlx::query(query)
            .bind(role.id)
            .bind(&role.name)
            .bind(&role.description)
            .execute(&self.pool)
            .instrument(span)
            .await
        {
            Ok(_) => Ok(()),
            Err(err) if is_unique_violation(&err) => Err(StoreError::UniqueViolation("roles.name")),
            Err(err) => Err(backend(err, "failed to insert role")),
        }
    }

    async fn delete_role(&self, id: Uuid) -> Result<bool, StoreError> {
        // Memberships and rules go with the role; FK cascades cover this, but
        // the explicit statements keep the policy visible and testable.
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|err| backend(err, "failed to begin delete-role transaction"))?;

        for (query, context) in [
            (
                "DELETE FROM user_roles WHERE role_id = $1",
                "failed to delete role memberships",
            ),
            (
                "DELETE FROM access_rules WHERE role_id = $1",
                "failed to delete role rules",
            ),
        ] {
            let span = query_span("DELETE", query);
            if let Err(err) = sqlx::query(query)
                .bind(id)
                .execute(&mut *tx)
                .instrument(span)
                .await
            {
                let _ = tx.rollback().await;
                return Err(backend(err, context));
            }
        }

        let query = "DELETE FROM roles WHERE id = $1";
        let span = query_span("DELETE", query);
        let result = sqlx::query(query)
            .bind(id)
            .execute(&mut *tx)
            .instrument(span)
            .await;

        let deleted = match result {
            Ok(done) => done.rows_affected() > 0,
            Err(err) => {
                let _ = tx.rollback().await;
                return Err(backend(err, "failed to delete role"));
            }
        };

        tx.commit()
            .await
            .map_err(|err| backend(err, "failed to commit delete-role transaction"))?;
        Ok(deleted)
    }

    async fn list_roles(&self) -> Result<Vec<Role>, StoreError> {
        let query = "SELECT id, name, description FROM roles ORDER BY name";
        let span = query_span("SELECT", query);
        let rows = sqlx::query(query)
            .fetch_all(&self.pool)
            .instrument(span)
            .await
            .map_err(|err| backend(err, "failed to list roles"))?;
        Ok(rows.iter().map(role_from_row).collect())
    }

    async fn find_element_by_code(
        &self,
        code: &str,
    ) -> Result<Option<BusinessElement>, StoreError> {
        let query = "SELECT id, code, name, description FROM business_elements WHERE code = $1";
        let span = query_span("SELECT", query);
        let row = sqlx::query(query)
            .bind(code)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .map_err(|err| backend(err, "failed to lookup element by code"))?;
        Ok(row.as_ref().map(element_from_row))
    }

    async fn find_element_by_id(&self, id: Uuid) -> Result<Option<BusinessElement>, StoreError> {
        let query = "SELECT id, code, name, description FROM business_elements WHERE id = $1";
        let span = query_span("SELECT", query);
        let row = sqlx::query(query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .map_err(|err| backend(err, "failed to lookup element by id"))?;
        Ok(row.as_ref().map(element_from_row))
    }

    async fn insert_element(&self, element: &BusinessElement) -> Result<(), StoreError> {
        let query = "INSERT INTO business_elements (id, code, name, description) \
             VALUES ($1, $2, $3, $4)";
        let span = query_span("INSERT", query);
        match sqlx::query(query)
            .bind(element.id)
            .bind(&element.code)
            .bind(&element.name)
            .bind(&element.description)
            .execute(&self.pool)
            .instrument(span)
            .await
        {
            Ok(_) => Ok(()),
            Err(err) if is_unique_violation(&err) => {
                Err(StoreError::UniqueViolation("business_elements.code"))
            }
            Err(err) => Err(backend(err, "failed to insert element")),
        }
    }

    async fn list_elements(&self) -> Result<Vec<BusinessElement>, StoreError> {
        let query = "SELECT id, code, name, description FROM business_elements ORDER BY code";
        let span = query_span("SELECT", query);
        let rows = sqlx::query(query)
            .fetch_all(&self.pool)
            .instrument(span)
            .await
            .map_err(|err| backend(err, "failed to list elements"))?;
        Ok(rows.iter().map(element_from_row).collect())
    }

    async fn find_rule(
        &self,
        role_id: Uuid,
        element_id: Uuid,
    ) -> Result<Option<AccessRule>, StoreError> {
        let query = format!(
            "SELECT {RULE_COLUMNS} FROM access_rules WHERE role_id = $1 AND element_id = $2"
        );
        let span = query_span("SELECT", &query);
        let row = sqlx::query(&query)
            .bind(role_id)
            .bind(element_id)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .map_err(|err| backend(err, "failed to lookup rule"))?;
        Ok(row.as_ref().map(rule_from_row))
    }

    async fn list_rules_for_role(&self, role_id: Uuid) -> Result<Vec<AccessRule>, StoreError> {
        let query = format!("SELECT {RULE_COLUMNS} FROM access_rules WHERE role_id = $1");
        let span = query_span("SELECT", &query);
        let rows = sqlx::query(&query)
            .bind(role_id)
            .fetch_all(&self.pool)
            .instrument(span)
            .await
            .map_err(|err| backend(err, "failed to list rules for role"))?;
        Ok(rows.iter().map(rule_from_row).collect())
    }

    async fn list_rules_for_roles(
        &self,
        role_ids: &[Uuid],
        element_id: Uuid,
    ) -> Result<Vec<AccessRule>, StoreError> {
        let query = format!(
            "SELECT {RULE_COLUMNS} FROM access_rules \
             WHERE role_id = ANY($1) AND element_id = $2"
        );
        let span = query_span("SELECT", &query);
        let rows = sqlx::query(&query)
            .bind(role_ids.to_vec())
            .bind(element_id)
            .fetch_all(&self.pool)
            .instrument(span)
            .await
            .map_err(|err| backend(err, "failed to list rules for role set"))?;
        Ok(rows.iter().map(rule_from_row).collect())
    }

    async fn insert_rule(&self, rule: &AccessRule) -> Result<(), StoreError> {
        let query = r"
            INSERT INTO access_rules
                (id, role_id, element_id, read_permission, read_all_permission,
                 create_permission, update_permission, update_all_permission,
                 delete_permission, delete_all_permission)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        ";
        let span = query_span("INSERT", query);
        match sqlx::query(query)
            .bind(rule.id)
            .bind(rule.role_id)
            .bind(rule.element_id)
            .bind(rule.grants.read)
            .bind(rule.grants.read_all)
            .bind(rule.grants.create)
            .bind(rule.grants.update)
            .bind(rule.grants.update_all)
            .bind(rule.grants.delete)
            .bind(rule.grants.delete_all)
            .execute(&self.pool)
            .instrument(span)
            .await
        {
            Ok(_) => Ok(()),
            Err(err) if is_unique_violation(&err) => {
                Err(StoreError::UniqueViolation("access_rules.role_element"))
            }
            Err(err) => Err(backend(err, "failed to insert rule")),
        }
    }

    async fn update_rule(
        &self,
        rule_id: Uuid,
        grants: Grants,
    ) -> Result<Option<AccessRule>, StoreError> {
        let query = format!(
            "UPDATE access_rules \
             SET read_permission = $2, read_all_permission = $3, create_permission = $4, \
                 update_permission = $5, update_all_permission = $6, delete_permission = $7, \
                 delete_all_permission = $8 \
             WHERE id = $1 \
             RETURNING {RULE_COLUMNS}"
        );
        let span = query_span("UPDATE", &query);
        let row = sqlx::query(&query)
            .bind(rule_id)
            .bind(grants.read)
            .bind(grants.read_all)
            .bind(grants.create)
            .bind(grants.update)
            .bind(grants.update_all)
            .bind(grants.delete)
            .bind(grants.delete_all)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .map_err(|err| backend(err, "failed to update rule"))?;
        Ok(row.as_ref().map(rule_from_row))
    }

    async fn insert_session(&self, session: &Session) -> Result<(), StoreError> {
        // Single statement, so session creation is atomic by construction.
        let query = r"
            INSERT INTO user_sessions (id, user_id, token_hash, created_at, expires_at)
            VALUES ($1, $2, $3, $4, $5)
        ";
        let span = query_span("INSERT", query);
        match sqlx::query(query)
            .bind(session.id)
            .bind(session.user_id)
            .bind(&session.token_hash)
            .bind(session.created_at)
            .bind(session.expires_at)
            .execute(&self.pool)
            .instrument(span)
            .await
        {
            Ok(_) => Ok(()),
            Err(err) if is_unique_violation(&err) => {
                Err(StoreError::UniqueViolation("user_sessions.token_hash"))
            }
            Err(err) => Err(backend(err, "failed to insert session")),
        }
    }

    async fn find_session_by_token_hash(
        &self,
        token_hash: &[u8],
    ) -> Result<Option<Session>, StoreError> {
        let query = "SELECT id, user_id, token_hash, created_at, expires_at \
             FROM user_sessions WHERE token_hash = $1";
        let span = query_span("SELECT", query);
        let row = sqlx::query(query)
            .bind(token_hash)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .map_err(|err| backend(err, "failed to lookup session"))?;
        Ok(row.as_ref().map(session_from_row))
    }

    async fn update_session_expiry(
        &self,
        token_hash: &[u8],
        expires_at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let query = "UPDATE user_sessions SET expires_at = $2 WHERE token_hash = $1";
        let span = query_span("UPDATE", query);
        let done = sqlx::query(query)
            .bind(token_hash)
            .bind(expires_at)
            .execute(&self.pool)
            .instrument(span)
            .await
            .map_err(|err| backend(err, "failed to update session expiry"))?;
        Ok(done.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_not_found_is_not_a_unique_violation() {
        assert!(!is_unique_violation(&sqlx::Error::RowNotFound));
    }

    #[test]
    fn schema_covers_every_table() {
        let tables = [
            "users",
            "roles",
            "user_roles",
            "business_elements",
            "access_rules",
            "user_sessions",
        ];
        for table in tables {
            assert!(
                SCHEMA.iter().any(|stmt| stmt.contains(table)),
                "schema is missing {table}"
            );
        }
    }
}
