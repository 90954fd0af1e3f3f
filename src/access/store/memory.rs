//! In-memory [`Store`] used by tests and DSN-less deployments.
//!
//! A single `RwLock` over plain maps keeps every mutation atomic, which is
//! exactly the transactional guarantee the trait asks for.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use uuid::Uuid;

use super::{Store, StoreError};
use crate::access::models::{AccessRule, BusinessElement, Grants, Role, Session, User};

#[derive(Default)]
struct Inner {
    users: HashMap<Uuid, User>,
    users_by_email: HashMap<String, Uuid>,
    roles: HashMap<Uuid, Role>,
    elements: HashMap<Uuid, BusinessElement>,
    rules: HashMap<Uuid, AccessRule>,
    rule_by_pair: HashMap<(Uuid, Uuid), Uuid>,
    sessions: HashMap<Vec<u8>, Session>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let inner = self.inner.read();
        Ok(inner
            .users_by_email
            .get(email)
            .and_then(|id| inner.users.get(id))
            .cloned())
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.inner.read().users.get(&id).cloned())
    }

    async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        if inner.users_by_email.contains_key(&user.email) {
            return Err(StoreError::UniqueViolation("users.email"));
        }
        inner.users_by_email.insert(user.email.clone(), user.id);
        inner.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn update_user(&self, user: &User) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        let Some(existing) = inner.users.get(&user.id).cloned() else {
            return Err(StoreError::Backend(anyhow::anyhow!(
                "user {} does not exist",
                user.id
            )));
        };
        if existing.email != user.email {
            if inner.users_by_email.contains_key(&user.email) {
                return Err(StoreError::UniqueViolation("users.email"));
            }
            inner.users_by_email.remove(&existing.email);
            inner.users_by_email.insert(user.email.clone(), user.id);
        }
        inner.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_role_by_id(&self, id: Uuid) -> Result<Option<Role>, StoreError> {
        Ok(self.inner.read().roles.get(&id).cloned())
    }

    async fn insert_role(&self, role: &Role) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        if inner.roles.values().any(|existing| existing.name == role.name) {
            return Err(StoreError::UniqueViolation("roles.name"));
        }
        inner.roles.insert(role.id, role.clone());
        Ok(())
    }

    async fn delete_role(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut inner = self.inner.write();
        if inner.roles.remove(&id).is_none() {
            return Ok(false);
        }
        // Cascade: drop the role's rules and strip memberships so no user is
        // left pointing at a role that no longer exists.
        inner.rules.retain(|_, rule| rule.role_id != id);
        inner.rule_by_pair.retain(|(role_id, _), _| *role_id != id);
        for user in inner.users.values_mut() {
            user.role_ids.retain(|role_id| *role_id != id);
        }
        Ok(true)
    }

    async fn list_roles(&self) -> Result<Vec<Role>, StoreError> {
        let mut roles: Vec<Role> = self.inner.read().roles.values().cloned().collect();
        roles.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(roles)
    }

    async fn find_element_by_code(
        &self,
        code: &str,
    ) -> Result<Option<BusinessElement>, StoreError> {
        Ok(self
            .inner
            .read()
            .elements
            .values()
            .find(|element| element.code == code)
            .cloned())
    }

    async fn find_element_by_id(&self, id: Uuid) -> Result<Option<BusinessElement>, StoreError> {
        Ok(self.inner.read().elements.get(&id).cloned())
    }

    async fn insert_element(&self, element: &BusinessElement) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        if inner
            .elements
            .values()
            .any(|existing| existing.code == element.code)
        {
            return Err(StoreError::UniqueViolation("business_elements.code"));
        }
        inner.elements.insert(element.id, element.clone());
        Ok(())
    }

    async fn list_elements(&self) -> Result<Vec<BusinessElement>, StoreError> {
        let mut elements: Vec<BusinessElement> =
            self.inner.read().elements.values().cloned().collect();
        elements.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(elements)
    }

    async fn find_rule(
        &self,
        role_id: Uuid,
        element_id: Uuid,
    ) -> Result<Option<AccessRule>, StoreError> {
        let inner = self.inner.read();
        Ok(inner
            .rule_by_pair
            .get(&(role_id, element_id))
            .and_then(|id| inner.rules.get(id))
            .cloned())
    }

    async fn list_rules_for_role(&self, role_id: Uuid) -> Result<Vec<AccessRule>, StoreError> {
        Ok(self
            .inner
            .read()
            .rules
            .values()
            .filter(|rule| rule.role_id == role_id)
            .cloned()
            .collect())
    }

    async fn list_rules_for_roles(
        &self,
        role_ids: &[Uuid],
        element_id: Uuid,
    ) -> Result<Vec<AccessRule>, StoreError> {
        let inner = self.inner.read();
        Ok(role_ids
            .iter()
            .filter_map(|role_id| inner.rule_by_pair.get(&(*role_id, element_id)))
            .filter_map(|id| inner.rules.get(id))
            .cloned()
            .collect())
    }

    async fn insert_rule(&self, rule: &AccessRule) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        let pair = (rule.role_id, rule.element_id);
        if inner.rule_by_pair.contains_key(&pair) {
            return Err(StoreError::UniqueViolation("access_rules.role_element"));
        }
        inner.rule_by_pair.insert(pair, rule.id);
        inner.rules.insert(rule.id, rule.clone());
        Ok(())
    }

    async fn update_rule(
        &self,
        rule_id: Uuid,
        grants: Grants,
    ) -> Result<Option<AccessRule>, StoreError> {
        let mut inner = self.inner.write();
        Ok(inner.rules.get_mut(&rule_id).map(|rule| {
            rule.grants = grants;
            rule.clone()
        }))
    }

    async fn insert_session(&self, session: &Session) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        if inner.sessions.contains_key(&session.token_hash) {
            return Err(StoreError::UniqueViolation("user_sessions.token_hash"));
        }
        inner
            .sessions
            .insert(session.token_hash.clone(), session.clone());
        Ok(())
    }

    async fn find_session_by_token_hash(
        &self,
        token_hash: &[u8],
    ) -> Result<Option<Session>, StoreError> {
        Ok(self.inner.read().sessions.get(token_hash).cloned())
    }

    async fn update_session_expiry(
        &self,
        token_hash: &[u8],
        expires_at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut inner = self.inner.write();
        match inner.sessions.get_mut(token_hash) {
            Some(session) => {
                session.expires_at = expires_at;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn user(email: &str, role_ids: Vec<Uuid>) -> User {
        User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            first_name: "Test".to_string(),
            last_name: None,
            password_hash: "$argon2id$stub".to_string(),
            is_active: true,
            role_ids,
            created_at: Utc::now(),
            last_login: None,
        }
    }

    fn role(name: &str) -> Role {
        Role {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: String::new(),
        }
    }

    #[tokio::test]
    async fn duplicate_email_is_a_unique_violation() {
        let store = MemoryStore::new();
        store.insert_user(&user("a@x.com", Vec::new())).await.unwrap();
        let err = store
            .insert_user(&user("a@x.com", Vec::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation("users.email")));
    }

    #[tokio::test]
    async fn duplicate_rule_pair_is_a_unique_violation() {
        let store = MemoryStore::new();
        let role_id = Uuid::new_v4();
        let element_id = Uuid::new_v4();
        let rule = AccessRule {
            id: Uuid::new_v4(),
            role_id,
            element_id,
            grants: Grants::default(),
        };
        store.insert_rule(&rule).await.unwrap();

        let second = AccessRule {
            id: Uuid::new_v4(),
            role_id,
            element_id,
            grants: Grants::default(),
        };
        let err = store.insert_rule(&second).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::UniqueViolation("access_rules.role_element")
        ));
    }

    #[tokio::test]
    async fn delete_role_cascades_rules_and_memberships() {
        let store = MemoryStore::new();
        let editor = role("editor");
        store.insert_role(&editor).await.unwrap();

        let element_id = Uuid::new_v4();
        store
            .insert_rule(&AccessRule {
                id: Uuid::new_v4(),
                role_id: editor.id,
                element_id,
                grants: Grants::default(),
            })
            .await
            .unwrap();

        let member = user("member@x.com", vec![editor.id]);
        store.insert_user(&member).await.unwrap();

        assert!(store.delete_role(editor.id).await.unwrap());
        assert!(store.find_rule(editor.id, element_id).await.unwrap().is_none());
        let member = store.find_user_by_id(member.id).await.unwrap().unwrap();
        assert!(member.role_ids.is_empty());
        // Deleting again reports absence instead of erroring.
        assert!(!store.delete_role(editor.id).await.unwrap());
    }

    #[tokio::test]
    async fn session_expiry_update_is_reported() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let session = Session {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            token_hash: vec![1u8; 32],
            created_at: now,
            expires_at: now + Duration::hours(24),
        };
        store.insert_session(&session).await.unwrap();

        assert!(store.update_session_expiry(&session.token_hash, now).await.unwrap());
        let stored = store
            .find_session_by_token_hash(&session.token_hash)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.expires_at, now);
        assert!(!store.update_session_expiry(&[9u8; 32], now).await.unwrap());
    }
}
