//! Administrative surface for roles, elements, and the permission matrix.
//!
//! The engine only ever reads rules; everything here is for the
//! administrative actor that maintains them. The unique `(role, element)`
//! key is enforced by the store, so concurrent creators race safely; the
//! loser gets [`Error::DuplicateRule`].

use std::future::Future;
use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use super::config::AccessConfig;
use super::error::Error;
use super::models::{AccessRule, BusinessElement, Grants, Role};
use super::store::{self, Store, StoreError};

pub struct RuleAdmin<S> {
    store: Arc<S>,
    config: AccessConfig,
}

impl<S> Clone for RuleAdmin<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            config: self.config.clone(),
        }
    }
}

impl<S: Store> RuleAdmin<S> {
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

    /// Create a role.
    ///
    /// # Errors
    /// Infrastructure errors only; a duplicate name is a store-level
    /// conflict surfaced as `Persistence`.
    pub async fn define_role(&self, name: &str, description: &str) -> Result<Role, Error> {
        let role = Role {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: description.to_string(),
        };
        self.bounded(self.store.insert_role(&role)).await?;
        debug!(role = %role.name, "role defined");
        Ok(role)
    }

    /// Remove a role together with its rules and memberships.
    ///
    /// Users keep existing; they just lose the membership; a role deletion
    /// never silently orphans accounts.
    ///
    /// # Errors
    /// `InvalidRole` when the role does not exist.
    pub async fn delete_role(&self, role_id: Uuid) -> Result<(), Error> {
        let deleted = self.bounded(self.store.delete_role(role_id)).await?;
        if deleted {
            debug!(%role_id, "role deleted");
            Ok(())
        } else {
            Err(Error::InvalidRole)
        }
    }

    /// Register a protected business element under a unique `code`.
    ///
    /// # Errors
    /// Infrastructure errors only.
    pub async fn define_element(
        &self,
        code: &str,
        name: &str,
        description: &str,
    ) -> Result<BusinessElement, Error> {
        let element = BusinessElement {
            id: Uuid::new_v4(),
            code: code.to_string(),
            name: name.to_string(),
            description: description.to_string(),
        };
        self.bounded(self.store.insert_element(&element)).await?;
        debug!(code = %element.code, "business element defined");
        Ok(element)
    }

    /// Create the rule for a `(role, element)` pair.
    ///
    /// # Errors
    /// `InvalidRole` / `UnknownElement` when either side does not exist,
    /// `DuplicateRule` when the pair already has a rule.
    pub async fn create_rule(
        &self,
        role_id: Uuid,
        element_id: Uuid,
        grants: Grants,
    ) -> Result<AccessRule, Error> {
        self.bounded(self.store.find_role_by_id(role_id))
            .await?
            .ok_or(Error::InvalidRole)?;
        self.bounded(self.store.find_element_by_id(element_id))
            .await?
            .ok_or(Error::UnknownElement)?;

        let rule = AccessRule {
            id: Uuid::new_v4(),
            role_id,
            element_id,
            grants,
        };
        match self.bounded(self.store.insert_rule(&rule)).await {
            Ok(()) => {
                debug!(%role_id, %element_id, "access rule created");
                Ok(rule)
            }
            Err(StoreError::UniqueViolation(_)) => Err(Error::DuplicateRule),
            Err(err) => Err(err.into()),
        }
    }

    /// Replace the grants of an existing rule.
    ///
    /// Returns `None` when the rule id is unknown; the caller decides
    /// whether that is worth reporting.
    ///
    /// # Errors
    /// Infrastructure errors only.
    pub async fn update_rule(
        &self,
        rule_id: Uuid,
        grants: Grants,
    ) -> Result<Option<AccessRule>, Error> {
        let updated = self.bounded(self.store.update_rule(rule_id, grants)).await?;
        Ok(updated)
    }

    /// The rule for a pair, or `None`, and `None` means default-deny.
    ///
    /// # Errors
    /// Infrastructure errors only.
    pub async fn get_rule(
        &self,
        role_id: Uuid,
        element_id: Uuid,
    ) -> Result<Option<AccessRule>, Error> {
        let rule = self
            .bounded(self.store.find_rule(role_id, element_id))
            .await?;
        Ok(rule)
    }

    /// Every rule a role carries, across all elements.
    ///
    /// # Errors
    /// Infrastructure errors only.
    pub async fn list_rules_for_role(&self, role_id: Uuid) -> Result<Vec<AccessRule>, Error> {
        let rules = self.bounded(self.store.list_rules_for_role(role_id)).await?;
        Ok(rules)
    }

    /// # Errors
    /// Infrastructure errors only.
    pub async fn list_roles(&self) -> Result<Vec<Role>, Error> {
        let roles = self.bounded(self.store.list_roles()).await?;
        Ok(roles)
    }

    /// # Errors
    /// Infrastructure errors only.
    pub async fn list_elements(&self) -> Result<Vec<BusinessElement>, Error> {
        let elements = self.bounded(self.store.list_elements()).await?;
        Ok(elements)
    }
}
