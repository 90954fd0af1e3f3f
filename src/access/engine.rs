//! The authorization engine: (actor, element, action) -> Allow | Deny.

use std::future::Future;
use std::sync::Arc;

use super::config::AccessConfig;
use super::error::Error;
use super::models::{AccessRule, Action, Decision, User};
use super::store::{self, Store, StoreError};

/// Evaluate a snapshot of rules for one element against an actor.
///
/// Default-deny with union semantics: the action is allowed iff at least
/// one rule belonging to one of the actor's roles grants the applicable
/// flag. Inactive actors are denied regardless of rules. Pure: safe to
/// call repeatedly and concurrently.
#[must_use]
pub fn evaluate(user: &User, rules: &[AccessRule], action: Action, is_own_record: bool) -> Decision {
    if !user.is_active {
        return Decision::Deny;
    }

    let allowed = rules
        .iter()
        .filter(|rule| user.role_ids.contains(&rule.role_id))
        .any(|rule| rule.grants.allows(action, is_own_record));

    if allowed { Decision::Allow } else { Decision::Deny }
}

pub struct Authorizer<S> {
    store: Arc<S>,
    config: AccessConfig,
}

impl<S> Clone for Authorizer<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            config: self.config.clone(),
        }
    }
}

impl<S: Store> Authorizer<S> {
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

    /// Decide whether `user` may perform `action` on the element addressed
    /// by `element_code`.
    ///
    /// An unknown element code is a Deny, not an error: nothing is knowingly
    /// protected there, so access must not be implicitly granted. The rule
    /// set is read fresh on every call; it is externally mutable at any
    /// time.
    ///
    /// # Errors
    /// Only infrastructure failures (`StoreTimeout`, `Persistence`).
    pub async fn authorize(
        &self,
        user: &User,
        element_code: &str,
        action: Action,
        is_own_record: bool,
    ) -> Result<Decision, Error> {
        if !user.is_active {
            return Ok(Decision::Deny);
        }

        let Some(element) = self
            .bounded(self.store.find_element_by_code(element_code))
            .await?
        else {
            return Ok(Decision::Deny);
        };

        if user.role_ids.is_empty() {
            return Ok(Decision::Deny);
        }

        let rules = self
            .bounded(self.store.list_rules_for_roles(&user.role_ids, element.id))
            .await?;

        Ok(evaluate(user, &rules, action, is_own_record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::models::Grants;
    use chrono::Utc;
    use uuid::Uuid;

    fn user_with_roles(role_ids: Vec<Uuid>, is_active: bool) -> User {
        User {
            id: Uuid::new_v4(),
            email: "u@example.com".to_string(),
            first_name: "U".to_string(),
            last_name: None,
            password_hash: String::new(),
            is_active,
            role_ids,
            created_at: Utc::now(),
            last_login: None,
        }
    }

    fn rule(role_id: Uuid, grants: Grants) -> AccessRule {
        AccessRule {
            id: Uuid::new_v4(),
            role_id,
            element_id: Uuid::new_v4(),
            grants,
        }
    }

    #[test]
    fn no_rules_means_deny() {
        let user = user_with_roles(vec![Uuid::new_v4()], true);
        for action in Action::ALL {
            assert_eq!(evaluate(&user, &[], action, true), Decision::Deny);
            assert_eq!(evaluate(&user, &[], action, false), Decision::Deny);
        }
    }

    #[test]
    fn inactive_user_is_denied_despite_grants() {
        let role_id = Uuid::new_v4();
        let user = user_with_roles(vec![role_id], false);
        let rules = [rule(
            role_id,
            Grants {
                read: true,
                read_all: true,
                create: true,
                update: true,
                update_all: true,
                delete: true,
                delete_all: true,
            },
        )];
        for action in Action::ALL {
            assert_eq!(evaluate(&user, &rules, action, true), Decision::Deny);
            assert_eq!(evaluate(&user, &rules, action, false), Decision::Deny);
        }
    }

    #[test]
    fn union_across_roles_grants_if_any_role_does() {
        let reader = Uuid::new_v4();
        let writer = Uuid::new_v4();
        let user = user_with_roles(vec![reader, writer], true);
        let rules = [
            rule(
                reader,
                Grants {
                    read: true,
                    ..Grants::default()
                },
            ),
            rule(
                writer,
                Grants {
                    update: true,
                    ..Grants::default()
                },
            ),
        ];
        assert_eq!(evaluate(&user, &rules, Action::Read, true), Decision::Allow);
        assert_eq!(
            evaluate(&user, &rules, Action::Update, true),
            Decision::Allow
        );
        assert_eq!(
            evaluate(&user, &rules, Action::Delete, true),
            Decision::Deny
        );
    }

    #[test]
    fn rules_of_unassigned_roles_are_ignored() {
        let assigned = Uuid::new_v4();
        let other = Uuid::new_v4();
        let user = user_with_roles(vec![assigned], true);
        let rules = [rule(
            other,
            Grants {
                read: true,
                read_all: true,
                ..Grants::default()
            },
        )];
        assert_eq!(evaluate(&user, &rules, Action::Read, true), Decision::Deny);
        assert_eq!(evaluate(&user, &rules, Action::Read, false), Decision::Deny);
    }

    #[test]
    fn own_record_flag_selects_the_all_variant() {
        let role_id = Uuid::new_v4();
        let user = user_with_roles(vec![role_id], true);
        let rules = [rule(
            role_id,
            Grants {
                read: true,
                read_all: false,
                ..Grants::default()
            },
        )];
        assert_eq!(evaluate(&user, &rules, Action::Read, true), Decision::Allow);
        assert_eq!(evaluate(&user, &rules, Action::Read, false), Decision::Deny);
    }
}
