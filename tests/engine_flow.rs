//! End-to-end engine behavior over the in-memory store: registration,
//! login, sessions, and the permission matrix.

use std::sync::Arc;

use chrono::{Duration, Utc};
use secrecy::SecretString;
use uuid::Uuid;

use rajtigi::access::{
    AccessState,
    accounts::{NewAccount, ProfileUpdate},
    config::AccessConfig,
    error::Error,
    models::{Action, Decision, Grants, Session, User},
    store::{Store, memory::MemoryStore},
    token::{generate_session_token, hash_session_token},
};

fn secret(value: &str) -> SecretString {
    SecretString::from(value.to_string())
}

fn new_account(email: &str, password: &str, role_id: Option<Uuid>) -> NewAccount {
    NewAccount {
        email: email.to_string(),
        password: secret(password),
        first_name: "Test".to_string(),
        last_name: Some("User".to_string()),
        role_id,
    }
}

fn state_with_store() -> (Arc<MemoryStore>, AccessState<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let state = AccessState::new(Arc::clone(&store), AccessConfig::new());
    (store, state)
}

async fn register_editor_with_article(
    state: &AccessState<MemoryStore>,
    grants: Grants,
) -> (User, Uuid) {
    let editor = state.rules().define_role("editor", "Editors").await.unwrap();
    let article = state
        .rules()
        .define_element("article", "Article", "Published articles")
        .await
        .unwrap();
    state
        .rules()
        .create_rule(editor.id, article.id, grants)
        .await
        .unwrap();
    let user = state
        .accounts()
        .register(new_account("editor@example.com", "pw1", Some(editor.id)))
        .await
        .unwrap();
    (user, editor.id)
}

#[tokio::test]
async fn editor_article_scenario() {
    let (_store, state) = state_with_store();
    let (user, _) = register_editor_with_article(
        &state,
        Grants {
            read: true,
            read_all: false,
            create: true,
            ..Grants::default()
        },
    )
    .await;

    let authz = state.authorizer();
    assert_eq!(
        authz
            .authorize(&user, "article", Action::Create, false)
            .await
            .unwrap(),
        Decision::Allow
    );
    assert_eq!(
        authz
            .authorize(&user, "article", Action::Read, false)
            .await
            .unwrap(),
        Decision::Deny
    );
    assert_eq!(
        authz
            .authorize(&user, "article", Action::Read, true)
            .await
            .unwrap(),
        Decision::Allow
    );
}

#[tokio::test]
async fn authorize_is_deny_by_default() {
    let (_store, state) = state_with_store();
    let editor = state.rules().define_role("editor", "").await.unwrap();
    state
        .rules()
        .define_element("article", "Article", "")
        .await
        .unwrap();
    // No rule exists for (editor, article).
    let user = state
        .accounts()
        .register(new_account("a@example.com", "pw", Some(editor.id)))
        .await
        .unwrap();

    for action in Action::ALL {
        for own in [true, false] {
            assert_eq!(
                state
                    .authorizer()
                    .authorize(&user, "article", action, own)
                    .await
                    .unwrap(),
                Decision::Deny,
                "{action:?} own={own} should deny without a rule"
            );
        }
    }

    // Unknown element codes deny rather than error.
    assert_eq!(
        state
            .authorizer()
            .authorize(&user, "no-such-element", Action::Read, true)
            .await
            .unwrap(),
        Decision::Deny
    );
}

#[tokio::test]
async fn duplicate_email_is_rejected() {
    let (_store, state) = state_with_store();
    state
        .accounts()
        .register(new_account("a@x.com", "pw1", None))
        .await
        .unwrap();
    let err = state
        .accounts()
        .register(new_account("a@x.com", "pw2", None))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::DuplicateEmail));

    // Same address, different case: emails are normalized before storage.
    let err = state
        .accounts()
        .register(new_account(" A@X.COM ", "pw3", None))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::DuplicateEmail));
}

#[tokio::test]
async fn register_with_unknown_role_is_rejected() {
    let (_store, state) = state_with_store();
    let err = state
        .accounts()
        .register(new_account("a@x.com", "pw", Some(Uuid::new_v4())))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidRole));
}

#[tokio::test]
async fn login_failure_modes_are_indistinguishable() {
    let (_store, state) = state_with_store();
    state
        .accounts()
        .register(new_account("known@x.com", "right-password", None))
        .await
        .unwrap();

    let wrong_password = state
        .accounts()
        .login("known@x.com", &secret("wrong-password"))
        .await
        .unwrap_err();
    let unknown_email = state
        .accounts()
        .login("unknown@x.com", &secret("whatever"))
        .await
        .unwrap_err();

    assert!(matches!(wrong_password, Error::InvalidCredentials));
    assert!(matches!(unknown_email, Error::InvalidCredentials));
    // Identical error, identical message: nothing leaks which half failed.
    assert_eq!(wrong_password.to_string(), unknown_email.to_string());
}

#[tokio::test]
async fn login_issues_a_resolvable_session_and_stamps_last_login() {
    let (_store, state) = state_with_store();
    let registered = state
        .accounts()
        .register(new_account("a@x.com", "pw", None))
        .await
        .unwrap();
    assert!(registered.last_login.is_none());

    let issued = state
        .accounts()
        .login("a@x.com", &secret("pw"))
        .await
        .unwrap();
    let (session, user) = state.sessions().resolve(&issued.token).await.unwrap();
    assert_eq!(user.id, registered.id);
    assert_eq!(session.user_id, registered.id);
    assert!(user.last_login.is_some());
}

#[tokio::test]
async fn invalidated_session_reports_expired() {
    let (_store, state) = state_with_store();
    state
        .accounts()
        .register(new_account("a@x.com", "pw", None))
        .await
        .unwrap();
    let issued = state
        .accounts()
        .login("a@x.com", &secret("pw"))
        .await
        .unwrap();

    state.sessions().invalidate(&issued.token).await.unwrap();
    let err = state.sessions().resolve(&issued.token).await.unwrap_err();
    assert!(matches!(err, Error::SessionExpired));

    // Idempotent: expiring an already-expired session is a no-op success.
    state.sessions().invalidate(&issued.token).await.unwrap();

    // An unknown token is a different failure.
    let err = state.sessions().invalidate("no-such-token").await.unwrap_err();
    assert!(matches!(err, Error::InvalidSession));
}

#[tokio::test]
async fn expired_session_is_never_resolved() {
    let (store, state) = state_with_store();
    let user = state
        .accounts()
        .register(new_account("a@x.com", "pw", None))
        .await
        .unwrap();

    // Plant a session whose TTL already elapsed.
    let token = generate_session_token().unwrap();
    let created_at = Utc::now() - Duration::hours(25);
    store
        .insert_session(&Session {
            id: Uuid::new_v4(),
            user_id: user.id,
            token_hash: hash_session_token(&token),
            created_at,
            expires_at: created_at + Duration::hours(24),
        })
        .await
        .unwrap();

    let err = state.sessions().resolve(&token).await.unwrap_err();
    assert!(matches!(err, Error::SessionExpired));
}

#[tokio::test]
async fn resolve_does_not_slide_expiration() {
    let (store, state) = state_with_store();
    state
        .accounts()
        .register(new_account("a@x.com", "pw", None))
        .await
        .unwrap();
    let issued = state
        .accounts()
        .login("a@x.com", &secret("pw"))
        .await
        .unwrap();

    let before = store
        .find_session_by_token_hash(&hash_session_token(&issued.token))
        .await
        .unwrap()
        .unwrap();
    state.sessions().resolve(&issued.token).await.unwrap();
    state.sessions().resolve(&issued.token).await.unwrap();
    let after = store
        .find_session_by_token_hash(&hash_session_token(&issued.token))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(before.expires_at, after.expires_at);
}

#[tokio::test]
async fn unknown_token_is_invalid_session() {
    let (_store, state) = state_with_store();
    let err = state.sessions().resolve("bogus").await.unwrap_err();
    assert!(matches!(err, Error::InvalidSession));
}

#[tokio::test]
async fn deactivation_denies_everything_and_kills_the_session() {
    let (_store, state) = state_with_store();
    let (_, editor_id) = register_editor_with_article(
        &state,
        Grants {
            read: true,
            read_all: true,
            create: true,
            update: true,
            update_all: true,
            delete: true,
            delete_all: true,
        },
    )
    .await;

    let issued = state
        .accounts()
        .login("editor@example.com", &secret("pw1"))
        .await
        .unwrap();
    state
        .accounts()
        .deactivate(issued.session.user_id, &issued.token)
        .await
        .unwrap();

    // The session died with the account.
    let err = state.sessions().resolve(&issued.token).await.unwrap_err();
    assert!(matches!(err, Error::SessionExpired));

    // Every action denies despite the all-granting rule.
    let (user, _roles) = state
        .accounts()
        .profile(issued.session.user_id)
        .await
        .unwrap();
    assert!(!user.is_active);
    assert_eq!(user.role_ids, vec![editor_id]);
    for action in Action::ALL {
        for own in [true, false] {
            assert_eq!(
                state
                    .authorizer()
                    .authorize(&user, "article", action, own)
                    .await
                    .unwrap(),
                Decision::Deny
            );
        }
    }

    // And logging back in reports the inactive account, not bad credentials.
    let err = state
        .accounts()
        .login("editor@example.com", &secret("pw1"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InactiveAccount));
}

#[tokio::test]
async fn duplicate_rule_for_pair_is_rejected() {
    let (_store, state) = state_with_store();
    let editor = state.rules().define_role("editor", "").await.unwrap();
    let article = state
        .rules()
        .define_element("article", "Article", "")
        .await
        .unwrap();

    state
        .rules()
        .create_rule(
            editor.id,
            article.id,
            Grants {
                read: true,
                ..Grants::default()
            },
        )
        .await
        .unwrap();

    let err = state
        .rules()
        .create_rule(editor.id, article.id, Grants::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::DuplicateRule));

    // The first rule stays the sole source of truth for the pair.
    let rule = state
        .rules()
        .get_rule(editor.id, article.id)
        .await
        .unwrap()
        .unwrap();
    assert!(rule.grants.read);
    let rules = state.rules().list_rules_for_role(editor.id).await.unwrap();
    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0].id, rule.id);
}

#[tokio::test]
async fn rule_creation_validates_both_sides() {
    let (_store, state) = state_with_store();
    let editor = state.rules().define_role("editor", "").await.unwrap();
    let article = state
        .rules()
        .define_element("article", "Article", "")
        .await
        .unwrap();

    let err = state
        .rules()
        .create_rule(Uuid::new_v4(), article.id, Grants::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidRole));

    let err = state
        .rules()
        .create_rule(editor.id, Uuid::new_v4(), Grants::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::UnknownElement));
}

#[tokio::test]
async fn updated_rule_changes_the_decision() {
    let (_store, state) = state_with_store();
    let (user, editor_id) = register_editor_with_article(
        &state,
        Grants {
            read: true,
            ..Grants::default()
        },
    )
    .await;

    assert_eq!(
        state
            .authorizer()
            .authorize(&user, "article", Action::Read, false)
            .await
            .unwrap(),
        Decision::Deny
    );

    let article = state
        .rules()
        .list_elements()
        .await
        .unwrap()
        .into_iter()
        .find(|element| element.code == "article")
        .unwrap();
    let rule = state
        .rules()
        .get_rule(editor_id, article.id)
        .await
        .unwrap()
        .unwrap();
    state
        .rules()
        .update_rule(
            rule.id,
            Grants {
                read: true,
                read_all: true,
                ..Grants::default()
            },
        )
        .await
        .unwrap()
        .unwrap();

    // The engine reads rules fresh on every check.
    assert_eq!(
        state
            .authorizer()
            .authorize(&user, "article", Action::Read, false)
            .await
            .unwrap(),
        Decision::Allow
    );
}

#[tokio::test]
async fn union_semantics_across_the_role_set() {
    let (store, state) = state_with_store();
    let reader = state.rules().define_role("reader", "").await.unwrap();
    let updater = state.rules().define_role("updater", "").await.unwrap();
    let article = state
        .rules()
        .define_element("article", "Article", "")
        .await
        .unwrap();
    state
        .rules()
        .create_rule(
            reader.id,
            article.id,
            Grants {
                read: true,
                ..Grants::default()
            },
        )
        .await
        .unwrap();
    state
        .rules()
        .create_rule(
            updater.id,
            article.id,
            Grants {
                update_all: true,
                ..Grants::default()
            },
        )
        .await
        .unwrap();

    let mut user = state
        .accounts()
        .register(new_account("both@x.com", "pw", Some(reader.id)))
        .await
        .unwrap();
    user.role_ids.push(updater.id);
    store.update_user(&user).await.unwrap();
    let (user, _) = state.accounts().profile(user.id).await.unwrap();

    let authz = state.authorizer();
    assert_eq!(
        authz
            .authorize(&user, "article", Action::Read, true)
            .await
            .unwrap(),
        Decision::Allow
    );
    assert_eq!(
        authz
            .authorize(&user, "article", Action::Update, false)
            .await
            .unwrap(),
        Decision::Allow
    );
    assert_eq!(
        authz
            .authorize(&user, "article", Action::Delete, true)
            .await
            .unwrap(),
        Decision::Deny
    );
}

#[tokio::test]
async fn deleting_a_role_strips_membership_without_orphaning_users() {
    let (_store, state) = state_with_store();
    let (user, editor_id) = register_editor_with_article(
        &state,
        Grants {
            read: true,
            ..Grants::default()
        },
    )
    .await;

    state.rules().delete_role(editor_id).await.unwrap();

    let (user, roles) = state.accounts().profile(user.id).await.unwrap();
    assert!(roles.is_empty());
    assert!(user.role_ids.is_empty());
    assert_eq!(
        state
            .authorizer()
            .authorize(&user, "article", Action::Read, true)
            .await
            .unwrap(),
        Decision::Deny
    );

    let err = state.rules().delete_role(editor_id).await.unwrap_err();
    assert!(matches!(err, Error::InvalidRole));
}

#[tokio::test]
async fn profile_update_changes_names_and_password() {
    let (_store, state) = state_with_store();
    let user = state
        .accounts()
        .register(new_account("a@x.com", "old-password", None))
        .await
        .unwrap();

    // Mismatched repeat leaves the account untouched.
    let err = state
        .accounts()
        .update_profile(
            user.id,
            ProfileUpdate {
                password: Some(secret("new-password")),
                password_repeat: Some(secret("different")),
                ..ProfileUpdate::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::PasswordMismatch));
    state
        .accounts()
        .login("a@x.com", &secret("old-password"))
        .await
        .unwrap();

    // A missing repeat is the same mismatch.
    let err = state
        .accounts()
        .update_profile(
            user.id,
            ProfileUpdate {
                password: Some(secret("new-password")),
                ..ProfileUpdate::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::PasswordMismatch));

    let updated = state
        .accounts()
        .update_profile(
            user.id,
            ProfileUpdate {
                first_name: Some("Ada".to_string()),
                last_name: Some("Lovelace".to_string()),
                password: Some(secret("new-password")),
                password_repeat: Some(secret("new-password")),
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.first_name, "Ada");
    assert_eq!(updated.last_name.as_deref(), Some("Lovelace"));

    state
        .accounts()
        .login("a@x.com", &secret("new-password"))
        .await
        .unwrap();
    let err = state
        .accounts()
        .login("a@x.com", &secret("old-password"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidCredentials));
}
