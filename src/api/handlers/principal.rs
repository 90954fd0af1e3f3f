//! Authenticated principal extraction.
//!
//! The guard is an explicit function composed at the boundary: it takes the
//! session manager as an injected dependency, resolves the bearer token,
//! and hands the handler a principal; no global registry is involved.

use axum::http::{HeaderMap, StatusCode, header::AUTHORIZATION};
use tracing::error;

use crate::access::{error::Error, models::User, sessions::SessionManager, store::Store};

/// Authenticated user context derived from the bearer token.
pub struct Principal {
    pub user: User,
    /// The raw presented token; logout and deactivation need it back.
    pub token: String,
}

/// Resolve the `Authorization: Bearer` token into a principal.
///
/// # Errors
/// 401 for missing/unknown/expired sessions, 403 for a session whose
/// account has since been disabled, 500 for infrastructure failures.
pub async fn require_auth<S: Store>(
    headers: &HeaderMap,
    sessions: &SessionManager<S>,
) -> Result<Principal, (StatusCode, String)> {
    let Some(token) = extract_bearer_token(headers) else {
        return Err((
            StatusCode::UNAUTHORIZED,
            "Authentication required".to_string(),
        ));
    };

    match sessions.resolve(&token).await {
        Ok((_session, user)) => {
            if user.is_active {
                Ok(Principal { user, token })
            } else {
                Err((
                    StatusCode::FORBIDDEN,
                    Error::InactiveAccount.to_string(),
                ))
            }
        }
        Err(err) if err.is_domain() => Err((StatusCode::UNAUTHORIZED, err.to_string())),
        Err(err) => {
            error!("failed to resolve session: {err}");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ))
        }
    }
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}
