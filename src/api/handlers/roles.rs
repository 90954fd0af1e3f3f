use axum::{
    Json, extract::Extension, http::{HeaderMap, StatusCode}, response::IntoResponse,
};
use serde::Serialize;
use std::sync::Arc;

use super::{error_reply, principal::require_auth};
use crate::access::{AccessState, models::Action, store::Store};

/// Element code gating the role report; the matrix governs its own
/// reporting surface.
const ROLE_ELEMENT: &str = "role";

#[derive(utoipa::ToSchema, Serialize, Debug)]
pub struct RoleResponse {
    id: String,
    name: String,
    description: String,
}

#[utoipa::path(
    get,
    path= "/api/roles",
    responses (
        (status = 200, description = "Known roles", body = [RoleResponse]),
        (status = 401, description = "Missing or invalid session"),
        (status = 403, description = "No role grants reading roles"),
    ),
    tag= "access"
)]
pub async fn list_roles<S: Store>(
    headers: HeaderMap,
    state: Extension<Arc<AccessState<S>>>,
) -> impl IntoResponse {
    let principal = match require_auth(&headers, state.sessions()).await {
        Ok(principal) => principal,
        Err(reply) => return reply.into_response(),
    };

    let decision = match state
        .authorizer()
        .authorize(&principal.user, ROLE_ELEMENT, Action::Read, false)
        .await
    {
        Ok(decision) => decision,
        Err(err) => return error_reply(&err).into_response(),
    };
    if !decision.is_allowed() {
        return (StatusCode::FORBIDDEN, "Forbidden".to_string()).into_response();
    }

    match state.rules().list_roles().await {
        Ok(roles) => {
            let body: Vec<RoleResponse> = roles
                .into_iter()
                .map(|role| RoleResponse {
                    id: role.id.to_string(),
                    name: role.name,
                    description: role.description,
                })
                .collect();
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(err) => error_reply(&err).into_response(),
    }
}
