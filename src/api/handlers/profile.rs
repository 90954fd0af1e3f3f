//! Authenticated self-service: read and update the caller's own profile.

use axum::{
    Json, extract::Extension, http::{HeaderMap, StatusCode}, response::IntoResponse,
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{MessageResponse, error_reply, principal::require_auth};
use crate::access::{
    AccessState,
    accounts::ProfileUpdate,
    models::{Role, User},
    store::Store,
};

#[derive(utoipa::ToSchema, Serialize, Debug)]
pub struct ProfileResponse {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: Option<String>,
    pub roles: Vec<String>,
    pub is_active: bool,
    pub created_at: String,
    pub last_login: Option<String>,
}

#[derive(utoipa::ToSchema, Deserialize, Debug)]
pub struct UpdateProfileRequest {
    first_name: Option<String>,
    last_name: Option<String>,
    #[schema(value_type = Option<String>)]
    password: Option<SecretString>,
    #[schema(value_type = Option<String>)]
    password_repeat: Option<SecretString>,
}

fn profile_response(user: &User, roles: &[Role]) -> ProfileResponse {
    ProfileResponse {
        id: user.id.to_string(),
        email: user.email.clone(),
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
        roles: roles.iter().map(|role| role.name.clone()).collect(),
        is_active: user.is_active,
        created_at: user.created_at.to_rfc3339(),
        last_login: user.last_login.map(|at| at.to_rfc3339()),
    }
}

#[utoipa::path(
    get,
    path= "/api/profile",
    responses (
        (status = 200, description = "The authenticated user's profile", body = [ProfileResponse]),
        (status = 401, description = "Missing or invalid session"),
    ),
    tag= "accounts"
)]
pub async fn get_profile<S: Store>(
    headers: HeaderMap,
    state: Extension<Arc<AccessState<S>>>,
) -> impl IntoResponse {
    let principal = match require_auth(&headers, state.sessions()).await {
        Ok(principal) => principal,
        Err(reply) => return reply.into_response(),
    };

    match state.accounts().profile(principal.user.id).await {
        Ok((user, roles)) => {
            (StatusCode::OK, Json(profile_response(&user, &roles))).into_response()
        }
        Err(err) => error_reply(&err).into_response(),
    }
}

#[utoipa::path(
    post,
    path= "/api/profile",
    request_body = UpdateProfileRequest,
    responses (
        (status = 200, description = "Profile updated", body = [MessageResponse]),
        (status = 400, description = "Password and repeat do not match"),
        (status = 401, description = "Missing or invalid session"),
    ),
    tag= "accounts"
)]
pub async fn update_profile<S: Store>(
    headers: HeaderMap,
    state: Extension<Arc<AccessState<S>>>,
    payload: Option<Json<UpdateProfileRequest>>,
) -> impl IntoResponse {
    let principal = match require_auth(&headers, state.sessions()).await {
        Ok(principal) => principal,
        Err(reply) => return reply.into_response(),
    };

    let Some(Json(request)) = payload else {
        return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response();
    };

    let update = ProfileUpdate {
        first_name: request.first_name,
        last_name: request.last_name,
        password: request.password,
        password_repeat: request.password_repeat,
    };

    match state
        .accounts()
        .update_profile(principal.user.id, update)
        .await
    {
        Ok(_user) => (
            StatusCode::OK,
            Json(MessageResponse {
                message: "Profile updated successfully".to_string(),
            }),
        )
            .into_response(),
        Err(err) => error_reply(&err).into_response(),
    }
}
