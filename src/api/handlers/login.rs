use axum::{
    Json, extract::Extension, http::StatusCode, response::IntoResponse,
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;

use super::error_reply;
use crate::access::{AccessState, models::normalize_email, store::Store};

#[derive(utoipa::ToSchema, Deserialize, Debug)]
pub struct LoginRequest {
    email: String,
    #[schema(value_type = String)]
    password: SecretString,
}

#[derive(utoipa::ToSchema, Serialize, Debug)]
pub struct LoginUser {
    id: String,
    email: String,
    roles: Vec<String>,
}

#[derive(utoipa::ToSchema, Serialize, Debug)]
pub struct LoginResponse {
    message: String,
    token: String,
    user: LoginUser,
}

#[utoipa::path(
    post,
    path= "/api/login",
    request_body = LoginRequest,
    responses (
        (status = 200, description = "Login successful", body = [LoginResponse]),
        (status = 401, description = "Unknown email or wrong password; indistinguishable"),
        (status = 403, description = "Account is inactive"),
    ),
    tag= "auth"
)]
pub async fn login<S: Store>(
    state: Extension<Arc<AccessState<S>>>,
    payload: Option<Json<LoginRequest>>,
) -> impl IntoResponse {
    let Some(Json(request)) = payload else {
        return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response();
    };

    let email = normalize_email(&request.email);
    let issued = match state.accounts().login(&email, &request.password).await {
        Ok(issued) => issued,
        Err(err) => return error_reply(&err).into_response(),
    };

    // The session already exists, so a failed role lookup downgrades the
    // response instead of failing the login.
    let roles = match state.accounts().profile(issued.session.user_id).await {
        Ok((_, roles)) => roles.into_iter().map(|role| role.name).collect(),
        Err(err) => {
            error!("failed to load roles for login response: {err}");
            Vec::new()
        }
    };

    (
        StatusCode::OK,
        Json(LoginResponse {
            message: "Login successful".to_string(),
            token: issued.token,
            user: LoginUser {
                id: issued.session.user_id.to_string(),
                email,
                roles,
            },
        }),
    )
        .into_response()
}
