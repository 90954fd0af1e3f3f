use axum::{
    Json, extract::Extension, http::StatusCode, response::IntoResponse,
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use super::error_reply;
use crate::access::{
    AccessState,
    accounts::NewAccount,
    models::{normalize_email, valid_email},
    store::Store,
};

#[derive(utoipa::ToSchema, Deserialize, Debug)]
pub struct RegisterRequest {
    email: String,
    #[schema(value_type = String)]
    password: SecretString,
    first_name: String,
    last_name: Option<String>,
    #[schema(value_type = Option<String>)]
    role_id: Option<Uuid>,
}

#[derive(utoipa::ToSchema, Serialize, Debug)]
pub struct RegisterResponse {
    message: String,
    id: String,
}

#[utoipa::path(
    post,
    path= "/api/register",
    request_body = RegisterRequest,
    responses (
        (status = 201, description = "Registration successful", body = [RegisterResponse]),
        (status = 400, description = "Invalid email, missing fields, or unknown role"),
        (status = 409, description = "Email already registered"),
    ),
    tag= "accounts"
)]
pub async fn register<S: Store>(
    state: Extension<Arc<AccessState<S>>>,
    payload: Option<Json<RegisterRequest>>,
) -> impl IntoResponse {
    let Some(Json(request)) = payload else {
        return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response();
    };

    let email = normalize_email(&request.email);
    if !valid_email(&email) {
        return (StatusCode::BAD_REQUEST, "Invalid email".to_string()).into_response();
    }
    if request.first_name.trim().is_empty() {
        return (StatusCode::BAD_REQUEST, "Missing required fields".to_string()).into_response();
    }

    let new_account = NewAccount {
        email,
        password: request.password,
        first_name: request.first_name,
        last_name: request.last_name,
        role_id: request.role_id,
    };

    match state.accounts().register(new_account).await {
        Ok(user) => (
            StatusCode::CREATED,
            Json(RegisterResponse {
                message: "User registered successfully".to_string(),
                id: user.id.to_string(),
            }),
        )
            .into_response(),
        Err(err) => error_reply(&err).into_response(),
    }
}
