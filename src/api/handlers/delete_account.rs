use axum::{
    Json, extract::Extension, http::{HeaderMap, StatusCode}, response::IntoResponse,
};
use std::sync::Arc;

use super::{MessageResponse, error_reply, principal::require_auth};
use crate::access::{AccessState, store::Store};

#[utoipa::path(
    post,
    path= "/api/delete-account",
    responses (
        (status = 200, description = "Account deactivated and session expired", body = [MessageResponse]),
        (status = 401, description = "Missing or invalid session"),
    ),
    tag= "accounts"
)]
pub async fn delete_account<S: Store>(
    headers: HeaderMap,
    state: Extension<Arc<AccessState<S>>>,
) -> impl IntoResponse {
    let principal = match require_auth(&headers, state.sessions()).await {
        Ok(principal) => principal,
        Err(reply) => return reply.into_response(),
    };

    match state
        .accounts()
        .deactivate(principal.user.id, &principal.token)
        .await
    {
        Ok(()) => (
            StatusCode::OK,
            Json(MessageResponse {
                message: "Account deactivated and logged out".to_string(),
            }),
        )
            .into_response(),
        Err(err) => error_reply(&err).into_response(),
    }
}
