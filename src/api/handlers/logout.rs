use axum::{
    Json, extract::Extension, http::{HeaderMap, StatusCode}, response::IntoResponse,
};
use std::sync::Arc;

use super::{MessageResponse, error_reply, principal::require_auth};
use crate::access::{AccessState, store::Store};

#[utoipa::path(
    post,
    path= "/api/logout",
    responses (
        (status = 200, description = "Session expired in place", body = [MessageResponse]),
        (status = 401, description = "Missing or invalid session"),
    ),
    tag= "auth"
)]
pub async fn logout<S: Store>(
    headers: HeaderMap,
    state: Extension<Arc<AccessState<S>>>,
) -> impl IntoResponse {
    let principal = match require_auth(&headers, state.sessions()).await {
        Ok(principal) => principal,
        Err(reply) => return reply.into_response(),
    };

    match state.sessions().invalidate(&principal.token).await {
        Ok(()) => (
            StatusCode::OK,
            Json(MessageResponse {
                message: "Logged out successfully".to_string(),
            }),
        )
            .into_response(),
        Err(err) => error_reply(&err).into_response(),
    }
}
