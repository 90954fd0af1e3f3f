use axum::{
    Json, extract::Extension, http::{HeaderMap, StatusCode}, response::IntoResponse,
};
use serde::Serialize;
use std::sync::Arc;

use super::{error_reply, principal::require_auth};
use crate::access::{AccessState, models::Action, store::Store};

const ELEMENT_ELEMENT: &str = "element";

#[derive(utoipa::ToSchema, Serialize, Debug)]
pub struct ElementResponse {
    id: String,
    code: String,
    name: String,
    description: String,
}

#[utoipa::path(
    get,
    path= "/api/elements",
    responses (
        (status = 200, description = "Protected business elements", body = [ElementResponse]),
        (status = 401, description = "Missing or invalid session"),
        (status = 403, description = "No role grants reading elements"),
    ),
    tag= "access"
)]
pub async fn list_elements<S: Store>(
    headers: HeaderMap,
    state: Extension<Arc<AccessState<S>>>,
) -> impl IntoResponse {
    let principal = match require_auth(&headers, state.sessions()).await {
        Ok(principal) => principal,
        Err(reply) => return reply.into_response(),
    };

    let decision = match state
        .authorizer()
        .authorize(&principal.user, ELEMENT_ELEMENT, Action::Read, false)
        .await
    {
        Ok(decision) => decision,
        Err(err) => return error_reply(&err).into_response(),
    };
    if !decision.is_allowed() {
        return (StatusCode::FORBIDDEN, "Forbidden".to_string()).into_response();
    }

    match state.rules().list_elements().await {
        Ok(elements) => {
            let body: Vec<ElementResponse> = elements
                .into_iter()
                .map(|element| ElementResponse {
                    id: element.id.to_string(),
                    code: element.code,
                    name: element.name,
                    description: element.description,
                })
                .collect();
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(err) => error_reply(&err).into_response(),
    }
}
