//! Demo protected resource: the end-to-end proof of the guard + engine
//! composition. `?mine=true` asks for the caller's own records and only
//! needs the plain read grant; without it the `_all` variant is required.

use axum::{
    Json, extract::{Extension, Query}, http::{HeaderMap, StatusCode}, response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{error_reply, principal::require_auth};
use crate::access::{AccessState, models::Action, store::Store};

const BUSINESS_ELEMENT: &str = "business_data";

#[derive(Deserialize, Debug)]
pub struct BusinessDataQuery {
    #[serde(default)]
    mine: bool,
}

#[derive(utoipa::ToSchema, Serialize, Debug)]
pub struct BusinessDataResponse {
    message: String,
    scope: String,
    records: Vec<String>,
}

#[utoipa::path(
    get,
    path= "/api/business-data",
    params(
        ("mine" = bool, Query, description = "Restrict to records owned by the caller"),
    ),
    responses (
        (status = 200, description = "Business data access granted", body = [BusinessDataResponse]),
        (status = 401, description = "Missing or invalid session"),
        (status = 403, description = "The role set does not grant this read"),
    ),
    tag= "access"
)]
pub async fn business_data<S: Store>(
    headers: HeaderMap,
    query: Query<BusinessDataQuery>,
    state: Extension<Arc<AccessState<S>>>,
) -> impl IntoResponse {
    let principal = match require_auth(&headers, state.sessions()).await {
        Ok(principal) => principal,
        Err(reply) => return reply.into_response(),
    };

    let decision = match state
        .authorizer()
        .authorize(&principal.user, BUSINESS_ELEMENT, Action::Read, query.mine)
        .await
    {
        Ok(decision) => decision,
        Err(err) => return error_reply(&err).into_response(),
    };
    if !decision.is_allowed() {
        return (StatusCode::FORBIDDEN, "Forbidden".to_string()).into_response();
    }

    let scope = if query.mine { "own" } else { "all" };
    (
        StatusCode::OK,
        Json(BusinessDataResponse {
            message: "Business data access granted".to_string(),
            scope: scope.to_string(),
            records: vec![
                format!("{scope} record 1"),
                format!("{scope} record 2"),
            ],
        }),
    )
        .into_response()
}
