//! HTTP surface over the access core.
//!
//! Thin by design: handlers parse payloads, call into [`crate::access`],
//! and map the error taxonomy onto status codes. Nothing here holds state
//! beyond the shared [`AccessState`] extension.

use std::sync::Arc;

use anyhow::Result;
use axum::{
    Extension, Router,
    body::Body,
    extract::MatchedPath,
    http::{HeaderName, HeaderValue, Request},
    response::IntoResponse,
    routing::{get, post},
};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{Span, info, info_span};
use ulid::Ulid;

use crate::access::{AccessState, store::Store};

pub(crate) mod handlers;
mod openapi;

pub use openapi::openapi;

/// Build the full application router over any store implementation.
#[must_use]
pub fn router<S: Store>(state: Arc<AccessState<S>>) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health::<S>))
        .route("/api/register", post(handlers::register::register::<S>))
        .route("/api/login", post(handlers::login::login::<S>))
        .route("/api/logout", post(handlers::logout::logout::<S>))
        .route(
            "/api/profile",
            get(handlers::profile::get_profile::<S>).post(handlers::profile::update_profile::<S>),
        )
        .route(
            "/api/delete-account",
            post(handlers::delete_account::delete_account::<S>),
        )
        .route("/api/roles", get(handlers::roles::list_roles::<S>))
        .route("/api/elements", get(handlers::elements::list_elements::<S>))
        .route(
            "/api/business-data",
            get(handlers::business_data::business_data::<S>),
        )
        .route("/openapi.json", get(openapi_json))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &Request<Body>| {
                        HeaderValue::from_str(Ulid::new().to_string().as_str()).ok()
                    },
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(Extension(state)),
        )
}

async fn openapi_json() -> impl IntoResponse {
    axum::Json(openapi())
}

fn make_span(request: &Request<Body>) -> Span {
    // Prefer the matched route over the raw URI so span names stay low-cardinality.
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);
    info_span!("http.request", method = %request.method(), path = %path)
}

/// Start the server
/// # Errors
/// Return error if failed to bind or serve
pub async fn serve<S: Store>(port: u16, state: Arc<AccessState<S>>) -> Result<()> {
    let app = router(state);
    let listener = TcpListener::bind(format!("::0:{port}")).await?;
    info!(port, "listening");
    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}
