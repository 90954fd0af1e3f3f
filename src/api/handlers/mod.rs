pub mod business_data;
pub mod delete_account;
pub mod elements;
pub mod health;
pub mod login;
pub mod logout;
pub mod principal;
pub mod profile;
pub mod register;
pub mod roles;

use axum::http::StatusCode;
use serde::Serialize;
use tracing::error;
use utoipa::ToSchema;

use crate::access::error::Error;

#[derive(Serialize, ToSchema, Debug)]
pub struct MessageResponse {
    pub message: String,
}

pub(crate) const fn error_status(err: &Error) -> StatusCode {
    match err {
        Error::InvalidCredentials | Error::InvalidSession | Error::SessionExpired => {
            StatusCode::UNAUTHORIZED
        }
        Error::InactiveAccount => StatusCode::FORBIDDEN,
        Error::DuplicateEmail | Error::DuplicateRule => StatusCode::CONFLICT,
        Error::InvalidRole | Error::UnknownElement | Error::PasswordMismatch => {
            StatusCode::BAD_REQUEST
        }
        Error::StoreTimeout | Error::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Map a core error onto a transport reply.
///
/// Domain outcomes surface their own message; infrastructure failures are
/// logged here and answered with a generic body so internals never leak.
pub(crate) fn error_reply(err: &Error) -> (StatusCode, String) {
    if err.is_domain() {
        (error_status(err), err.to_string())
    } else {
        error!("access core failure: {err}");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error".to_string(),
        )
    }
}
