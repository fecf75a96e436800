//! JSON rendering of [`Error`].

use crate::{Error, ErrorKind, api::handlers::auth::validation::ValidationErrors};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::{debug, error, warn};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Debug)]
pub struct ErrorResponse {
    pub error: ErrorKind,
    pub message: String,
    /// Per-field messages, only present for `validation`.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub fields: Option<ValidationErrors>,
}

impl From<&Error> for ErrorResponse {
    fn from(err: &Error) -> Self {
        Self {
            error: err.kind(),
            message: err.user_message(),
            fields: match err {
                Error::Validation(errors) => Some(errors.clone()),
                _ => None,
            },
        }
    }
}

#[must_use]
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::InvalidCredentials | ErrorKind::NoSession => StatusCode::UNAUTHORIZED,
        ErrorKind::AccountExists => StatusCode::CONFLICT,
        ErrorKind::TokenRejected => StatusCode::BAD_REQUEST,
        ErrorKind::PartialSignUp | ErrorKind::Upstream => StatusCode::BAD_GATEWAY,
        ErrorKind::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
    }
}

/// Log at a level matching who is at fault.
pub(crate) fn log_error(err: &Error) {
    match err.kind() {
        ErrorKind::Unavailable | ErrorKind::Upstream | ErrorKind::PartialSignUp => {
            error!("relay failure: {err}");
        }
        ErrorKind::TokenRejected => warn!("{err}"),
        _ => debug!("request rejected: {err}"),
    }
}

/// Response for a JSON endpoint called without a parsable body.
pub(crate) fn missing_payload() -> Response {
    Error::Validation(ValidationErrors::single("body", "Missing payload")).into_response()
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        log_error(&self);
        let status = status_for(self.kind());
        (status, Json(ErrorResponse::from(&self))).into_response()
    }
}
