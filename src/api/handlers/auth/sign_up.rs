//! JSON sign-up.

use super::{
    relay::AuthRelay,
    session::set_cookie_headers,
    types::{SessionResponse, SignUpRequest},
};
use crate::api::handlers::error::{ErrorResponse, missing_payload};
use axum::{
    Json,
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
};

#[utoipa::path(
    post,
    path = "/v1/auth/sign-up",
    request_body = SignUpRequest,
    responses(
        (status = 201, description = "Account and session created, cookie set", body = SessionResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse),
        (status = 502, description = "Account created but sign-in failed", body = ErrorResponse),
        (status = 503, description = "Identity provider unavailable", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn sign_up(
    relay: Extension<AuthRelay>,
    payload: Option<Json<SignUpRequest>>,
) -> Response {
    let Some(Json(request)) = payload else {
        return missing_payload();
    };

    let (account, session) = match relay.sign_up(&request).await {
        Ok(created) => created,
        Err(err) => return err.into_response(),
    };

    match set_cookie_headers(&session.secret) {
        Ok(headers) => (
            StatusCode::CREATED,
            headers,
            Json(SessionResponse {
                user_id: account.id,
            }),
        )
            .into_response(),
        Err(response) => response,
    }
}
