//! JSON sign-in.

use super::{
    relay::AuthRelay,
    session::set_cookie_headers,
    types::{SessionResponse, SignInRequest},
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
    path = "/v1/auth/sign-in",
    request_body = SignInRequest,
    responses(
        (status = 200, description = "Session created, cookie set", body = SessionResponse),
        (status = 401, description = "Invalid email or password", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse),
        (status = 503, description = "Identity provider unavailable", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn sign_in(
    relay: Extension<AuthRelay>,
    payload: Option<Json<SignInRequest>>,
) -> Response {
    let Some(Json(request)) = payload else {
        return missing_payload();
    };

    let session = match relay.sign_in(&request).await {
        Ok(session) => session,
        Err(err) => return err.into_response(),
    };

    match set_cookie_headers(&session.secret) {
        Ok(headers) => (
            StatusCode::OK,
            headers,
            Json(SessionResponse {
                user_id: session.user_id,
            }),
        )
            .into_response(),
        Err(response) => response,
    }
}
