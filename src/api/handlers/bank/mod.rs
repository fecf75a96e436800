//! Bank-link endpoints.
//!
//! Both endpoints require a live session; the link token is always scoped to
//! the signed-in account.

pub mod relay;
pub mod types;

pub use relay::LinkTokenRelay;

use crate::{
    aggregator::LinkToken,
    api::handlers::{
        auth::{AuthRelay, session::require_user},
        error::{ErrorResponse, missing_payload},
    },
    widget::LinkWidget,
};
use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::{debug, error};
use types::{ExchangeRequest, LinkedItem};

#[utoipa::path(
    post,
    path = "/v1/bank/link-token",
    responses(
        (status = 200, description = "Link token issued", body = LinkToken),
        (status = 401, description = "No active session", body = ErrorResponse),
        (status = 503, description = "Aggregator unavailable", body = ErrorResponse)
    ),
    tag = "bank"
)]
pub async fn link_token(
    headers: HeaderMap,
    auth: Extension<AuthRelay>,
    bank: Extension<LinkTokenRelay>,
) -> Response {
    let user = match require_user(&headers, &auth).await {
        Ok(user) => user,
        Err(err) => return err.into_response(),
    };
    match bank.create_link_token(&user).await {
        Ok(token) => (StatusCode::OK, Json(token)).into_response(),
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/v1/bank/exchange",
    request_body = ExchangeRequest,
    responses(
        (status = 200, description = "Public token exchanged", body = LinkedItem),
        (status = 400, description = "Token expired or already used", body = ErrorResponse),
        (status = 401, description = "No active session", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    tag = "bank"
)]
pub async fn exchange(
    headers: HeaderMap,
    auth: Extension<AuthRelay>,
    bank: Extension<LinkTokenRelay>,
    payload: Option<Json<ExchangeRequest>>,
) -> Response {
    let user = match require_user(&headers, &auth).await {
        Ok(user) => user,
        Err(err) => return err.into_response(),
    };
    let Some(Json(request)) = payload else {
        return missing_payload();
    };
    // the hosted widget handed the token to the page; finish its flow here
    let mut widget = LinkWidget::with_public_token(request.public_token);
    let outcome = match widget.exchange(&bank, &user).await {
        Ok(outcome) => outcome,
        Err(err) => {
            error!("link widget: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };
    debug!("link widget finished in {}", widget.state().name());
    match outcome {
        Ok(item) => (StatusCode::OK, Json(item)).into_response(),
        Err(err) => err.into_response(),
    }
}
