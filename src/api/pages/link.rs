//! GET `/link-bank`: the "Link Account" step.
//!
//! The server drives the widget up to `token-ready` (or `failed`); the page
//! script waits for the hosted SDK before enabling the button, opens it and
//! posts the public token to `/v1/bank/exchange`.

use super::{SharedPages, form::render_failure};
use crate::{
    api::handlers::{
        auth::{AuthRelay, session::extract_session_secret},
        bank::LinkTokenRelay,
    },
    widget::{LinkState, LinkWidget},
};
use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
};
use minijinja::context;
use tracing::error;

/// Hosted aggregator SDK.
pub const LINK_SDK_URL: &str = "https://cdn.plaid.com/link/v2/stable/link-initialize.js";

pub async fn link_bank(
    headers: HeaderMap,
    auth: Extension<AuthRelay>,
    bank: Extension<LinkTokenRelay>,
    pages: SharedPages,
) -> Response {
    let secret = extract_session_secret(&headers);
    let user = match auth.logged_in_user(secret.as_ref()).await {
        Ok(Some(user)) => user,
        Ok(None) => return Redirect::to("/sign-in").into_response(),
        Err(err) => return render_failure(&pages, &err),
    };

    let mut widget = LinkWidget::new();
    if let Err(err) = widget.load_token(&bank, &user).await {
        error!("link widget: {err}");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    let (link_token, message, status) = match widget.state() {
        LinkState::TokenReady { token } => (Some(token.link_token.clone()), None, StatusCode::OK),
        LinkState::Failed { message } => {
            (None, Some(message.clone()), StatusCode::SERVICE_UNAVAILABLE)
        }
        _ => (None, None, StatusCode::OK),
    };

    pages.render(
        status,
        "link_bank.html",
        context! {
            state => widget.state().name(),
            link_token,
            message,
            button_enabled => widget.button_enabled(),
            sdk_url => LINK_SDK_URL,
        },
    )
}
