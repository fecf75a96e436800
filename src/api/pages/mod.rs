//! Server-rendered pages: the unified auth form, home and the bank-link step.

pub mod form;
pub mod link;

use crate::api::handlers::auth::{AuthRelay, session::extract_session_secret};
use anyhow::{Context, Result};
use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
};
use minijinja::{Environment, context};
use serde::Serialize;
use std::sync::Arc;
use tracing::error;

const TEMPLATES: &[(&str, &str)] = &[
    ("base.html", include_str!("../../../templates/base.html")),
    ("form.html", include_str!("../../../templates/form.html")),
    ("home.html", include_str!("../../../templates/home.html")),
    (
        "link_bank.html",
        include_str!("../../../templates/link_bank.html"),
    ),
];

/// Compiled page templates. Names ending in `.html` are auto-escaped.
pub struct Pages {
    env: Environment<'static>,
}

impl Pages {
    /// # Errors
    /// Returns an error if a bundled template does not parse.
    pub fn new() -> Result<Self> {
        let mut env = Environment::new();
        for &(name, source) in TEMPLATES {
            env.add_template(name, source)
                .with_context(|| format!("Failed to load template {name}"))?;
        }
        Ok(Self { env })
    }

    /// Render `name` with `ctx`, logging and hiding template failures.
    pub(crate) fn render<S: Serialize>(&self, status: StatusCode, name: &str, ctx: S) -> Response {
        match self.env.get_template(name).and_then(|t| t.render(ctx)) {
            Ok(html) => (status, Html(html)).into_response(),
            Err(err) => {
                error!("Failed to render {name}: {err:#}");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

pub(crate) type SharedPages = Extension<Arc<Pages>>;

/// GET `/`: the signed-in landing page.
pub async fn home(headers: HeaderMap, relay: Extension<AuthRelay>, pages: SharedPages) -> Response {
    let secret = extract_session_secret(&headers);
    match relay.logged_in_user(secret.as_ref()).await {
        Ok(Some(user)) => pages.render(StatusCode::OK, "home.html", context! { user }),
        Ok(None) => Redirect::to("/sign-in").into_response(),
        Err(err) => form::render_failure(&pages, &err),
    }
}
