use crate::{
    aggregator::{Aggregator, memory::MemoryAggregator},
    identity::{IdentityProvider, ItemStore, memory::MemoryIdentity},
};
use anyhow::{Context, Result};
use axum::{
    Extension, Router,
    body::Body,
    extract::MatchedPath,
    http::{HeaderName, HeaderValue, Request},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr, sync::Arc};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{Span, info, info_span};
use ulid::Ulid;
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;

pub mod handlers;
mod openapi;
pub mod pages;

pub use openapi::openapi;

use handlers::{auth::AuthRelay, bank::LinkTokenRelay};
use pages::Pages;

/// Build the JSON router with all documented routes registered.
#[must_use]
pub fn router() -> OpenApiRouter {
    openapi::api_router()
}

/// Which provider implementations the relay talks to.
#[derive(ToSchema, Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Hosted identity provider and aggregator.
    Live,
    /// In-process providers for local development.
    Memory,
}

impl Backend {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Live => "live",
            Self::Memory => "memory",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Backend {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "live" => Ok(Self::Live),
            "memory" => Ok(Self::Memory),
            other => Err(anyhow::anyhow!("unknown backend: {other}")),
        }
    }
}

/// Provider clients the relays are built from.
#[derive(Clone)]
pub struct Providers {
    pub identity: Arc<dyn IdentityProvider>,
    pub items: Arc<dyn ItemStore>,
    pub aggregator: Arc<dyn Aggregator>,
    pub backend: Backend,
}

impl Providers {
    /// Fresh in-process providers.
    #[must_use]
    pub fn memory() -> Self {
        let identity = Arc::new(MemoryIdentity::new());
        Self {
            identity: identity.clone(),
            items: identity,
            aggregator: Arc::new(MemoryAggregator::new()),
            backend: Backend::Memory,
        }
    }
}

/// Assemble pages, JSON routes and layers.
///
/// # Errors
/// Returns an error if the page templates fail to load.
pub fn app(providers: Providers) -> Result<Router> {
    let auth = AuthRelay::new(providers.identity);
    let bank = LinkTokenRelay::new(providers.aggregator, providers.items);
    let pages = Arc::new(Pages::new().context("Failed to load page templates")?);

    let (router, _openapi) = router().split_for_parts();
    let app = router
        .route("/", get(pages::home))
        .route(
            "/sign-in",
            get(pages::form::sign_in_page).post(pages::form::sign_in_submit),
        )
        .route(
            "/sign-up",
            get(pages::form::sign_up_page).post(pages::form::sign_up_submit),
        )
        .route("/logout", post(pages::form::logout))
        .route("/link-bank", get(pages::link::link_bank))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(Extension(auth))
                .layer(Extension(bank))
                .layer(Extension(pages))
                .layer(Extension(providers.backend)),
        );

    Ok(app)
}

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(port: u16, providers: Providers) -> Result<()> {
    let backend = providers.backend;
    let app = app(providers)?;

    let listener = TcpListener::bind(format!("::0:{port}"))
        .await
        .with_context(|| format!("Failed to bind port {port}"))?;

    info!("Listening on [::]:{} ({} backend)", port, backend);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Gracefully shutdown");
            }
        })
        .await?;

    Ok(())
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}
