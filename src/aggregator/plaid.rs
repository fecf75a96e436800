//! Plaid REST client for `/link/token/create` and
//! `/item/public_token/exchange`.

use super::{AccessGrant, Aggregator, LinkToken, LinkUser};
use crate::{APP_USER_AGENT, Error};
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::{Client, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{Value, json};
use std::{fmt, str::FromStr, time::Duration};
use tracing::{debug, instrument};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaidEnvironment {
    Sandbox,
    Development,
    Production,
}

impl PlaidEnvironment {
    #[must_use]
    pub fn base_url(self) -> &'static str {
        match self {
            Self::Sandbox => "https://sandbox.plaid.com",
            Self::Development => "https://development.plaid.com",
            Self::Production => "https://production.plaid.com",
        }
    }
}

impl FromStr for PlaidEnvironment {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "sandbox" => Ok(Self::Sandbox),
            "development" => Ok(Self::Development),
            "production" => Ok(Self::Production),
            other => Err(anyhow!("unknown Plaid environment: {other}")),
        }
    }
}

#[derive(Clone)]
pub struct PlaidConfig {
    base_url: String,
    client_id: String,
    secret: SecretString,
    client_name: String,
    products: Vec<String>,
    country_codes: Vec<String>,
    language: String,
    timeout: Duration,
}

impl PlaidConfig {
    #[must_use]
    pub fn new(environment: PlaidEnvironment, client_id: String, secret: SecretString) -> Self {
        Self {
            base_url: environment.base_url().to_string(),
            client_id,
            secret,
            client_name: "Horizon".to_string(),
            products: vec!["auth".to_string()],
            country_codes: vec!["US".to_string()],
            language: "en".to_string(),
            timeout: Duration::from_secs(10),
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn with_client_name(mut self, client_name: String) -> Self {
        self.client_name = client_name;
        self
    }

    #[must_use]
    pub fn with_products(mut self, products: Vec<String>) -> Self {
        self.products = products;
        self
    }

    #[must_use]
    pub fn with_country_codes(mut self, country_codes: Vec<String>) -> Self {
        self.country_codes = country_codes;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl fmt::Debug for PlaidConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaidConfig")
            .field("base_url", &self.base_url)
            .field("client_id", &self.client_id)
            .field("secret", &"***")
            .field("client_name", &self.client_name)
            .field("products", &self.products)
            .field("country_codes", &self.country_codes)
            .field("language", &self.language)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Debug)]
pub struct PlaidClient {
    config: PlaidConfig,
    client: Client,
}

#[derive(Deserialize)]
struct LinkTokenBody {
    link_token: String,
    #[serde(default)]
    expiration: Option<String>,
}

#[derive(Deserialize)]
struct ExchangeBody {
    access_token: String,
    item_id: String,
}

#[derive(Deserialize, Default)]
struct PlaidErrorBody {
    #[serde(default)]
    error_type: String,
    #[serde(default)]
    error_code: String,
    #[serde(default)]
    error_message: String,
}

impl PlaidClient {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: PlaidConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(config.timeout)
            .build()
            .context("Failed to build Plaid HTTP client")?;
        Ok(Self { config, client })
    }

    async fn post(&self, path: &str, mut body: Value) -> Result<Response, Error> {
        body["client_id"] = json!(self.config.client_id);
        body["secret"] = json!(self.config.secret.expose_secret());
        let response = self
            .client
            .post(format!("{}{path}", self.config.base_url))
            .json(&body)
            .send()
            .await?;
        check(response).await
    }
}

async fn check(response: Response) -> Result<Response, Error> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body: PlaidErrorBody = response.json().await.unwrap_or_default();
    debug!(
        "plaid responded {}: {} {} {}",
        status, body.error_type, body.error_code, body.error_message
    );

    Err(match body.error_type.as_str() {
        "INVALID_INPUT" if body.error_code.contains("PUBLIC_TOKEN") => {
            Error::TokenRejected(body.error_code)
        }
        "RATE_LIMIT_EXCEEDED" | "API_ERROR" | "INSTITUTION_ERROR" => {
            Error::Unavailable(body.error_code)
        }
        _ if status.is_server_error() => Error::Unavailable(body.error_code),
        _ => Error::Upstream {
            status: status.as_u16(),
            message: format!("{}: {}", body.error_code, body.error_message),
        },
    })
}

#[async_trait]
impl Aggregator for PlaidClient {
    #[instrument(skip(self), fields(client_user_id = %user.client_user_id))]
    async fn create_link_token(&self, user: &LinkUser) -> Result<LinkToken, Error> {
        let body = json!({
            "client_name": self.config.client_name,
            "user": {
                "client_user_id": user.client_user_id,
                "legal_name": user.legal_name,
                "email_address": user.email,
            },
            "products": self.config.products,
            "country_codes": self.config.country_codes,
            "language": self.config.language,
        });
        let response = self.post("/link/token/create", body).await?;
        let body: LinkTokenBody = response.json().await?;
        Ok(LinkToken {
            link_token: body.link_token,
            expiration: body.expiration,
        })
    }

    /// Plaid binds the public token to the link token it came from, which was
    /// created for `client_user_id`; the exchange itself carries no user.
    #[instrument(skip_all)]
    async fn exchange_public_token(
        &self,
        public_token: &str,
        _user: &LinkUser,
    ) -> Result<AccessGrant, Error> {
        let response = self
            .post(
                "/item/public_token/exchange",
                json!({ "public_token": public_token }),
            )
            .await?;
        let body: ExchangeBody = response.json().await?;
        Ok(AccessGrant {
            access_token: SecretString::from(body.access_token),
            item_id: body.item_id,
        })
    }
}
