//! Appwrite REST client for accounts, email/password sessions and the
//! bank-item collection.

use super::{Account, BankItem, IdentityProvider, ItemStore, NewAccount, Session};
use crate::{APP_USER_AGENT, Error};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use std::{fmt, time::Duration};
use tracing::{debug, instrument};

const HEADER_PROJECT: &str = "X-Appwrite-Project";
const HEADER_KEY: &str = "X-Appwrite-Key";
const HEADER_SESSION: &str = "X-Appwrite-Session";

#[derive(Clone)]
pub struct AppwriteConfig {
    endpoint: String,
    project_id: String,
    api_key: SecretString,
    database_id: String,
    bank_collection_id: String,
    timeout: Duration,
}

impl AppwriteConfig {
    #[must_use]
    pub fn new(endpoint: &str, project_id: String, api_key: SecretString) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            project_id,
            api_key,
            database_id: "horizon".to_string(),
            bank_collection_id: "banks".to_string(),
            timeout: Duration::from_secs(10),
        }
    }

    #[must_use]
    pub fn with_database_id(mut self, database_id: String) -> Self {
        self.database_id = database_id;
        self
    }

    #[must_use]
    pub fn with_bank_collection_id(mut self, collection_id: String) -> Self {
        self.bank_collection_id = collection_id;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl fmt::Debug for AppwriteConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppwriteConfig")
            .field("endpoint", &self.endpoint)
            .field("project_id", &self.project_id)
            .field("api_key", &"***")
            .field("database_id", &self.database_id)
            .field("bank_collection_id", &self.bank_collection_id)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Debug)]
pub struct AppwriteClient {
    config: AppwriteConfig,
    client: Client,
}

#[derive(Deserialize)]
struct UserBody {
    #[serde(rename = "$id")]
    id: String,
    email: String,
    #[serde(default)]
    name: String,
}

#[derive(Deserialize)]
struct SessionBody {
    #[serde(rename = "$id")]
    id: String,
    #[serde(rename = "userId")]
    user_id: String,
    #[serde(default)]
    secret: String,
}

#[derive(Deserialize, Default)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

impl From<UserBody> for Account {
    fn from(body: UserBody) -> Self {
        Self {
            id: body.id,
            email: body.email,
            name: body.name,
        }
    }
}

impl AppwriteClient {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: AppwriteConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(config.timeout)
            .build()
            .context("Failed to build Appwrite HTTP client")?;
        Ok(Self { config, client })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.endpoint)
    }

    /// Requests authenticated with the server API key.
    fn admin(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header(HEADER_PROJECT, &self.config.project_id)
            .header(HEADER_KEY, self.config.api_key.expose_secret())
    }

    /// Requests acting as the user that owns `secret`.
    fn as_session(&self, builder: RequestBuilder, secret: &SecretString) -> RequestBuilder {
        builder
            .header(HEADER_PROJECT, &self.config.project_id)
            .header(HEADER_SESSION, secret.expose_secret())
    }
}

/// Map a non-success response onto the relay's error kinds.
///
/// `unauthorized` is what a `401` means for the calling operation.
async fn check(response: Response, unauthorized: Error) -> Result<Response, Error> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body: ErrorBody = response.json().await.unwrap_or_default();
    debug!("appwrite responded {}: {}", status, body.message);

    Err(match status {
        StatusCode::UNAUTHORIZED => unauthorized,
        StatusCode::CONFLICT => Error::AccountExists,
        StatusCode::TOO_MANY_REQUESTS
        | StatusCode::BAD_GATEWAY
        | StatusCode::SERVICE_UNAVAILABLE
        | StatusCode::GATEWAY_TIMEOUT => Error::Unavailable(body.message),
        _ => Error::Upstream {
            status: status.as_u16(),
            message: body.message,
        },
    })
}

#[async_trait]
impl IdentityProvider for AppwriteClient {
    #[instrument(skip(self))]
    async fn create_account(&self, account: &NewAccount) -> Result<Account, Error> {
        let request = self.admin(self.client.post(self.url("/account"))).json(&json!({
            "userId": account.id,
            "email": account.email,
            "password": account.password.expose_secret(),
            "name": account.name,
        }));
        let response = check(request.send().await?, Error::Upstream {
            status: 401,
            message: "Appwrite rejected the API key".to_string(),
        })
        .await?;
        let body: UserBody = response.json().await?;
        Ok(body.into())
    }

    #[instrument(skip(self, password))]
    async fn create_session(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<Session, Error> {
        let request = self
            .admin(self.client.post(self.url("/account/sessions/email")))
            .json(&json!({
                "email": email,
                "password": password.expose_secret(),
            }));
        let response = check(request.send().await?, Error::InvalidCredentials).await?;
        let body: SessionBody = response.json().await?;
        if body.secret.is_empty() {
            return Err(Error::Upstream {
                status: 200,
                message: "session created without a secret; is the API key set?".to_string(),
            });
        }
        Ok(Session {
            id: body.id,
            user_id: body.user_id,
            secret: SecretString::from(body.secret),
        })
    }

    #[instrument(skip_all)]
    async fn current_user(&self, secret: &SecretString) -> Result<Account, Error> {
        let request = self.as_session(self.client.get(self.url("/account")), secret);
        let response = check(request.send().await?, Error::NoSession).await?;
        let body: UserBody = response.json().await?;
        Ok(body.into())
    }

    #[instrument(skip_all)]
    async fn delete_session(&self, secret: &SecretString) -> Result<(), Error> {
        let request = self.as_session(
            self.client.delete(self.url("/account/sessions/current")),
            secret,
        );
        let response = request.send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(Error::NoSession);
        }
        check(response, Error::NoSession).await?;
        Ok(())
    }
}

#[async_trait]
impl ItemStore for AppwriteClient {
    #[instrument(skip(self, item), fields(user_id = %item.user_id, item_id = %item.item_id))]
    async fn associate_item(&self, item: &BankItem) -> Result<(), Error> {
        let path = format!(
            "/databases/{}/collections/{}/documents",
            self.config.database_id, self.config.bank_collection_id
        );
        let request = self.admin(self.client.post(self.url(&path))).json(&json!({
            "documentId": "unique()",
            "data": {
                "userId": item.user_id,
                "itemId": item.item_id,
                "accessToken": item.access_token.expose_secret(),
            },
        }));
        check(request.send().await?, Error::Upstream {
            status: 401,
            message: "Appwrite rejected the API key".to_string(),
        })
        .await?;
        Ok(())
    }
}
