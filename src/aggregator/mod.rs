//! Financial data aggregator seam: link tokens and public-token exchange.

pub mod memory;
pub mod plaid;

use crate::Error;
use async_trait::async_trait;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

/// The user a link token is scoped to.
#[derive(Clone, Debug)]
pub struct LinkUser {
    /// Stable identifier; the account id from the identity provider.
    pub client_user_id: String,
    pub legal_name: String,
    pub email: String,
}

/// Single-use token that initializes the hosted linking widget.
#[derive(ToSchema, Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct LinkToken {
    pub link_token: String,
    pub expiration: Option<String>,
}

/// Durable credentials returned by the public-token exchange.
pub struct AccessGrant {
    pub access_token: SecretString,
    pub item_id: String,
}

impl fmt::Debug for AccessGrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessGrant")
            .field("access_token", &"***")
            .field("item_id", &self.item_id)
            .finish()
    }
}

#[async_trait]
pub trait Aggregator: Send + Sync {
    /// # Errors
    /// Returns an error if the aggregator refuses or cannot be reached.
    async fn create_link_token(&self, user: &LinkUser) -> Result<LinkToken, Error>;

    /// Exchange a public token minted for `user`.
    ///
    /// # Errors
    /// [`Error::TokenRejected`] for unknown, expired or already used tokens,
    /// or tokens minted for a different user where the backend can tell.
    async fn exchange_public_token(
        &self,
        public_token: &str,
        user: &LinkUser,
    ) -> Result<AccessGrant, Error>;
}
