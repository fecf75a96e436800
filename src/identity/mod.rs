//! Identity provider seam.
//!
//! The relay never hashes passwords or mints sessions itself; it forwards
//! credentials to an [`IdentityProvider`] and keeps whatever opaque secret
//! comes back. [`ItemStore`] is the backing store that remembers which bank
//! items belong to which account.

pub mod appwrite;
pub mod memory;

use crate::Error;
use async_trait::async_trait;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

/// Provider-side account, safe to return to the browser.
#[derive(ToSchema, Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Account {
    pub id: String,
    pub email: String,
    pub name: String,
}

/// Input for [`IdentityProvider::create_account`].
pub struct NewAccount {
    pub id: String,
    pub email: String,
    pub password: SecretString,
    pub name: String,
}

impl fmt::Debug for NewAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewAccount")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("password", &"***")
            .field("name", &self.name)
            .finish()
    }
}

/// An authenticated session. `secret` is what goes into the cookie.
#[derive(Clone)]
pub struct Session {
    pub id: String,
    pub user_id: String,
    pub secret: SecretString,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("user_id", &self.user_id)
            .field("secret", &"***")
            .finish()
    }
}

/// Durable aggregator credentials associated with an account.
pub struct BankItem {
    pub user_id: String,
    pub item_id: String,
    pub access_token: SecretString,
}

impl fmt::Debug for BankItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BankItem")
            .field("user_id", &self.user_id)
            .field("item_id", &self.item_id)
            .field("access_token", &"***")
            .finish()
    }
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// # Errors
    /// [`Error::AccountExists`] when the email is taken.
    async fn create_account(&self, account: &NewAccount) -> Result<Account, Error>;

    /// # Errors
    /// [`Error::InvalidCredentials`] for an unknown email or wrong password.
    async fn create_session(&self, email: &str, password: &SecretString)
    -> Result<Session, Error>;

    /// # Errors
    /// [`Error::NoSession`] when the secret is unknown, expired or revoked.
    async fn current_user(&self, secret: &SecretString) -> Result<Account, Error>;

    /// # Errors
    /// [`Error::NoSession`] when there is nothing to delete.
    async fn delete_session(&self, secret: &SecretString) -> Result<(), Error>;
}

#[async_trait]
pub trait ItemStore: Send + Sync {
    /// # Errors
    /// Returns an error if the backing store rejects the record.
    async fn associate_item(&self, item: &BankItem) -> Result<(), Error>;
}
