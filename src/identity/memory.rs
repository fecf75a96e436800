//! In-process identity provider for local development and tests.
//!
//! Behaves like the hosted provider from the relay's point of view: unique
//! emails, opaque random session secrets, `current` session deletion.

use super::{Account, BankItem, IdentityProvider, ItemStore, NewAccount, Session};
use crate::Error;
use async_trait::async_trait;
use base64ct::{Base64UrlUnpadded, Encoding};
use rand::{RngCore, rngs::OsRng};
use secrecy::{ExposeSecret, SecretString};
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

struct StoredAccount {
    account: Account,
    password: SecretString,
}

struct StoredSession {
    id: String,
    user_id: String,
}

#[derive(Default)]
struct State {
    // keyed by normalized email
    accounts: HashMap<String, StoredAccount>,
    // keyed by session secret
    sessions: HashMap<String, StoredSession>,
    items: Vec<(String, String)>,
}

#[derive(Default)]
pub struct MemoryIdentity {
    state: Mutex<State>,
}

impl MemoryIdentity {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live sessions, across all accounts.
    pub async fn session_count(&self) -> usize {
        self.state.lock().await.sessions.len()
    }

    /// Item ids associated with `user_id`, in link order.
    pub async fn items_for(&self, user_id: &str) -> Vec<String> {
        self.state
            .lock()
            .await
            .items
            .iter()
            .filter(|(owner, _)| owner == user_id)
            .map(|(_, item_id)| item_id.clone())
            .collect()
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// 32 random bytes, URL-safe base64.
fn generate_secret() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    Base64UrlUnpadded::encode_string(&bytes)
}

#[async_trait]
impl IdentityProvider for MemoryIdentity {
    async fn create_account(&self, account: &NewAccount) -> Result<Account, Error> {
        let key = normalize_email(&account.email);
        let mut state = self.state.lock().await;
        if state.accounts.contains_key(&key) {
            return Err(Error::AccountExists);
        }
        let created = Account {
            id: account.id.clone(),
            email: key.clone(),
            name: account.name.clone(),
        };
        state.accounts.insert(
            key,
            StoredAccount {
                account: created.clone(),
                password: account.password.clone(),
            },
        );
        debug!("memory identity created account {}", created.id);
        Ok(created)
    }

    async fn create_session(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<Session, Error> {
        let mut state = self.state.lock().await;
        let user_id = match state.accounts.get(&normalize_email(email)) {
            Some(stored) if stored.password.expose_secret() == password.expose_secret() => {
                stored.account.id.clone()
            }
            _ => return Err(Error::InvalidCredentials),
        };
        let secret = generate_secret();
        let id = Uuid::new_v4().simple().to_string();
        state.sessions.insert(
            secret.clone(),
            StoredSession {
                id: id.clone(),
                user_id: user_id.clone(),
            },
        );
        Ok(Session {
            id,
            user_id,
            secret: SecretString::from(secret),
        })
    }

    async fn current_user(&self, secret: &SecretString) -> Result<Account, Error> {
        let state = self.state.lock().await;
        let session = state
            .sessions
            .get(secret.expose_secret())
            .ok_or(Error::NoSession)?;
        state
            .accounts
            .values()
            .find(|stored| stored.account.id == session.user_id)
            .map(|stored| stored.account.clone())
            .ok_or(Error::NoSession)
    }

    async fn delete_session(&self, secret: &SecretString) -> Result<(), Error> {
        let mut state = self.state.lock().await;
        match state.sessions.remove(secret.expose_secret()) {
            Some(session) => {
                debug!("memory identity deleted session {}", session.id);
                Ok(())
            }
            None => Err(Error::NoSession),
        }
    }
}

#[async_trait]
impl ItemStore for MemoryIdentity {
    async fn associate_item(&self, item: &BankItem) -> Result<(), Error> {
        let mut state = self.state.lock().await;
        state
            .items
            .push((item.user_id.clone(), item.item_id.clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_account(email: &str) -> NewAccount {
        NewAccount {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            password: SecretString::from("secret123".to_string()),
            name: "Ada Lovelace".to_string(),
        }
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected_case_insensitively() {
        let identity = MemoryIdentity::new();
        assert!(identity.create_account(&new_account("a@b.com")).await.is_ok());
        let result = identity.create_account(&new_account(" A@B.com ")).await;
        assert!(matches!(result, Err(Error::AccountExists)));
    }

    #[tokio::test]
    async fn sessions_resolve_and_revoke() -> anyhow::Result<()> {
        let identity = MemoryIdentity::new();
        let account = identity.create_account(&new_account("a@b.com")).await?;
        let session = identity
            .create_session("a@b.com", &SecretString::from("secret123".to_string()))
            .await?;
        assert_eq!(session.user_id, account.id);
        assert_eq!(identity.current_user(&session.secret).await?, account);

        identity.delete_session(&session.secret).await?;
        assert!(matches!(
            identity.current_user(&session.secret).await,
            Err(Error::NoSession)
        ));
        assert!(matches!(
            identity.delete_session(&session.secret).await,
            Err(Error::NoSession)
        ));
        Ok(())
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_email_look_the_same() -> anyhow::Result<()> {
        let identity = MemoryIdentity::new();
        identity.create_account(&new_account("a@b.com")).await?;
        let wrong = identity
            .create_session("a@b.com", &SecretString::from("nope-nope".to_string()))
            .await;
        let unknown = identity
            .create_session("x@y.com", &SecretString::from("secret123".to_string()))
            .await;
        assert!(matches!(wrong, Err(Error::InvalidCredentials)));
        assert!(matches!(unknown, Err(Error::InvalidCredentials)));
        assert_eq!(identity.session_count().await, 0);
        Ok(())
    }

    #[test]
    fn generated_secrets_are_distinct() {
        let first = generate_secret();
        let second = generate_secret();
        assert_ne!(first, second);
        assert_eq!(Base64UrlUnpadded::decode_vec(&first).map(|b| b.len()).ok(), Some(32));
    }
}
