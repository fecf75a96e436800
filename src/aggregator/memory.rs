//! In-process aggregator with single-use token semantics.
//!
//! Issuing a new link token for a user revokes the previous one. A public
//! token can only be obtained from a live link token
//! ([`MemoryAggregator::complete_link`], standing in for the hosted widget) and
//! can only be exchanged once, by the user the link token was issued to.

use super::{AccessGrant, Aggregator, LinkToken, LinkUser};
use crate::Error;
use async_trait::async_trait;
use secrecy::SecretString;
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Default)]
struct State {
    // link token -> client_user_id
    link_tokens: HashMap<String, String>,
    // client_user_id -> most recent link token
    latest: HashMap<String, String>,
    // public token -> client_user_id
    public_tokens: HashMap<String, String>,
}

#[derive(Default)]
pub struct MemoryAggregator {
    state: Mutex<State>,
}

impl MemoryAggregator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume a link token the way the hosted widget does on success and
    /// return the public token it hands back.
    ///
    /// # Errors
    /// [`Error::TokenRejected`] if the link token is unknown or was replaced.
    pub async fn complete_link(&self, link_token: &str) -> Result<String, Error> {
        let mut state = self.state.lock().await;
        let user_id = state
            .link_tokens
            .remove(link_token)
            .ok_or_else(|| Error::TokenRejected("INVALID_LINK_TOKEN".to_string()))?;
        state.latest.retain(|_, token| token.as_str() != link_token);
        let public_token = format!("public-memory-{}", Uuid::new_v4().simple());
        state.public_tokens.insert(public_token.clone(), user_id);
        Ok(public_token)
    }
}

#[async_trait]
impl Aggregator for MemoryAggregator {
    async fn create_link_token(&self, user: &LinkUser) -> Result<LinkToken, Error> {
        let mut state = self.state.lock().await;
        let token = format!("link-memory-{}", Uuid::new_v4().simple());
        if let Some(previous) = state
            .latest
            .insert(user.client_user_id.clone(), token.clone())
        {
            state.link_tokens.remove(&previous);
        }
        state
            .link_tokens
            .insert(token.clone(), user.client_user_id.clone());
        Ok(LinkToken {
            link_token: token,
            expiration: None,
        })
    }

    async fn exchange_public_token(
        &self,
        public_token: &str,
        user: &LinkUser,
    ) -> Result<AccessGrant, Error> {
        let mut state = self.state.lock().await;
        match state.public_tokens.get(public_token).cloned() {
            Some(owner) if owner == user.client_user_id => {
                state.public_tokens.remove(public_token);
            }
            // a foreign token is refused without being consumed
            Some(_) => {
                return Err(Error::TokenRejected(
                    "PUBLIC_TOKEN_OWNER_MISMATCH".to_string(),
                ));
            }
            None => return Err(Error::TokenRejected("INVALID_PUBLIC_TOKEN".to_string())),
        }
        Ok(AccessGrant {
            access_token: SecretString::from(format!(
                "access-memory-{}",
                Uuid::new_v4().simple()
            )),
            item_id: format!("item-{}", Uuid::new_v4().simple()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str) -> LinkUser {
        LinkUser {
            client_user_id: id.to_string(),
            legal_name: "Ada Lovelace".to_string(),
            email: "ada@example.com".to_string(),
        }
    }

    #[tokio::test]
    async fn new_token_revokes_previous_for_same_user() -> anyhow::Result<()> {
        let aggregator = MemoryAggregator::new();
        let first = aggregator.create_link_token(&user("u1")).await?;
        let second = aggregator.create_link_token(&user("u1")).await?;
        assert_ne!(first.link_token, second.link_token);

        assert!(matches!(
            aggregator.complete_link(&first.link_token).await,
            Err(Error::TokenRejected(_))
        ));
        assert!(aggregator.complete_link(&second.link_token).await.is_ok());
        Ok(())
    }

    #[tokio::test]
    async fn tokens_of_other_users_stay_valid() -> anyhow::Result<()> {
        let aggregator = MemoryAggregator::new();
        let first = aggregator.create_link_token(&user("u1")).await?;
        aggregator.create_link_token(&user("u2")).await?;
        assert!(aggregator.complete_link(&first.link_token).await.is_ok());
        Ok(())
    }

    #[tokio::test]
    async fn public_token_exchanges_once() -> anyhow::Result<()> {
        let aggregator = MemoryAggregator::new();
        let link = aggregator.create_link_token(&user("u1")).await?;
        let public_token = aggregator.complete_link(&link.link_token).await?;

        let grant = aggregator
            .exchange_public_token(&public_token, &user("u1"))
            .await?;
        assert!(grant.item_id.starts_with("item-"));

        assert!(matches!(
            aggregator.exchange_public_token(&public_token, &user("u1")).await,
            Err(Error::TokenRejected(_))
        ));
        // a link token is single-use too
        assert!(aggregator.complete_link(&link.link_token).await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn public_token_belongs_to_its_user() -> anyhow::Result<()> {
        let aggregator = MemoryAggregator::new();
        let link = aggregator.create_link_token(&user("alice")).await?;
        let public_token = aggregator.complete_link(&link.link_token).await?;

        assert!(matches!(
            aggregator.exchange_public_token(&public_token, &user("mallory")).await,
            Err(Error::TokenRejected(code)) if code == "PUBLIC_TOKEN_OWNER_MISMATCH"
        ));
        // the owner can still use it
        assert!(
            aggregator
                .exchange_public_token(&public_token, &user("alice"))
                .await
                .is_ok()
        );
        Ok(())
    }
}
