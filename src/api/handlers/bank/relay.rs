//! Link-token relay.
//!
//! Requests link tokens scoped to the signed-in account and exchanges the
//! public token the hosted widget returns. Access tokens go straight to the
//! [`ItemStore`] and are never returned to the browser.

use super::types::LinkedItem;
use crate::{
    Error,
    aggregator::{Aggregator, LinkToken, LinkUser},
    api::handlers::auth::validation::ValidationErrors,
    identity::{Account, BankItem, ItemStore},
};
use std::sync::Arc;
use tracing::{info, instrument};

#[derive(Clone)]
pub struct LinkTokenRelay {
    aggregator: Arc<dyn Aggregator>,
    items: Arc<dyn ItemStore>,
}

impl LinkTokenRelay {
    #[must_use]
    pub fn new(aggregator: Arc<dyn Aggregator>, items: Arc<dyn ItemStore>) -> Self {
        Self { aggregator, items }
    }

    /// # Errors
    /// Whatever the aggregator returns.
    #[instrument(skip_all, fields(user_id = %user.id))]
    pub async fn create_link_token(&self, user: &Account) -> Result<LinkToken, Error> {
        self.aggregator.create_link_token(&link_user(user)).await
    }

    /// Exchange the public token and remember the item for `user`.
    ///
    /// # Errors
    /// [`Error::Validation`] for an empty token, [`Error::TokenRejected`] for
    /// unknown, reused or foreign tokens, store errors otherwise.
    #[instrument(skip_all, fields(user_id = %user.id))]
    pub async fn exchange_public_token(
        &self,
        public_token: &str,
        user: &Account,
    ) -> Result<LinkedItem, Error> {
        let public_token = public_token.trim();
        if public_token.is_empty() {
            return Err(Error::Validation(ValidationErrors::single(
                "public_token",
                "This field is required",
            )));
        }

        let grant = self
            .aggregator
            .exchange_public_token(public_token, &link_user(user))
            .await?;
        self.items
            .associate_item(&BankItem {
                user_id: user.id.clone(),
                item_id: grant.item_id.clone(),
                access_token: grant.access_token,
            })
            .await?;
        info!("linked item {} for user {}", grant.item_id, user.id);
        Ok(LinkedItem {
            item_id: grant.item_id,
        })
    }
}

fn link_user(user: &Account) -> LinkUser {
    LinkUser {
        client_user_id: user.id.clone(),
        legal_name: user.name.clone(),
        email: user.email.clone(),
    }
}
