//! Server-side auth relay.
//!
//! Validates input against the form schema, forwards credentials to the
//! identity provider and hands back whatever session the provider minted.
//! Cookie handling stays in [`super::session`].

use super::{
    types::{SignInRequest, SignUpRequest},
    validation::{AuthMode, validate},
};
use crate::{
    Error,
    identity::{Account, IdentityProvider, NewAccount, Session},
};
use secrecy::SecretString;
use std::sync::Arc;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

#[derive(Clone)]
pub struct AuthRelay {
    identity: Arc<dyn IdentityProvider>,
}

impl AuthRelay {
    #[must_use]
    pub fn new(identity: Arc<dyn IdentityProvider>) -> Self {
        Self { identity }
    }

    /// Create an email/password session.
    ///
    /// # Errors
    /// [`Error::Validation`] for malformed input, [`Error::InvalidCredentials`]
    /// when the provider refuses the pair.
    #[instrument(skip_all)]
    pub async fn sign_in(&self, request: &SignInRequest) -> Result<Session, Error> {
        validate(AuthMode::SignIn, request).map_err(Error::Validation)?;
        let session = self
            .identity
            .create_session(&normalize_email(&request.email), &request.password)
            .await?;
        debug!("session created for user {}", session.user_id);
        Ok(session)
    }

    /// Create the account, then sign in with the same credentials.
    ///
    /// There is no rollback: if the session cannot be created the account
    /// stays and [`Error::PartialSignUp`] tells the caller to sign in.
    ///
    /// # Errors
    /// [`Error::Validation`], [`Error::AccountExists`] or whatever the
    /// provider returns for account creation.
    #[instrument(skip_all)]
    pub async fn sign_up(&self, request: &SignUpRequest) -> Result<(Account, Session), Error> {
        validate(AuthMode::SignUp, request).map_err(Error::Validation)?;
        let email = normalize_email(&request.email);
        let new_account = NewAccount {
            id: Uuid::new_v4().simple().to_string(),
            email: email.clone(),
            password: request.password.clone(),
            name: request.display_name(),
        };
        let account = self.identity.create_account(&new_account).await?;
        debug!("account created: {}", account.id);

        match self.identity.create_session(&email, &request.password).await {
            Ok(session) => Ok((account, session)),
            Err(err) => {
                warn!(
                    "account {} created but session creation failed: {err}",
                    account.id
                );
                Err(Error::PartialSignUp {
                    account_id: account.id,
                    source: Box::new(err),
                })
            }
        }
    }

    /// Invalidate the current session at the provider.
    ///
    /// Missing or already revoked sessions are not an error.
    ///
    /// # Errors
    /// Transport or provider failures.
    #[instrument(skip_all)]
    pub async fn logout(&self, secret: Option<&SecretString>) -> Result<(), Error> {
        let Some(secret) = secret else {
            return Ok(());
        };
        match self.identity.delete_session(secret).await {
            Ok(()) | Err(Error::NoSession) => Ok(()),
            Err(err) => Err(err),
        }
    }

    /// Resolve the session secret into its account.
    ///
    /// # Errors
    /// Transport or provider failures; an unknown secret is `Ok(None)`.
    #[instrument(skip_all)]
    pub async fn logged_in_user(
        &self,
        secret: Option<&SecretString>,
    ) -> Result<Option<Account>, Error> {
        let Some(secret) = secret else {
            return Ok(None);
        };
        match self.identity.current_user(secret).await {
            Ok(account) => Ok(Some(account)),
            Err(Error::NoSession) => Ok(None),
            Err(err) => Err(err),
        }
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::memory::MemoryIdentity;
    use async_trait::async_trait;

    fn relay() -> (AuthRelay, Arc<MemoryIdentity>) {
        let identity = Arc::new(MemoryIdentity::new());
        (AuthRelay::new(identity.clone()), identity)
    }

    fn sign_up_request(email: &str) -> SignUpRequest {
        SignUpRequest {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            address1: "12 Analytical Row".to_string(),
            city: "London".to_string(),
            state: "NY".to_string(),
            postal_code: "11101".to_string(),
            date_of_birth: "1815-12-10".to_string(),
            ssn: SecretString::from("1234".to_string()),
            email: email.to_string(),
            password: SecretString::from("secret123".to_string()),
        }
    }

    fn sign_in_request(email: &str, password: &str) -> SignInRequest {
        SignInRequest {
            email: email.to_string(),
            password: SecretString::from(password.to_string()),
        }
    }

    #[tokio::test]
    async fn sign_up_then_logged_in_user_returns_email() -> anyhow::Result<()> {
        let (relay, _) = relay();
        let (account, session) = relay.sign_up(&sign_up_request("Ada@Example.com ")).await?;
        assert_eq!(account.name, "Ada Lovelace");
        let user = relay.logged_in_user(Some(&session.secret)).await?;
        assert_eq!(user.map(|u| u.email), Some("ada@example.com".to_string()));
        Ok(())
    }

    #[tokio::test]
    async fn invalid_credentials_create_no_session() -> anyhow::Result<()> {
        let (relay, identity) = relay();
        relay.sign_up(&sign_up_request("ada@example.com")).await?;
        let before = identity.session_count().await;

        let result = relay
            .sign_in(&sign_in_request("ada@example.com", "wrong-password"))
            .await;
        assert!(matches!(result, Err(Error::InvalidCredentials)));
        let result = relay
            .sign_in(&sign_in_request("nobody@example.com", "secret123"))
            .await;
        assert!(matches!(result, Err(Error::InvalidCredentials)));
        assert_eq!(identity.session_count().await, before);
        Ok(())
    }

    #[tokio::test]
    async fn invalid_input_never_reaches_provider() {
        let (relay, identity) = relay();
        let result = relay.sign_in(&sign_in_request("not-an-email", "short")).await;
        let Err(Error::Validation(errors)) = result else {
            panic!("expected validation error");
        };
        assert_eq!(errors.len(), 2);
        assert_eq!(identity.session_count().await, 0);
    }

    #[tokio::test]
    async fn duplicate_sign_up_is_account_exists() -> anyhow::Result<()> {
        let (relay, _) = relay();
        relay.sign_up(&sign_up_request("ada@example.com")).await?;
        let result = relay.sign_up(&sign_up_request("ADA@example.com")).await;
        assert!(matches!(result, Err(Error::AccountExists)));
        Ok(())
    }

    #[tokio::test]
    async fn logout_is_idempotent() -> anyhow::Result<()> {
        let (relay, _) = relay();
        let (_, session) = relay.sign_up(&sign_up_request("ada@example.com")).await?;

        relay.logout(Some(&session.secret)).await?;
        assert_eq!(relay.logged_in_user(Some(&session.secret)).await?, None);

        relay.logout(Some(&session.secret)).await?;
        relay.logout(None).await?;
        assert_eq!(relay.logged_in_user(None).await?, None);
        Ok(())
    }

    struct SessionlessIdentity(MemoryIdentity);

    #[async_trait]
    impl IdentityProvider for SessionlessIdentity {
        async fn create_account(&self, account: &NewAccount) -> Result<Account, Error> {
            self.0.create_account(account).await
        }

        async fn create_session(
            &self,
            _email: &str,
            _password: &SecretString,
        ) -> Result<Session, Error> {
            Err(Error::Unavailable("session endpoint down".to_string()))
        }

        async fn current_user(&self, secret: &SecretString) -> Result<Account, Error> {
            self.0.current_user(secret).await
        }

        async fn delete_session(&self, secret: &SecretString) -> Result<(), Error> {
            self.0.delete_session(secret).await
        }
    }

    #[tokio::test]
    async fn session_failure_after_account_creation_is_partial() -> anyhow::Result<()> {
        let relay = AuthRelay::new(Arc::new(SessionlessIdentity(MemoryIdentity::new())));
        let result = relay.sign_up(&sign_up_request("ada@example.com")).await;
        let Err(Error::PartialSignUp { account_id, source }) = result else {
            panic!("expected partial sign-up");
        };
        assert!(!account_id.is_empty());
        assert!(matches!(*source, Error::Unavailable(_)));

        // the account stays, so a retry hits the duplicate check
        let retry = relay.sign_up(&sign_up_request("ada@example.com")).await;
        assert!(matches!(retry, Err(Error::AccountExists)));
        Ok(())
    }
}
