//! Typed failure reasons shared by the relays and the provider clients.

use crate::api::handlers::auth::validation::ValidationErrors;
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

#[derive(Debug, Error)]
pub enum Error {
    #[error("some fields are invalid")]
    Validation(ValidationErrors),
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("an account with this email already exists")]
    AccountExists,
    #[error("no active session")]
    NoSession,
    #[error("token rejected: {0}")]
    TokenRejected(String),
    #[error("account {account_id} was created but signing in failed, please sign in")]
    PartialSignUp {
        account_id: String,
        #[source]
        source: Box<Error>,
    },
    #[error("service unavailable: {0}")]
    Unavailable(String),
    #[error("upstream error ({status}): {message}")]
    Upstream { status: u16, message: String },
}

/// Stable, machine-readable error identifier returned in JSON bodies.
#[derive(ToSchema, Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    InvalidCredentials,
    AccountExists,
    NoSession,
    TokenRejected,
    PartialSignUp,
    Unavailable,
    Upstream,
}

impl Error {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::InvalidCredentials => ErrorKind::InvalidCredentials,
            Self::AccountExists => ErrorKind::AccountExists,
            Self::NoSession => ErrorKind::NoSession,
            Self::TokenRejected(_) => ErrorKind::TokenRejected,
            Self::PartialSignUp { .. } => ErrorKind::PartialSignUp,
            Self::Unavailable(_) => ErrorKind::Unavailable,
            Self::Upstream { .. } => ErrorKind::Upstream,
        }
    }

    /// Text safe to show next to the form.
    ///
    /// Upstream bodies are not echoed to users; they only reach the logs.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Unavailable(_) => {
                "The service is temporarily unavailable, please try again.".to_string()
            }
            Self::Upstream { .. } => "Something went wrong, please try again.".to_string(),
            Self::TokenRejected(_) => {
                "The bank link expired or was already used, please try again.".to_string()
            }
            other => {
                let mut message = other.to_string();
                if let Some(first) = message.get_mut(0..1) {
                    first.make_ascii_uppercase();
                }
                message
            }
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() || err.is_request() {
            Self::Unavailable(err.without_url().to_string())
        } else if let Some(status) = err.status() {
            Self::Upstream {
                status: status.as_u16(),
                message: err.without_url().to_string(),
            }
        } else {
            Self::Upstream {
                status: 0,
                message: err.without_url().to_string(),
            }
        }
    }
}
