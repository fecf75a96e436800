//! # Horizon (authentication & bank-link relay)
//!
//! `horizon` is the server-side relay behind the Horizon personal-finance app.
//! It renders the sign-in/sign-up form, forwards credentials to an identity
//! provider, keeps the resulting session secret in an `HttpOnly` cookie and
//! relays bank-linking tokens to a financial data aggregator.
//!
//! ## Trust boundary
//!
//! Form input is validated on the server with the same schema the form uses;
//! the browser is never trusted for input shape. Passwords, session secrets and
//! access tokens are wrapped in [`secrecy::SecretString`] from the moment they
//! are parsed and never reach logs or rendered HTML.
//!
//! ## Failure model
//!
//! Every relay operation returns [`Result<T, Error>`](Error). Pages render the
//! failure reason next to the form; JSON endpoints return
//! `{"error": kind, "message": ...}` with a status derived from the kind.

pub mod aggregator;
pub mod api;
pub mod cli;
pub mod error;
pub mod identity;
pub mod widget;

pub use error::{Error, ErrorKind};

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
    }

    #[test]
    fn test_app_user_agent_format() {
        assert!(APP_USER_AGENT.starts_with(env!("CARGO_PKG_NAME")));
        assert!(APP_USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }
}
