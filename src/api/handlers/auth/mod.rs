//! Auth handlers and supporting modules.
//!
//! Credentials are validated against [`validation`] before anything reaches
//! the identity provider. The provider owns accounts and sessions; the relay
//! only keeps the session secret in the `session-secret` cookie.

pub mod relay;
pub mod session;
pub(crate) mod sign_in;
pub(crate) mod sign_up;
pub mod types;
pub mod validation;

pub use relay::AuthRelay;
