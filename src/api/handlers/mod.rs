//! JSON route handlers.

pub mod auth;
pub mod bank;
pub mod error;
pub mod health;
