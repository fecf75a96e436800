//! Request/response types for auth endpoints and form posts.
//!
//! Every field defaults to empty so a partial form post reaches validation
//! instead of failing deserialization. Defaults are set per field; the
//! schema never needs to serialize a request.

use super::validation::{Field, FieldSource};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(ToSchema, Deserialize, Debug)]
pub struct SignInRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default = "empty_secret")]
    #[schema(value_type = String, format = Password)]
    pub password: SecretString,
}

#[derive(ToSchema, Deserialize, Debug)]
pub struct SignUpRequest {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub address1: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub postal_code: String,
    #[serde(default)]
    pub date_of_birth: String,
    #[serde(default = "empty_secret")]
    #[schema(value_type = String, format = Password)]
    pub ssn: SecretString,
    #[serde(default)]
    pub email: String,
    #[serde(default = "empty_secret")]
    #[schema(value_type = String, format = Password)]
    pub password: SecretString,
}

fn empty_secret() -> SecretString {
    SecretString::from(String::new())
}

impl Default for SignInRequest {
    fn default() -> Self {
        Self {
            email: String::new(),
            password: empty_secret(),
        }
    }
}

impl Default for SignUpRequest {
    fn default() -> Self {
        Self {
            first_name: String::new(),
            last_name: String::new(),
            address1: String::new(),
            city: String::new(),
            state: String::new(),
            postal_code: String::new(),
            date_of_birth: String::new(),
            ssn: empty_secret(),
            email: String::new(),
            password: empty_secret(),
        }
    }
}

impl SignUpRequest {
    /// Display name handed to the identity provider.
    #[must_use]
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
    }
}

impl FieldSource for SignInRequest {
    fn value(&self, field: Field) -> &str {
        match field {
            Field::Email => self.email.as_str(),
            Field::Password => self.password.expose_secret(),
            _ => "",
        }
    }
}

impl FieldSource for SignUpRequest {
    fn value(&self, field: Field) -> &str {
        match field {
            Field::FirstName => self.first_name.as_str(),
            Field::LastName => self.last_name.as_str(),
            Field::Address1 => self.address1.as_str(),
            Field::City => self.city.as_str(),
            Field::State => self.state.as_str(),
            Field::PostalCode => self.postal_code.as_str(),
            Field::DateOfBirth => self.date_of_birth.as_str(),
            Field::Ssn => self.ssn.expose_secret(),
            Field::Email => self.email.as_str(),
            Field::Password => self.password.expose_secret(),
        }
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SessionResponse {
    pub user_id: String,
}
