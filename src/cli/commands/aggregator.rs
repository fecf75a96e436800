use crate::aggregator::plaid::PlaidEnvironment;
use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;
use url::Url;

pub const ARG_PLAID_CLIENT_ID: &str = "plaid-client-id";
pub const ARG_PLAID_SECRET: &str = "plaid-secret";
pub const ARG_PLAID_ENV: &str = "plaid-env";
pub const ARG_PLAID_BASE_URL: &str = "plaid-base-url";
pub const ARG_PLAID_CLIENT_NAME: &str = "plaid-client-name";
pub const ARG_PLAID_PRODUCTS: &str = "plaid-products";
pub const ARG_PLAID_COUNTRY_CODES: &str = "plaid-country-codes";

/// Required for the live backend.
pub const REQUIRED: &[&str] = &[ARG_PLAID_CLIENT_ID, ARG_PLAID_SECRET];

pub struct Options {
    pub environment: PlaidEnvironment,
    pub base_url: Option<Url>,
    pub client_id: String,
    pub secret: SecretString,
    pub client_name: String,
    pub products: Vec<String>,
    pub country_codes: Vec<String>,
}

impl std::fmt::Debug for Options {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Options")
            .field("environment", &self.environment)
            .field("base_url", &self.base_url.as_ref().map(Url::as_str))
            .field("client_id", &self.client_id)
            .field("secret", &"***")
            .field("client_name", &self.client_name)
            .field("products", &self.products)
            .field("country_codes", &self.country_codes)
            .finish()
    }
}

fn list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

impl Options {
    /// Parse aggregator arguments from matches.
    ///
    /// # Errors
    /// Returns an error if a required argument is missing or malformed.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let environment: PlaidEnvironment = super::required(matches, ARG_PLAID_ENV)?.parse()?;
        let base_url = matches
            .get_one::<String>(ARG_PLAID_BASE_URL)
            .filter(|value| !value.trim().is_empty())
            .map(|value| {
                Url::parse(value).with_context(|| format!("invalid --{ARG_PLAID_BASE_URL}: {value}"))
            })
            .transpose()?;

        let products = list(&super::required(matches, ARG_PLAID_PRODUCTS)?);
        if products.is_empty() {
            anyhow::bail!("--{ARG_PLAID_PRODUCTS} must name at least one product");
        }

        Ok(Self {
            environment,
            base_url,
            client_id: super::required(matches, ARG_PLAID_CLIENT_ID)?,
            secret: SecretString::from(super::required(matches, ARG_PLAID_SECRET)?),
            client_name: super::required(matches, ARG_PLAID_CLIENT_NAME)?,
            products,
            country_codes: list(&super::required(matches, ARG_PLAID_COUNTRY_CODES)?),
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_PLAID_CLIENT_ID)
                .long(ARG_PLAID_CLIENT_ID)
                .help("Plaid client id")
                .env("HORIZON_PLAID_CLIENT_ID"),
        )
        .arg(
            Arg::new(ARG_PLAID_SECRET)
                .long(ARG_PLAID_SECRET)
                .help("Plaid secret for the selected environment")
                .env("HORIZON_PLAID_SECRET")
                .hide_env_values(true),
        )
        .arg(
            Arg::new(ARG_PLAID_ENV)
                .long(ARG_PLAID_ENV)
                .help("Plaid environment")
                .env("HORIZON_PLAID_ENV")
                .default_value("sandbox")
                .value_parser(["sandbox", "development", "production"]),
        )
        .arg(
            Arg::new(ARG_PLAID_BASE_URL)
                .long(ARG_PLAID_BASE_URL)
                .help("Override the Plaid API host (takes precedence over --plaid-env)")
                .env("HORIZON_PLAID_BASE_URL"),
        )
        .arg(
            Arg::new(ARG_PLAID_CLIENT_NAME)
                .long(ARG_PLAID_CLIENT_NAME)
                .help("Application name shown in the linking widget")
                .env("HORIZON_PLAID_CLIENT_NAME")
                .default_value("Horizon"),
        )
        .arg(
            Arg::new(ARG_PLAID_PRODUCTS)
                .long(ARG_PLAID_PRODUCTS)
                .help("Comma separated Plaid products")
                .env("HORIZON_PLAID_PRODUCTS")
                .default_value("auth"),
        )
        .arg(
            Arg::new(ARG_PLAID_COUNTRY_CODES)
                .long(ARG_PLAID_COUNTRY_CODES)
                .help("Comma separated country codes")
                .env("HORIZON_PLAID_COUNTRY_CODES")
                .default_value("US"),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_trims_and_drops_empty() {
        assert_eq!(list(" auth, transactions ,,"), vec!["auth", "transactions"]);
        assert!(list("").is_empty());
    }
}
