use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;
use url::Url;

pub const ARG_APPWRITE_ENDPOINT: &str = "appwrite-endpoint";
pub const ARG_APPWRITE_PROJECT_ID: &str = "appwrite-project-id";
pub const ARG_APPWRITE_KEY: &str = "appwrite-key";
pub const ARG_APPWRITE_DATABASE_ID: &str = "appwrite-database-id";
pub const ARG_APPWRITE_BANK_COLLECTION_ID: &str = "appwrite-bank-collection-id";

/// Required for the live backend.
pub const REQUIRED: &[&str] = &[
    ARG_APPWRITE_ENDPOINT,
    ARG_APPWRITE_PROJECT_ID,
    ARG_APPWRITE_KEY,
];

pub struct Options {
    pub endpoint: Url,
    pub project_id: String,
    pub api_key: SecretString,
    pub database_id: String,
    pub bank_collection_id: String,
}

impl std::fmt::Debug for Options {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Options")
            .field("endpoint", &self.endpoint.as_str())
            .field("project_id", &self.project_id)
            .field("api_key", &"***")
            .field("database_id", &self.database_id)
            .field("bank_collection_id", &self.bank_collection_id)
            .finish()
    }
}

impl Options {
    /// Parse identity provider arguments from matches.
    ///
    /// # Errors
    /// Returns an error if a required argument is missing or the endpoint is not a URL.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let endpoint = super::required(matches, ARG_APPWRITE_ENDPOINT)?;
        let endpoint = Url::parse(&endpoint)
            .with_context(|| format!("invalid --{ARG_APPWRITE_ENDPOINT}: {endpoint}"))?;

        Ok(Self {
            endpoint,
            project_id: super::required(matches, ARG_APPWRITE_PROJECT_ID)?,
            api_key: SecretString::from(super::required(matches, ARG_APPWRITE_KEY)?),
            database_id: super::required(matches, ARG_APPWRITE_DATABASE_ID)?,
            bank_collection_id: super::required(matches, ARG_APPWRITE_BANK_COLLECTION_ID)?,
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_APPWRITE_ENDPOINT)
                .long(ARG_APPWRITE_ENDPOINT)
                .help("Appwrite API endpoint, example: https://cloud.appwrite.io/v1")
                .env("HORIZON_APPWRITE_ENDPOINT"),
        )
        .arg(
            Arg::new(ARG_APPWRITE_PROJECT_ID)
                .long(ARG_APPWRITE_PROJECT_ID)
                .help("Appwrite project id")
                .env("HORIZON_APPWRITE_PROJECT_ID"),
        )
        .arg(
            Arg::new(ARG_APPWRITE_KEY)
                .long(ARG_APPWRITE_KEY)
                .help("Appwrite server API key")
                .env("HORIZON_APPWRITE_KEY")
                .hide_env_values(true),
        )
        .arg(
            Arg::new(ARG_APPWRITE_DATABASE_ID)
                .long(ARG_APPWRITE_DATABASE_ID)
                .help("Appwrite database holding linked bank items")
                .env("HORIZON_APPWRITE_DATABASE_ID")
                .default_value("horizon"),
        )
        .arg(
            Arg::new(ARG_APPWRITE_BANK_COLLECTION_ID)
                .long(ARG_APPWRITE_BANK_COLLECTION_ID)
                .help("Appwrite collection for linked bank items")
                .env("HORIZON_APPWRITE_BANK_COLLECTION_ID")
                .default_value("banks"),
        )
}
