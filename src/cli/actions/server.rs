use crate::{
    aggregator::plaid::{PlaidClient, PlaidConfig},
    api::{self, Backend, Providers},
    cli::commands::{aggregator, identity},
    identity::appwrite::{AppwriteClient, AppwriteConfig},
};
use anyhow::{Context, Result};
use std::{sync::Arc, time::Duration};
use tracing::{debug, warn};

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub backend: Backend,
    pub upstream_timeout: Duration,
    pub identity: Option<identity::Options>,
    pub aggregator: Option<aggregator::Options>,
}

/// Build the provider clients for the selected backend.
///
/// # Errors
/// Returns an error if live credentials are missing or an HTTP client cannot be built.
pub fn providers(args: Args) -> Result<Providers> {
    match args.backend {
        Backend::Memory => {
            warn!("Using in-memory providers; accounts and sessions are lost on restart");
            Ok(Providers::memory())
        }
        Backend::Live => {
            let identity = args
                .identity
                .context("identity provider options are required for the live backend")?;
            let aggregator = args
                .aggregator
                .context("aggregator options are required for the live backend")?;

            let appwrite = Arc::new(AppwriteClient::new(
                AppwriteConfig::new(
                    identity.endpoint.as_str(),
                    identity.project_id,
                    identity.api_key,
                )
                .with_database_id(identity.database_id)
                .with_bank_collection_id(identity.bank_collection_id)
                .with_timeout(args.upstream_timeout),
            )?);

            let mut plaid_config = PlaidConfig::new(
                aggregator.environment,
                aggregator.client_id,
                aggregator.secret,
            )
            .with_client_name(aggregator.client_name)
            .with_products(aggregator.products)
            .with_country_codes(aggregator.country_codes)
            .with_timeout(args.upstream_timeout);
            if let Some(base_url) = aggregator.base_url {
                plaid_config = plaid_config.with_base_url(base_url.as_str());
            }
            debug!("Plaid config: {:?}", plaid_config);
            let plaid = Arc::new(PlaidClient::new(plaid_config)?);

            Ok(Providers {
                identity: appwrite.clone(),
                items: appwrite,
                aggregator: plaid,
                backend: Backend::Live,
            })
        }
    }
}

/// Execute the server action.
/// # Errors
/// Returns an error if the providers cannot be built or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let port = args.port;
    let providers = providers(args)?;
    let result = api::new(port, providers).await;
    crate::cli::telemetry::shutdown_tracer();
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_backend_builds_memory_providers() -> Result<()> {
        let providers = providers(Args {
            port: 8080,
            backend: Backend::Memory,
            upstream_timeout: Duration::from_secs(10),
            identity: None,
            aggregator: None,
        })?;
        assert_eq!(providers.backend, Backend::Memory);
        Ok(())
    }

    #[test]
    fn live_backend_without_options_fails() {
        let result = providers(Args {
            port: 8080,
            backend: Backend::Live,
            upstream_timeout: Duration::from_secs(10),
            identity: None,
            aggregator: None,
        });
        assert!(result.is_err());
    }
}
