//! Map validated CLI arguments to an action.

use crate::api::Backend;
use crate::cli::actions::{Action, server::Args};
use crate::cli::commands::{self, aggregator, identity};
use anyhow::{Context, Result};
use std::time::Duration;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches
        .get_one::<u16>(commands::ARG_PORT)
        .copied()
        .unwrap_or(8080);
    let backend: Backend = commands::required(matches, commands::ARG_BACKEND)?.parse()?;
    let upstream_timeout = Duration::from_secs(
        matches
            .get_one::<u64>(commands::ARG_UPSTREAM_TIMEOUT_SECONDS)
            .copied()
            .unwrap_or(10),
    );

    commands::validate(matches).map_err(|e| anyhow::anyhow!(e))?;

    let (identity, aggregator) = match backend {
        Backend::Live => (
            Some(identity::Options::parse(matches).context("identity provider arguments")?),
            Some(aggregator::Options::parse(matches).context("aggregator arguments")?),
        ),
        Backend::Memory => (None, None),
    };

    Ok(Action::Server(Args {
        port,
        backend,
        upstream_timeout,
        identity,
        aggregator,
    }))
}
