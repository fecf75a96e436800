pub mod aggregator;
pub mod identity;
pub mod logging;

use anyhow::Result;
use clap::{
    Arg, ArgMatches, ColorChoice, Command,
    builder::styling::{AnsiColor, Effects, Styles},
};

pub const ARG_PORT: &str = "port";
pub const ARG_BACKEND: &str = "backend";
pub const ARG_UPSTREAM_TIMEOUT_SECONDS: &str = "upstream-timeout-seconds";

/// Non-empty value of `id`, or a "missing required argument" error.
///
/// # Errors
/// Returns an error if the argument is absent or blank.
pub fn required(matches: &ArgMatches, id: &str) -> Result<String> {
    match matches.get_one::<String>(id) {
        Some(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        _ => anyhow::bail!("missing required argument: --{id}"),
    }
}

/// Validate that the live backend has its provider credentials.
///
/// # Errors
/// Returns an error string naming the first missing argument.
pub fn validate(matches: &ArgMatches) -> Result<(), String> {
    if matches.get_one::<String>(ARG_BACKEND).map(String::as_str) != Some("live") {
        return Ok(());
    }

    for id in identity::REQUIRED.iter().chain(aggregator::REQUIRED) {
        let present = matches
            .get_one::<String>(id)
            .is_some_and(|value| !value.trim().is_empty());
        if !present {
            return Err(format!(
                "Missing required argument: --{id} (required for the live backend)"
            ));
        }
    }
    Ok(())
}

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    let command = Command::new("horizon")
        .about("Authentication and bank-link relay")
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new(ARG_PORT)
                .short('p')
                .long(ARG_PORT)
                .help("Port to listen on")
                .default_value("8080")
                .env("HORIZON_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new(ARG_BACKEND)
                .long(ARG_BACKEND)
                .help("Provider backend: hosted services or in-process memory")
                .env("HORIZON_BACKEND")
                .default_value("live")
                .value_parser(["live", "memory"]),
        )
        .arg(
            Arg::new(ARG_UPSTREAM_TIMEOUT_SECONDS)
                .long(ARG_UPSTREAM_TIMEOUT_SECONDS)
                .help("Timeout for each identity provider and aggregator call")
                .env("HORIZON_UPSTREAM_TIMEOUT_SECONDS")
                .default_value("10")
                .value_parser(clap::value_parser!(u64).range(1..)),
        );

    let command = identity::with_args(command);
    let command = aggregator::with_args(command);
    logging::with_args(command)
}
