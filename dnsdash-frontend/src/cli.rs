//! CLI argument parsing for the DNS dashboard.
//!
//! Parses the command line with clap into a [`CliConfig`], which is then
//! validated and turned into the [`BackendConfig`] the session runs with.

use std::time::Duration;

use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgMatches, Command};
use dnsdash_shared::{BackendConfig, PollingInterval};

/// CLI configuration structure containing all parsed command line arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliConfig {
    pub verbose: bool,
    pub backend_url: String,
    pub timeout_secs: u64,
    pub poll_interval_secs: i64,
}

impl CliConfig {
    /// Parse CLI arguments and create CliConfig
    pub fn from_args() -> Result<Self> {
        let matches = Self::build_cli().get_matches();
        Self::from_matches(&matches)
    }

    /// Create CliConfig from pre-parsed ArgMatches (useful for testing)
    pub fn from_matches(matches: &ArgMatches) -> Result<Self> {
        let verbose = matches.get_flag("verbose");

        let backend_url = matches
            .get_one::<String>("backend-url")
            .ok_or_else(|| anyhow::anyhow!("Backend URL is required"))?
            .clone();

        let timeout_secs = *matches
            .get_one::<u64>("timeout")
            .ok_or_else(|| anyhow::anyhow!("Request timeout is required"))?;

        let poll_interval_secs = *matches
            .get_one::<i64>("poll-interval")
            .ok_or_else(|| anyhow::anyhow!("Polling interval is required"))?;

        Ok(Self {
            verbose,
            backend_url,
            timeout_secs,
            poll_interval_secs,
        })
    }

    /// Build the clap Command structure
    pub fn build_cli() -> Command {
        Command::new("dnsdash-frontend")
            .version(env!("CARGO_PKG_VERSION"))
            .about("DNS traffic dashboard - live view of a DNS capture backend")
            .long_about(
                "Desktop dashboard for a DNS capture backend. Lists the backend's network \
                 interfaces, starts capture on the selected one and polls aggregated DNS \
                 statistics at a configurable interval.",
            )
            .arg(
                Arg::new("verbose")
                    .short('v')
                    .long("verbose")
                    .action(clap::ArgAction::SetTrue)
                    .help("Enable verbose logging"),
            )
            .arg(
                Arg::new("backend-url")
                    .long("backend-url")
                    .value_name("URL")
                    .help("Base URL of the capture backend")
                    .default_value(BackendConfig::DEFAULT_URL),
            )
            .arg(
                Arg::new("timeout")
                    .long("timeout")
                    .value_name("SECS")
                    .help("Timeout of every backend request, in seconds")
                    .value_parser(value_parser!(u64))
                    .default_value("10"),
            )
            .arg(
                Arg::new("poll-interval")
                    .long("poll-interval")
                    .value_name("SECS")
                    .help("Initial stats polling interval, in seconds (1-120)")
                    .value_parser(value_parser!(i64))
                    .allow_negative_numbers(true)
                    .default_value("10"),
            )
    }

    /// Validates the arguments and builds the backend configuration
    pub fn backend_config(&self) -> Result<BackendConfig> {
        let interval = PollingInterval::new(self.poll_interval_secs)
            .context("Invalid --poll-interval")?;

        let config = BackendConfig::new(self.backend_url.clone())
            .with_timeout(Duration::from_secs(self.timeout_secs))
            .with_initial_interval(interval);
        config.validate().context("Invalid backend configuration")?;

        Ok(config)
    }
}
