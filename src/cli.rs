//! Command-line interface parsing for sheetdash
//!
//! This module handles parsing of CLI arguments using clap and merges them
//! with the config file into the startup configuration.

use std::path::PathBuf;

use clap::Parser;
use thiserror::Error;

use crate::config::{ConfigError, FileConfig, Overrides, Settings};

/// Error types for CLI startup
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration could not be loaded or is incomplete
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// `--country` names an empty market
    #[error("Invalid country filter: country must not be empty")]
    EmptyCountry,
}

/// sheetdash - Terminal dashboard for a hosted performance spreadsheet
#[derive(Parser, Debug)]
#[command(name = "sheetdash")]
#[command(about = "Terminal dashboard for a hosted daily performance spreadsheet")]
#[command(version)]
pub struct Cli {
    /// JSON config file (defaults to the platform config directory)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Link to the spreadsheet or to a CSV export
    #[arg(long, env = "SHEETDASH_SHEET_URL", value_name = "URL")]
    pub sheet_url: Option<String>,

    /// Worksheet (tab) to read instead of the first one
    #[arg(long, value_name = "NAME")]
    pub worksheet: Option<String>,

    /// Seconds before cached data is refetched
    #[arg(long, value_name = "SECS")]
    pub ttl_secs: Option<u64>,

    /// OAuth access token sent as a bearer token
    #[arg(long, env = "SHEETDASH_ACCESS_TOKEN", hide_env_values = true, value_name = "TOKEN")]
    pub access_token: Option<String>,

    /// API key sent as the `key` query parameter
    #[arg(long, env = "SHEETDASH_API_KEY", hide_env_values = true, value_name = "KEY")]
    pub api_key: Option<String>,

    /// Print the rows as JSON and exit instead of opening the dashboard
    ///
    /// Examples:
    ///   sheetdash --json
    ///   sheetdash --json --country UK
    #[arg(long)]
    pub json: bool,

    /// Only print rows for this country (with --json)
    #[arg(long, value_name = "COUNTRY", requires = "json")]
    pub country: Option<String>,

    /// Log file (defaults to the platform cache directory)
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

/// Configuration derived from CLI arguments for application startup
#[derive(Debug, Clone)]
pub struct StartupConfig {
    /// Resolved sheet and cache settings
    pub settings: Settings,
    /// Whether to dump JSON instead of running the dashboard
    pub json: bool,
    /// Country restriction for the JSON dump
    pub country: Option<String>,
    /// Explicit log file location
    pub log_file: Option<PathBuf>,
}

impl StartupConfig {
    /// Creates a StartupConfig from parsed CLI arguments.
    ///
    /// Reads the file named by `--config`, or the default config file if it
    /// exists.
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        let file = match &cli.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::load_default()?,
        };
        Self::from_parts(cli, file)
    }

    /// Merges CLI arguments over an already loaded config file
    pub fn from_parts(cli: &Cli, file: FileConfig) -> Result<Self, CliError> {
        let country = match &cli.country {
            Some(country) if country.trim().is_empty() => return Err(CliError::EmptyCountry),
            Some(country) => Some(country.trim().to_string()),
            None => None,
        };

        let overrides = Overrides {
            sheet_url: cli.sheet_url.clone(),
            worksheet: cli.worksheet.clone(),
            ttl_secs: cli.ttl_secs,
            access_token: cli.access_token.clone(),
            api_key: cli.api_key.clone(),
        };

        Ok(StartupConfig {
            settings: Settings::resolve(file, overrides)?,
            json: cli.json,
            country,
            log_file: cli.log_file.clone(),
        })
    }
}
