//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

use imgharvest_core::{
    CONNECT_TIMEOUT_SECS, DEFAULT_MAX_ROUTINES, DEFAULT_SEARCH_ENDPOINT, HarvestConfig,
    HttpTimeouts, READ_TIMEOUT_SECS,
};

/// Search for images and download every result concurrently.
///
/// Results are written to the output directory; an existing file is never
/// overwritten, a numeric suffix is added instead.
#[derive(Parser, Debug)]
#[command(name = "imgharvest")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Search query (required, must not be empty)
    #[arg(long)]
    pub query: String,

    /// Directory for downloaded files [default: system temp dir]
    #[arg(short = 'o', long)]
    pub output_dir: Option<PathBuf>,

    /// Maximum number of concurrent downloads (must be at least 1)
    #[arg(short = 'c', long, default_value_t = DEFAULT_MAX_ROUTINES, allow_negative_numbers = true)]
    pub max_routines: i64,

    /// Search API access key
    #[arg(long, env = "IMGHARVEST_ACCESS_KEY", hide_env_values = true)]
    pub access_key: Option<String>,

    /// Search endpoint URL
    #[arg(long, default_value = DEFAULT_SEARCH_ENDPOINT)]
    pub endpoint: String,

    /// HTTP connect timeout in seconds
    #[arg(long, default_value_t = CONNECT_TIMEOUT_SECS, value_parser = clap::value_parser!(u64).range(1..))]
    pub connect_timeout: u64,

    /// HTTP request timeout in seconds
    #[arg(long, default_value_t = READ_TIMEOUT_SECS, value_parser = clap::value_parser!(u64).range(1..))]
    pub read_timeout: u64,
}

impl Args {
    /// Builds the library run configuration.
    pub fn to_config(&self) -> HarvestConfig {
        HarvestConfig {
            output_dir: self.output_dir.clone().unwrap_or_else(std::env::temp_dir),
            max_routines: self.max_routines,
            query: self.query.clone(),
            access_key: self.access_key.clone(),
            endpoint: self.endpoint.clone(),
            timeouts: HttpTimeouts {
                connect_secs: self.connect_timeout,
                read_secs: self.read_timeout,
            },
        }
    }
}
