use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};

/// Command-line arguments for the Solar Sentinel binary.
#[derive(Debug, Parser)]
#[command(
    name = "solar-sentinel",
    version,
    about = "UV and weather forecast caching proxy"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(
        long = "config-file",
        env = "SOLAR_SENTINEL_CONFIG_FILE",
        value_name = "PATH"
    )]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the forecast HTTP service.
    Serve(Box<ServeArgs>),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Emit JSON formatted logs.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the forecast provider endpoint.
    #[arg(long = "upstream-base-url", value_name = "URL")]
    pub upstream_base_url: Option<String>,

    #[arg(long = "upstream-timeout-seconds", value_name = "SECONDS")]
    pub upstream_timeout_seconds: Option<u64>,

    /// Override how often expired cache entries are swept.
    #[arg(long = "cache-sweep-interval-seconds", value_name = "SECONDS")]
    pub cache_sweep_interval_seconds: Option<u64>,

    /// Minimum entry age before a cache hit triggers a background refresh.
    #[arg(long = "cache-refresh-after-seconds", value_name = "SECONDS")]
    pub cache_refresh_after_seconds: Option<u64>,

    #[arg(long = "forecast-default-latitude", value_name = "DEGREES", allow_hyphen_values = true)]
    pub forecast_default_latitude: Option<f64>,

    #[arg(long = "forecast-default-longitude", value_name = "DEGREES", allow_hyphen_values = true)]
    pub forecast_default_longitude: Option<f64>,

    #[arg(long = "forecast-horizon-days", value_name = "DAYS")]
    pub forecast_horizon_days: Option<u16>,

    /// Override the directory holding the front-end bundle.
    #[arg(long = "assets-public-dir", value_name = "PATH")]
    pub assets_public_dir: Option<PathBuf>,
}
