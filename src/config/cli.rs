use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};

/// Command-line arguments for the bizdir binary.
#[derive(Debug, Parser)]
#[command(name = "bizdir", version, about = "Business directory explore service")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "BIZDIR_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the public and admin HTTP services.
    Serve(Box<ServeArgs>),
    /// Evict every explore cache entry in both tiers.
    #[command(name = "flush-cache")]
    FlushCache(DatabaseOverride),
    /// Print the hub, city and intersection URLs that should exist.
    #[command(name = "explore-urls")]
    ExploreUrls(DatabaseOverride),
    /// Print the geo sitemap document.
    #[command(name = "geositemap")]
    Geositemap(DatabaseOverride),
}

#[derive(Debug, Args, Default, Clone)]
pub struct DatabaseOverride {
    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL")]
    pub database_url: Option<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    /// Override the public listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the administrative listener host.
    #[arg(long = "server-admin-host", value_name = "HOST")]
    pub server_admin_host: Option<String>,

    /// Override the public listener port.
    #[arg(long = "server-public-port", value_name = "PORT")]
    pub public_port: Option<u16>,

    /// Override the administrative listener port.
    #[arg(long = "server-admin-port", value_name = "PORT")]
    pub admin_port: Option<u16>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL")]
    pub database_url: Option<String>,

    /// Override the database pool size.
    #[arg(long = "database-max-connections", value_name = "COUNT")]
    pub database_max_connections: Option<u32>,

    /// Override the absolute site URL used in links and sitemaps.
    #[arg(long = "explore-site-url", value_name = "URL")]
    pub explore_site_url: Option<String>,

    /// Override the number of listings per explore page.
    #[arg(long = "explore-per-page", value_name = "COUNT")]
    pub explore_per_page: Option<u32>,

    /// Override the lifetime of cached explore entries.
    #[arg(long = "explore-cache-ttl-seconds", value_name = "SECONDS")]
    pub explore_cache_ttl_seconds: Option<u64>,

    /// Enable or disable the in-process object tier.
    #[arg(
        long = "cache-enable-object-tier",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub cache_enable_object_tier: Option<bool>,

    /// Enable or disable the persistent transient tier.
    #[arg(
        long = "cache-enable-persistent-tier",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub cache_enable_persistent_tier: Option<bool>,

    /// Override the object tier capacity.
    #[arg(long = "cache-object-tier-capacity", value_name = "COUNT")]
    pub cache_object_tier_capacity: Option<usize>,
}
