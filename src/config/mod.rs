//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{net::SocketAddr, num::NonZeroU32, str::FromStr, time::Duration};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

use crate::cache::MAX_ENTRY_TTL_SECS;

mod cli;

pub use cli::{CliArgs, Command, DatabaseOverride, ServeArgs, ServeOverrides};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "bizdir";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_ADMIN_HOST: &str = "127.0.0.1";
const DEFAULT_PUBLIC_PORT: u16 = 3000;
const DEFAULT_ADMIN_PORT: u16 = 3001;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 8;
const DEFAULT_SITE_URL: &str = "http://localhost:3000";
const DEFAULT_PER_PAGE: u32 = 20;
const DEFAULT_CACHE_TTL_SECS: u64 = 3600;
const DEFAULT_GEOSITEMAP_BATCH_SIZE: u32 = 500;
const DEFAULT_COMMUNITY_NAME: &str = "Love TriValley";
const DEFAULT_REGION: &str = "California";
const DEFAULT_OBJECT_TIER_CAPACITY: usize = 2048;
const DEFAULT_AUTO_CONSUME_INTERVAL_MS: u64 = 5000;
const DEFAULT_CONSUME_BATCH_LIMIT: usize = 100;

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub database: DatabaseSettings,
    pub explore: ExploreSettings,
    pub cache: CacheSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub public_addr: SocketAddr,
    pub admin_addr: SocketAddr,
    pub graceful_shutdown: Duration,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub url: Option<String>,
    pub max_connections: NonZeroU32,
}

#[derive(Debug, Clone)]
pub struct ExploreSettings {
    /// Absolute origin without a trailing slash, e.g. `https://example.com`.
    pub site_url: String,
    pub per_page: NonZeroU32,
    pub cache_ttl: Duration,
    pub geositemap_batch_size: NonZeroU32,
    /// Community named in generated intersection intros.
    pub community_name: String,
    /// Region appended to area names in generated intros.
    pub region: String,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub enable_object_tier: bool,
    pub enable_persistent_tier: bool,
    pub object_tier_capacity: usize,
    pub auto_consume_interval_ms: u64,
    pub consume_batch_limit: usize,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix("BIZDIR").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::FlushCache(database))
        | Some(Command::ExploreUrls(database))
        | Some(Command::Geositemap(database)) => raw.apply_database_override(database),
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    database: RawDatabaseSettings,
    explore: RawExploreSettings,
    cache: RawCacheSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(host) = overrides.server_admin_host.as_ref() {
            self.server.admin_host = Some(host.clone());
        }
        if let Some(port) = overrides.public_port {
            self.server.public_port = Some(port);
        }
        if let Some(port) = overrides.admin_port {
            self.server.admin_port = Some(port);
        }
        if let Some(seconds) = overrides.server_graceful_shutdown_seconds {
            self.server.graceful_shutdown_seconds = Some(seconds);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(url) = overrides.database_url.as_ref() {
            self.database.url = Some(url.clone());
        }
        if let Some(max) = overrides.database_max_connections {
            self.database.max_connections = Some(max);
        }
        if let Some(url) = overrides.explore_site_url.as_ref() {
            self.explore.site_url = Some(url.clone());
        }
        if let Some(per_page) = overrides.explore_per_page {
            self.explore.per_page = Some(per_page);
        }
        if let Some(ttl) = overrides.explore_cache_ttl_seconds {
            self.explore.cache_ttl_seconds = Some(ttl);
        }
        if let Some(enabled) = overrides.cache_enable_object_tier {
            self.cache.enable_object_tier = Some(enabled);
        }
        if let Some(enabled) = overrides.cache_enable_persistent_tier {
            self.cache.enable_persistent_tier = Some(enabled);
        }
        if let Some(capacity) = overrides.cache_object_tier_capacity {
            self.cache.object_tier_capacity = Some(capacity);
        }
    }

    fn apply_database_override(&mut self, overrides: &DatabaseOverride) {
        if let Some(url) = overrides.database_url.as_ref() {
            self.database.url = Some(url.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            database,
            explore,
            cache,
        } = raw;

        Ok(Self {
            server: build_server_settings(server)?,
            logging: build_logging_settings(logging)?,
            database: build_database_settings(database)?,
            explore: build_explore_settings(explore)?,
            cache: build_cache_settings(cache)?,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());
    let admin_host = server
        .admin_host
        .unwrap_or_else(|| DEFAULT_ADMIN_HOST.to_string());

    let public_port = server.public_port.unwrap_or(DEFAULT_PUBLIC_PORT);
    if public_port == 0 {
        return Err(LoadError::invalid(
            "server.public_port",
            "port must be greater than zero",
        ));
    }

    let admin_port = server.admin_port.unwrap_or(DEFAULT_ADMIN_PORT);
    if admin_port == 0 {
        return Err(LoadError::invalid(
            "server.admin_port",
            "port must be greater than zero",
        ));
    }

    let public_addr = parse_socket_addr(&host, public_port)
        .map_err(|reason| LoadError::invalid("server.public_addr", reason))?;
    let admin_addr = parse_socket_addr(&admin_host, admin_port)
        .map_err(|reason| LoadError::invalid("server.admin_addr", reason))?;

    let graceful_secs = server
        .graceful_shutdown_seconds
        .unwrap_or(DEFAULT_GRACEFUL_SHUTDOWN_SECS);
    if graceful_secs == 0 {
        return Err(LoadError::invalid(
            "server.graceful_shutdown_seconds",
            "must be greater than zero",
        ));
    }

    Ok(ServerSettings {
        public_addr,
        admin_addr,
        graceful_shutdown: Duration::from_secs(graceful_secs),
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_database_settings(database: RawDatabaseSettings) -> Result<DatabaseSettings, LoadError> {
    let url = database.url.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    });

    let max_connections = non_zero_u32(
        database
            .max_connections
            .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS)
            .into(),
        "database.max_connections",
    )?;

    Ok(DatabaseSettings {
        url,
        max_connections,
    })
}

fn build_explore_settings(explore: RawExploreSettings) -> Result<ExploreSettings, LoadError> {
    let raw_url = explore
        .site_url
        .unwrap_or_else(|| DEFAULT_SITE_URL.to_string());
    let parsed = Url::parse(raw_url.trim())
        .map_err(|err| LoadError::invalid("explore.site_url", format!("invalid URL: {err}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(LoadError::invalid(
            "explore.site_url",
            "scheme must be http or https",
        ));
    }
    let site_url = parsed.as_str().trim_end_matches('/').to_string();

    let per_page = non_zero_u32(
        explore.per_page.unwrap_or(DEFAULT_PER_PAGE).into(),
        "explore.per_page",
    )?;

    let ttl_secs = explore.cache_ttl_seconds.unwrap_or(DEFAULT_CACHE_TTL_SECS);
    if ttl_secs == 0 {
        return Err(LoadError::invalid(
            "explore.cache_ttl_seconds",
            "must be greater than zero",
        ));
    }
    if ttl_secs > MAX_ENTRY_TTL_SECS {
        return Err(LoadError::invalid(
            "explore.cache_ttl_seconds",
            format!("must not exceed {MAX_ENTRY_TTL_SECS}"),
        ));
    }

    let geositemap_batch_size = non_zero_u32(
        explore
            .geositemap_batch_size
            .unwrap_or(DEFAULT_GEOSITEMAP_BATCH_SIZE)
            .into(),
        "explore.geositemap_batch_size",
    )?;

    let community_name = non_blank(
        explore.community_name,
        DEFAULT_COMMUNITY_NAME,
        "explore.community_name",
    )?;
    let region = non_blank(explore.region, DEFAULT_REGION, "explore.region")?;

    Ok(ExploreSettings {
        site_url,
        per_page,
        cache_ttl: Duration::from_secs(ttl_secs),
        geositemap_batch_size,
        community_name,
        region,
    })
}

fn non_blank(
    value: Option<String>,
    default: &str,
    key: &'static str,
) -> Result<String, LoadError> {
    let value = value.unwrap_or_else(|| default.to_string());
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(LoadError::invalid(key, "must not be blank"));
    }
    Ok(trimmed.to_string())
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let object_tier_capacity = cache
        .object_tier_capacity
        .unwrap_or(DEFAULT_OBJECT_TIER_CAPACITY);
    if object_tier_capacity == 0 {
        return Err(LoadError::invalid(
            "cache.object_tier_capacity",
            "must be greater than zero",
        ));
    }

    let auto_consume_interval_ms = cache
        .auto_consume_interval_ms
        .unwrap_or(DEFAULT_AUTO_CONSUME_INTERVAL_MS);
    if auto_consume_interval_ms == 0 {
        return Err(LoadError::invalid(
            "cache.auto_consume_interval_ms",
            "must be greater than zero",
        ));
    }

    let consume_batch_limit = cache
        .consume_batch_limit
        .unwrap_or(DEFAULT_CONSUME_BATCH_LIMIT);
    if consume_batch_limit == 0 {
        return Err(LoadError::invalid(
            "cache.consume_batch_limit",
            "must be greater than zero",
        ));
    }

    Ok(CacheSettings {
        enable_object_tier: cache.enable_object_tier.unwrap_or(true),
        enable_persistent_tier: cache.enable_persistent_tier.unwrap_or(true),
        object_tier_capacity,
        auto_consume_interval_ms,
        consume_batch_limit,
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    admin_host: Option<String>,
    public_port: Option<u16>,
    admin_port: Option<u16>,
    graceful_shutdown_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawDatabaseSettings {
    url: Option<String>,
    max_connections: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawExploreSettings {
    site_url: Option<String>,
    per_page: Option<u32>,
    cache_ttl_seconds: Option<u64>,
    geositemap_batch_size: Option<u32>,
    community_name: Option<String>,
    region: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    enable_object_tier: Option<bool>,
    enable_persistent_tier: Option<bool>,
    object_tier_capacity: Option<usize>,
    auto_consume_interval_ms: Option<u64>,
    consume_batch_limit: Option<usize>,
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn non_zero_u32(value: u64, key: &'static str) -> Result<NonZeroU32, LoadError> {
    let value_u32: u32 = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for u32"))?;
    NonZeroU32::new(value_u32).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}
