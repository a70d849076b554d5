use serde::Deserialize;
use std::env;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    #[serde(default)]
    pub booking: BookingConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_true")]
    pub migrate: bool,
}

fn default_max_connections() -> u32 { 10 }
fn default_true() -> bool { true }

#[derive(Debug, Deserialize, Clone)]
pub struct RedisConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BookingConfig {
    #[serde(default = "default_seat_cache_ttl")]
    pub seat_cache_ttl_seconds: u64,
    #[serde(default = "default_order_prefix")]
    pub order_number_prefix: String,
    /// Deadline applied to each booking call. 0 disables it.
    #[serde(default)]
    pub request_timeout_ms: u64,
}

fn default_seat_cache_ttl() -> u64 { 24 * 60 * 60 }
fn default_order_prefix() -> String { "ORD".to_string() }

impl BookingConfig {
    pub fn seat_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.seat_cache_ttl_seconds)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_ms > 0).then(|| Duration::from_millis(self.request_timeout_ms))
    }
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            seat_cache_ttl_seconds: default_seat_cache_ttl(),
            order_number_prefix: default_order_prefix(),
            request_timeout_ms: 0,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Postgres,
    /// Process-local cache and store, for local runs without Redis/Postgres.
    Memory,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Per-environment overrides, e.g. config/production.toml
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Untracked local overrides
            .add_source(config::File::with_name("config/local").required(false))
            // Eg.. `SKYBOOK_REDIS__URL=redis://cache:6379` sets `redis.url`
            .add_source(config::Environment::with_prefix("SKYBOOK").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
