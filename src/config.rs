use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    pub publishing: PublishingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
    pub max_pool_size: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Entries older than this are evicted on the next refresh cycle.
    #[serde(default = "default_expiration_secs")]
    pub expiration_secs: u64,
    /// Sleep between refresh cycles (sweep + recompute + push).
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
    /// Upper bound on buckets in a zero-filled answer; wider ranges are rejected as invalid.
    #[serde(default = "default_max_buckets")]
    pub max_buckets: u64,
}

fn default_expiration_secs() -> u64 {
    30 * 60
}

fn default_refresh_interval_secs() -> u64 {
    300
}

fn default_max_buckets() -> u64 {
    100_000
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            expiration_secs: default_expiration_secs(),
            refresh_interval_secs: default_refresh_interval_secs(),
            max_buckets: default_max_buckets(),
        }
    }
}

impl CacheConfig {
    pub fn expiration(&self) -> chrono::TimeDelta {
        chrono::TimeDelta::seconds(self.expiration_secs as i64)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PublishingConfig {
    /// Max number of live events kept in the broadcast channel for /ws/metrics (slow clients may lag).
    pub broadcast_capacity: usize,
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.server.port > 0,
            "server.port must be between 1 and 65535, got {}",
            self.server.port
        );
        anyhow::ensure!(
            !self.database.path.is_empty(),
            "database.path must be non-empty"
        );
        anyhow::ensure!(
            self.database.max_pool_size > 0,
            "database.max_pool_size must be > 0, got {}",
            self.database.max_pool_size
        );
        anyhow::ensure!(
            self.cache.expiration_secs > 0 && self.cache.expiration_secs <= i64::MAX as u64 / 1000,
            "cache.expiration_secs must be > 0 and fit a millisecond duration, got {}",
            self.cache.expiration_secs
        );
        anyhow::ensure!(
            self.cache.refresh_interval_secs > 0,
            "cache.refresh_interval_secs must be > 0, got {}",
            self.cache.refresh_interval_secs
        );
        anyhow::ensure!(
            self.cache.max_buckets > 0,
            "cache.max_buckets must be > 0, got {}",
            self.cache.max_buckets
        );
        anyhow::ensure!(
            self.publishing.broadcast_capacity > 0,
            "publishing.broadcast_capacity must be > 0, got {}",
            self.publishing.broadcast_capacity
        );
        Ok(())
    }
}
