use std::path::Path;
use std::time::Duration;
use config::{Config, ConfigError, Environment, File, Map};
use serde::Deserialize;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub tracking: TrackingConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,
    pub user: String,
    pub password: String,
    /// Maximum connections in pool
    pub max_connections: u32,
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("target", &self.target())
            .field("user", &self.user)
            .field("max_connections", &self.max_connections)
            .finish_non_exhaustive()
    }
}

impl DatabaseConfig {
    /// `host[:port]/database` from the URL, without credentials or query parameters.
    pub fn target(&self) -> String {
        let rest = self.url.split_once("://").map_or(self.url.as_str(), |(_, rest)| rest);
        let rest = rest.split(['?', '#']).next().unwrap_or(rest);
        match rest.rsplit_once('@') {
            Some((_, host)) => host.to_string(),
            None => rest.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrackingConfig {
    /// Delay between status reads while tracking an order, in milliseconds
    pub interval_ms: u64,
}

impl TrackingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(1))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Filter used when RUST_LOG is not set
    pub level: String,
}

impl AppConfig {
    /// Load configuration from the `config` directory and the environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from a specific directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        Self::load_with(config_dir.as_ref(), std::env::vars().collect())
    }

    /// Load configuration with `vars` standing in for the process environment
    fn load_with(config_dir: &Path, vars: Map<String, String>) -> Result<Self, ConfigError> {
        // Blank values count as unset
        let non_blank = |name: &str| vars.get(name).filter(|value| !value.trim().is_empty()).cloned();
        let environment = non_blank("CLOUDKITCHEN_ENV").unwrap_or_else(|| "development".to_string());

        let builder = Config::builder()
            // Start with default values
            .set_default("database.url", "postgres://localhost:5432/cloud_kitchen")?
            .set_default("database.user", "postgres")?
            .set_default("database.password", "postgres")?
            .set_default("database.max_connections", 5)?
            .set_default("tracking.interval_ms", 2000)?
            .set_default("logging.level", "info")?
            // Load default config file
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Load environment-specific config (e.g., config/production.toml)
            .add_source(File::from(config_dir.join(&environment)).required(false))
            // Override with environment variables (CLOUDKITCHEN_TRACKING__INTERVAL_MS, etc.)
            .add_source(
                Environment::with_prefix("CLOUDKITCHEN")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .source(Some(vars.clone())),
            )
            // Short database variables take precedence over everything else
            .set_override_option("database.url", non_blank("CLOUDKITCHEN_DB_URL"))?
            .set_override_option("database.user", non_blank("CLOUDKITCHEN_DB_USER"))?
            .set_override_option("database.password", non_blank("CLOUDKITCHEN_DB_PASS"))?;

        builder.build()?.try_deserialize()
    }
}
