use crate::analytics::AnalyticsConfig;
use crate::dispatch::DispatchConfig;
use crate::search::{ReconciliationConfig, SearchConfig};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variable naming an optional configuration file
pub const CONFIG_PATH_ENV: &str = "CATALOG_SEARCH_CONFIG";

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Search backend and read-path settings
    #[serde(default)]
    pub search: SearchConfig,

    /// Background queue for catalog-to-index synchronization
    #[serde(default)]
    pub indexing: DispatchConfig,

    /// Search analytics recording
    #[serde(default)]
    pub analytics: AnalyticsConfig,

    /// Full index rebuilds
    #[serde(default)]
    pub reconciliation: ReconciliationConfig,

    /// Catalog source used by the CLI
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self, config::ConfigError> {
        let config_path = std::env::var(CONFIG_PATH_ENV).ok();
        Self::load_from(config_path.as_deref())
    }

    /// Load configuration layering defaults, an optional file and the environment
    pub fn load_from(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder()
            // Start with default values
            .add_source(config::File::from_str(
                include_str!("../config/default.toml"),
                config::FileFormat::Toml,
            ));

        // Override with config file if given
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(true));
        }

        builder
            // Override with environment variables (prefix: CATALOG_SEARCH__)
            .add_source(
                config::Environment::with_prefix("CATALOG_SEARCH")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Check cross-field constraints the type system cannot express
    pub fn validate(&self) -> crate::error::Result<()> {
        self.search.validate()?;

        if self.reconciliation.page_size == 0 {
            return Err(crate::error::AppError::Configuration(
                "reconciliation.page_size must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// JSON array of products loaded into the in-memory catalog
    #[serde(default)]
    pub fixture_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub json_logs: bool,

    /// Service name
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Enable Prometheus metrics
    #[serde(default = "default_true")]
    pub prometheus_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logs: false,
            service_name: default_service_name(),
            prometheus_enabled: true,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_service_name() -> String {
    "catalog-search".to_string()
}

fn default_true() -> bool {
    true
}
