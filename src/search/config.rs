//! Search configuration

use crate::search::error::{SearchError, SearchResult};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Which `SearchIndex` implementation to run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, EnumString, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum SearchBackend {
    /// Deterministic in-process index
    #[default]
    Memory,
    /// External Elasticsearch-compatible engine
    Engine,
}

/// Connection settings for the external search engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Base URL of the engine's REST API
    #[serde(default = "default_engine_url")]
    pub url: String,

    /// Name of the product index
    #[serde(default = "default_index_name")]
    pub index_name: String,

    /// Per-request timeout (milliseconds)
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    #[serde(default = "default_shards")]
    pub shards: u32,

    #[serde(default = "default_replicas")]
    pub replicas: u32,

    /// Refresh after each write so documents are immediately searchable
    #[serde(default)]
    pub refresh: bool,

    /// Basic auth user
    #[serde(default)]
    pub username: Option<String>,

    /// Name of the environment variable holding the basic auth password
    #[serde(default)]
    pub password_env: Option<String>,
}

fn default_engine_url() -> String {
    "http://localhost:9200".to_string()
}

fn default_index_name() -> String {
    "products".to_string()
}

fn default_request_timeout_ms() -> u64 {
    2_000
}

fn default_shards() -> u32 {
    1
}

fn default_replicas() -> u32 {
    0
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            url: default_engine_url(),
            index_name: default_index_name(),
            request_timeout_ms: default_request_timeout_ms(),
            shards: default_shards(),
            replicas: default_replicas(),
            refresh: false,
            username: None,
            password_env: None,
        }
    }
}

impl EngineConfig {
    /// Resolve the basic auth password from the environment, if configured
    pub fn password(&self) -> Option<String> {
        self.password_env
            .as_deref()
            .and_then(|var| std::env::var(var).ok())
    }
}

/// Search service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Backend selected at startup
    #[serde(default)]
    pub backend: SearchBackend,

    /// Engine settings (used when `backend = "engine"`)
    #[serde(default)]
    pub engine: EngineConfig,

    /// Upper bound on a single query before falling back to the catalog
    #[serde(default = "default_query_timeout_ms")]
    pub query_timeout_ms: u64,

    /// Largest page a caller may request
    #[serde(default = "default_max_page_size")]
    pub max_page_size: usize,

    /// Largest suggestion list a caller may request
    #[serde(default = "default_max_suggestions")]
    pub max_suggestions: usize,

    /// Fuzziness passed to the engine's multi-field match (e.g. `AUTO`, `1`)
    #[serde(default = "default_fuzziness")]
    pub fuzziness: String,

    /// Enable faceted search
    #[serde(default = "default_true")]
    pub enable_facets: bool,

    /// Enable query suggestions
    #[serde(default = "default_true")]
    pub enable_suggestions: bool,
}

fn default_query_timeout_ms() -> u64 {
    1_500
}

fn default_max_page_size() -> usize {
    100
}

fn default_max_suggestions() -> usize {
    20
}

fn default_fuzziness() -> String {
    "AUTO".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            backend: SearchBackend::default(),
            engine: EngineConfig::default(),
            query_timeout_ms: default_query_timeout_ms(),
            max_page_size: default_max_page_size(),
            max_suggestions: default_max_suggestions(),
            fuzziness: default_fuzziness(),
            enable_facets: true,
            enable_suggestions: true,
        }
    }
}

impl SearchConfig {
    /// Reject settings no backend could run with
    pub fn validate(&self) -> SearchResult<()> {
        if self.query_timeout_ms == 0 {
            return Err(SearchError::InvalidConfiguration(
                "query_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.max_page_size == 0 {
            return Err(SearchError::InvalidConfiguration(
                "max_page_size must be greater than zero".to_string(),
            ));
        }
        if self.max_suggestions == 0 {
            return Err(SearchError::InvalidConfiguration(
                "max_suggestions must be greater than zero".to_string(),
            ));
        }
        if self.backend == SearchBackend::Engine {
            if self.engine.index_name.is_empty() {
                return Err(SearchError::InvalidConfiguration(
                    "engine.index_name must not be empty".to_string(),
                ));
            }
            if !self.engine.url.starts_with("http://") && !self.engine.url.starts_with("https://")
            {
                return Err(SearchError::InvalidConfiguration(format!(
                    "engine.url must be an http(s) URL, got '{}'",
                    self.engine.url
                )));
            }
        }
        Ok(())
    }
}

/// Builder for SearchConfig
pub struct SearchConfigBuilder {
    config: SearchConfig,
}

impl SearchConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: SearchConfig::default(),
        }
    }

    pub fn backend(mut self, backend: SearchBackend) -> Self {
        self.config.backend = backend;
        self
    }

    pub fn engine_url(mut self, url: impl Into<String>) -> Self {
        self.config.engine.url = url.into();
        self
    }

    pub fn index_name(mut self, name: impl Into<String>) -> Self {
        self.config.engine.index_name = name.into();
        self
    }

    pub fn request_timeout_ms(mut self, ms: u64) -> Self {
        self.config.engine.request_timeout_ms = ms;
        self
    }

    pub fn refresh(mut self, refresh: bool) -> Self {
        self.config.engine.refresh = refresh;
        self
    }

    pub fn query_timeout_ms(mut self, ms: u64) -> Self {
        self.config.query_timeout_ms = ms;
        self
    }

    pub fn max_page_size(mut self, size: usize) -> Self {
        self.config.max_page_size = size;
        self
    }

    pub fn max_suggestions(mut self, size: usize) -> Self {
        self.config.max_suggestions = size;
        self
    }

    pub fn fuzziness(mut self, fuzziness: impl Into<String>) -> Self {
        self.config.fuzziness = fuzziness.into();
        self
    }

    pub fn enable_facets(mut self, enabled: bool) -> Self {
        self.config.enable_facets = enabled;
        self
    }

    pub fn enable_suggestions(mut self, enabled: bool) -> Self {
        self.config.enable_suggestions = enabled;
        self
    }

    pub fn build(self) -> SearchConfig {
        self.config
    }
}

impl Default for SearchConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
