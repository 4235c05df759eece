//! Wiring of the search subsystem from configuration

use crate::analytics::{AnalyticsRecorder, AnalyticsStore};
use crate::catalog::CatalogStore;
use crate::config::Config;
use crate::search::config::{SearchBackend, SearchConfig};
use crate::search::engine::EngineBackedIndex;
use crate::search::error::SearchResult;
use crate::search::index::SearchIndex;
use crate::search::memory::InMemoryIndex;
use crate::search::reconcile::ReconciliationJob;
use crate::search::service::SearchService;
use crate::search::sync::IndexSynchronizer;
use std::sync::Arc;
use tracing::{info, warn};

/// Create the configured index backend
pub fn create_search_index(config: &SearchConfig) -> SearchResult<Arc<dyn SearchIndex>> {
    match config.backend {
        SearchBackend::Memory => {
            info!("Using in-memory search index");
            Ok(Arc::new(InMemoryIndex::new()))
        }
        SearchBackend::Engine => {
            info!(
                url = %config.engine.url,
                index = %config.engine.index_name,
                "Using engine-backed search index"
            );
            Ok(Arc::new(EngineBackedIndex::new(config)?))
        }
    }
}

/// All search components sharing one index and one catalog
pub struct SearchSystem {
    pub index: Arc<dyn SearchIndex>,
    pub service: Arc<SearchService>,
    pub synchronizer: Arc<IndexSynchronizer>,
    pub reconciliation: Arc<ReconciliationJob>,
    pub analytics: Arc<AnalyticsRecorder>,
}

impl SearchSystem {
    /// Build every component and prepare the index.
    ///
    /// An index that cannot be initialized is logged and left in place: reads
    /// fall back to the catalog and writes retry initialization.
    pub async fn build(
        config: &Config,
        catalog: Arc<dyn CatalogStore>,
        analytics_store: Arc<dyn AnalyticsStore>,
    ) -> SearchResult<Self> {
        let index = create_search_index(&config.search)?;

        if let Err(e) = index.initialize().await {
            warn!(
                backend = index.backend_name(),
                error = %e,
                "Search index initialization failed; continuing in degraded mode"
            );
        }

        let analytics = Arc::new(AnalyticsRecorder::new(&config.analytics, analytics_store));
        let service = Arc::new(
            SearchService::new(config.search.clone(), index.clone(), catalog.clone())?
                .with_analytics(analytics.clone()),
        );
        let synchronizer = Arc::new(IndexSynchronizer::new(index.clone(), &config.indexing));
        let reconciliation = Arc::new(ReconciliationJob::new(
            catalog,
            index.clone(),
            &config.reconciliation,
        ));

        Ok(Self {
            index,
            service,
            synchronizer,
            reconciliation,
            analytics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::InMemoryAnalyticsStore;
    use crate::catalog::InMemoryCatalog;
    use crate::search::config::SearchConfigBuilder;

    #[test]
    fn test_memory_backend_selected_by_default() {
        let index = create_search_index(&SearchConfig::default()).unwrap();
        assert_eq!(index.backend_name(), "memory");
    }

    #[test]
    fn test_engine_backend_with_bad_url() {
        let config = SearchConfigBuilder::new()
            .backend(SearchBackend::Engine)
            .engine_url("not a url")
            .build();
        assert!(create_search_index(&config).is_err());
    }

    #[tokio::test]
    async fn test_build_system() {
        let system = SearchSystem::build(
            &Config::default(),
            Arc::new(InMemoryCatalog::new()),
            Arc::new(InMemoryAnalyticsStore::new()),
        )
        .await
        .unwrap();

        assert_eq!(system.index.backend_name(), "memory");
        assert!(system.analytics.is_enabled());
        assert_eq!(system.synchronizer.pending(), 0);
    }
}
