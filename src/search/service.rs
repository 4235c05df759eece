//! Read-path orchestration: validation, bounded query, fallback, analytics

use crate::analytics::AnalyticsRecorder;
use crate::catalog::CatalogStore;
use crate::metrics::{SEARCH_QUERIES_TOTAL, SEARCH_QUERY_DURATION_SECONDS, SEARCH_SUGGESTIONS_TOTAL};
use crate::search::config::SearchConfig;
use crate::search::error::{SearchError, SearchResult};
use crate::search::fallback::FallbackCoordinator;
use crate::search::index::SearchIndex;
use crate::search::query::{Page, SearchRequest};
use crate::search::response::SearchResponse;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Main search service
///
/// Callers only ever see validation errors. Any backend failure or timeout is
/// answered from the catalog instead, and only if that also fails does the
/// search return [`SearchError::Unavailable`].
pub struct SearchService {
    config: SearchConfig,
    index: Arc<dyn SearchIndex>,
    fallback: FallbackCoordinator,
    analytics: Option<Arc<AnalyticsRecorder>>,
}

impl SearchService {
    /// Create a new search service
    pub fn new(
        config: SearchConfig,
        index: Arc<dyn SearchIndex>,
        catalog: Arc<dyn CatalogStore>,
    ) -> SearchResult<Self> {
        config.validate()?;

        info!(
            backend = index.backend_name(),
            query_timeout_ms = config.query_timeout_ms,
            facets = config.enable_facets,
            "Search service initialized"
        );

        Ok(Self {
            config,
            index,
            fallback: FallbackCoordinator::new(catalog),
            analytics: None,
        })
    }

    /// Record every text search through `recorder`
    pub fn with_analytics(mut self, recorder: Arc<AnalyticsRecorder>) -> Self {
        self.analytics = Some(recorder);
        self
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn index(&self) -> &Arc<dyn SearchIndex> {
        &self.index
    }

    /// Validate a request against the pagination rules and configured limits
    pub fn validate(&self, request: &SearchRequest) -> SearchResult<Page> {
        let page = request.page()?;
        if page.size > self.config.max_page_size {
            return Err(SearchError::Validation(format!(
                "size {} exceeds the maximum of {}",
                page.size, self.config.max_page_size
            )));
        }
        Ok(page)
    }

    /// Perform a search
    pub async fn search(&self, request: &SearchRequest) -> SearchResult<SearchResponse> {
        self.search_for_user(request, None).await
    }

    /// Perform a search on behalf of a known user (recorded in analytics)
    pub async fn search_for_user(
        &self,
        request: &SearchRequest,
        user_id: Option<String>,
    ) -> SearchResult<SearchResponse> {
        let start = Instant::now();
        let backend = self.index.backend_name();

        if let Err(e) = self.validate(request) {
            SEARCH_QUERIES_TOTAL
                .with_label_values(&[backend, "rejected"])
                .inc();
            debug!(error = %e, "Search request rejected");
            return Err(e);
        }

        let (mut response, outcome) = match self.query_index(request).await {
            Ok(response) => (response, "success"),
            Err(SearchError::Validation(msg)) => {
                SEARCH_QUERIES_TOTAL
                    .with_label_values(&[backend, "rejected"])
                    .inc();
                return Err(SearchError::Validation(msg));
            }
            Err(cause) => match self.fallback.search(request, &cause).await {
                Ok(response) => (response, "degraded"),
                Err(e) => {
                    SEARCH_QUERIES_TOTAL
                        .with_label_values(&[backend, "unavailable"])
                        .inc();
                    return Err(e);
                }
            },
        };

        if !self.config.enable_facets {
            response.facets.clear();
        }
        response.search_time_ms = start.elapsed().as_millis() as u64;

        if let (Some(recorder), Some(text)) = (&self.analytics, request.text_query()) {
            recorder.record(text, user_id, response.total);
        }

        SEARCH_QUERIES_TOTAL
            .with_label_values(&[backend, outcome])
            .inc();
        SEARCH_QUERY_DURATION_SECONDS
            .with_label_values(&[backend])
            .observe(start.elapsed().as_secs_f64());

        debug!(
            backend,
            outcome,
            total = response.total,
            returned = response.documents.len(),
            took_ms = response.search_time_ms,
            "Search completed"
        );

        Ok(response)
    }

    /// Single attempt against the index, bounded by the query timeout
    async fn query_index(&self, request: &SearchRequest) -> SearchResult<SearchResponse> {
        let timeout = Duration::from_millis(self.config.query_timeout_ms);
        match tokio::time::timeout(timeout, self.index.query(request)).await {
            Ok(result) => result,
            Err(_) => Err(SearchError::Timeout(self.config.query_timeout_ms)),
        }
    }

    /// Suggest product names for a prefix; backend failures yield no suggestions
    pub async fn suggest(&self, prefix: &str, size: usize) -> SearchResult<Vec<String>> {
        if size == 0 || size > self.config.max_suggestions {
            return Err(SearchError::Validation(format!(
                "suggestion size must be between 1 and {}",
                self.config.max_suggestions
            )));
        }

        let prefix = prefix.trim();
        if !self.config.enable_suggestions || prefix.is_empty() {
            return Ok(Vec::new());
        }

        let backend = self.index.backend_name();
        let timeout = Duration::from_millis(self.config.query_timeout_ms);
        let result = match tokio::time::timeout(timeout, self.index.suggest(prefix, size)).await {
            Ok(result) => result,
            Err(_) => Err(SearchError::Timeout(self.config.query_timeout_ms)),
        };

        match result {
            Ok(suggestions) => {
                SEARCH_SUGGESTIONS_TOTAL
                    .with_label_values(&[backend, "success"])
                    .inc();
                Ok(suggestions)
            }
            Err(e) => {
                SEARCH_SUGGESTIONS_TOTAL
                    .with_label_values(&[backend, "degraded"])
                    .inc();
                warn!(error = %e, prefix, "Suggestions unavailable, returning none");
                Ok(Vec::new())
            }
        }
    }
}
