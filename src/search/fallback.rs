//! Degraded-mode search against the catalog store.

use crate::catalog::{CatalogQuery, CatalogStore};
use crate::metrics::SEARCH_DEGRADED_TOTAL;
use crate::search::error::{SearchError, SearchResult};
use crate::search::query::SearchRequest;
use crate::search::response::SearchResponse;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, warn};

/// Re-runs a search against the catalog's filtered listing when the index fails.
///
/// Responses have the same shape as index responses; facets are always empty.
pub struct FallbackCoordinator {
    catalog: Arc<dyn CatalogStore>,
}

impl FallbackCoordinator {
    pub fn new(catalog: Arc<dyn CatalogStore>) -> Self {
        Self { catalog }
    }

    /// Map a search request onto the catalog listing
    pub fn catalog_query(request: &SearchRequest) -> SearchResult<CatalogQuery> {
        let page = request.page()?;
        Ok(CatalogQuery {
            filters: request.filters.clone(),
            text: request.text_query().map(String::from),
            sort: request.sort.clone(),
            offset: page.offset,
            limit: page.size,
            after_id: None,
        })
    }

    /// Answer `request` from the catalog. `cause` is the index failure that triggered this.
    pub async fn search(
        &self,
        request: &SearchRequest,
        cause: &SearchError,
    ) -> SearchResult<SearchResponse> {
        let start = Instant::now();

        warn!(
            error = %cause,
            reason = cause.kind(),
            query = request.text_query().unwrap_or(""),
            "Search backend failed, serving from catalog in degraded mode"
        );
        SEARCH_DEGRADED_TOTAL
            .with_label_values(&[cause.kind()])
            .inc();

        let query = Self::catalog_query(request)?;
        let page = self.catalog.list_products(&query).await.map_err(|e| {
            error!(error = %e, "Catalog fallback failed");
            SearchError::Unavailable(format!("index: {}; catalog: {}", cause, e))
        })?;

        Ok(SearchResponse {
            documents: page.products,
            total: page.total,
            facets: BTreeMap::new(),
            query: query.text,
            offset: query.offset,
            size: query.limit,
            search_time_ms: start.elapsed().as_millis() as u64,
        })
    }
}
