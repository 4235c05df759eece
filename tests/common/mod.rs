//! Shared fixtures and failure-injecting backends for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use catalog_search::catalog::{CatalogPage, CatalogQuery, CatalogStore, InMemoryCatalog};
use catalog_search::error::{AppError, Result};
use catalog_search::models::ProductDocument;
use catalog_search::search::{
    BulkIndexSummary, InMemoryIndex, SearchError, SearchIndex, SearchRequest, SearchResponse,
    SearchResult,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Product in `category` with a predictable SKU
pub fn product(id: &str, name: &str, category: &str, price: f64) -> ProductDocument {
    ProductDocument::new(id, format!("SKU-{}", id), name, category, price).with_stock(5)
}

/// Red Shirt, Blue Jeans and Green Hat: two clothing items and one accessory
pub fn wardrobe() -> Vec<ProductDocument> {
    vec![
        product("p-1", "Red Shirt", "clothing", 19.99)
            .with_brand("Acme")
            .with_color("red")
            .with_description("Cotton crew neck"),
        product("p-2", "Blue Jeans", "clothing", 59.0)
            .with_brand("Denimco")
            .with_color("blue"),
        product("p-3", "Green Hat", "accessories", 12.5)
            .with_brand("Acme")
            .with_color("green"),
    ]
}

/// `count` generic products spread over two categories
pub fn bulk_products(count: usize) -> Vec<ProductDocument> {
    (0..count)
        .map(|i| {
            let category = if i % 2 == 0 { "even" } else { "odd" };
            product(&format!("bulk-{:03}", i), &format!("Item {}", i), category, 10.0 + i as f64)
        })
        .collect()
}

pub async fn seeded_index(products: &[ProductDocument]) -> Arc<InMemoryIndex> {
    let index = Arc::new(InMemoryIndex::new());
    index.bulk_index(products).await.unwrap();
    index
}

pub fn seeded_catalog(products: Vec<ProductDocument>) -> Arc<InMemoryCatalog> {
    Arc::new(InMemoryCatalog::with_products(products))
}

/// Index whose every operation fails as an unreachable backend would
#[derive(Default)]
pub struct FailingIndex {
    pub queries: AtomicUsize,
}

impl FailingIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SearchIndex for FailingIndex {
    async fn initialize(&self) -> SearchResult<()> {
        Err(SearchError::IndexInitFailed("connection refused".to_string()))
    }

    async fn index(&self, _doc: &ProductDocument) -> SearchResult<()> {
        Err(SearchError::IndexingFailed("connection refused".to_string()))
    }

    async fn bulk_index(&self, _docs: &[ProductDocument]) -> SearchResult<BulkIndexSummary> {
        Err(SearchError::IndexingFailed("connection refused".to_string()))
    }

    async fn delete(&self, _id: &str) -> SearchResult<()> {
        Err(SearchError::DeletionFailed("connection refused".to_string()))
    }

    async fn query(&self, _request: &SearchRequest) -> SearchResult<SearchResponse> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        Err(SearchError::BackendUnavailable("connection refused".to_string()))
    }

    async fn suggest(&self, _prefix: &str, _size: usize) -> SearchResult<Vec<String>> {
        Err(SearchError::BackendUnavailable("connection refused".to_string()))
    }

    async fn document_ids(&self) -> SearchResult<Vec<String>> {
        Err(SearchError::BackendUnavailable("connection refused".to_string()))
    }

    fn backend_name(&self) -> &'static str {
        "failing"
    }
}

/// Wraps a working index and delays every read
pub struct SlowIndex {
    inner: Arc<InMemoryIndex>,
    delay: Duration,
}

impl SlowIndex {
    pub fn new(inner: Arc<InMemoryIndex>, delay: Duration) -> Self {
        Self { inner, delay }
    }
}

#[async_trait]
impl SearchIndex for SlowIndex {
    async fn index(&self, doc: &ProductDocument) -> SearchResult<()> {
        self.inner.index(doc).await
    }

    async fn bulk_index(&self, docs: &[ProductDocument]) -> SearchResult<BulkIndexSummary> {
        self.inner.bulk_index(docs).await
    }

    async fn delete(&self, id: &str) -> SearchResult<()> {
        self.inner.delete(id).await
    }

    async fn query(&self, request: &SearchRequest) -> SearchResult<SearchResponse> {
        tokio::time::sleep(self.delay).await;
        self.inner.query(request).await
    }

    async fn suggest(&self, prefix: &str, size: usize) -> SearchResult<Vec<String>> {
        tokio::time::sleep(self.delay).await;
        self.inner.suggest(prefix, size).await
    }

    async fn document_ids(&self) -> SearchResult<Vec<String>> {
        self.inner.document_ids().await
    }

    fn backend_name(&self) -> &'static str {
        "slow"
    }
}

/// Wraps a working index and delays writes of documents with one name
pub struct LaggingWriteIndex {
    inner: Arc<InMemoryIndex>,
    lagging_name: String,
    delay: Duration,
}

impl LaggingWriteIndex {
    pub fn new(inner: Arc<InMemoryIndex>, lagging_name: &str, delay: Duration) -> Self {
        Self {
            inner,
            lagging_name: lagging_name.to_string(),
            delay,
        }
    }
}

#[async_trait]
impl SearchIndex for LaggingWriteIndex {
    async fn index(&self, doc: &ProductDocument) -> SearchResult<()> {
        if doc.name == self.lagging_name {
            tokio::time::sleep(self.delay).await;
        }
        self.inner.index(doc).await
    }

    async fn bulk_index(&self, docs: &[ProductDocument]) -> SearchResult<BulkIndexSummary> {
        self.inner.bulk_index(docs).await
    }

    async fn delete(&self, id: &str) -> SearchResult<()> {
        self.inner.delete(id).await
    }

    async fn query(&self, request: &SearchRequest) -> SearchResult<SearchResponse> {
        self.inner.query(request).await
    }

    async fn suggest(&self, prefix: &str, size: usize) -> SearchResult<Vec<String>> {
        self.inner.suggest(prefix, size).await
    }

    async fn document_ids(&self) -> SearchResult<Vec<String>> {
        self.inner.document_ids().await
    }

    fn backend_name(&self) -> &'static str {
        "lagging"
    }
}

/// Catalog whose listing is unavailable
pub struct FailingCatalog;

#[async_trait]
impl CatalogStore for FailingCatalog {
    async fn list_products(&self, _query: &CatalogQuery) -> Result<CatalogPage> {
        Err(AppError::Catalog("database offline".to_string()))
    }

    async fn get_products(&self, _ids: &[String]) -> Result<Vec<ProductDocument>> {
        Err(AppError::Catalog("database offline".to_string()))
    }
}
