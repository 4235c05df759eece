//! Deterministic in-process search index.
//!
//! Free text is a case-insensitive substring match over name and
//! description: no fuzziness, no field boosts, no scoring. Facets are never
//! computed. Callers must not expect ranking or facet parity with the
//! engine-backed index.

use crate::models::ProductDocument;
use crate::search::error::{SearchError, SearchResult};
use crate::search::index::{BulkIndexSummary, SearchIndex};
use crate::search::query::{matches_all, matches_text, sort_documents, SearchRequest};
use crate::search::response::SearchResponse;
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;
use validator::Validate;

/// In-memory search index (for tests and deployments without an engine)
#[derive(Clone, Default)]
pub struct InMemoryIndex {
    documents: Arc<DashMap<String, ProductDocument>>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live documents
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<ProductDocument> {
        self.documents.get(id).map(|entry| entry.clone())
    }

    fn upsert(&self, doc: &ProductDocument) -> SearchResult<()> {
        doc.validate()
            .map_err(|e| SearchError::IndexingFailed(format!("document {}: {}", doc.id, e)))?;
        self.documents.insert(doc.id.clone(), doc.clone());
        Ok(())
    }
}

#[async_trait]
impl SearchIndex for InMemoryIndex {
    async fn index(&self, doc: &ProductDocument) -> SearchResult<()> {
        self.upsert(doc)?;
        debug!(product_id = %doc.id, "Document indexed");
        Ok(())
    }

    async fn bulk_index(&self, docs: &[ProductDocument]) -> SearchResult<BulkIndexSummary> {
        let mut summary = BulkIndexSummary::new(docs.len());

        for doc in docs {
            match self.upsert(doc) {
                Ok(()) => summary.record_success(),
                Err(e) => summary.record_failure(doc.id.clone(), e.to_string()),
            }
        }

        debug!(
            total = summary.total,
            failed = summary.failed,
            "Bulk index completed"
        );
        Ok(summary)
    }

    async fn delete(&self, id: &str) -> SearchResult<()> {
        let removed = self.documents.remove(id).is_some();
        debug!(product_id = %id, removed, "Document deleted");
        Ok(())
    }

    async fn query(&self, request: &SearchRequest) -> SearchResult<SearchResponse> {
        let start = Instant::now();
        let page = request.page()?;
        let text = request.text_query();

        let mut matched: Vec<ProductDocument> = self
            .documents
            .iter()
            .filter(|entry| matches_all(&request.filters, entry.value()))
            .filter(|entry| text.map_or(true, |t| matches_text(t, entry.value())))
            .map(|entry| entry.value().clone())
            .collect();

        sort_documents(&mut matched, &request.sort);

        let total = matched.len() as u64;
        let documents = matched
            .into_iter()
            .skip(page.offset)
            .take(page.size)
            .collect();

        Ok(SearchResponse {
            documents,
            total,
            facets: BTreeMap::new(),
            query: text.map(String::from),
            offset: page.offset,
            size: page.size,
            search_time_ms: start.elapsed().as_millis() as u64,
        })
    }

    async fn suggest(&self, prefix: &str, size: usize) -> SearchResult<Vec<String>> {
        let prefix = prefix.trim().to_lowercase();
        if prefix.is_empty() || size == 0 {
            return Ok(Vec::new());
        }

        let names: BTreeSet<String> = self
            .documents
            .iter()
            .filter(|entry| entry.name.to_lowercase().starts_with(&prefix))
            .map(|entry| entry.name.clone())
            .collect();

        Ok(names.into_iter().take(size).collect())
    }

    async fn document_ids(&self) -> SearchResult<Vec<String>> {
        let mut ids: Vec<String> = self.documents.iter().map(|entry| entry.key().clone()).collect();
        ids.sort();
        Ok(ids)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
