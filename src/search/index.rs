//! The `SearchIndex` contract shared by every backend

use crate::models::ProductDocument;
use crate::search::error::SearchResult;
use crate::search::query::SearchRequest;
use crate::search::response::SearchResponse;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A document that could not be written during a bulk operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkFailure {
    pub id: String,
    pub reason: String,
}

/// Per-document outcome of a bulk write
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkIndexSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub failures: Vec<BulkFailure>,
}

impl BulkIndexSummary {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Default::default()
        }
    }

    pub fn record_success(&mut self) {
        self.succeeded += 1;
    }

    pub fn record_failure(&mut self, id: impl Into<String>, reason: impl Into<String>) {
        self.failed += 1;
        self.failures.push(BulkFailure {
            id: id.into(),
            reason: reason.into(),
        });
    }

    /// Every document in the batch failed for the same reason
    pub fn all_failed<'a>(
        ids: impl IntoIterator<Item = &'a str>,
        reason: &str,
    ) -> Self {
        let mut summary = Self::default();
        for id in ids {
            summary.total += 1;
            summary.record_failure(id, reason);
        }
        summary
    }

    pub fn is_complete_success(&self) -> bool {
        self.failed == 0
    }
}

/// Read-optimized product index.
///
/// Writes are upserts keyed by document id and deletes are idempotent. A
/// query error always means the backend could not answer; an empty result
/// set is a successful answer.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Prepare backing storage. Safe to call any number of times.
    async fn initialize(&self) -> SearchResult<()> {
        Ok(())
    }

    /// Insert or replace a single document
    async fn index(&self, doc: &ProductDocument) -> SearchResult<()>;

    /// Insert or replace many documents; each succeeds or fails on its own
    async fn bulk_index(&self, docs: &[ProductDocument]) -> SearchResult<BulkIndexSummary>;

    /// Remove a document. Removing an unknown id succeeds.
    async fn delete(&self, id: &str) -> SearchResult<()>;

    /// Execute a validated search request
    async fn query(&self, request: &SearchRequest) -> SearchResult<SearchResponse>;

    /// Candidate completions for a prefix
    async fn suggest(&self, prefix: &str, size: usize) -> SearchResult<Vec<String>>;

    /// Ids of every indexed document, ascending
    async fn document_ids(&self) -> SearchResult<Vec<String>>;

    /// Backend label for logs and metrics
    fn backend_name(&self) -> &'static str;
}
